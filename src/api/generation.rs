use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth::Identity;
use crate::generation::{DualPathSimulation, QuestionAnswer};
use crate::{AppState, Result};

#[derive(Debug, Deserialize)]
pub struct QuestionsRequest {
    pub decision: String,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub decision: String,
    #[serde(default)]
    pub answers: Vec<QuestionAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct FlashcardsRequest {
    pub decision: String,
    #[serde(default)]
    pub answers: Vec<QuestionAnswer>,
    pub simulations: DualPathSimulation,
}

fn caller(identity: &Option<Identity>) -> &str {
    identity.as_ref().map_or("anonymous", |i| i.external_id.as_str())
}

pub async fn questions(
    state: web::Data<AppState>,
    identity: Option<Identity>,
    req: web::Json<QuestionsRequest>,
) -> Result<HttpResponse> {
    tracing::info!(caller = caller(&identity), "Generating questions");
    let questions = state.gateway.questions(req.decision.trim()).await?;
    Ok(HttpResponse::Ok().json(json!({ "questions": questions })))
}

pub async fn simulate_paths(
    state: web::Data<AppState>,
    identity: Option<Identity>,
    req: web::Json<SimulateRequest>,
) -> Result<HttpResponse> {
    tracing::info!(caller = caller(&identity), answers = req.answers.len(), "Simulating paths");
    let simulation = state.gateway.simulate(req.decision.trim(), &req.answers).await?;
    Ok(HttpResponse::Ok().json(simulation))
}

pub async fn flashcards(
    state: web::Data<AppState>,
    identity: Option<Identity>,
    req: web::Json<FlashcardsRequest>,
) -> Result<HttpResponse> {
    tracing::info!(caller = caller(&identity), "Generating flashcards");
    let set = state
        .gateway
        .flashcards(req.decision.trim(), &req.answers, &req.simulations)
        .await?;
    Ok(HttpResponse::Ok().json(set))
}
