use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Identity;
use crate::decisions::SaveDecisionRequest;
use crate::{AppState, Result};

pub async fn save_decision(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<SaveDecisionRequest>,
) -> Result<HttpResponse> {
    let decision = state.decisions.save(&identity, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "decisionId": decision.id,
    })))
}

pub async fn list_decisions(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse> {
    let decisions = state.decisions.list(&identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "decisions": decisions })))
}

pub async fn get_decision(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let decision = state.decisions.get(&identity, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(decision))
}

pub async fn delete_decision(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.decisions.delete(&identity, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub reflection: String,
    pub status: Option<String>,
}

pub async fn check_in(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
    req: web::Json<CheckInRequest>,
) -> Result<HttpResponse> {
    let check_in = state
        .check_ins
        .submit_check_in(&identity, id.into_inner(), &req.reflection, req.status.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "checkIn": check_in,
    })))
}
