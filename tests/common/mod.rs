#![allow(dead_code)]

use actix_web::web;
use afterward_server::auth::Claims;
use afterward_server::generation::fallback;
use afterward_server::{AppState, Settings};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

pub const JWT_SECRET: &str = "test_secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const DECISION: &str = "Should I quit my job to start a bakery?";

pub fn settings() -> Settings {
    let mut settings = Settings::new_for_test().expect("Failed to load test config");
    settings.billing.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    settings
}

pub fn state_with(settings: Settings) -> web::Data<AppState> {
    web::Data::new(AppState::in_memory(settings).expect("in-memory state"))
}

pub fn state() -> web::Data<AppState> {
    state_with(settings())
}

pub fn token(external_id: &str) -> String {
    let claims = Claims {
        sub: external_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
        iat: None,
        email: Some(format!("{}@example.com", external_id)),
        iss: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).expect("token")
}

pub fn bearer(external_id: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(external_id)))
}

/// A complete save-decision body built from the offline artifacts.
pub fn save_body(choice: &str) -> Value {
    let answers: Vec<Value> = fallback::questions()
        .iter()
        .enumerate()
        .map(|(i, q)| {
            json!({
                "question": q.question,
                "answer": format!("answer {}", i + 1),
                "order": i + 1,
            })
        })
        .collect();

    json!({
        "decision": DECISION,
        "answers": answers,
        "simulations": fallback::simulation(),
        "flashcards": fallback::flashcards(),
        "userChoice": choice,
    })
}
