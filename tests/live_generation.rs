mod common;

use std::time::Duration;

use actix_web::{test, App};
use afterward_server::api;
use afterward_server::generation::{GeminiClient, GenerationGateway, TextGenerator};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
    }))
}

fn live_settings(server: &MockServer) -> afterward_server::Settings {
    let mut settings = common::settings();
    settings.generation.api_key = Some("gm_test_key".into());
    settings.generation.base_url = format!("{}/", server.uri());
    settings
}

#[tokio::test]
async fn test_client_sends_key_and_joins_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "gm_test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello, " }, { "text": "future self" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(
        "gm_test_key",
        "gemini-2.5-flash",
        &format!("{}/", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(client.generate("hi").await.unwrap(), "Hello, future self");
}

#[tokio::test]
async fn test_gateway_decodes_fenced_questions() {
    let server = MockServer::start().await;
    let payload = json!([
        { "question": "What's pulling you toward the bakery?", "type": "multiple_choice",
          "options": ["Freedom", "Craft", "Money", "Escape"] },
        { "question": "What scares you most?", "type": "text" },
        { "question": "How ready do you feel?", "type": "scale" }
    ]);
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(reply(&format!("```json\n{}\n```", payload)))
        .mount(&server)
        .await;

    let client = GeminiClient::new("gm_test_key", "gemini-2.5-flash", &format!("{}/", server.uri()), Duration::from_secs(5))
        .unwrap();
    let gateway = GenerationGateway::live(Arc::new(client), Duration::from_secs(5));

    let questions = gateway.questions(common::DECISION).await.unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0].options.as_ref().map(Vec::len), Some(4));
    assert!(questions[1].options.is_none());
}

#[actix_web::test]
async fn test_ill_shaped_output_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(reply(r#"[{"question": "Only one?", "type": "text"}]"#))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(common::state_with(live_settings(&server)))
            .configure(api::configure),
    )
    .await;

    let resp = test::TestRequest::post()
        .uri("/api/questions")
        .set_json(json!({ "decision": common::DECISION }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_empty_output_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(reply("   "))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(common::state_with(live_settings(&server)))
            .configure(api::configure),
    )
    .await;

    let health: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(health["generation"], "live");

    let resp = test::TestRequest::post()
        .uri("/api/simulate-paths")
        .set_json(json!({ "decision": common::DECISION, "answers": [] }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No content from AI");
}

#[actix_web::test]
async fn test_unreachable_generator_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(common::state_with(live_settings(&server)))
            .configure(api::configure),
    )
    .await;

    let resp = test::TestRequest::post()
        .uri("/api/questions")
        .set_json(json!({ "decision": common::DECISION }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 500);
}
