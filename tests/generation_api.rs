mod common;

use actix_web::{test, App};
use afterward_server::api;
use serde_json::{json, Value};

#[actix_web::test]
async fn test_offline_questions_for_bakery_decision() {
    let app = test::init_service(App::new().app_data(common::state()).configure(api::configure)).await;

    let resp = test::TestRequest::post()
        .uri("/api/questions")
        .set_json(json!({ "decision": common::DECISION }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 4);
    assert_eq!(questions[3]["question"], "What would you regret more in 10 years?");
    assert_eq!(questions[3]["type"], "multiple_choice");
    assert!(questions[3]["options"].as_array().unwrap().len() >= 4);
}

#[actix_web::test]
async fn test_offline_artifacts_are_deterministic() {
    let app = test::init_service(App::new().app_data(common::state()).configure(api::configure)).await;
    let request = json!({ "decision": common::DECISION, "answers": [] });

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let resp = test::TestRequest::post()
            .uri("/api/simulate-paths")
            .set_json(&request)
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 200);
        bodies.push(test::read_body_json::<Value, _>(resp).await);
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[0]["pathA"]["pathType"], "go");
    assert_eq!(bodies[0]["pathB"]["pathType"], "stay");
    assert!(bodies[0]["pathA"]["phases"].as_array().unwrap().len() >= 3);

    let resp = test::TestRequest::post()
        .uri("/api/flashcards")
        .set_json(json!({
            "decision": common::DECISION,
            "answers": [],
            "simulations": bodies[0],
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let set: Value = test::read_body_json(resp).await;
    assert!(set["goFlashcards"].as_array().unwrap().len() >= 4);
    assert!(set["stayFlashcards"].as_array().unwrap().len() >= 4);
}

#[actix_web::test]
async fn test_decision_length_is_validated() {
    let app = test::init_service(App::new().app_data(common::state()).configure(api::configure)).await;

    for decision in ["quit".to_string(), "x".repeat(501)] {
        let resp = test::TestRequest::post()
            .uri("/api/questions")
            .set_json(json!({ "decision": decision }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("between 5 and 500"));
    }
}

#[actix_web::test]
async fn test_malformed_body_is_bad_request() {
    let app = test::init_service(App::new().app_data(common::state()).configure(api::configure)).await;

    let resp = test::TestRequest::post()
        .uri("/api/questions")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"decision\":")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
}
