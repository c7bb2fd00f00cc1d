mod common;

use actix_web::{test, App};
use afterward_server::api;
use chrono::DateTime;

#[actix_web::test]
async fn test_health_check() {
    let app = test::init_service(App::new().app_data(common::state()).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["generation"], "offline");
    assert_eq!(json["storage"], "memory");
    assert!(DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
}
