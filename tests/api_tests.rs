use actix_web::{test, web, App};
use serde_json::Value;

use exam_insights::api::{self, AppState};
use exam_insights::data::sample_dataset;
use exam_insights::{AnalyticsEngine, EngineConfig};

fn state() -> web::Data<AppState> {
    web::Data::new(AppState {
        engine: AnalyticsEngine::new(EngineConfig::default()),
        dataset: sample_dataset(),
    })
}

#[actix_web::test]
async fn test_health_check() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_seeded_report_is_stable() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/report?seed=99").to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::get().uri("/report?seed=99").to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(first, second);
    assert_eq!(first["total_tests"], 5);
    assert!(first["errors"]["weak_topics"].as_array().unwrap().len() > 0);
    assert_eq!(first["forecast"]["goal"]["target_rank"], 2500);
}

#[actix_web::test]
async fn test_forecast_is_null_without_history() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;
    let body = serde_json::json!({
        "tests": [],
        "attempts": [],
    });
    let req = test::TestRequest::post().uri("/analyze?seed=1").set_json(&body).to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;

    assert!(report["forecast"].is_null());
    assert!(report["trend"].is_null());
    assert_eq!(report["guesses"]["total_guesses"], 0);
}

#[actix_web::test]
async fn test_analyze_rejects_malformed_body() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;
    let req = test::TestRequest::post()
        .uri("/analyze")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}
