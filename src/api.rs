use actix_web::http::StatusCode;
use actix_web::{error, web, HttpResponse, ResponseError};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analytics::AnalyticsEngine;
use crate::data::Dataset;

/// Shared, read-only state: the engine and the dataset loaded at startup.
pub struct AppState {
    pub engine: AnalyticsEngine,
    pub dataset: Dataset,
}

#[derive(Deserialize)]
pub struct SeedQuery {
    pub seed: Option<u64>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "bad request: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::BadRequest(msg) => msg.clone(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error: message })
    }
}

/// A seeded generator when the caller asks for a reproducible forecast.
fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Exam insights API is running!")
}

async fn get_report(state: web::Data<AppState>, query: web::Query<SeedQuery>) -> HttpResponse {
    let report = state.engine.report(&state.dataset, &mut rng_for(query.seed));
    HttpResponse::Ok().json(report)
}

async fn get_forecast(state: web::Data<AppState>, query: web::Query<SeedQuery>) -> HttpResponse {
    let forecast = state.engine.forecast(&state.dataset, &mut rng_for(query.seed));
    HttpResponse::Ok().json(forecast)
}

async fn analyze(
    state: web::Data<AppState>,
    query: web::Query<SeedQuery>,
    web::Json(dataset): web::Json<Dataset>,
) -> HttpResponse {
    debug!(
        "analyze request: {} tests, {} attempts",
        dataset.tests.len(),
        dataset.attempts.len()
    );
    let report = state.engine.report(&dataset, &mut rng_for(query.seed));
    HttpResponse::Ok().json(report)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(8 * 1024 * 1024)
        .error_handler(|err, _req| {
            let message = err.to_string();
            error::InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
        });

    cfg.app_data(json_config)
        .route("/health", web::get().to(health_check))
        .route("/report", web::get().to(get_report))
        .route("/forecast", web::get().to(get_forecast))
        .route("/analyze", web::post().to(analyze));
}
