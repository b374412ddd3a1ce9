use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::error::Error;

use exam_insights::api::{self, AppState};
use exam_insights::config::ServerConfig;
use exam_insights::data::{load_dataset, load_tables, sample_dataset};
use exam_insights::tables::StaticTables;
use exam_insights::AnalyticsEngine;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::from_env()?;
    env_logger::Builder::from_env(Env::default().default_filter_or(config.rust_log.as_str())).init();

    let (dataset, tables) = match &config.data_dir {
        Some(dir) => (load_dataset(dir)?, load_tables(dir)?),
        None => {
            info!("DATA_DIR not set, serving the built-in sample history");
            (sample_dataset(), StaticTables::default())
        }
    };
    let engine = AnalyticsEngine::new(config.load_engine_config()?)
        .with_dependency_graph(tables.graph)
        .with_weightage(tables.weights)
        .with_marking(tables.marking);

    let state = web::Data::new(AppState { engine, dataset });

    info!("Starting exam insights API on http://{}:{}", config.host, config.port);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await?;

    Ok(())
}
