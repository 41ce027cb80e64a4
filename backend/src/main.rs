mod config;
mod prediction;
mod routes;
mod storage;
mod upstream;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use prediction::replicate_service::PredictionService;
use routes::configure_routes;
use std::env;
use std::time::Duration;
use storage::media_service::MediaService;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let http_client = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .map_err(|e| {
            log::error!("Failed to build HTTP client: {}", e);
            std::io::Error::other(e)
        })?;

    let media_service = MediaService::new(http_client.clone(), &config.media);
    let prediction_service = PredictionService::new(http_client, &config.replicate);

    log::info!("Media uploads go to {}", config.media.upload_url);
    log::info!(
        "Predictions use model version {} at {}",
        config.replicate.generation.version,
        config.replicate.api_base
    );
    log::info!("Serving frontend from {}", config.frontend_dir);

    let frontend_dir = config.frontend_dir.clone();
    let bind_address = format!("0.0.0.0:{}", config.port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(media_service.clone()))
            .app_data(web::Data::new(prediction_service.clone()))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
