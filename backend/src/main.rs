use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::{error, info};

use crop_disease::config::{ServerConfig, DECODER_PATH, MODEL_PATH};
use crop_disease::inference::load_assets;
use crop_disease::routes;
use crop_disease::state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Starting crop disease prediction server");

    // No listener is bound until both artifacts are resident.
    let inference = match load_assets() {
        Ok(inference) => {
            info!("✅ Model and label decoder loaded");
            inference
        }
        Err(e) => {
            error!("❌ Cannot serve predictions: {}", e);
            error!(
                "   Expected '{}' and '{}' in the working directory",
                MODEL_PATH, DECODER_PATH
            );
            return Err(e).context("loading model artifacts");
        }
    };

    let config = ServerConfig::from_env();
    let bind_address = config.bind_address();
    let origin = format!("http://{}", bind_address);
    let state = web::Data::new(AppState::new(inference));

    info!("🌐 Listening on http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("🔧 Endpoints:");
    info!("   GET  /                 - Prediction form");
    info!("   POST /                 - Submit form");
    info!("   GET  /api/health       - Health check");
    info!("   GET  /api/model-info   - Model features and classes");
    info!("   GET  /api/advisories   - Advisory table");
    info!("   GET  /api/stats        - Prediction counters");
    info!("   POST /api/predict      - JSON prediction");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(state.clone())
            .service(Files::new("/static", "./static").prefer_utf8(true))
            .configure(routes::configure)
    })
    .workers(config.workers)
    .bind(&bind_address)
    .with_context(|| format!("binding {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
