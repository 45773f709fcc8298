use std::time::Instant;

use actix_web::error::InternalError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};
use serde::Serialize;

use crate::error::PredictError;
use crate::form::{FormInput, RawForm};
use crate::knowledge::AdvisoryEntry;
use crate::models::{ApiResponse, DiseaseLabel, PredictionOutcome, PredictionRequest};
use crate::render::{render, render_page, PageState};
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::resource("/")
                .route(web::get().to(index))
                .route(web::post().to(submit)),
        )
        .route("/api/health", web::get().to(health_check))
        .route("/api/model-info", web::get().to(model_info))
        .route("/api/advisories", web::get().to(advisories))
        .route("/api/stats", web::get().to(stats))
        .route("/api/predict", web::post().to(predict_disease))
        .default_service(web::route().to(not_found));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req: &HttpRequest| {
            let body = ApiResponse::<()>::error(&format!("Invalid request: {}", err));
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Runs one blocking prediction off the async workers and records the outcome.
async fn predict_label(
    state: &web::Data<AppState>,
    request: &PredictionRequest,
) -> Result<DiseaseLabel, PredictError> {
    let inference = state.inference.clone();
    let owned = request.clone();

    let result = web::block(move || inference.predict(&owned))
        .await
        .map_err(|e| PredictError::Execution(e.to_string()))
        .and_then(|r| r);

    match &result {
        Ok(label) => {
            state.stats.record_success(label.as_str());
            if !state.knowledge.is_known(label.as_str()) {
                warn!("Label '{}' has no advisory, showing the default entry", label);
            }
            info!("Prediction for {}: {}", request.crop, label);
        }
        Err(e) => {
            state.stats.record_failure();
            error!("Prediction failed for {}: {}", request.crop, e);
        }
    }

    result
}

/// GET renders the controls from the query string and never predicts.
async fn index(query: web::Query<RawForm>) -> impl Responder {
    let form = FormInput::from_raw(&query);
    html(render_page(&form, &PageState::AwaitingInput))
}

async fn submit(state: web::Data<AppState>, body: web::Form<RawForm>) -> impl Responder {
    let form = FormInput::from_raw(&body);

    let page = if form.submitted {
        match predict_label(&state, &form.request).await {
            Ok(label) => PageState::ShowingResult(render(&state.knowledge, label, &form.request)),
            Err(e) => PageState::Failed(e.to_string()),
        }
    } else {
        PageState::AwaitingInput
    };

    html(render_page(&form, &page))
}

async fn predict_disease(
    state: web::Data<AppState>,
    req: web::Json<PredictionRequest>,
) -> impl Responder {
    let start_time = Instant::now();
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

    if let Err(e) = req.validate() {
        warn!("Rejected prediction request: {}", e);
        return HttpResponse::BadRequest()
            .json(ApiResponse::<PredictionOutcome>::error(&e).timed(elapsed(start_time)));
    }

    let request = req.into_inner();
    match predict_label(&state, &request).await {
        Ok(label) => {
            let outcome = render(&state.knowledge, label, &request);
            HttpResponse::Ok().json(ApiResponse::success(outcome).timed(elapsed(start_time)))
        }
        Err(e) => HttpResponse::InternalServerError().json(
            ApiResponse::<PredictionOutcome>::error(&format!("Prediction failed: {}", e))
                .timed(elapsed(start_time)),
        ),
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    uptime_seconds: u64,
    version: &'static str,
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(Health {
        status: "ok",
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

async fn model_info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(state.inference.get_model_info()))
}

#[derive(Serialize)]
struct AdvisoryRow<'a> {
    label: &'a str,
    #[serde(flatten)]
    entry: &'a AdvisoryEntry,
}

async fn advisories(state: web::Data<AppState>) -> impl Responder {
    let rows: Vec<AdvisoryRow<'_>> = state
        .knowledge
        .entries()
        .map(|(label, entry)| AdvisoryRow { label, entry })
        .collect();
    HttpResponse::Ok().json(ApiResponse::success(rows))
}

async fn stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(state.stats.snapshot()))
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(ApiResponse::<()>::error("Endpoint not found"))
}
