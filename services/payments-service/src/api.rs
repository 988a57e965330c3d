//! RPC surface for the payments service

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use settlement_common::rpc::{CapturePaymentRequest, CreatePaymentIntentRequest};
use std::sync::Arc;
use tracing::error;

use crate::PaymentService;

struct ApiState {
    service: Arc<PaymentService>,
}

/// POST /api/payments/intent - Create a payment intent
async fn create_payment_intent(
    data: web::Data<ApiState>,
    req: web::Json<CreatePaymentIntentRequest>,
) -> HttpResponse {
    match data.service.create_payment_intent(req.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            error!("create payment intent failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "FAILED",
                "message": "internal error",
            }))
        }
    }
}

/// POST /api/payments/capture - Capture an authorized intent
async fn capture_payment(
    data: web::Data<ApiState>,
    req: web::Json<CapturePaymentRequest>,
) -> HttpResponse {
    match data.service.capture_payment(req.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            error!("capture payment failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "FAILED",
                "message": "internal error",
            }))
        }
    }
}

/// GET /api/health - Health check endpoint
async fn health_check(data: web::Data<ApiState>) -> HttpResponse {
    let healthy = data.service.health().await;
    let status = if healthy { "healthy" } else { "degraded" };
    HttpResponse::Ok().json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/payments/intent", web::post().to(create_payment_intent))
        .route("/payments/capture", web::post().to(capture_payment));
}

/// Start the RPC server (runs until shutdown).
pub async fn start_api_server(
    service: Arc<PaymentService>,
    bind_address: &str,
) -> std::io::Result<()> {
    tracing::info!("Starting payments API server on {}", bind_address);

    let api_state = web::Data::new(ApiState { service });

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(api_state.clone())
            .service(web::scope("/api").configure(configure_routes))
    })
    .bind(bind_address)?
    .run()
    .await
}
