//! Read-only RPC surface for settlement status

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use settlement_common::rpc::{ErrorKind, ErrorResponse, SettlementStatusResponse};
use std::sync::Arc;
use tracing::error;

use crate::SettlementStore;

struct ApiState {
    store: Arc<SettlementStore>,
}

/// GET /api/settlements/{reference_id} - Settlement status for a reference
async fn get_settlement_status(
    data: web::Data<ApiState>,
    path: web::Path<String>,
) -> HttpResponse {
    let reference_id = path.into_inner();
    match data.store.get_by_reference(&reference_id).await {
        Ok(Some(settlement)) => HttpResponse::Ok().json(SettlementStatusResponse {
            reference_id: settlement.reference_id,
            status: settlement.status,
        }),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            kind: ErrorKind::NotFound,
            message: format!("settlement {} not found", reference_id),
        }),
        Err(e) => {
            error!("settlement lookup failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                kind: ErrorKind::Internal,
                message: "internal error".to_string(),
            })
        }
    }
}

/// GET /api/health - Health check endpoint
async fn health_check(data: web::Data<ApiState>) -> HttpResponse {
    let healthy = data.store.health().await;
    let status = if healthy { "healthy" } else { "degraded" };
    HttpResponse::Ok().json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/settlements/{reference_id}", web::get().to(get_settlement_status));
}

/// Start the RPC server (runs until shutdown).
pub async fn start_api_server(
    store: Arc<SettlementStore>,
    bind_address: &str,
) -> std::io::Result<()> {
    tracing::info!("Starting settlement API server on {}", bind_address);

    let api_state = web::Data::new(ApiState { store });

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
