//! RPC surface for the accounts service
//!
//! Unary JSON endpoints. Account CRUD maps domain errors to HTTP statuses;
//! the reserve/transfer/release primitive always answers 200 with a
//! structured outcome so callers branch on the enumerated kind, not on
//! transport errors.

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use settlement_common::rpc::{
    CreateAccountRequest, ErrorKind, ErrorResponse, ListAccountsResponse, ReleaseFundsRequest,
    ReserveFundsRequest, TransferOutcome, TransferRequest, UpdateBalanceRequest,
};
use tracing::error;

use crate::{AccountStore, Error};

struct ApiState {
    store: AccountStore,
}

fn error_to_response(err: Error) -> HttpResponse {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        error!("accounts rpc failed: {}", err);
    }
    let body = ErrorResponse {
        kind,
        message: err.to_string(),
    };
    match kind {
        ErrorKind::InvalidArgument => HttpResponse::BadRequest().json(body),
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Duplicate | ErrorKind::InvalidState | ErrorKind::InsufficientFunds => {
            HttpResponse::Conflict().json(body)
        }
        ErrorKind::Internal => HttpResponse::InternalServerError().json(body),
    }
}

fn outcome_from_error(err: Error) -> TransferOutcome {
    if err.kind() == ErrorKind::Internal {
        error!("transfer primitive failed: {}", err);
    }
    match err {
        Error::InvalidState {
            status,
            ref reference_id,
        } => TransferOutcome::invalid_state(
            status,
            format!("reservation {} is {}", reference_id, status),
        ),
        other => TransferOutcome::failed(other.kind(), other.to_string()),
    }
}

/// POST /api/accounts - Create an account
async fn create_account(
    data: web::Data<ApiState>,
    req: web::Json<CreateAccountRequest>,
) -> HttpResponse {
    let req = req.into_inner();
    if req.name.is_empty() || req.account_no.is_empty() {
        return error_to_response(Error::InvalidArgument(
            "name and account_no required".to_string(),
        ));
    }
    if req.initial_balance.is_negative() {
        return error_to_response(Error::InvalidArgument(
            "initial_balance must not be negative".to_string(),
        ));
    }

    match data
        .store
        .create_account(&req.name, &req.account_no, req.initial_balance)
        .await
    {
        Ok(account) => HttpResponse::Ok().json(account.into_response()),
        Err(e) => error_to_response(e),
    }
}

/// GET /api/accounts/{id} - Fetch one account
async fn get_account(data: web::Data<ApiState>, path: web::Path<String>) -> HttpResponse {
    let account_id = path.into_inner();
    match data.store.get_account(&account_id).await {
        Ok(account) => HttpResponse::Ok().json(account.into_response()),
        Err(e) => error_to_response(e),
    }
}

/// POST /api/accounts/balance - Credit or debit an account
async fn update_balance(
    data: web::Data<ApiState>,
    req: web::Json<UpdateBalanceRequest>,
) -> HttpResponse {
    let req = req.into_inner();
    if req.account_id.is_empty() {
        return error_to_response(Error::InvalidArgument("account_id required".to_string()));
    }
    if !req.amount.is_positive() {
        return error_to_response(Error::InvalidArgument(
            "amount must be positive".to_string(),
        ));
    }

    match data
        .store
        .update_balance(&req.account_id, req.amount, req.is_credit)
        .await
    {
        Ok(account) => HttpResponse::Ok().json(account.into_response()),
        Err(e) => error_to_response(e),
    }
}

/// GET /api/accounts - List accounts, newest first
async fn list_accounts(data: web::Data<ApiState>) -> HttpResponse {
    match data.store.list_accounts().await {
        Ok(accounts) => HttpResponse::Ok().json(ListAccountsResponse {
            accounts: accounts.into_iter().map(|a| a.into_response()).collect(),
        }),
        Err(e) => error_to_response(e),
    }
}

/// POST /api/reservations/reserve - Place a hold on the payer's funds
async fn reserve_funds(
    data: web::Data<ApiState>,
    req: web::Json<ReserveFundsRequest>,
) -> HttpResponse {
    let req = req.into_inner();
    if req.reference_id.is_empty() || req.payer_id.is_empty() || req.payee_id.is_empty() {
        return HttpResponse::Ok().json(TransferOutcome::failed(
            ErrorKind::InvalidArgument,
            "reference_id, payer_id and payee_id required",
        ));
    }
    if !req.amount.is_positive() {
        return HttpResponse::Ok().json(TransferOutcome::failed(
            ErrorKind::InvalidArgument,
            "amount must be positive",
        ));
    }

    match data
        .store
        .reserve_funds(&req.reference_id, &req.payer_id, &req.payee_id, req.amount)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(TransferOutcome::success("funds reserved")),
        Err(e) => HttpResponse::Ok().json(outcome_from_error(e)),
    }
}

/// POST /api/reservations/transfer - Commit a pending reservation
async fn transfer(data: web::Data<ApiState>, req: web::Json<TransferRequest>) -> HttpResponse {
    let req = req.into_inner();
    if req.reference_id.is_empty() {
        return HttpResponse::Ok().json(TransferOutcome::failed(
            ErrorKind::InvalidArgument,
            "reference_id required",
        ));
    }

    match data.store.transfer(&req.reference_id).await {
        Ok(()) => HttpResponse::Ok().json(TransferOutcome::success("transfer completed")),
        Err(e) => HttpResponse::Ok().json(outcome_from_error(e)),
    }
}

/// POST /api/reservations/release - Cancel a pending reservation
async fn release_funds(
    data: web::Data<ApiState>,
    req: web::Json<ReleaseFundsRequest>,
) -> HttpResponse {
    let req = req.into_inner();
    if req.reference_id.is_empty() {
        return HttpResponse::Ok().json(TransferOutcome::failed(
            ErrorKind::InvalidArgument,
            "reference_id required",
        ));
    }

    match data.store.release_funds(&req.reference_id).await {
        Ok(()) => HttpResponse::Ok().json(TransferOutcome::success("funds released")),
        Err(e) => HttpResponse::Ok().json(outcome_from_error(e)),
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
        .route("/accounts", web::post().to(create_account))
        .route("/accounts", web::get().to(list_accounts))
        .route("/accounts/balance", web::post().to(update_balance))
        .route("/accounts/{id}", web::get().to(get_account))
        .route("/reservations/reserve", web::post().to(reserve_funds))
        .route("/reservations/transfer", web::post().to(transfer))
        .route("/reservations/release", web::post().to(release_funds));
}

/// Start the RPC server (runs until shutdown).
pub async fn start_api_server(store: AccountStore, bind_address: &str) -> std::io::Result<()> {
    tracing::info!("Starting accounts API server on {}", bind_address);

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
