use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::ApiError,
    protocol::{FormPayload, PurchaseResponse, UpdateResponse},
};
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use url::Url;

mod checkout;
mod config;

use checkout::{CheckoutStore, Validator};
use config::load_settings;

struct AppState {
    store: Mutex<CheckoutStore>,
    validator: Validator,
    psp_redirect: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings()?;
    let state = AppState {
        store: Mutex::new(CheckoutStore::default()),
        validator: Validator::new(&settings.required_fields),
        psp_redirect: settings.psp_redirect()?,
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, psp = ?settings.psp_redirect_url, "checkout server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/checkout/update/", post(checkout_update))
        .route("/checkout/purchase/", post(checkout_purchase))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn checkout_update(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FormPayload>,
) -> Json<UpdateResponse> {
    let mut store = state.store.lock().await;
    let response = store.update(&state.validator, payload);
    info!(
        revision = store.revision(),
        failing_forms = response.errors.len(),
        "checkout updated"
    );
    Json(response)
}

async fn checkout_purchase(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FormPayload>,
) -> Result<Json<PurchaseResponse>, (StatusCode, Json<ApiError>)> {
    let mut store = state.store.lock().await;
    let response = store
        .purchase(&state.validator, state.psp_redirect.as_ref(), payload)
        .map_err(|e| {
            warn!(error = %e, "purchase rejected");
            (StatusCode::BAD_REQUEST, Json(ApiError::from(e)))
        })?;
    if let Some(order) = store.orders().last() {
        info!(
            order_id = %order.order_id,
            created_at = %order.created_at,
            directive = ?response.expression,
            "order placed"
        );
    }
    Ok(Json(response))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
