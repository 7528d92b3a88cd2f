//! PCnC order pipeline API
//!
//! Order lifecycle, checkout pricing and M-Pesa push-payment backend for a
//! small restaurant storefront. The storefront pages, menu/settings admin,
//! uploads and exports are separate collaborators; this crate owns the
//! orders, their permanent audit log, discount resolution and the payment
//! provider round trip.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod cart;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::events::EventSender;
use crate::services::{mpesa::MpesaClient, orders::OrderService, pricing::PricingService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: EventSender,
    pub services: AppServices,
}

/// Service instances used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub pricing: Arc<PricingService>,
    pub mpesa: Arc<MpesaClient>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &config::AppConfig,
    ) -> Result<Self, errors::ServiceError> {
        Ok(Self {
            orders: Arc::new(OrderService::new(db.clone(), event_sender)),
            pricing: Arc::new(PricingService::new(db)),
            mpesa: Arc::new(MpesaClient::new(config.mpesa.clone())?),
        })
    }
}

/// Routes under /api: the public storefront surface plus the key-gated
/// admin console surface.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/order", post(handlers::orders::submit_order))
        .route("/order/rate", post(handlers::orders::rate_order))
        .route("/order/:id", get(handlers::orders::track_order))
        .route("/validate-promo", post(handlers::orders::validate_promo));

    let admin = Router::new()
        .route("/admin/orders", get(handlers::admin::list_orders))
        .route("/admin/order/update", post(handlers::admin::update_order))
        .route("/admin/order/delete", post(handlers::admin::delete_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::admin::require_admin,
        ));

    public.merge(admin)
}

/// Builds the complete application router with tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            if trimmed.is_empty() {
                None
            } else {
                HeaderValue::from_str(trimmed).ok()
            }
        })
        .collect();

    if origins.is_empty() {
        info!("No CORS origins configured; allowing any origin");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": if database == "healthy" { "healthy" } else { "unhealthy" },
        "checks": { "database": database },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
