//! Back-office endpoints, gated by a static bearer API key. The full admin
//! auth/session subsystem lives outside this core.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    cart::CartLine,
    entities::{order, order_item},
    errors::ServiceError,
    services::orders::OrderChanges,
    AppState,
};

use super::orders::item_to_line;

/// Rejects requests whose bearer token does not match the configured admin
/// API key. Applied as a route layer on the /api/admin subtree.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == state.config.admin_api_key)
        .unwrap_or(false);

    if !authorized {
        return Err(ServiceError::Unauthorized(
            "invalid admin API key".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Full order record as the admin console sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderView {
    pub id: String,
    pub customer_name: String,
    pub phone_number: String,
    pub location: String,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
    pub promo_code: Option<String>,
    pub payment_method: String,
    pub status: String,
    pub payment_status: String,
    pub assigned_rider_id: Option<String>,
    pub estimated_time: Option<String>,
    pub rating: Option<i32>,
    pub feedback: Option<String>,
    pub date: DateTime<Utc>,
}

impl AdminOrderView {
    fn from_models(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name,
            phone_number: order.phone_number,
            location: order.location,
            lat: order.lat,
            lng: order.lng,
            notes: order.notes,
            items: items.into_iter().map(item_to_line).collect(),
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            delivery_fee: order.delivery_fee,
            total_amount: order.total_amount,
            promo_code: order.promo_code,
            payment_method: order.payment_method,
            status: order.status,
            payment_status: order.payment_status,
            assigned_rider_id: order.assigned_rider_id,
            estimated_time: order.estimated_time,
            rating: order.rating,
            feedback: order.feedback,
            date: order.date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub order_id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub assigned_rider_id: Option<String>,
    pub estimated_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateOrderResponse {
    pub success: bool,
    pub order: AdminOrderView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderRequest {
    pub order_id: String,
}

/// GET /api/admin/orders — every live order, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminOrderView>>, ServiceError> {
    let orders = state.services.orders.list().await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|(order, items)| AdminOrderView::from_models(order, items))
            .collect(),
    ))
}

/// POST /api/admin/order/update — partial merge of the mutable fields.
/// Any status may follow any other; the back office is trusted.
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn update_order(
    State(state): State<AppState>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<UpdateOrderResponse>, ServiceError> {
    let changes = OrderChanges {
        status: request.status,
        payment_status: request.payment_status,
        assigned_rider_id: request.assigned_rider_id,
        estimated_time: request.estimated_time,
    };

    let updated = state.services.orders.update(&request.order_id, changes).await?;
    let items = state
        .services
        .orders
        .find_by_id(&updated.id)
        .await?
        .map(|(_, items)| items)
        .unwrap_or_default();

    Ok(Json(UpdateOrderResponse {
        success: true,
        order: AdminOrderView::from_models(updated, items),
    }))
}

/// POST /api/admin/order/delete — removes the live record; the audit log
/// keeps the order forever under the "Deleted (Admin)" status.
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn delete_order(
    State(state): State<AppState>,
    Json(request): Json<DeleteOrderRequest>,
) -> Result<Json<super::StatusResponse>, ServiceError> {
    state.services.orders.delete(&request.order_id).await?;
    Ok(Json(super::StatusResponse::ok()))
}
