//! Public storefront endpoints: checkout submission, order tracking,
//! rating and promo validation.

use axum::{
    extract::{Path, State},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    cart::CartLine,
    entities::{order, order_item},
    errors::ServiceError,
    events::Event,
    services::{
        mpesa::MpesaCredentials,
        orders::NewOrder,
        pricing::{self, Discount},
    },
    AppState,
};

/// 10-digit local mobile number starting with a recognized national prefix.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(07|01)\d{8}$").unwrap());

/// Sentinel location for orders collected at the counter.
const PICKUP_LOCATION: &str = "Pick Up";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub location: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub delivery_fee: Option<Decimal>,
    pub promo_code: Option<String>,
    pub payment_method: Option<String>,
    pub credentials: Option<MpesaCredentials>,
    /// Client-computed figures; accepted for wire compatibility but ignored.
    /// The pricing engine recomputes the authoritative breakdown.
    pub total_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub success: bool,
    pub order_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TrackOrderResponse {
    pub success: bool,
    pub order: PublicOrderView,
}

/// Tracking view: what the customer may see. The phone number and internal
/// pricing fields stay private.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrderView {
    pub id: String,
    pub status: String,
    pub payment_status: String,
    pub customer_name: String,
    pub items: Vec<CartLine>,
    pub total_amount: Decimal,
    pub estimated_time: Option<String>,
    pub assigned_rider: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl PublicOrderView {
    pub fn from_models(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            status: order.status,
            payment_status: order.payment_status,
            customer_name: order.customer_name,
            items: items.into_iter().map(item_to_line).collect(),
            total_amount: order.total_amount,
            estimated_time: order.estimated_time,
            assigned_rider: order.assigned_rider_id,
            lat: order.lat,
            lng: order.lng,
        }
    }
}

pub(crate) fn item_to_line(item: order_item::Model) -> CartLine {
    CartLine {
        product_id: item.product_id,
        name: item.name,
        price: item.price,
        image: None,
        category: None,
        quantity: item.quantity,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateOrderRequest {
    pub id: String,
    pub rating: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i32>,
    pub message: String,
}

/// POST /api/order — the single orchestration point for order creation.
///
/// Validates in order (first failure wins), recomputes the authoritative
/// total server-side, persists order + log, then — only for push-payment —
/// calls the provider. A payment failure after persistence returns a
/// payment-specific message; the order stays saved as Pending.
#[instrument(skip(state, request), fields(customer = %request.customer_name))]
pub async fn submit_order(
    State(state): State<AppState>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<Json<SubmitOrderResponse>, ServiceError> {
    if request.items.is_empty() {
        return Err(ServiceError::ValidationError("Cart is empty".to_string()));
    }

    let customer_name = request.customer_name.trim().to_string();
    let phone_number = request.phone_number.trim().to_string();
    if customer_name.is_empty() || phone_number.is_empty() {
        return Err(ServiceError::ValidationError(
            "Missing required fields".to_string(),
        ));
    }

    if !PHONE_PATTERN.is_match(&phone_number) {
        return Err(ServiceError::ValidationError(
            "Please enter a valid 10-digit phone number starting with 07 or 01".to_string(),
        ));
    }

    if request.items.iter().any(|line| line.quantity < 1) {
        return Err(ServiceError::ValidationError(
            "Item quantities must be at least 1".to_string(),
        ));
    }

    let delivery_fee = request.delivery_fee.unwrap_or(Decimal::ZERO);
    if delivery_fee < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Invalid delivery fee".to_string(),
        ));
    }

    // An omitted or blank location means a counter pickup.
    let location = request
        .location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| PICKUP_LOCATION.to_string());

    let discount = state
        .services
        .pricing
        .resolve_discount(request.promo_code.as_deref(), Some(&phone_number))
        .await?;
    let breakdown = pricing::price(&request.items, discount.percent(), delivery_fee);

    let payment_method = match request.payment_method.as_deref() {
        Some("stk") => "stk",
        _ => "till",
    };

    let order = state
        .services
        .orders
        .create(NewOrder {
            customer_name,
            phone_number,
            location,
            lat: request.lat,
            lng: request.lng,
            notes: request.notes,
            items: request.items,
            breakdown,
            promo_label: discount.label(),
            payment_method: payment_method.to_string(),
        })
        .await?;

    let message = if payment_method == "stk" {
        let credentials = request
            .credentials
            .or_else(|| config_credentials(&state))
            .ok_or(ServiceError::PaymentAuthFailed)?;

        match state
            .services
            .mpesa
            .initiate_push(
                &credentials,
                &order.phone_number,
                order.total_amount,
                &order.id,
            )
            .await
        {
            Ok(message) => {
                state
                    .event_sender
                    .send_or_log(Event::PaymentPushSent {
                        order_id: order.id.clone(),
                    })
                    .await;
                message
            }
            Err(err) => {
                state
                    .event_sender
                    .send_or_log(Event::PaymentFailed {
                        order_id: order.id.clone(),
                        reason: err.response_message(),
                    })
                    .await;
                return Err(err);
            }
        }
    } else {
        state.services.mpesa.manual_payment_instructions()
    };

    info!(order_id = %order.id, payment_method, "order submitted");
    Ok(Json(SubmitOrderResponse {
        success: true,
        order_id: order.id,
        message,
    }))
}

fn config_credentials(state: &AppState) -> Option<MpesaCredentials> {
    match (
        state.config.mpesa.consumer_key.clone(),
        state.config.mpesa.consumer_secret.clone(),
    ) {
        (Some(consumer_key), Some(consumer_secret)) => Some(MpesaCredentials {
            consumer_key,
            consumer_secret,
        }),
        _ => None,
    }
}

/// GET /api/order/:id — public tracking endpoint, polled by the storefront.
pub async fn track_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrackOrderResponse>, ServiceError> {
    let (order, items) = state
        .services
        .orders
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

    Ok(Json(TrackOrderResponse {
        success: true,
        order: PublicOrderView::from_models(order, items),
    }))
}

/// POST /api/order/rate — post-delivery rating; last write wins.
pub async fn rate_order(
    State(state): State<AppState>,
    Json(request): Json<RateOrderRequest>,
) -> Result<Json<super::StatusResponse>, ServiceError> {
    if !(1..=5).contains(&request.rating) {
        return Err(ServiceError::ValidationError(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    state
        .services
        .orders
        .rate(&request.id, request.rating, request.feedback)
        .await?;

    Ok(Json(super::StatusResponse::ok()))
}

/// POST /api/validate-promo — discount resolution for the checkout page.
/// An invalid code is a 400 with its own message; "no discount available"
/// is a soft negative so the storefront can stay quiet about it.
pub async fn validate_promo(
    State(state): State<AppState>,
    Json(request): Json<ValidatePromoRequest>,
) -> Result<Json<PromoValidationResponse>, ServiceError> {
    let discount = state
        .services
        .pricing
        .resolve_discount(request.code.as_deref(), request.phone.as_deref())
        .await?;

    let response = match discount {
        Discount::Promo { percent, .. } => PromoValidationResponse {
            success: true,
            discount_percent: Some(percent),
            message: format!("Success! {percent}% discount applied."),
        },
        Discount::Loyalty { percent } => PromoValidationResponse {
            success: true,
            discount_percent: Some(percent),
            message: format!("Loyalty reward! You save {percent}% on this order."),
        },
        Discount::None => PromoValidationResponse {
            success: false,
            discount_percent: None,
            message: "No discount available".to_string(),
        },
    };

    Ok(Json(response))
}
