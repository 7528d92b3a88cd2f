use crate::{config::MpesaSettings, errors::ServiceError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Consumer key/secret pair exchanged for a bearer token. Carried on the
/// checkout request; config-level values act as the fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpesaCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// STK push request body in the provider's wire format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushRequest {
    business_short_code: String,
    password: String,
    timestamp: String,
    transaction_type: String,
    amount: u64,
    party_a: String,
    party_b: String,
    phone_number: String,
    #[serde(rename = "CallBackURL")]
    callback_url: String,
    account_reference: String,
    transaction_desc: String,
}

#[derive(Debug, Deserialize)]
struct StkErrorResponse {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// Client for the M-Pesa push-payment (STK) flow.
///
/// Stateless across calls: every push re-authenticates, runs inside the
/// submitting request, and interprets a 2xx acknowledgement as "push sent" —
/// never as "payment received". Confirmation arrives out of band via the
/// provider callback, which is outside this core.
#[derive(Clone)]
pub struct MpesaClient {
    http: reqwest::Client,
    settings: MpesaSettings,
}

impl MpesaClient {
    pub fn new(settings: MpesaSettings) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client init: {e}")))?;
        Ok(Self { http, settings })
    }

    /// Requests the customer's phone to prompt for payment authorization.
    /// Returns the instruction shown to the customer when the push went out.
    #[instrument(skip(self, credentials), fields(order_id = %order_id))]
    pub async fn initiate_push(
        &self,
        credentials: &MpesaCredentials,
        phone: &str,
        amount: Decimal,
        order_id: &str,
    ) -> Result<String, ServiceError> {
        let token = self.acquire_token(credentials).await?;

        let timestamp = format_timestamp(Utc::now());
        let password = derive_password(&self.settings.shortcode, &self.settings.passkey, &timestamp);
        let msisdn = normalize_phone(phone, &self.settings.country_code);
        let amount = amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
            .ok_or_else(|| {
                ServiceError::InternalError(format!("amount not representable: {amount}"))
            })?;

        let body = StkPushRequest {
            business_short_code: self.settings.shortcode.clone(),
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount,
            party_a: msisdn.clone(),
            party_b: self.settings.shortcode.clone(),
            phone_number: msisdn,
            callback_url: self.settings.callback_url.clone(),
            account_reference: self.settings.account_reference.clone(),
            transaction_desc: format!("Pay for Order {order_id}"),
        };

        let response = self
            .http
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.settings.base_url
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "STK push request failed");
                ServiceError::PaymentUnavailable
            })?;

        if response.status().is_success() {
            info!(amount, "STK push accepted by provider");
            return Ok("STK Push Sent. Please enter your PIN on your phone.".to_string());
        }

        let status = response.status();
        let provider_error = response.json::<StkErrorResponse>().await.ok();
        let message = provider_error
            .and_then(|e| e.error_message)
            .unwrap_or_else(|| "STK Push failed".to_string());
        warn!(%status, message = %message, "provider rejected STK push");
        Err(ServiceError::PaymentProvider(message))
    }

    /// OAuth client-credentials exchange. Network errors, non-2xx responses
    /// and token-less bodies all collapse to the same authentication failure;
    /// the order stays Pending either way.
    async fn acquire_token(&self, credentials: &MpesaCredentials) -> Result<String, ServiceError> {
        let response = self
            .http
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.settings.base_url
            ))
            .basic_auth(&credentials.consumer_key, Some(&credentials.consumer_secret))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "token request failed");
                ServiceError::PaymentAuthFailed
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "token endpoint returned an error");
            return Err(ServiceError::PaymentAuthFailed);
        }

        response
            .json::<TokenResponse>()
            .await
            .ok()
            .and_then(|t| t.access_token)
            .ok_or(ServiceError::PaymentAuthFailed)
    }

    /// Instruction returned for the manual (till) fallback path.
    pub fn manual_payment_instructions(&self) -> String {
        format!(
            "Order placed successfully! Please pay via Till Number {}.",
            self.settings.till_number
        )
    }
}

/// `base64(shortcode + passkey + timestamp)` per the provider contract.
fn derive_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// `YYYYMMDDHHmmss` in UTC.
fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Normalizes a phone number to international format: `+` stripped, a
/// leading national-trunk `0` replaced with the country code, and the
/// country code prepended when no recognized prefix is present.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let cleaned: String = phone.trim().replace('+', "");
    if let Some(rest) = cleaned.strip_prefix('0') {
        return format!("{country_code}{rest}");
    }
    if !cleaned.starts_with(country_code) {
        return format!("{country_code}{cleaned}");
    }
    cleaned
}
