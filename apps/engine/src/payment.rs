//! # Payment Gateway
//!
//! Checkout sessions on the external payment processor.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Session                                 │
//! │                                                                         │
//! │  start_payment ──► create_session(amount, currency, REQ-…)             │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                    {session_id, redirect_url} ──► customer pays        │
//! │                                                                         │
//! │  confirm_payment ──► retrieve_session(session_id)                      │
//! │                         │                                               │
//! │                         ├── payment_status == "paid" ──► job paid      │
//! │                         └── anything else ──► job unchanged            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use moowwee_core::Money;

use crate::config::PaymentsSettings;

// =============================================================================
// Errors
// =============================================================================

/// Payment processor failures. All of them leave the job untouched.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor credentials are not configured")]
    MissingCredentials,

    #[error("payment processor unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment processor rejected the request ({status}): {message}")]
    Processor { status: u16, message: String },

    #[error("unexpected payment processor response: {0}")]
    Malformed(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

// =============================================================================
// Gateway Types
// =============================================================================

/// What to charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub amount: Money,
    pub currency: String,
    /// Job request number, echoed back in session metadata.
    pub reference: String,
    /// Line item name shown on the checkout page.
    pub description: String,
}

impl CheckoutRequest {
    /// Checkout for a job's quoted price.
    pub fn for_price(amount: Money, currency: &str, request_number: &str) -> Self {
        CheckoutRequest {
            amount,
            currency: currency.to_string(),
            reference: request_number.to_string(),
            description: format!("Moving Request #{}", request_number),
        }
    }

    /// Checkout for a job's crew gratuity.
    pub fn for_tips(amount: Money, currency: &str, request_number: &str) -> Self {
        CheckoutRequest {
            amount,
            currency: currency.to_string(),
            reference: request_number.to_string(),
            description: format!("Crew Tips for Moving Request #{}", request_number),
        }
    }
}

/// A freshly opened checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// A session as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    /// Processor payment status, e.g. `paid`, `unpaid`, `no_payment_required`.
    pub payment_status: String,
    pub amount: Money,
    pub currency: String,
    pub reference: Option<String>,
}

impl SessionStatus {
    /// Only `paid` settles a job.
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// The two processor calls settlement needs.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession>;

    async fn retrieve_session(&self, session_id: &str) -> PaymentResult<SessionStatus>;
}

// =============================================================================
// Stripe Checkout
// =============================================================================

#[derive(Debug, Deserialize)]
struct SessionBody {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Option<SessionMetadata>,
}

#[derive(Debug, Deserialize)]
struct SessionMetadata {
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Checkout sessions on Stripe's form-encoded REST API.
pub struct StripeCheckoutGateway {
    client: Client,
    api_url: String,
    secret_key: Option<String>,
    success_url: String,
    cancel_url: String,
}

impl StripeCheckoutGateway {
    pub fn new(settings: &PaymentsSettings) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(StripeCheckoutGateway {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            secret_key: settings.secret_key().map(str::to_string),
            success_url: settings.success_url.clone(),
            cancel_url: settings.cancel_url.clone(),
        })
    }

    fn secret(&self) -> PaymentResult<&str> {
        self.secret_key.as_deref().ok_or(PaymentError::MissingCredentials)
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.api_url)
    }

    async fn read_session(response: reqwest::Response) -> PaymentResult<SessionBody> {
        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            warn!(status = status.as_u16(), message = %message, "Payment processor error");
            return Err(PaymentError::Processor {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SessionBody>()
            .await
            .map_err(|e| PaymentError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckoutGateway {
    async fn create_session(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let secret = self.secret()?;
        debug!(reference = %request.reference, amount = %request.amount, "Creating checkout session");

        let form: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", request.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount.cents().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.clone(),
            ),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("metadata[request_id]", request.reference.clone()),
        ];

        let response = self
            .client
            .post(self.sessions_url())
            .bearer_auth(secret)
            .form(&form)
            .send()
            .await?;
        let body = Self::read_session(response).await?;

        let redirect_url = body
            .url
            .ok_or_else(|| PaymentError::Malformed("session has no url".to_string()))?;

        Ok(CheckoutSession {
            session_id: body.id,
            redirect_url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> PaymentResult<SessionStatus> {
        let secret = self.secret()?;
        debug!(session_id = %session_id, "Retrieving checkout session");

        let response = self
            .client
            .get(format!("{}/{}", self.sessions_url(), session_id))
            .bearer_auth(secret)
            .send()
            .await?;
        let body = Self::read_session(response).await?;

        Ok(SessionStatus {
            session_id: body.id,
            payment_status: body
                .payment_status
                .ok_or_else(|| PaymentError::Malformed("session has no payment_status".to_string()))?,
            amount: Money::from_cents(body.amount_total.unwrap_or(0)),
            currency: body.currency.unwrap_or_default(),
            reference: body.metadata.and_then(|m| m.request_id),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
