//! Stripe Checkout Sessions client for credit purchases

use super::CheckoutProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use wardrobe_common::config::CheckoutConfig;

const USER_AGENT: &str = concat!("wardrobe-server/", env!("CARGO_PKG_VERSION"));

/// Price of one try-on credit in US cents ($1 buys 10 credits)
pub const CENTS_PER_CREDIT: u64 = 10;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Payment API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Checkout session has no redirect URL")]
    MissingUrl,

    #[error("Payment provider not configured")]
    NotConfigured,
}

/// A credit purchase to be paid on the hosted checkout page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOrder {
    pub user_id: String,
    pub credits: u32,
    pub success_url: String,
    pub cancel_url: String,
}

impl CreditOrder {
    /// Build an order whose redirects land back on the try-on page
    pub fn new(user_id: impl Into<String>, credits: u32, public_base_url: &str) -> Self {
        let base = public_base_url.trim_end_matches('/');
        Self {
            user_id: user_id.into(),
            credits,
            success_url: format!(
                "{}/dashboard/virtual-tryon?success=true&credits={}",
                base, credits
            ),
            cancel_url: format!("{}/dashboard/virtual-tryon?canceled=true", base),
        }
    }

    /// Total charge in cents
    pub fn unit_amount_cents(&self) -> u64 {
        u64::from(self.credits) * CENTS_PER_CREDIT
    }

    /// Form fields for `POST /v1/checkout/sessions`
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                self.unit_amount_cents().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                "Virtual Try-On Credits".to_string(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                format!("{} credits for virtual try-on", self.credits),
            ),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("metadata[userId]", self.user_id.clone()),
            ("metadata[credits]", self.credits.to_string()),
        ]
    }
}

/// Created checkout session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

/// Stripe API client
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: Option<String>,
    api_url: String,
}

impl StripeClient {
    pub fn new(secret_key: Option<String>, api_url: impl Into<String>) -> Result<Self, CheckoutError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        Ok(Self {
            http,
            secret_key: secret_key.filter(|k| !k.trim().is_empty()),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CheckoutConfig) -> Result<Self, CheckoutError> {
        Self::new(config.secret_key.clone(), config.api_url.clone())
    }
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_session(&self, order: &CreditOrder) -> Result<CheckoutSession, CheckoutError> {
        let secret_key = self.secret_key.as_deref().ok_or(CheckoutError::NotConfigured)?;

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(secret_key)
            .form(&order.form_fields())
            .send()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Api(status.as_u16(), body));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::Parse(e.to_string()))?;
        let url = session.url.ok_or(CheckoutError::MissingUrl)?;

        tracing::info!(
            user_id = %order.user_id,
            credits = order.credits,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }
}
