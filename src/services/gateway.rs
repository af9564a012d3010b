use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway returned status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected gateway response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Minor currency units.
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: u64,
    #[serde(default)]
    pub status: Option<String>,
}

/// The hosted payment gateway as the services see it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError>;

    async fn refund_payment(&self, payment_id: &str, amount: u64) -> Result<GatewayRefund, GatewayError>;
}

#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, payload: &Value) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.api_url, path);

        let response = self.client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;

        log::debug!("gateway POST {} -> {}", path, status);

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        serde_json::from_str(&body_text).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let payload = json!({
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": request.notes,
        });

        let order: GatewayOrder = self.post("/orders", &payload).await?;
        log::info!("gateway order {} created for {} {}", order.id, order.amount, order.currency);
        Ok(order)
    }

    async fn refund_payment(&self, payment_id: &str, amount: u64) -> Result<GatewayRefund, GatewayError> {
        let payload = json!({ "amount": amount });
        let refund: GatewayRefund = self
            .post(&format!("/payments/{}/refund", payment_id), &payload)
            .await?;
        log::info!("gateway refund {} issued for payment {}", refund.id, payment_id);
        Ok(refund)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_gateway_order_parses_api_response() {
        let body = r#"{"id":"order_IluGWxBm9U8zJ8","entity":"order","amount":50000,
            "amount_paid":0,"currency":"INR","receipt":"rcpt_1","status":"created","notes":[]}"#;
        let order: GatewayOrder = serde_json::from_str(body).unwrap();
        assert_eq!(order.id, "order_IluGWxBm9U8zJ8");
        assert_eq!(order.amount, 50_000);
        assert_eq!(order.status.as_deref(), Some("created"));
    }

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let gateway = RazorpayGateway::new(&GatewayConfig {
            api_url: "https://api.razorpay.com/v1/".to_string(),
            key_id: "rzp_test".to_string(),
            key_secret: "secret".to_string(),
            webhook_secret: "secret".to_string(),
            currency: "INR".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(gateway.api_url, "https://api.razorpay.com/v1");
        assert_eq!(gateway.key_id(), "rzp_test");
    }
}
