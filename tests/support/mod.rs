#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use studio_payments::auth::TokenService;
use studio_payments::config::{AuthConfig, GatewayConfig};
use studio_payments::models::user::{Role, User};
use studio_payments::services::gateway::{
    GatewayError, GatewayOrder, GatewayRefund, OrderRequest, PaymentGateway,
};
use studio_payments::services::memory::MemoryStore;
use studio_payments::services::signature::SignatureVerifier;
use studio_payments::services::store::Store;
use studio_payments::AppServices;

pub const KEY_SECRET: &str = "rzp_test_secret";
pub const WEBHOOK_SECRET: &str = "rzp_webhook_secret";

/// Gateway double that records every order and refund it receives.
#[derive(Default)]
pub struct RecordingGateway {
    pub orders: Mutex<Vec<OrderRequest>>,
    pub refunds: Mutex<Vec<(String, u64)>>,
    counter: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    fn key_id(&self) -> &str {
        "rzp_test_key"
    }

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let order = GatewayOrder {
            id: format!("order_test{}", n),
            amount: request.amount,
            currency: request.currency.clone(),
            status: Some("created".to_string()),
        };
        self.orders.lock().unwrap().push(request);
        Ok(order)
    }

    async fn refund_payment(&self, payment_id: &str, amount: u64) -> Result<GatewayRefund, GatewayError> {
        self.refunds.lock().unwrap().push((payment_id.to_string(), amount));
        Ok(GatewayRefund {
            id: format!("rfnd_{}", payment_id),
            payment_id: payment_id.to_string(),
            amount,
            status: Some("processed".to_string()),
        })
    }
}

pub struct TestContext {
    pub services: AppServices,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<RecordingGateway>,
    pub signatures: SignatureVerifier,
    pub user: User,
    pub user_token: String,
    pub admin_token: String,
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        api_url: "http://gateway.invalid/v1".to_string(),
        key_id: "rzp_test_key".to_string(),
        key_secret: KEY_SECRET.to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        currency: "INR".to_string(),
        timeout: Duration::from_secs(5),
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-secret".to_string(),
        token_ttl_hours: 1,
        admin_email: None,
    }
}

pub async fn context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(RecordingGateway::default());
    let services = AppServices::new(store.clone(), gateway.clone(), &gateway_config(), &auth_config());
    let tokens = TokenService::new(&auth_config());

    let user = User::new("Asha".to_string(), "asha@example.com".to_string(), "unused".to_string(), Role::User);
    let admin = User::new("Owner".to_string(), "owner@example.com".to_string(), "unused".to_string(), Role::Admin);
    store.insert_user(&user).await.unwrap();
    store.insert_user(&admin).await.unwrap();

    TestContext {
        services,
        store,
        gateway,
        signatures: SignatureVerifier::new(KEY_SECRET, WEBHOOK_SECRET),
        user_token: tokens.issue(&user).unwrap(),
        admin_token: tokens.issue(&admin).unwrap(),
        user,
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn captured_webhook(order_id: &str, payment_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": payment_id,
            "entity": "payment",
            "order_id": order_id,
            "status": "captured",
            "amount": 50000,
            "currency": "INR"
        }}}
    }))
    .unwrap()
}

pub fn uuid_of(value: &serde_json::Value) -> Uuid {
    value.as_str().unwrap().parse().unwrap()
}
