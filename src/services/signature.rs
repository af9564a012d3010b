use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::GatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Computes and checks the gateway's HMAC-SHA256 signatures.
#[derive(Clone)]
pub struct SignatureVerifier {
    key_secret: String,
    webhook_secret: String,
}

impl SignatureVerifier {
    pub fn new(key_secret: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.key_secret.clone(), config.webhook_secret.clone())
    }

    /// Hex signature the checkout returns for a captured payment.
    pub fn payment_signature(&self, order_id: &str, payment_id: &str) -> String {
        let payload = format!("{}|{}", order_id, payment_id);
        hex::encode(hmac_sha256(self.key_secret.as_bytes(), payload.as_bytes()))
    }

    pub fn webhook_signature(&self, body: &[u8]) -> String {
        hex::encode(hmac_sha256(self.webhook_secret.as_bytes(), body))
    }

    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let payload = format!("{}|{}", order_id, payment_id);
        let expected = hmac_sha256(self.key_secret.as_bytes(), payload.as_bytes());
        matches_hex(&expected, signature)
    }

    pub fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        let expected = hmac_sha256(self.webhook_secret.as_bytes(), body);
        matches_hex(&expected, signature)
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key)
        .expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Compares against the lowercase hex encoding the gateway sends, so any
/// altered character (case included) is a mismatch.
fn matches_hex(expected: &[u8], provided: &str) -> bool {
    let expected = hex::encode(expected);
    if provided.len() != expected.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
