use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Statuses a payment may be in for `self` to be applied. Payments only
    /// move forward: pending settles once, and only a completed payment can be
    /// refunded.
    pub fn predecessors(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[],
            PaymentStatus::Completed | PaymentStatus::Failed => &[PaymentStatus::Pending],
            PaymentStatus::Refunded => &[PaymentStatus::Completed],
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub class_id: Option<Uuid>,
    /// Minor currency units, as sent to the gateway.
    pub amount: u64,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    pub fn new_class_order(
        user_id: Uuid,
        class_id: Uuid,
        amount: u64,
        currency: String,
        gateway_order_id: String,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            class_id: Some(class_id),
            amount,
            currency,
            status: PaymentStatus::Pending,
            gateway_order_id,
            gateway_payment_id: None,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a status change if it is a forward transition. Returns whether
    /// anything changed.
    pub fn transition(&mut self, next: PaymentStatus, gateway_payment_id: Option<&str>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if let Some(payment_id) = gateway_payment_id {
            self.gateway_payment_id = Some(payment_id.to_string());
        }
        self.updated_at = Utc::now();
        true
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassOrderRequest {
    pub class_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOrderResponse {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub payment_id: Uuid,
    pub key_id: String,
}

/// Client-side confirmation sent after the hosted checkout completes. Field
/// names follow the gateway's checkout callback, camelCase is accepted too.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id", alias = "orderId")]
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,

    #[serde(alias = "razorpay_payment_id", alias = "paymentId")]
    #[validate(length(min = 1, message = "Payment id is required"))]
    pub payment_id: String,

    #[serde(alias = "razorpay_signature")]
    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,

    #[serde(alias = "classId")]
    pub class_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub class_id: Uuid,
    pub newly_enrolled: bool,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event: Option<String>,
    pub payload: WebhookEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub payment: WebhookPayment,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayment {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: String,
    pub status: String,
    pub amount: Option<u64>,
    pub currency: Option<String>,
    pub error_description: Option<String>,
}

/// What a webhook delivery did, reported back to the gateway.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Completed,
    AlreadyCompleted,
    Failed,
    AlreadySettled,
    SubscriptionAcknowledged,
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order() -> PaymentOrder {
        PaymentOrder::new_class_order(
            Uuid::new_v4(),
            Uuid::new_v4(),
            50_000,
            "INR".to_string(),
            "order_abc".to_string(),
            "Sunrise Vinyasa".to_string(),
        )
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        let mut order = pending_order();
        assert!(order.transition(PaymentStatus::Completed, Some("pay_1")));
        assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_1"));

        assert!(!order.transition(PaymentStatus::Failed, None));
        assert!(!order.transition(PaymentStatus::Pending, None));
        assert_eq!(order.status, PaymentStatus::Completed);

        assert!(order.transition(PaymentStatus::Refunded, None));
        assert!(!order.transition(PaymentStatus::Completed, None));
    }

    #[test]
    fn test_failed_payment_cannot_complete() {
        let mut order = pending_order();
        assert!(order.transition(PaymentStatus::Failed, None));
        assert!(!order.transition(PaymentStatus::Completed, Some("pay_2")));
        assert_eq!(order.gateway_payment_id, None);
    }

    #[test]
    fn test_verify_request_accepts_gateway_field_names() {
        let request: VerifyPaymentRequest = serde_json::from_value(serde_json::json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "abc",
            "classId": "8d1f3d5e-2c4b-4e7a-9c1a-0f5b6d7e8f90"
        }))
        .unwrap();
        assert_eq!(request.order_id, "order_1");
        assert_eq!(request.payment_id, "pay_1");
        assert!(request.class_id.is_some());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(PaymentStatus::Refunded).unwrap(), "refunded");
    }
}
