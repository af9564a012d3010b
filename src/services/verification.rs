use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::class::RosterChange;
use crate::models::payment::{
    PaymentEntity, PaymentOrder, PaymentStatus, VerifyPaymentRequest, VerifyPaymentResponse, WebhookOutcome,
    WebhookPayload,
};
use crate::services::enrollment::EnrollmentService;
use crate::services::signature::SignatureVerifier;
use crate::services::store::Store;

/// Confirms payments, either from the client after checkout or from the
/// gateway's webhook, and enrolls the payer once a class payment settles.
#[derive(Clone)]
pub struct PaymentVerifier {
    store: Arc<dyn Store>,
    signatures: SignatureVerifier,
    enrollment: EnrollmentService,
}

impl PaymentVerifier {
    pub fn new(store: Arc<dyn Store>, signatures: SignatureVerifier) -> Self {
        Self {
            enrollment: EnrollmentService::new(store.clone()),
            store,
            signatures,
        }
    }

    pub async fn verify_class_payment(
        &self,
        request: VerifyPaymentRequest,
        caller: &AuthUser,
    ) -> AppResult<VerifyPaymentResponse> {
        request.validate()?;

        if !self.signatures.verify_payment(&request.order_id, &request.payment_id, &request.signature) {
            log::warn!(
                "Rejected payment signature for order {} from user {}",
                request.order_id,
                caller.id
            );
            return Err(AppError::Validation("Invalid payment signature".to_string()));
        }

        // Only a stored class order decides which class was paid for.
        let order = self.store
            .find_payment_order_by_gateway_id(&request.order_id)
            .await?
            .filter(|order| order.class_id.is_some())
            .ok_or_else(|| {
                log::warn!("No class payment recorded for gateway order {}", request.order_id);
                AppError::Validation("No class payment found for this order".to_string())
            })?;
        if order.user_id != caller.id {
            return Err(AppError::Forbidden("Payment belongs to another user".to_string()));
        }

        let class_id = order
            .class_id
            .ok_or_else(|| AppError::Validation("No class payment found for this order".to_string()))?;
        if request.class_id.map_or(false, |requested| requested != class_id) {
            log::warn!(
                "User {} verified order {} for class {} but named class {:?}",
                caller.id,
                order.gateway_order_id,
                class_id,
                request.class_id
            );
            return Err(AppError::Validation("Class does not match the paid order".to_string()));
        }
        self.enrollment.get_class(class_id).await?;

        let payment_status = self.complete(&order, &request.payment_id).await?;

        let newly_enrolled = match self.enrollment.ensure_enrolled(class_id, caller.id).await? {
            RosterChange::Enrolled => true,
            RosterChange::AlreadyEnrolled => false,
            RosterChange::ClassFull => return Err(AppError::Validation("Class is full".to_string())),
        };

        Ok(VerifyPaymentResponse {
            class_id,
            newly_enrolled,
            payment_status,
        })
    }

    /// Verifies and applies one webhook delivery. Redelivery of an event
    /// that was already applied changes nothing.
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> AppResult<WebhookOutcome> {
        let signature = signature.ok_or_else(|| {
            log::warn!("Webhook delivered without a signature header");
            AppError::Validation("Invalid webhook signature".to_string())
        })?;
        if !self.signatures.verify_webhook(body, signature) {
            log::warn!("Rejected webhook with invalid signature");
            return Err(AppError::Validation("Invalid webhook signature".to_string()));
        }

        let payload: WebhookPayload = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;
        let entity = payload.payload.payment.entity;

        log::info!(
            "Webhook {} for order {} with payment status {}",
            payload.event.as_deref().unwrap_or("<none>"),
            entity.order_id,
            entity.status
        );

        match entity.status.as_str() {
            "captured" => self.on_captured(&entity).await,
            "failed" => self.on_failed(&entity).await,
            other => {
                log::debug!("Ignoring payment status {}", other);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn on_captured(&self, entity: &PaymentEntity) -> AppResult<WebhookOutcome> {
        let order = match self.store.find_payment_order_by_gateway_id(&entity.order_id).await? {
            Some(order) => order,
            None => return self.acknowledge_subscription(&entity.order_id).await,
        };

        let outcome = match self.store
            .transition_payment_order(&order.gateway_order_id, PaymentStatus::Completed, Some(&entity.id))
            .await?
        {
            Some(_) => {
                log::info!("Payment order {} completed by webhook", order.id);
                WebhookOutcome::Completed
            }
            None if order.status == PaymentStatus::Completed => {
                log::warn!("Duplicate capture for payment order {}", order.id);
                WebhookOutcome::AlreadyCompleted
            }
            None => {
                log::warn!("Capture for payment order {} in status {} ignored", order.id, order.status);
                return Ok(WebhookOutcome::AlreadySettled);
            }
        };

        if let Some(class_id) = order.class_id {
            self.enroll_payer(class_id, &order).await?;
        }
        Ok(outcome)
    }

    async fn on_failed(&self, entity: &PaymentEntity) -> AppResult<WebhookOutcome> {
        let order = match self.store.find_payment_order_by_gateway_id(&entity.order_id).await? {
            Some(order) => order,
            None => return self.acknowledge_subscription(&entity.order_id).await,
        };

        match self.store
            .transition_payment_order(&order.gateway_order_id, PaymentStatus::Failed, Some(&entity.id))
            .await?
        {
            Some(_) => {
                log::info!(
                    "Payment order {} failed: {}",
                    order.id,
                    entity.error_description.as_deref().unwrap_or("no reason given")
                );
                Ok(WebhookOutcome::Failed)
            }
            None => {
                log::warn!("Failure for payment order {} in status {} ignored", order.id, order.status);
                Ok(WebhookOutcome::AlreadySettled)
            }
        }
    }

    async fn acknowledge_subscription(&self, gateway_order_id: &str) -> AppResult<WebhookOutcome> {
        match self.store.find_subscription_by_payment_id(gateway_order_id).await? {
            Some(subscription) => {
                log::info!("Webhook for subscription {} acknowledged", subscription.id);
                Ok(WebhookOutcome::SubscriptionAcknowledged)
            }
            None => Err(AppError::not_found("Payment order")),
        }
    }

    /// The payment is already settled here, so a missing or full class is
    /// logged for follow-up rather than failing the delivery.
    async fn enroll_payer(&self, class_id: Uuid, order: &PaymentOrder) -> AppResult<()> {
        match self.enrollment.ensure_enrolled(class_id, order.user_id).await {
            Ok(RosterChange::ClassFull) => {
                log::warn!(
                    "Class {} is full, paid order {} needs manual follow-up",
                    class_id,
                    order.id
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => {
                log::warn!("Class {} of paid order {} no longer exists", class_id, order.id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Pending to completed, tolerating an order that already completed.
    async fn complete(&self, order: &PaymentOrder, payment_id: &str) -> AppResult<PaymentStatus> {
        match self.store
            .transition_payment_order(&order.gateway_order_id, PaymentStatus::Completed, Some(payment_id))
            .await?
        {
            Some(updated) => {
                log::info!("Payment order {} verified", updated.id);
                Ok(updated.status)
            }
            None => {
                let current = self.store
                    .find_payment_order(order.id)
                    .await?
                    .map(|o| o.status)
                    .unwrap_or(order.status);
                if current != PaymentStatus::Completed {
                    return Err(AppError::Validation(format!("Payment is {}", current)));
                }
                Ok(current)
            }
        }
    }
}
