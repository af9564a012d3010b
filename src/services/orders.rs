use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::common::{PaginatedResponse, PaginationQuery};
use crate::models::payment::{ClassOrderResponse, PaymentOrder, PaymentStatus};
use crate::models::subscription::{BillingCycle, Subscription, SubscriptionOrderResponse};
use crate::services::gateway::{OrderRequest, PaymentGateway};
use crate::services::store::Store;

/// Creates gateway orders and the local records that track them.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>) -> Self {
        Self {
            store,
            gateway,
            currency: currency.into(),
        }
    }

    pub async fn create_class_order(&self, class_id: Uuid, user_id: Uuid) -> AppResult<ClassOrderResponse> {
        let class = self.store
            .find_class(class_id)
            .await?
            .ok_or_else(|| AppError::not_found("Class"))?;
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let amount = class
            .amount_minor_units()
            .ok_or_else(|| AppError::Validation("Invalid class price".to_string()))?;

        let gateway_order = self.gateway
            .create_order(OrderRequest {
                amount,
                currency: self.currency.clone(),
                receipt: receipt("class", class_id),
                notes: json!({
                    "classId": class_id.to_string(),
                    "userId": user_id.to_string(),
                }),
            })
            .await?;

        let order = PaymentOrder::new_class_order(
            user_id,
            class_id,
            amount,
            self.currency.clone(),
            gateway_order.id.clone(),
            format!("Payment for class: {}", class.title),
        );
        self.store.insert_payment_order(&order).await?;

        log::info!(
            "Payment order {} ({}) created for user {} and class {}",
            order.id,
            order.gateway_order_id,
            user_id,
            class_id
        );

        Ok(ClassOrderResponse {
            order_id: gateway_order.id,
            amount,
            currency: order.currency,
            payment_id: order.id,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Buys a plan. The gateway order is created before the user's current
    /// subscription is replaced, so a gateway failure keeps the old one.
    pub async fn create_subscription_order(
        &self,
        plan_id: Uuid,
        billing_cycle: BillingCycle,
        user_id: Uuid,
    ) -> AppResult<SubscriptionOrderResponse> {
        let plan = self.store
            .find_plan(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found("Subscription plan"))?;

        let amount = plan
            .amount_minor_units(billing_cycle)
            .ok_or_else(|| AppError::Validation("Invalid plan price".to_string()))?;

        let start_date = Utc::now();
        let end_date = billing_cycle
            .period_end(start_date)
            .ok_or_else(|| anyhow::anyhow!("billing period end out of range"))?;

        let gateway_order = self.gateway
            .create_order(OrderRequest {
                amount,
                currency: self.currency.clone(),
                receipt: receipt("sub", plan_id),
                notes: json!({
                    "planId": plan_id.to_string(),
                    "userId": user_id.to_string(),
                    "billingCycle": billing_cycle.to_string(),
                }),
            })
            .await?;

        let subscription = Subscription::new(
            user_id,
            plan_id,
            billing_cycle,
            start_date,
            end_date,
            gateway_order.id.clone(),
            amount,
            self.currency.clone(),
        );
        let replaced = self.store.replace_subscription(&subscription).await?;

        log::info!(
            "Subscription {} ({} {}) created for user {}, replaced {}",
            subscription.id,
            plan.name,
            billing_cycle,
            user_id,
            replaced
        );

        Ok(SubscriptionOrderResponse {
            order_id: gateway_order.id,
            amount,
            currency: subscription.currency,
            subscription_id: subscription.id,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    pub async fn payment_history(
        &self,
        user_id: Uuid,
        query: &PaginationQuery,
    ) -> AppResult<PaginatedResponse<PaymentOrder>> {
        let (page, limit) = query.resolve();
        let offset = (page - 1).saturating_mul(limit);
        let (orders, total) = self.store.list_payment_orders(user_id, offset, limit).await?;
        Ok(PaginatedResponse::new(orders, total, page, limit))
    }

    pub async fn get_payment(&self, id: Uuid, caller: &AuthUser) -> AppResult<PaymentOrder> {
        let order = self.store
            .find_payment_order(id)
            .await?
            .ok_or_else(|| AppError::not_found("Payment"))?;

        if order.user_id != caller.id && !caller.is_admin() {
            return Err(AppError::Forbidden("Not allowed to view this payment".to_string()));
        }
        Ok(order)
    }

    /// Refunds a completed payment in full. Admin only.
    pub async fn refund(&self, id: Uuid, caller: &AuthUser) -> AppResult<PaymentOrder> {
        caller.require_admin()?;

        let order = self.store
            .find_payment_order(id)
            .await?
            .ok_or_else(|| AppError::not_found("Payment"))?;

        if order.status != PaymentStatus::Completed {
            return Err(AppError::Validation(format!(
                "Only completed payments can be refunded (status: {})",
                order.status
            )));
        }
        let payment_id = order
            .gateway_payment_id
            .as_deref()
            .ok_or_else(|| AppError::Validation("Payment has no captured gateway payment".to_string()))?;

        // A concurrent duplicate fails at the gateway, which refuses to refund
        // more than the captured amount. Only one transition below can win.
        let refund = self.gateway.refund_payment(payment_id, order.amount).await?;

        let refunded = self.store
            .transition_payment_order(&order.gateway_order_id, PaymentStatus::Refunded, None)
            .await?
            .ok_or_else(|| AppError::Validation("Payment was already refunded".to_string()))?;

        log::info!("Payment {} refunded by {} (refund {})", refunded.id, caller.id, refund.id);
        Ok(refunded)
    }
}

/// Gateways cap receipts at 40 characters.
fn receipt(prefix: &str, id: Uuid) -> String {
    let mut receipt = format!("{}_{}_{}", prefix, id.simple(), Utc::now().timestamp());
    receipt.truncate(40);
    receipt
}
