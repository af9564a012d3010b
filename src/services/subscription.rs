use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::subscription::{CreatePlanRequest, Subscription, SubscriptionPlan};
use crate::services::store::Store;

#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn Store>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_plans(&self) -> AppResult<Vec<SubscriptionPlan>> {
        Ok(self.store.list_plans().await?)
    }

    pub async fn create_plan(&self, request: CreatePlanRequest) -> AppResult<SubscriptionPlan> {
        request.validate()?;
        let plan = SubscriptionPlan::new(request);
        self.store.insert_plan(&plan).await?;
        log::info!("Subscription plan {} ({}) created", plan.name, plan.id);
        Ok(plan)
    }

    /// The caller's subscription with its status brought up to date. An
    /// active subscription past its end date is stored as expired.
    pub async fn current_subscription(&self, user_id: Uuid) -> AppResult<Subscription> {
        let mut subscription = self.store
            .find_subscription_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Subscription"))?;

        if subscription.refresh_status(Utc::now()) {
            self.store.update_subscription(&subscription).await?;
            log::info!("Subscription {} of user {} expired", subscription.id, user_id);
        }
        Ok(subscription)
    }

    pub async fn cancel_subscription(&self, user_id: Uuid) -> AppResult<Subscription> {
        let mut subscription = self.current_subscription(user_id).await?;
        subscription.cancel().map_err(AppError::Validation)?;
        self.store.update_subscription(&subscription).await?;
        log::info!("Subscription {} cancelled by user {}", subscription.id, user_id);
        Ok(subscription)
    }
}
