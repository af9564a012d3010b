use serde::{Deserialize, Serialize};
use chrono::{DateTime, Months, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use validator::Validate;

use crate::models::common::validate_price;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// End of a billing period starting at `start`, in calendar months so a
    /// period starting on Jan 31st ends on the last day of February.
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            BillingCycle::Monthly => Months::new(1),
            BillingCycle::Yearly => Months::new(12),
        };
        start.checked_add_months(months)
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingCycle::Monthly => write!(f, "monthly"),
            BillingCycle::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub monthly_price: Decimal,
    pub yearly_price: Decimal,
    #[serde(default)]
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    pub fn new(request: CreatePlanRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            monthly_price: request.monthly_price,
            yearly_price: request.yearly_price,
            features: request.features.unwrap_or_default(),
            created_at: Utc::now(),
        }
    }

    pub fn price_for(&self, cycle: BillingCycle) -> Decimal {
        match cycle {
            BillingCycle::Monthly => self.monthly_price,
            BillingCycle::Yearly => self.yearly_price,
        }
    }

    pub fn amount_minor_units(&self, cycle: BillingCycle) -> Option<u64> {
        self.price_for(cycle).checked_mul(Decimal::ONE_HUNDRED)?.round().to_u64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
    /// Gateway order id the subscription was bought with.
    pub payment_id: String,
    pub amount: u64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        user_id: Uuid,
        plan_id: Uuid,
        billing_cycle: BillingCycle,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        payment_id: String,
        amount: u64,
        currency: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            billing_cycle,
            status: SubscriptionStatus::Active,
            start_date,
            end_date,
            auto_renew: true,
            payment_id,
            amount,
            currency,
            created_at: start_date,
            updated_at: start_date,
        }
    }

    /// Marks an active subscription expired once its end date is behind
    /// `now`. Returns whether the status changed and needs persisting.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == SubscriptionStatus::Active && self.end_date <= now {
            self.status = SubscriptionStatus::Expired;
            self.updated_at = now;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) -> Result<(), String> {
        if self.status != SubscriptionStatus::Active {
            return Err("Only active subscriptions can be cancelled".to_string());
        }
        self.status = SubscriptionStatus::Cancelled;
        self.auto_renew = false;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.end_date.signed_duration_since(now).num_days().max(0)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    #[validate(length(min = 2, max = 80, message = "Name must be between 2 and 80 characters"))]
    pub name: String,

    #[validate(custom = "validate_price")]
    pub monthly_price: Decimal,

    #[validate(custom = "validate_price")]
    pub yearly_price: Decimal,

    pub features: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionOrderRequest {
    pub plan_id: Uuid,
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOrderResponse {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub subscription_id: Uuid,
    pub key_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days_remaining: i64,
    pub auto_renew: bool,
}

impl From<&Subscription> for SubscriptionStatusResponse {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id,
            plan_id: subscription.plan_id,
            billing_cycle: subscription.billing_cycle,
            status: subscription.status,
            start_date: subscription.start_date,
            end_date: subscription.end_date,
            days_remaining: subscription.days_remaining(Utc::now()),
            auto_renew: subscription.auto_renew,
        }
    }
}
