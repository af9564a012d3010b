use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    class::{RosterChange, YogaClass},
    payment::{PaymentOrder, PaymentStatus},
    subscription::{Subscription, SubscriptionPlan},
    user::User,
};

/// Persistence used by the payment services.
///
/// Roster changes and payment status transitions are conditional updates the
/// implementation must apply atomically per document: concurrent callers may
/// race on the same class or order.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `false` when the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<bool>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn insert_class(&self, class: &YogaClass) -> Result<()>;
    async fn find_class(&self, class_id: Uuid) -> Result<Option<YogaClass>>;
    /// Adds the user if absent and the class has room. `None` when the class
    /// does not exist; otherwise the outcome and the class as stored after it.
    async fn enroll_student(&self, class_id: Uuid, user_id: Uuid) -> Result<Option<(RosterChange, YogaClass)>>;
    /// `None` when the class does not exist; `false` when the user was not on
    /// the roster.
    async fn unenroll_student(&self, class_id: Uuid, user_id: Uuid) -> Result<Option<(bool, YogaClass)>>;

    async fn insert_payment_order(&self, order: &PaymentOrder) -> Result<()>;
    async fn find_payment_order(&self, id: Uuid) -> Result<Option<PaymentOrder>>;
    async fn find_payment_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<PaymentOrder>>;
    /// Moves the order to `next` only from one of `next.predecessors()`.
    /// Returns the updated order, or `None` if no transition happened.
    async fn transition_payment_order(
        &self,
        gateway_order_id: &str,
        next: PaymentStatus,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentOrder>>;
    /// Newest first, with the total count for pagination.
    async fn list_payment_orders(&self, user_id: Uuid, offset: u32, limit: u32) -> Result<(Vec<PaymentOrder>, u32)>;

    async fn insert_plan(&self, plan: &SubscriptionPlan) -> Result<()>;
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>>;
    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>>;

    /// Deletes every subscription of the owner and stores `subscription` in
    /// its place. Returns how many were removed.
    async fn replace_subscription(&self, subscription: &Subscription) -> Result<usize>;
    async fn find_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>>;
    async fn find_subscription_by_payment_id(&self, payment_id: &str) -> Result<Option<Subscription>>;
    async fn list_subscriptions_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>>;
    async fn update_subscription(&self, subscription: &Subscription) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}
