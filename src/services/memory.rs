use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    class::{RosterChange, YogaClass},
    payment::{PaymentOrder, PaymentStatus},
    subscription::{Subscription, SubscriptionPlan},
    user::User,
};
use crate::services::store::Store;

/// Process-local store. Every operation runs under a single collection lock,
/// which is what makes the conditional updates atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<Vec<User>>>,
    classes: Arc<Mutex<Vec<YogaClass>>>,
    payment_orders: Arc<Mutex<Vec<PaymentOrder>>>,
    plans: Arc<Mutex<Vec<SubscriptionPlan>>>,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow!("memory store lock poisoned"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<bool> {
        let mut users = lock(&self.users)?;
        if users.iter().any(|u| u.email == user.email) {
            return Ok(false);
        }
        users.push(user.clone());
        Ok(true)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(lock(&self.users)?.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(lock(&self.users)?.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_class(&self, class: &YogaClass) -> Result<()> {
        lock(&self.classes)?.push(class.clone());
        Ok(())
    }

    async fn find_class(&self, class_id: Uuid) -> Result<Option<YogaClass>> {
        Ok(lock(&self.classes)?.iter().find(|c| c.id == class_id).cloned())
    }

    async fn enroll_student(&self, class_id: Uuid, user_id: Uuid) -> Result<Option<(RosterChange, YogaClass)>> {
        let mut classes = lock(&self.classes)?;
        Ok(classes.iter_mut().find(|c| c.id == class_id).map(|class| {
            let change = class.apply_enrollment(user_id);
            (change, class.clone())
        }))
    }

    async fn unenroll_student(&self, class_id: Uuid, user_id: Uuid) -> Result<Option<(bool, YogaClass)>> {
        let mut classes = lock(&self.classes)?;
        Ok(classes.iter_mut().find(|c| c.id == class_id).map(|class| {
            let removed = class.remove_student(&user_id);
            (removed, class.clone())
        }))
    }

    async fn insert_payment_order(&self, order: &PaymentOrder) -> Result<()> {
        let mut orders = lock(&self.payment_orders)?;
        if orders.iter().any(|o| o.gateway_order_id == order.gateway_order_id) {
            return Err(anyhow!("duplicate gateway order id {}", order.gateway_order_id));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn find_payment_order(&self, id: Uuid) -> Result<Option<PaymentOrder>> {
        Ok(lock(&self.payment_orders)?.iter().find(|o| o.id == id).cloned())
    }

    async fn find_payment_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<PaymentOrder>> {
        Ok(lock(&self.payment_orders)?
            .iter()
            .find(|o| o.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn transition_payment_order(
        &self,
        gateway_order_id: &str,
        next: PaymentStatus,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentOrder>> {
        let mut orders = lock(&self.payment_orders)?;
        let order = match orders.iter_mut().find(|o| o.gateway_order_id == gateway_order_id) {
            Some(order) => order,
            None => return Ok(None),
        };
        if order.transition(next, gateway_payment_id) {
            Ok(Some(order.clone()))
        } else {
            Ok(None)
        }
    }

    async fn list_payment_orders(&self, user_id: Uuid, offset: u32, limit: u32) -> Result<(Vec<PaymentOrder>, u32)> {
        let orders = lock(&self.payment_orders)?;
        let mut mine: Vec<PaymentOrder> = orders.iter().filter(|o| o.user_id == user_id).cloned().collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = mine.len() as u32;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert_plan(&self, plan: &SubscriptionPlan) -> Result<()> {
        lock(&self.plans)?.push(plan.clone());
        Ok(())
    }

    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>> {
        Ok(lock(&self.plans)?.iter().find(|p| p.id == plan_id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let mut plans = lock(&self.plans)?.clone();
        plans.sort_by(|a, b| a.monthly_price.cmp(&b.monthly_price));
        Ok(plans)
    }

    async fn replace_subscription(&self, subscription: &Subscription) -> Result<usize> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let before = subscriptions.len();
        subscriptions.retain(|s| s.user_id != subscription.user_id);
        let removed = before - subscriptions.len();
        subscriptions.push(subscription.clone());
        Ok(removed)
    }

    async fn find_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        Ok(lock(&self.subscriptions)?.iter().find(|s| s.user_id == user_id).cloned())
    }

    async fn find_subscription_by_payment_id(&self, payment_id: &str) -> Result<Option<Subscription>> {
        Ok(lock(&self.subscriptions)?
            .iter()
            .find(|s| s.payment_id == payment_id)
            .cloned())
    }

    async fn list_subscriptions_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        Ok(lock(&self.subscriptions)?
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut subscriptions = lock(&self.subscriptions)?;
        match subscriptions.iter_mut().find(|s| s.id == subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(anyhow!("subscription {} not found", subscription.id)),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::CreateClassRequest;
    use rust_decimal::Decimal;

    fn class(capacity: u32) -> YogaClass {
        YogaClass::new(CreateClassRequest {
            title: "Yin Flow".to_string(),
            instructor: "Meera".to_string(),
            description: None,
            price: Decimal::new(300, 0),
            capacity,
            schedule: None,
        })
    }

    #[tokio::test]
    async fn test_concurrent_enrollments_never_overfill() {
        let store = MemoryStore::new();
        let class = class(3);
        store.insert_class(&class).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let class_id = class.id;
            handles.push(tokio::spawn(async move {
                store.enroll_student(class_id, Uuid::new_v4()).await.unwrap()
            }));
        }

        let mut enrolled = 0;
        for handle in handles {
            if let Some((RosterChange::Enrolled, _)) = handle.await.unwrap() {
                enrolled += 1;
            }
        }

        assert_eq!(enrolled, 3);
        let stored = store.find_class(class.id).await.unwrap().unwrap();
        assert_eq!(stored.enrolled_students.len(), 3);
    }

    #[tokio::test]
    async fn test_enroll_unknown_class_is_none() {
        let store = MemoryStore::new();
        assert!(store.enroll_student(Uuid::new_v4(), Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paged() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for i in 0..5 {
            let mut order = PaymentOrder::new_class_order(
                user,
                Uuid::new_v4(),
                1000,
                "INR".to_string(),
                format!("order_{}", i),
                "class".to_string(),
            );
            order.created_at = order.created_at + chrono::Duration::seconds(i);
            store.insert_payment_order(&order).await.unwrap();
        }

        let (page, total) = store.list_payment_orders(user, 0, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page[0].gateway_order_id, "order_4");
        assert_eq!(page[1].gateway_order_id, "order_3");

        let (last, _) = store.list_payment_orders(user, 4, 2).await.unwrap();
        assert_eq!(last.len(), 1);
    }
}
