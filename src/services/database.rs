use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use surrealdb::engine::any::{self, Any};
use surrealdb::Surreal;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{
    class::{RosterChange, YogaClass},
    payment::{PaymentOrder, PaymentStatus},
    subscription::{Subscription, SubscriptionPlan},
    user::User,
};
use crate::services::store::Store;

/// Projection that swaps the record link for the bare uuid the models carry.
const RECORD: &str = "*, meta::id(id) AS id";

/// How many times a conditional roster update is retried when the class
/// changed between the update and the follow-up read.
const ROSTER_RETRIES: usize = 3;

#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

type Bindings = Vec<(&'static str, Value)>;

impl SurrealStore {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = any::connect(config.url.as_str()).await?;
        db.use_ns(config.namespace.as_str()).use_db(config.name.as_str()).await?;

        let service = Self { db };
        service.initialize_schema().await?;

        log::info!("Connected to SurrealDB at {}", config.url);
        Ok(service)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.db.query("
            DEFINE TABLE users SCHEMALESS;
            DEFINE INDEX unique_email ON users FIELDS email UNIQUE;

            DEFINE TABLE classes SCHEMALESS;

            DEFINE TABLE payment_orders SCHEMALESS;
            DEFINE INDEX unique_gateway_order ON payment_orders FIELDS gatewayOrderId UNIQUE;
            DEFINE INDEX payment_orders_by_user ON payment_orders FIELDS userId;

            DEFINE TABLE plans SCHEMALESS;

            DEFINE TABLE subscriptions SCHEMALESS;
            DEFINE INDEX subscriptions_by_user ON subscriptions FIELDS userId;
            DEFINE INDEX subscriptions_by_payment ON subscriptions FIELDS paymentId;
        ").await?.check()?;

        log::info!("Database schema initialized successfully");
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, sql: &str, bindings: Bindings) -> Result<Vec<T>> {
        let mut query = self.db.query(sql);
        for binding in bindings {
            query = query.bind(binding);
        }
        let mut response = query.await?;
        let rows: Vec<Value> = response.take(0)?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| anyhow!("failed to decode record: {}", e)))
            .collect()
    }

    async fn fetch_one<T: DeserializeOwned>(&self, sql: &str, bindings: Bindings) -> Result<Option<T>> {
        Ok(self.fetch(sql, bindings).await?.into_iter().next())
    }

    /// Runs a statement and reports how many records it touched.
    async fn execute(&self, sql: &str, bindings: Bindings) -> Result<usize> {
        let mut query = self.db.query(sql);
        for binding in bindings {
            query = query.bind(binding);
        }
        let mut response = query.await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(rows.len())
    }

    async fn create<T: Serialize>(&self, table: &str, record: &T) -> Result<()> {
        let sql = format!("CREATE {} CONTENT $doc RETURN NONE", table);
        self.db
            .query(sql)
            .bind(("doc", to_doc(record)?))
            .await?
            .check()?;
        Ok(())
    }

    async fn find_by_id<T: DeserializeOwned>(&self, table: &str, id: Uuid) -> Result<Option<T>> {
        let sql = format!("SELECT {} FROM type::thing('{}', $id)", RECORD, table);
        self.fetch_one(&sql, vec![("id", Value::String(id.to_string()))]).await
    }
}

fn to_doc<T: Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

fn uuid_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

fn now_value() -> Result<Value> {
    Ok(serde_json::to_value(Utc::now())?)
}

#[async_trait]
impl Store for SurrealStore {
    async fn insert_user(&self, user: &User) -> Result<bool> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Ok(false);
        }
        self.create("users", user).await?;
        Ok(true)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.find_by_id("users", user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $email", RECORD);
        self.fetch_one(&sql, vec![("email", Value::String(email.trim().to_lowercase()))])
            .await
    }

    async fn insert_class(&self, class: &YogaClass) -> Result<()> {
        self.create("classes", class).await
    }

    async fn find_class(&self, class_id: Uuid) -> Result<Option<YogaClass>> {
        self.find_by_id("classes", class_id).await
    }

    async fn enroll_student(&self, class_id: Uuid, user_id: Uuid) -> Result<Option<(RosterChange, YogaClass)>> {
        for _ in 0..ROSTER_RETRIES {
            let updated = self.execute(
                "UPDATE classes SET enrolledStudents += $user, updatedAt = $now
                 WHERE id = type::thing('classes', $class)
                   AND enrolledStudents CONTAINSNOT $user
                   AND array::len(enrolledStudents) < capacity
                 RETURN AFTER",
                vec![
                    ("class", uuid_value(class_id)),
                    ("user", uuid_value(user_id)),
                    ("now", now_value()?),
                ],
            ).await?;

            let class = match self.find_class(class_id).await? {
                Some(class) => class,
                None => return Ok(None),
            };

            if updated > 0 {
                return Ok(Some((RosterChange::Enrolled, class)));
            }
            if class.is_enrolled(&user_id) {
                return Ok(Some((RosterChange::AlreadyEnrolled, class)));
            }
            if class.is_full() {
                return Ok(Some((RosterChange::ClassFull, class)));
            }
            log::debug!("roster of class {} changed during enrollment, retrying", class_id);
        }
        Err(anyhow!("roster of class {} kept changing during enrollment", class_id))
    }

    async fn unenroll_student(&self, class_id: Uuid, user_id: Uuid) -> Result<Option<(bool, YogaClass)>> {
        let updated = self.execute(
            "UPDATE classes SET enrolledStudents -= $user, updatedAt = $now
             WHERE id = type::thing('classes', $class)
               AND enrolledStudents CONTAINS $user
             RETURN AFTER",
            vec![
                ("class", uuid_value(class_id)),
                ("user", uuid_value(user_id)),
                ("now", now_value()?),
            ],
        ).await?;

        Ok(self.find_class(class_id).await?.map(|class| (updated > 0, class)))
    }

    async fn insert_payment_order(&self, order: &PaymentOrder) -> Result<()> {
        self.create("payment_orders", order).await
    }

    async fn find_payment_order(&self, id: Uuid) -> Result<Option<PaymentOrder>> {
        self.find_by_id("payment_orders", id).await
    }

    async fn find_payment_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<PaymentOrder>> {
        let sql = format!("SELECT {} FROM payment_orders WHERE gatewayOrderId = $order", RECORD);
        self.fetch_one(&sql, vec![("order", Value::String(gateway_order_id.to_string()))])
            .await
    }

    async fn transition_payment_order(
        &self,
        gateway_order_id: &str,
        next: PaymentStatus,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentOrder>> {
        let from: Vec<&str> = next.predecessors().iter().map(|s| s.as_str()).collect();

        let mut sql = "UPDATE payment_orders SET status = $next, updatedAt = $now".to_string();
        let mut bindings: Bindings = vec![
            ("order", Value::String(gateway_order_id.to_string())),
            ("next", Value::String(next.as_str().to_string())),
            ("from", serde_json::to_value(from)?),
            ("now", now_value()?),
        ];

        if let Some(payment_id) = gateway_payment_id {
            sql.push_str(", gatewayPaymentId = $payment");
            bindings.push(("payment", Value::String(payment_id.to_string())));
        }
        sql.push_str(" WHERE gatewayOrderId = $order AND status INSIDE $from RETURN AFTER");

        if self.execute(&sql, bindings).await? == 0 {
            return Ok(None);
        }
        self.find_payment_order_by_gateway_id(gateway_order_id).await
    }

    async fn list_payment_orders(&self, user_id: Uuid, offset: u32, limit: u32) -> Result<(Vec<PaymentOrder>, u32)> {
        let sql = format!("SELECT {} FROM payment_orders WHERE userId = $user", RECORD);
        let mut orders: Vec<PaymentOrder> = self.fetch(&sql, vec![("user", uuid_value(user_id))]).await?;

        // createdAt is stored as text; order on the parsed timestamps.
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = orders.len() as u32;
        let page = orders
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert_plan(&self, plan: &SubscriptionPlan) -> Result<()> {
        self.create("plans", plan).await
    }

    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>> {
        self.find_by_id("plans", plan_id).await
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let sql = format!("SELECT {} FROM plans", RECORD);
        let mut plans: Vec<SubscriptionPlan> = self.fetch(&sql, Vec::new()).await?;
        plans.sort_by(|a, b| a.monthly_price.cmp(&b.monthly_price));
        Ok(plans)
    }

    async fn replace_subscription(&self, subscription: &Subscription) -> Result<usize> {
        let existing: Vec<Subscription> = self.list_subscriptions_for_user(subscription.user_id).await?;

        self.db
            .query("
                BEGIN TRANSACTION;
                DELETE subscriptions WHERE userId = $user;
                CREATE subscriptions CONTENT $doc RETURN NONE;
                COMMIT TRANSACTION;
            ")
            .bind(("user", uuid_value(subscription.user_id)))
            .bind(("doc", to_doc(subscription)?))
            .await?
            .check()?;

        if !existing.is_empty() {
            log::info!(
                "Replaced {} subscription(s) of user {}",
                existing.len(),
                subscription.user_id
            );
        }
        Ok(existing.len())
    }

    async fn find_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        let sql = format!("SELECT {} FROM subscriptions WHERE userId = $user", RECORD);
        self.fetch_one(&sql, vec![("user", uuid_value(user_id))]).await
    }

    async fn find_subscription_by_payment_id(&self, payment_id: &str) -> Result<Option<Subscription>> {
        let sql = format!("SELECT {} FROM subscriptions WHERE paymentId = $payment", RECORD);
        self.fetch_one(&sql, vec![("payment", Value::String(payment_id.to_string()))])
            .await
    }

    async fn list_subscriptions_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let sql = format!("SELECT {} FROM subscriptions WHERE userId = $user", RECORD);
        self.fetch(&sql, vec![("user", uuid_value(user_id))]).await
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        let updated = self.execute(
            "UPDATE subscriptions SET status = $status, autoRenew = $auto_renew, updatedAt = $updated_at
             WHERE id = type::thing('subscriptions', $id)
             RETURN AFTER",
            vec![
                ("id", uuid_value(subscription.id)),
                ("status", serde_json::to_value(subscription.status)?),
                ("auto_renew", Value::Bool(subscription.auto_renew)),
                ("updated_at", serde_json::to_value(subscription.updated_at)?),
            ],
        ).await?;

        if updated == 0 {
            return Err(anyhow!("subscription {} not found", subscription.id));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }
}
