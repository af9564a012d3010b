use actix_web::{get, post, HttpResponse};
use actix_web::web::{Data, Json};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::common::ApiResponse;
use crate::models::subscription::{CreatePlanRequest, CreateSubscriptionOrderRequest, SubscriptionStatusResponse};
use crate::services::orders::OrderService;
use crate::services::subscription::SubscriptionService;

#[get("/plans")]
pub async fn list_plans(subscriptions: Data<SubscriptionService>) -> AppResult<HttpResponse> {
    let plans = subscriptions.list_plans().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(plans)))
}

#[post("/plans")]
pub async fn create_plan(
    subscriptions: Data<SubscriptionService>,
    caller: AuthUser,
    payload: Json<CreatePlanRequest>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;
    let plan = subscriptions.create_plan(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(plan)))
}

#[post("/create-subscription-order")]
pub async fn create_subscription_order(
    orders: Data<OrderService>,
    caller: AuthUser,
    payload: Json<CreateSubscriptionOrderRequest>,
) -> AppResult<HttpResponse> {
    let order = orders
        .create_subscription_order(payload.plan_id, payload.billing_cycle, caller.id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
}

#[get("/current")]
pub async fn current_subscription(
    subscriptions: Data<SubscriptionService>,
    caller: AuthUser,
) -> AppResult<HttpResponse> {
    let subscription = subscriptions.current_subscription(caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SubscriptionStatusResponse::from(&subscription))))
}

#[post("/cancel")]
pub async fn cancel_subscription(
    subscriptions: Data<SubscriptionService>,
    caller: AuthUser,
) -> AppResult<HttpResponse> {
    let subscription = subscriptions.cancel_subscription(caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        SubscriptionStatusResponse::from(&subscription),
        "Subscription cancelled",
    )))
}
