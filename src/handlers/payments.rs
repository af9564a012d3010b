use actix_web::{get, post, HttpRequest, HttpResponse};
use actix_web::web::{Data, Json, Path, Query};
use bytes::Bytes;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::common::{ApiResponse, PaginationQuery};
use crate::models::payment::{CreateClassOrderRequest, VerifyPaymentRequest};
use crate::services::orders::OrderService;
use crate::services::verification::PaymentVerifier;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

// POST /create-order
#[post("/create-order")]
pub async fn create_order(
    orders: Data<OrderService>,
    caller: AuthUser,
    payload: Json<CreateClassOrderRequest>,
) -> AppResult<HttpResponse> {
    let order = orders.create_class_order(payload.class_id, caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
}

// POST /verify
#[post("/verify")]
pub async fn verify_payment(
    verifier: Data<PaymentVerifier>,
    caller: AuthUser,
    payload: Json<VerifyPaymentRequest>,
) -> AppResult<HttpResponse> {
    let result = verifier.verify_class_payment(payload.into_inner(), &caller).await?;
    let message = if result.newly_enrolled {
        "Payment verified and enrolled successfully"
    } else {
        "Payment verified, already enrolled"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(result, message)))
}

// POST /webhook, authenticated by the gateway signature only
#[post("/webhook")]
pub async fn webhook(
    verifier: Data<PaymentVerifier>,
    req: HttpRequest,
    body: Bytes,
) -> AppResult<HttpResponse> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = verifier.handle_webhook(&body, signature).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

// GET /history?page=&limit=
#[get("/history")]
pub async fn payment_history(
    orders: Data<OrderService>,
    caller: AuthUser,
    query: Query<PaginationQuery>,
) -> AppResult<HttpResponse> {
    let page = orders.payment_history(caller.id, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

// GET /{id}
#[get("/{id}")]
pub async fn get_payment(
    orders: Data<OrderService>,
    caller: AuthUser,
    path: Path<Uuid>,
) -> AppResult<HttpResponse> {
    let order = orders.get_payment(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
}

// POST /{id}/refund
#[post("/{id}/refund")]
pub async fn refund_payment(
    orders: Data<OrderService>,
    caller: AuthUser,
    path: Path<Uuid>,
) -> AppResult<HttpResponse> {
    let order = orders.refund(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(order, "Payment refunded")))
}
