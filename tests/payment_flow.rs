mod support;

use actix_web::{http::StatusCode, test, App};
use serde_json::{json, Value};

use studio_payments::services::store::Store;
use support::{bearer, captured_webhook, context, uuid_of};

#[actix_rt::test]
async fn test_class_purchase_end_to_end() {
    let ctx = context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.services.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/classes")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({
            "title": "Sunrise Vinyasa",
            "instructor": "Asha",
            "price": 500,
            "capacity": 2
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let class_id = uuid_of(&body["data"]["id"]);

    let req = test::TestRequest::post()
        .uri("/api/payments/create-order")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "classId": class_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["amount"], 50_000);
    assert_eq!(ctx.gateway.orders.lock().unwrap()[0].amount, 50_000);
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();

    let good = ctx.signatures.payment_signature(&order_id, "pay_001");
    let tampered = format!("{}{}", &good[..good.len() - 1], if good.ends_with('a') { "b" } else { "a" });

    let req = test::TestRequest::post()
        .uri("/api/payments/verify")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_001",
            "razorpay_signature": tampered,
            "classId": class_id
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid payment signature");

    let class = ctx.store.find_class(class_id).await.unwrap().unwrap();
    assert!(class.enrolled_students.is_empty());

    let req = test::TestRequest::post()
        .uri("/api/payments/verify")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_001",
            "razorpay_signature": good,
            "classId": class_id
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["newlyEnrolled"], true);
    assert_eq!(body["data"]["paymentStatus"], "completed");

    let req = test::TestRequest::get().uri(&format!("/api/classes/{}", class_id)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["enrolledStudents"], json!([ctx.user.id]));

    let req = test::TestRequest::get()
        .uri("/api/payments/history?page=1&limit=10")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["data"][0]["status"], "completed");
}

#[actix_rt::test]
async fn test_duplicate_captured_webhook_is_applied_once() {
    let ctx = context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.services.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/classes")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({ "title": "Yin Flow", "instructor": "Meera", "price": 300, "capacity": 5 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let class_id = uuid_of(&body["data"]["id"]);

    let req = test::TestRequest::post()
        .uri("/api/payments/create-order")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "classId": class_id }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();
    let payment_id = uuid_of(&body["data"]["paymentId"]);

    let payload = captured_webhook(&order_id, "pay_wh_1");
    let signature = ctx.signatures.webhook_signature(&payload);

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/payments/webhook")
            .insert_header(("x-razorpay-signature", signature.clone()))
            .insert_header(("content-type", "application/json"))
            .set_payload(payload.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        outcomes.push(body["data"].clone());
    }
    assert_eq!(outcomes, vec![json!("completed"), json!("already_completed")]);

    let order = ctx.store.find_payment_order(payment_id).await.unwrap().unwrap();
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_wh_1"));
    let class = ctx.store.find_class(class_id).await.unwrap().unwrap();
    assert_eq!(class.enrolled_students, vec![ctx.user.id]);
}

#[actix_rt::test]
async fn test_webhook_with_bad_signature_is_rejected() {
    let ctx = context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.services.configure(cfg))).await;
    let payload = captured_webhook("order_test0", "pay_1");

    let req = test::TestRequest::post()
        .uri("/api/payments/webhook")
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header(("x-razorpay-signature", "00".repeat(32)))
        .set_payload(payload)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["error"], "Invalid webhook signature");
}

#[actix_rt::test]
async fn test_authentication_and_roles_are_enforced() {
    let ctx = context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.services.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/payments/create-order")
        .set_json(json!({ "classId": uuid::Uuid::new_v4() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/classes")
        .insert_header(bearer(&ctx.user_token))
        .set_json(json!({ "title": "Hatha", "instructor": "Ravi", "price": 200, "capacity": 3 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/payments/{}/refund", uuid::Uuid::new_v4()))
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/classes/{}", uuid::Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_second_subscription_order_replaces_the_first() {
    let ctx = context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.services.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/subscriptions/plans")
        .insert_header(bearer(&ctx.admin_token))
        .set_json(json!({ "name": "Unlimited", "monthlyPrice": 999, "yearlyPrice": 9999 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let plan_id = uuid_of(&body["data"]["id"]);

    for cycle in ["monthly", "yearly"] {
        let req = test::TestRequest::post()
            .uri("/api/subscriptions/create-subscription-order")
            .insert_header(bearer(&ctx.user_token))
            .set_json(json!({ "planId": plan_id, "billingCycle": cycle }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let subscriptions = ctx.store.list_subscriptions_for_user(ctx.user.id).await.unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].amount, 999_900);

    let req = test::TestRequest::get()
        .uri("/api/subscriptions/current")
        .insert_header(bearer(&ctx.user_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["billingCycle"], "yearly");
    assert_eq!(body["data"]["status"], "active");
}

#[actix_rt::test]
async fn test_health_reports_store_status() {
    let ctx = context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.services.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}
