pub mod classes;
pub mod health;
pub mod payments;
pub mod subscriptions;
pub mod users;

use actix_web::web;

/// Mounts every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/users")
                    .service(users::register)
                    .service(users::login)
                    .service(users::me),
            )
            .service(
                web::scope("/payments")
                    .service(payments::create_order)
                    .service(payments::verify_payment)
                    .service(payments::webhook)
                    // before /{id} so "history" is not taken for an id
                    .service(payments::payment_history)
                    .service(payments::get_payment)
                    .service(payments::refund_payment),
            )
            .service(
                web::scope("/subscriptions")
                    .service(subscriptions::list_plans)
                    .service(subscriptions::create_plan)
                    .service(subscriptions::create_subscription_order)
                    .service(subscriptions::current_subscription)
                    .service(subscriptions::cancel_subscription),
            )
            .service(
                web::scope("/classes")
                    .service(classes::create_class)
                    .service(classes::get_class)
                    .service(classes::enroll)
                    .service(classes::unenroll),
            )
            .route("/health", web::get().to(health::health_check)),
    );
}
