pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use auth::TokenService;
use config::{AuthConfig, GatewayConfig};
use models::common::ApiResponse;
use services::{
    enrollment::EnrollmentService,
    gateway::PaymentGateway,
    orders::OrderService,
    signature::SignatureVerifier,
    store::Store,
    subscription::SubscriptionService,
    users::UserService,
    verification::PaymentVerifier,
};

/// Everything the handlers pull out of app data, built once at start-up.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn Store>,
    tokens: TokenService,
    users: UserService,
    orders: OrderService,
    verifier: PaymentVerifier,
    enrollment: EnrollmentService,
    subscriptions: SubscriptionService,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        gateway_config: &GatewayConfig,
        auth_config: &AuthConfig,
    ) -> Self {
        let tokens = TokenService::new(auth_config);
        Self {
            users: UserService::new(store.clone(), tokens.clone(), auth_config.admin_email.clone()),
            orders: OrderService::new(store.clone(), gateway, gateway_config.currency.clone()),
            verifier: PaymentVerifier::new(store.clone(), SignatureVerifier::from_config(gateway_config)),
            enrollment: EnrollmentService::new(store.clone()),
            subscriptions: SubscriptionService::new(store.clone()),
            tokens,
            store,
        }
    }

    /// Registers app data and every route. Used by the server and by tests.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::new(self.tokens.clone()))
            .app_data(web::Data::new(self.users.clone()))
            .app_data(web::Data::new(self.orders.clone()))
            .app_data(web::Data::new(self.verifier.clone()))
            .app_data(web::Data::new(self.enrollment.clone()))
            .app_data(web::Data::new(self.subscriptions.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .configure(handlers::configure);
    }
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid request body: {}", err);
    let response = HttpResponse::BadRequest().json(ApiResponse::error(message));
    actix_web::error::InternalError::from_response(err, response).into()
}
