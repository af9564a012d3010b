use actix_web::HttpResponse;
use actix_web::web::Data;
use chrono::Utc;
use serde_json::json;

use crate::services::store::Store;

pub async fn health_check(store: Data<dyn Store>) -> HttpResponse {
    match store.health_check().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "service": "studio-payments"
        })),
        Err(e) => {
            log::error!("health check failed: {:#}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unhealthy",
                "timestamp": Utc::now().to_rfc3339(),
                "service": "studio-payments"
            }))
        }
    }
}
