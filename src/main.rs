use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use dotenv::dotenv;

use studio_payments::config::Config;
use studio_payments::services::{database::SurrealStore, gateway::RazorpayGateway};
use studio_payments::AppServices;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = SurrealStore::new(&config.database)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("database: {:#}", e)))?;

    let gateway = RazorpayGateway::new(&config.gateway)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("gateway client: {}", e)))?;

    let services = AppServices::new(Arc::new(store), Arc::new(gateway), &config.gateway, &config.auth);

    let bind_address = (config.server.host.clone(), config.server.port);
    let allowed_origin = config.server.allowed_origin.clone();

    log::info!("Starting studio payments server on {}:{}", bind_address.0, bind_address.1);

    HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials(),
            None => Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header(),
        };

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .configure(|cfg| services.configure(cfg))
    })
    .bind(bind_address)?
    .run()
    .await
}
