use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub currency: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Registering with this address grants the admin role.
    pub admin_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let key_secret = required("RAZORPAY_KEY_SECRET")?;

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "mem://".to_string()),
                namespace: env::var("DATABASE_NAMESPACE").unwrap_or_else(|_| "studio".to_string()),
                name: env::var("DATABASE_NAME").unwrap_or_else(|_| "payments".to_string()),
            },

            gateway: GatewayConfig {
                api_url: env::var("RAZORPAY_API_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
                key_id: required("RAZORPAY_KEY_ID")?,
                webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")
                    .unwrap_or_else(|_| key_secret.clone()),
                key_secret,
                currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
                timeout: Duration::from_secs(parsed("GATEWAY_TIMEOUT_SECS", 15)?),
            },

            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                token_ttl_hours: parsed("JWT_TTL_HOURS", 168)?,
                admin_email: env::var("ADMIN_EMAIL")
                    .ok()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty()),
            },

            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", 8080)?,
                allowed_origin: env::var("ALLOWED_ORIGIN").ok().filter(|s| !s.is_empty()),
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_falls_back_to_default() {
        assert_eq!(parsed::<u16>("STUDIO_PAYMENTS_TEST_UNSET_PORT", 8080).unwrap(), 8080);
    }

    #[test]
    fn test_parsed_rejects_garbage() {
        env::set_var("STUDIO_PAYMENTS_TEST_BAD_TTL", "forever");
        let err = parsed::<i64>("STUDIO_PAYMENTS_TEST_BAD_TTL", 1).unwrap_err();
        assert!(err.to_string().contains("STUDIO_PAYMENTS_TEST_BAD_TTL"));
    }

    #[test]
    fn test_required_rejects_blank() {
        env::set_var("STUDIO_PAYMENTS_TEST_BLANK", "  ");
        assert!(matches!(
            required("STUDIO_PAYMENTS_TEST_BLANK"),
            Err(ConfigError::Missing("STUDIO_PAYMENTS_TEST_BLANK"))
        ));
    }
}
