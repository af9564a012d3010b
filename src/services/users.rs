use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, TokenService};
use crate::error::{AppError, AppResult};
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, Role, User, UserResponse};
use crate::services::store::Store;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    admin_email: Option<String>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, admin_email: Option<String>) -> Self {
        Self { store, tokens, admin_email }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let password_hash = hash_password(&request.password)?;
        let mut user = User::new(request.name.trim().to_string(), request.email, password_hash, Role::User);
        if self.admin_email.as_deref() == Some(user.email.as_str()) {
            user.role = Role::Admin;
        }

        if !self.store.insert_user(&user).await? {
            return Err(AppError::Validation("Email already registered".to_string()));
        }
        log::info!("User {} registered", user.id);

        Ok(AuthResponse {
            token: self.tokens.issue(&user)?,
            user: user.to_response(),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
        let user = self.store
            .find_user_by_email(&request.email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        Ok(AuthResponse {
            token: self.tokens.issue(&user)?,
            user: user.to_response(),
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserResponse> {
        self.store
            .find_user(user_id)
            .await?
            .map(|user| user.to_response())
            .ok_or_else(|| AppError::not_found("User"))
    }
}
