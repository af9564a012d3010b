use actix_web::{get, post, HttpResponse};
use actix_web::web::{Data, Json};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::common::ApiResponse;
use crate::models::user::{LoginRequest, RegisterRequest};
use crate::services::users::UserService;

#[post("/register")]
pub async fn register(users: Data<UserService>, payload: Json<RegisterRequest>) -> AppResult<HttpResponse> {
    let response = users.register(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(response, "Registration successful")))
}

#[post("/login")]
pub async fn login(users: Data<UserService>, payload: Json<LoginRequest>) -> AppResult<HttpResponse> {
    let response = users.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

#[get("/me")]
pub async fn me(users: Data<UserService>, caller: AuthUser) -> AppResult<HttpResponse> {
    let profile = users.profile(caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}
