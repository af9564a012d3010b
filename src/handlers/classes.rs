use actix_web::{delete, get, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::class::CreateClassRequest;
use crate::models::common::ApiResponse;
use crate::services::enrollment::EnrollmentService;

#[post("")]
pub async fn create_class(
    classes: Data<EnrollmentService>,
    caller: AuthUser,
    payload: Json<CreateClassRequest>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;
    let class = classes.create_class(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(class)))
}

#[get("/{id}")]
pub async fn get_class(classes: Data<EnrollmentService>, path: Path<Uuid>) -> AppResult<HttpResponse> {
    let class = classes.get_class(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(class)))
}

#[post("/{id}/enroll")]
pub async fn enroll(
    classes: Data<EnrollmentService>,
    caller: AuthUser,
    path: Path<Uuid>,
) -> AppResult<HttpResponse> {
    let enrollment = classes.enroll(path.into_inner(), caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(enrollment, "Enrolled successfully")))
}

#[delete("/{id}/enroll")]
pub async fn unenroll(
    classes: Data<EnrollmentService>,
    caller: AuthUser,
    path: Path<Uuid>,
) -> AppResult<HttpResponse> {
    let enrollment = classes.unenroll(path.into_inner(), caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(enrollment, "Unenrolled successfully")))
}
