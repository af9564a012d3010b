use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::class::{CreateClassRequest, EnrollmentResponse, RosterChange, YogaClass};
use crate::services::store::Store;

/// Class rosters. Every change goes through the store's conditional update,
/// so a user appears at most once and a class never exceeds its capacity.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn Store>,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_class(&self, request: CreateClassRequest) -> AppResult<YogaClass> {
        request.validate()?;
        let class = YogaClass::new(request);
        self.store.insert_class(&class).await?;
        log::info!("Class {} created with capacity {}", class.id, class.capacity);
        Ok(class)
    }

    pub async fn get_class(&self, class_id: Uuid) -> AppResult<YogaClass> {
        self.store
            .find_class(class_id)
            .await?
            .ok_or_else(|| AppError::not_found("Class"))
    }

    /// Strict enrollment for a direct request: duplicates and full classes
    /// are errors.
    pub async fn enroll(&self, class_id: Uuid, user_id: Uuid) -> AppResult<EnrollmentResponse> {
        let (change, class) = self.apply(class_id, user_id).await?;
        match change {
            RosterChange::Enrolled => Ok(class.to_enrollment_response()),
            RosterChange::AlreadyEnrolled => Err(AppError::Validation("Already enrolled".to_string())),
            RosterChange::ClassFull => Err(AppError::Validation("Class is full".to_string())),
        }
    }

    pub async fn unenroll(&self, class_id: Uuid, user_id: Uuid) -> AppResult<EnrollmentResponse> {
        let (removed, class) = self.store
            .unenroll_student(class_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Class"))?;

        if !removed {
            return Err(AppError::Validation("Not enrolled in this class".to_string()));
        }
        log::info!("User {} left class {}", user_id, class_id);
        Ok(class.to_enrollment_response())
    }

    /// Idempotent add used once a payment is confirmed. The caller decides
    /// what a full class means for its path.
    pub async fn ensure_enrolled(&self, class_id: Uuid, user_id: Uuid) -> AppResult<RosterChange> {
        let (change, _) = self.apply(class_id, user_id).await?;
        if change == RosterChange::AlreadyEnrolled {
            log::warn!("User {} already on roster of class {}", user_id, class_id);
        }
        Ok(change)
    }

    async fn apply(&self, class_id: Uuid, user_id: Uuid) -> AppResult<(RosterChange, YogaClass)> {
        let (change, class) = self.store
            .enroll_student(class_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Class"))?;

        if change == RosterChange::Enrolled {
            log::info!(
                "User {} enrolled in class {} ({}/{})",
                user_id,
                class_id,
                class.enrolled_students.len(),
                class.capacity
            );
        }
        Ok((change, class))
    }
}
