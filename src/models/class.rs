use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use validator::Validate;

use crate::models::common::validate_price;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YogaClass {
    pub id: Uuid,
    pub title: String,
    pub instructor: String,
    pub description: Option<String>,
    /// Major currency units.
    pub price: Decimal,
    pub capacity: u32,
    #[serde(default)]
    pub enrolled_students: Vec<Uuid>,
    pub schedule: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a conditional roster update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterChange {
    Enrolled,
    AlreadyEnrolled,
    ClassFull,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    #[validate(length(min = 2, max = 120, message = "Title must be between 2 and 120 characters"))]
    pub title: String,

    #[validate(length(min = 2, max = 100, message = "Instructor must be between 2 and 100 characters"))]
    pub instructor: String,

    pub description: Option<String>,

    #[validate(custom = "validate_price")]
    pub price: Decimal,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: u32,

    pub schedule: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub class_id: Uuid,
    pub enrolled_count: usize,
    pub capacity: u32,
}

impl YogaClass {
    pub fn new(request: CreateClassRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: request.title,
            instructor: request.instructor,
            description: request.description,
            price: request.price,
            capacity: request.capacity,
            enrolled_students: Vec::new(),
            schedule: request.schedule,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_enrolled(&self, user_id: &Uuid) -> bool {
        self.enrolled_students.contains(user_id)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_students.len() >= self.capacity as usize
    }

    /// Price in minor units (paise, cents) as the gateway expects it.
    pub fn amount_minor_units(&self) -> Option<u64> {
        self.price.checked_mul(Decimal::ONE_HUNDRED)?.round().to_u64()
    }

    /// Push-if-absent-and-not-full, evaluated in one step. Stores call this
    /// while holding whatever guarantees atomicity for the document.
    pub fn apply_enrollment(&mut self, user_id: Uuid) -> RosterChange {
        if self.is_enrolled(&user_id) {
            return RosterChange::AlreadyEnrolled;
        }
        if self.is_full() {
            return RosterChange::ClassFull;
        }
        self.enrolled_students.push(user_id);
        self.updated_at = Utc::now();
        RosterChange::Enrolled
    }

    pub fn remove_student(&mut self, user_id: &Uuid) -> bool {
        let before = self.enrolled_students.len();
        self.enrolled_students.retain(|id| id != user_id);
        let removed = self.enrolled_students.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn to_enrollment_response(&self) -> EnrollmentResponse {
        EnrollmentResponse {
            class_id: self.id,
            enrolled_count: self.enrolled_students.len(),
            capacity: self.capacity,
        }
    }
}
