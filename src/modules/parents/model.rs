use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::students::model::Student;

/// A parent or guardian record, scoped to one school and linkable to any
/// number of that school's students.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Parent {
    pub id: Uuid,
    pub school_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParentWithStudents {
    #[serde(flatten)]
    pub parent: Parent,
    pub students: Vec<Student>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateParentDto {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50, message = "Phone must not exceed 50 characters"))]
    pub phone: Option<String>,
    /// Target school. Global callers must name one; tenant-scoped callers
    /// may omit it.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateParentDto {
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50, message = "Phone must not exceed 50 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LinkStudentDto {
    pub student_id: Uuid,
    /// Relationship label, e.g. "mother", "guardian"
    #[validate(length(min = 1, max = 50, message = "Relationship must be 1-50 characters"))]
    pub relationship: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParentFilterParams {
    /// Case-insensitive substring match on name or email
    pub search: Option<String>,
    /// School filter (global callers only; tenant callers are pinned)
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: crate::utils::pagination::PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedParentsResponse {
    pub data: Vec<Parent>,
    pub meta: crate::utils::pagination::PaginationMeta,
}
