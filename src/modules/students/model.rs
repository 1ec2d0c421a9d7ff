use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A student enrolled in one school. The admission number is unique within
/// the school.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub school_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub admission_number: String,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub level: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 50, message = "Admission number must be 1-50 characters"))]
    pub admission_number: String,
    pub date_of_birth: Option<chrono::NaiveDate>,
    /// Grade/level label, e.g. "Grade 5"
    #[validate(length(max = 50, message = "Level must not exceed 50 characters"))]
    pub level: Option<String>,
    /// Target school. Global callers must name one; tenant-scoped callers
    /// may omit it.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    #[validate(length(max = 50, message = "Level must not exceed 50 characters"))]
    pub level: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StudentFilterParams {
    /// Case-insensitive substring match on name or admission number
    pub search: Option<String>,
    pub level: Option<String>,
    pub is_active: Option<bool>,
    /// School filter (global callers only; tenant callers are pinned)
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: crate::utils::pagination::PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: crate::utils::pagination::PaginationMeta,
}
