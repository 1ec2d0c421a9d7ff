use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::users::model::User;

/// Access-token claims. `school_id` pins the active tenant for the
/// session; it is `None` for global operator sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub school_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub school_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// School to act in. Required when the user belongs to more than one
    /// school and holds no global role.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// One row of the caller's memberships, shown on the profile.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MembershipInfo {
    pub school_id: Option<Uuid>,
    pub school_name: Option<String>,
    pub role_id: Uuid,
    pub role_name: String,
    pub is_active: bool,
    pub is_validated: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: User,
    pub active_school_id: Option<Uuid>,
    pub memberships: Vec<MembershipInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Internal row for credential verification.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}
