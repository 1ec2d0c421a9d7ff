use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::modules::auth::model::Claims;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::verify_token;

/// Extractor that validates the bearer JWT and exposes the caller's claims.
///
/// This is the authentication step only. The caller's role within the
/// active school is resolved separately by the tenant middleware and
/// checked by the permissions guard.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    /// The active school for this session, `None` for global operators.
    pub fn school_id(&self) -> Option<Uuid> {
        self.0.school_id
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(school_id: Option<Uuid>) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            school_id,
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn user_id_parses_subject() {
        let c = claims(None);
        let expected = Uuid::parse_str(&c.sub).unwrap();
        assert_eq!(AuthUser(c).user_id().unwrap(), expected);
    }

    #[test]
    fn user_id_rejects_malformed_subject() {
        let mut c = claims(None);
        c.sub = "not-a-uuid".to_string();
        assert!(AuthUser(c).user_id().is_err());
    }

    #[test]
    fn school_id_passthrough() {
        let school = Uuid::new_v4();
        assert_eq!(AuthUser(claims(Some(school))).school_id(), Some(school));
        assert_eq!(AuthUser(claims(None)).school_id(), None);
    }
}
