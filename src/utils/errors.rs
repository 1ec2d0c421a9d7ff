use anyhow::{Error, anyhow};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type carrying an HTTP status and the underlying
/// error chain. Handlers and services return this from every fallible path.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow!(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow!(msg.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error.to_string()
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

/// Authorization failures raised by the permission check.
///
/// Both variants are terminal for the current request and surface as HTTP
/// 403. The response bodies carry fixed messages that distinguish the two
/// reasons without naming the permissions involved; the full required and
/// granted sets go to the server log instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No role-in-school assignment was attached to the request. After a
    /// successful authentication step this indicates a pipeline-ordering
    /// defect rather than a caller mistake.
    #[error("caller identity unresolved")]
    IdentityUnresolved,
    /// The role's granted permission set does not cover the required set.
    #[error("insufficient permissions")]
    InsufficientPermissions,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (StatusCode::FORBIDDEN, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authz_error_messages_are_fixed() {
        assert_eq!(
            AuthzError::IdentityUnresolved.to_string(),
            "caller identity unresolved"
        );
        assert_eq!(
            AuthzError::InsufficientPermissions.to_string(),
            "insufficient permissions"
        );
    }

    #[test]
    fn app_error_constructors_set_status() {
        assert_eq!(
            AppError::bad_request(anyhow!("bad")).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::not_found(anyhow!("missing")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::forbidden("nope").status, StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::unauthorized("who").status,
            StatusCode::UNAUTHORIZED
        );
    }
}
