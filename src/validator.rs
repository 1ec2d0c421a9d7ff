use anyhow::anyhow;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::utils::errors::AppError;

/// JSON extractor that runs `validator` rules after deserialization.
/// Malformed bodies map to 400, failed validation rules to 422, both with
/// the uniform error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value.validate().map_err(|errors| {
            AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                anyhow!("{}", collect_messages(&errors)),
            )
        })?;

        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Missing 'Content-Type: application/json' header".to_string()
        }
        JsonRejection::JsonDataError(_) => {
            // Serde's message names the offending field for missing-field
            // errors; surface that instead of a generic complaint.
            let body = rejection.body_text();
            match body.split("missing field `").nth(1).and_then(|s| s.split('`').next()) {
                Some(field) => format!("{} is required", field),
                None => "Invalid field type in request".to_string(),
            }
        }
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
        _ => "Invalid request body".to_string(),
    };

    AppError::new(StatusCode::BAD_REQUEST, anyhow!(message))
}

fn collect_messages(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, serde::Deserialize, Validate)]
    struct Dto {
        #[validate(length(min = 3, message = "Name too short"))]
        name: String,
    }

    #[test]
    fn collects_rule_messages() {
        let dto = Dto {
            name: "ab".to_string(),
        };
        let errors = dto.validate().unwrap_err();
        assert_eq!(collect_messages(&errors), "Name too short");
    }
}
