//! Mapping of [`MailroomError`] onto HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mailroom_core::error::{FieldError, MailroomError};
use serde::Serialize;
use tracing::error;

/// JSON error body. `errors` is present only for validation failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug)]
pub struct ApiError(pub MailroomError);

impl From<MailroomError> for ApiError {
    fn from(err: MailroomError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MailroomError::invalid("body", &rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(MailroomError::invalid("query", &rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(MailroomError::invalid("id", &rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MailroomError::Unauthenticated | MailroomError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            MailroomError::Forbidden { .. } => StatusCode::FORBIDDEN,
            MailroomError::Validation { .. } => StatusCode::BAD_REQUEST,
            MailroomError::AlreadyExists { .. } => StatusCode::CONFLICT,
            MailroomError::NotFound { .. } => StatusCode::NOT_FOUND,
            MailroomError::Database(_) | MailroomError::Crypto(_) | MailroomError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.0 {
            MailroomError::Unauthenticated => ErrorBody {
                message: "Authentication required".into(),
                errors: None,
            },
            MailroomError::InvalidCredentials => ErrorBody {
                message: "Invalid credentials".into(),
                errors: None,
            },
            MailroomError::Forbidden { reason } => ErrorBody {
                message: reason,
                errors: None,
            },
            MailroomError::Validation { errors } => ErrorBody {
                message: "Validation failed".into(),
                errors: Some(errors),
            },
            MailroomError::AlreadyExists { entity } => ErrorBody {
                message: format!("{entity} already exists"),
                errors: None,
            },
            MailroomError::NotFound { entity, .. } => ErrorBody {
                message: format!("{entity} not found"),
                errors: None,
            },
            internal => {
                error!(error = %internal, "request failed");
                ErrorBody {
                    message: "Internal server error".into(),
                    errors: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_stable_status_codes() {
        let cases = [
            (MailroomError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (MailroomError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (MailroomError::forbidden("no"), StatusCode::FORBIDDEN),
            (MailroomError::invalid("email", "bad"), StatusCode::BAD_REQUEST),
            (
                MailroomError::AlreadyExists {
                    entity: "user".into(),
                },
                StatusCode::CONFLICT,
            ),
            (MailroomError::not_found("user", "x"), StatusCode::NOT_FOUND),
            (
                MailroomError::Database("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
