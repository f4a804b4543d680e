//! API error handling
//!
//! Every failure leaves the service as `{"errors": [{type, msg, path, location}]}`.
//! Internal details are logged and never echoed to the client.

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::auth::tokens::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_core::CoreError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single error entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error kind, or `field` for input validation failures
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable message
    pub msg: String,
    /// Offending field, empty when not field-specific
    pub path: String,
    /// Where the field was read from (`body`, `query`, `params`)
    pub location: String,
}

impl ErrorDetail {
    pub fn new(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            msg: msg.into(),
            path: String::new(),
            location: String::new(),
        }
    }

    /// A validation failure on one input field
    pub fn field(
        path: impl Into<String>,
        location: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            kind: "field".to_string(),
            msg: msg.into(),
            path: path.into(),
            location: location.into(),
        }
    }
}

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub errors: Vec<ErrorDetail>,
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<ErrorDetail>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::InvalidCredentials
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => "ValidationError",
            AppError::InvalidCredentials | AppError::Unauthorized(_) => "AuthError",
            AppError::Forbidden(_) => "ForbiddenError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Conflict(_) => "ConflictError",
            AppError::Config(_) => "ConfigError",
            AppError::Database(_) => "PersistenceError",
            AppError::Internal(_) => "InternalError",
        }
    }

    pub fn unauthorized() -> Self {
        AppError::Unauthorized("Unauthorized".to_string())
    }

    pub fn forbidden() -> Self {
        AppError::Forbidden("You don't have enough permissions".to_string())
    }

    /// Body of the response, with internal details replaced
    pub fn body(&self) -> ApiError {
        let errors = match self {
            AppError::Validation(details) => details.clone(),
            AppError::Config(_) | AppError::Internal(_) => {
                vec![ErrorDetail::new(self.kind(), "Internal server error")]
            }
            AppError::Database(_) => {
                vec![ErrorDetail::new(self.kind(), "Database operation failed")]
            }
            other => vec![ErrorDetail::new(other.kind(), other.to_string())],
        };
        ApiError { errors }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::Conflict(msg) => AppError::Conflict(msg),
            CoreError::ValidationError(msg) => AppError::BadRequest(msg),
            CoreError::DatabaseError(msg) => AppError::Database(msg),
            CoreError::ConfigError(msg) => AppError::Config(msg),
            CoreError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::EmptyPassword => AppError::Validation(vec![ErrorDetail::field(
                "password",
                "body",
                "Password is required",
            )]),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        if err.is_config_error() {
            AppError::Config(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Jwt(e) => e.into(),
            TokenError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(validation_details(&errors, "body"))
    }
}

/// Flatten `validator` field errors into error entries
///
/// Paths use the camelCase wire name, not the Rust field name.
pub fn validation_details(
    errors: &validator::ValidationErrors,
    location: &str,
) -> Vec<ErrorDetail> {
    let mut details: Vec<ErrorDetail> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}"));
                ErrorDetail::field(camel_case(field), location, msg)
            })
        })
        .collect();

    // HashMap order is unstable
    details.sort_by(|a, b| a.path.cmp(&b.path));
    details
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
        password: String,
        #[validate(length(min = 1, message = "First Name is required"))]
        first_name: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Database("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_shape() {
        let json = serde_json::to_value(AppError::forbidden().body()).unwrap();
        let entry = &json["errors"][0];
        assert_eq!(entry["type"], "ForbiddenError");
        assert_eq!(entry["msg"], "You don't have enough permissions");
        assert_eq!(entry["path"], "");
        assert_eq!(entry["location"], "");
    }

    #[test]
    fn test_internal_details_hidden() {
        let body = AppError::Database("relation \"users\" does not exist".into()).body();
        assert_eq!(body.errors[0].msg, "Database operation failed");

        let body = AppError::Config("PRIVATE_KEY missing".into()).body();
        assert!(!body.errors[0].msg.contains("PRIVATE_KEY"));
    }

    #[test]
    fn test_core_error_conversion() {
        assert!(matches!(
            AppError::from(CoreError::Conflict("Email already exists".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(CoreError::DatabaseError("boom".into())),
            AppError::Database(_)
        ));
    }

    #[test]
    fn test_validation_errors_per_field() {
        let signup = Signup {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            first_name: "Ada".to_string(),
        };
        let err = AppError::from(signup.validate().unwrap_err());

        let AppError::Validation(details) = err else {
            panic!("expected validation error");
        };
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].path, "email");
        assert_eq!(details[0].kind, "field");
        assert_eq!(details[0].location, "body");
        assert_eq!(details[1].msg, "Password must be at least 8 characters long");
    }

    #[test]
    fn test_validation_paths_use_wire_names() {
        let signup = Signup {
            email: "a@b.com".to_string(),
            password: "12345678".to_string(),
            first_name: String::new(),
        };
        let details = validation_details(&signup.validate().unwrap_err(), "body");

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].path, "firstName");
        assert_eq!(details[0].msg, "First Name is required");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("last_name"), "lastName");
        assert_eq!(camel_case("tenant_id"), "tenantId");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = AppError::from(JwtError::MissingKey("PRIVATE_KEY"));
        assert!(matches!(err, AppError::Config(_)));
    }
}
