//! Custom extractors for API handlers
//!
//! Rejections are `AppError`s so malformed input gets the same error body as
//! every other failure.

use crate::error::{AppError, ErrorDetail};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

/// JSON body that has passed its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e.body_text(), "Rejected JSON body");
            AppError::BadRequest("Invalid JSON body".to_string())
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// UUID `:id` path segment; anything else is a 400
pub struct IdPath(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        Uuid::parse_str(&raw).map(IdPath).map_err(|_| {
            AppError::Validation(vec![ErrorDetail::field("id", "params", "Invalid url param.")])
        })
    }
}

/// `?page=&limit=` for user listing
///
/// Values that do not parse fall back to the defaults instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
}

impl PageQuery {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 6;
    pub const MAX_LIMIT: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(Self::DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l > 0)
            .map(|l| l.min(Self::MAX_LIMIT))
            .unwrap_or(Self::DEFAULT_LIMIT)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Query::<PageQuery>::from_request_parts(parts, state)
            .await
            .map(|Query(query)| query)
            .unwrap_or_default())
    }
}

/// Deserialize a string with surrounding whitespace removed
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn test_page_query_defaults() {
        let q = query(None, None);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 6);
    }

    #[test]
    fn test_page_query_lenient() {
        let q = query(Some("abc"), Some("-3"));
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 6);

        let q = query(Some("0"), Some("0"));
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 6);
    }

    #[test]
    fn test_page_query_values() {
        let q = query(Some("3"), Some("10"));
        assert_eq!(q.page(), 3);
        assert_eq!(q.limit(), 10);

        assert_eq!(query(None, Some("5000")).limit(), 100);
    }

    #[test]
    fn test_trimmed() {
        #[derive(Deserialize)]
        struct Login {
            #[serde(deserialize_with = "trimmed")]
            email: String,
        }

        let login: Login = serde_json::from_str(r#"{"email":"  a@b.com "}"#).unwrap();
        assert_eq!(login.email, "a@b.com");
    }
}
