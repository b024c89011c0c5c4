// Viewer extractor - identifies the acting user of a request

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Who is making the request. Authentication happens upstream; the user id
/// header is trusted as given and is only used for attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub user_id: Option<i64>,
    pub request_id: String,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::anonymous()
        }
    }

    fn from_parts(parts: &Parts) -> Result<Self, AppError> {
        let user_id = match parts.headers.get(USER_ID_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AppError::BadRequest("Invalid X-User-Id header".to_string()))?;
                Some(raw.trim().parse::<i64>().map_err(|_| {
                    AppError::BadRequest(format!("Invalid X-User-Id header: {}", raw))
                })?)
            }
            None => None,
        };

        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Self { user_id, request_id })
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let viewer = Viewer::from_parts(parts);
        async move { viewer }
    }
}
