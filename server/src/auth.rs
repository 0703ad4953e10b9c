use axum::{extract::FromRequestParts, http::request::Parts};
use model::OWNER_HEADER;

use crate::error::AppError;

/// Authenticated owner of the request, taken from the header the identity
/// layer installs. The value is trusted as-is; a missing or empty header
/// rejects the request before any store access.
pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}
