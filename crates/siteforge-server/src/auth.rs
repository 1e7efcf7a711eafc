//! Request ownership.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the id of the user a request acts for.
pub const OWNER_HEADER: &str = "x-user-id";

/// The user a request acts for, taken from the [`OWNER_HEADER`] header.
///
/// Issuing and checking credentials happens in front of this server; a
/// missing or malformed id is rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub Uuid);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(Owner)
            .ok_or(ApiError::Unauthorized)
    }
}
