use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use crate::session::AuthSession;

/// Add this as a parameter to a handler function to require the request to carry an
/// `AuthSession` attached by the authn connector. Mirrors the teacher's `AuthUser`/
/// `MaybeAuthUser` extractor pair, generalized to this crate's pluggable schemes.
///
/// If the connector admitted the request without authenticating (an unprotected URL), this
/// extractor rejects with `401` - use `Option<CurrentUser>` if the handler wants to allow
/// anonymous access and still check whether an identity is present.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthSession);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .map(CurrentUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Like [`CurrentUser`] but never rejects: `None` when the request was admitted anonymously.
#[derive(Debug, Clone)]
pub struct MaybeCurrentUser(pub Option<AuthSession>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeCurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeCurrentUser(
            parts.extensions.get::<AuthSession>().cloned(),
        ))
    }
}
