//! Request extractors.
//!
//! [`RequestAuth`] carries the session user into service calls. [`ApiPath`],
//! [`ApiQuery`] and [`ApiJson`] wrap axum's extractors so a malformed id,
//! query string or body is answered with the JSON error envelope.

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;

use crate::error::{Result, StriveError};
use crate::rbac::CurrentUser;
use crate::tenant::AuthProvider;

/// The user the session layer attached to this request, if any.
///
/// Extraction never fails; an anonymous request is rejected later by the
/// operation that needs a user.
#[derive(Debug, Clone, Default)]
pub struct RequestAuth(Option<CurrentUser>);

impl RequestAuth {
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self(user)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

#[async_trait]
impl AuthProvider for RequestAuth {
    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        Ok(self.0.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Validating extractors
// ═══════════════════════════════════════════════════════════════════════════════

/// Path parameters; a value that does not parse is a validation error.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = StriveError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| StriveError::validation(format!("Invalid path parameter: {}", e.body_text())))?;
        Ok(Self(value))
    }
}

/// Query-string parameters.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = StriveError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| StriveError::validation(format!("Invalid query parameters: {}", e.body_text())))?;
        Ok(Self(value))
    }
}

/// A JSON request body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = StriveError;

    async fn from_request(request: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|e| StriveError::validation(format!("Invalid request body: {}", e.body_text())))?;
        Ok(Self(value))
    }
}
