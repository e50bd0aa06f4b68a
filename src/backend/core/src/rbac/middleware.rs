//! Axum authorization middleware that enforces capabilities on requests.
//!
//! The session layer in front of this service inserts the resolved
//! [`CurrentUser`] into request extensions. Requests without one are rejected
//! with 401 before any handler runs; requests whose role lacks the capability
//! get 403 with "Forbidden: Missing permission <capability>".

use axum::{
    body::Body,
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::models::CurrentUser;
use super::policy::AccessPolicy;
use super::roles::Capability;
use crate::error::StriveError;
use crate::telemetry::{AccessMetrics, DenialReason};

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that wraps services with a capability check.
///
/// # Example
///
/// ```rust,ignore
/// use strive_core::rbac::{AccessPolicy, Capability, RequireCapabilityLayer};
///
/// let app = Router::new()
///     .route("/api/v1/loops/stats", get(loop_stats))
///     .layer(RequireCapabilityLayer::new(policy.clone(), Capability::ViewAnalytics));
/// ```
#[derive(Clone)]
pub struct RequireCapabilityLayer {
    policy: AccessPolicy,
    capability: Capability,
}

impl RequireCapabilityLayer {
    pub fn new(policy: AccessPolicy, capability: Capability) -> Self {
        Self { policy, capability }
    }
}

impl<S> Layer<S> for RequireCapabilityLayer {
    type Service = RequireCapabilityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireCapabilityService {
            inner,
            policy: self.policy.clone(),
            capability: self.capability,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that enforces a required capability per request.
#[derive(Clone)]
pub struct RequireCapabilityService<S> {
    inner: S,
    policy: AccessPolicy,
    capability: Capability,
}

impl<S> Service<Request<Body>> for RequireCapabilityService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let policy = self.policy.clone();
        let capability = self.capability;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let user = match request.extensions().get::<CurrentUser>() {
                Some(user) => user,
                None => {
                    AccessMetrics::denied(DenialReason::Unauthenticated);
                    return Ok(StriveError::not_authenticated().into_response());
                }
            };

            if let Err(denied) = policy.enforce(user, capability) {
                return Ok(denied.into_response());
            }

            inner.call(request).await
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::models::{GlobalRole, SubscriptionTier};
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use tower::ServiceExt;

    async fn status_for(role: Option<GlobalRole>) -> StatusCode {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        });
        let service = RequireCapabilityLayer::new(AccessPolicy::standard(), Capability::ManageSettings)
            .layer(inner);

        let mut request = Request::new(Body::empty());
        if let Some(role) = role {
            request
                .extensions_mut()
                .insert(CurrentUser::new("u1", "u1@example.com", role, SubscriptionTier::Free));
        }

        service.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_capability_is_forbidden() {
        assert_eq!(status_for(Some(GlobalRole::User)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_capability_passes_through() {
        assert_eq!(status_for(Some(GlobalRole::Moderator)).await, StatusCode::OK);
    }
}
