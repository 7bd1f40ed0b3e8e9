//! Authenticated tenant extractor.
//!
//! Identity is established upstream (session or gateway); this service only
//! trusts the `X-Tenant-Id` header the upstream sets.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::TenantId;
use crate::error::AnalyticsError;

/// Header carrying the authenticated tenant key.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// The tenant a request acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedTenant(pub TenantId);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedTenant {
    type Rejection = AnalyticsError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or(AnalyticsError::Unauthenticated)?;
        Ok(Self(TenantId::new(tenant)))
    }
}
