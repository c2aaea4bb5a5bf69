//! Request extractors

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use pixgate_core::AppError;
use serde::Deserialize;

use crate::constants::SHOP_DOMAIN_HEADER;
use crate::error::HttpAppError;

#[derive(Debug, Deserialize)]
struct ShopQuery {
    shop: Option<String>,
}

/// Resolve the tenant of a request: the shop domain header first, then `?shop=`.
pub fn resolve_tenant(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(SHOP_DOMAIN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    from_header.or_else(|| {
        let Query(query) = Query::<ShopQuery>::try_from_uri(uri).ok()?;
        query.shop.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    })
}

/// Tenant the request acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: String,
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_tenant(&parts.headers, &parts.uri)
            .map(|tenant_id| TenantContext { tenant_id })
            .ok_or_else(|| HttpAppError(AppError::MissingTenant))
    }
}
