use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::constants::VIEWER_ID_HEADER;
use crate::error::AppError;

/// The authenticated viewer, if any.
///
/// A missing or malformed viewer header is treated as anonymous.
#[derive(Debug, Clone, Copy)]
pub struct MaybeViewer(pub Option<i64>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeViewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(viewer_id(parts)))
    }
}

/// The authenticated viewer. Rejects with 401 when absent.
#[derive(Debug, Clone, Copy)]
pub struct RequireViewer(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RequireViewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        viewer_id(parts)
            .map(Self)
            .ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}

fn viewer_id(parts: &Parts) -> Option<i64> {
    parts
        .headers
        .get(VIEWER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}
