//! Caller identity for HTTP requests.
//!
//! Authentication lives in front of this service. By the time a request
//! arrives the caller's id is in the `x-user-id` header; an optional
//! `x-correlation-id` links the request to the envelopes it produces.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::domain::foundation::{CommandMetadata, UserId};

use super::error::ErrorResponse;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Extractor that requires a caller id.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: UserId,
    pub correlation_id: String,
}

impl Caller {
    /// Command metadata for a mutation made by this caller.
    pub fn metadata(&self) -> CommandMetadata {
        CommandMetadata::new(self.user_id.clone())
            .with_correlation_id(self.correlation_id.clone())
            .with_source("http")
    }
}

/// Rejection when no usable identity is present.
#[derive(Debug)]
pub enum IdentityRejection {
    Missing,
    Invalid,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let message = match self {
            IdentityRejection::Missing => "Missing x-user-id header",
            IdentityRejection::Invalid => "Invalid x-user-id header",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::unauthenticated(message)),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(IdentityRejection::Missing)?
            .to_str()
            .map_err(|_| IdentityRejection::Invalid)?;
        let user_id = UserId::new(raw.trim()).map_err(|_| IdentityRejection::Invalid)?;

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Caller {
            user_id,
            correlation_id,
        })
    }
}
