//! Caller identification for Axum handlers.
//!
//! There is no authentication: the client simply names itself in the
//! `X-User-Id` header. Handlers decide whether an identifier is required.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bathroom_core::error::CoreError;
use bathroom_core::types::UserId;

use crate::notifications::UNKNOWN_GROUP;

/// Header carrying the caller identifier.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller identifier, if one was supplied.
///
/// Blank or non-UTF-8 header values count as missing. Extraction never
/// fails, so handlers can still notify the `unknown` group when the
/// identifier is required but absent.
#[derive(Debug, Clone, Default)]
pub struct CallerId(pub Option<UserId>);

impl CallerId {
    /// The notification group for this caller.
    pub fn group(&self) -> &str {
        self.0.as_deref().unwrap_or(UNKNOWN_GROUP)
    }

    /// The identifier, or `CoreError::Unauthorized` when absent.
    pub fn require(&self) -> Result<&str, CoreError> {
        self.0.as_deref().ok_or_else(|| {
            CoreError::Unauthorized("No user identifier was provided".to_string())
        })
    }
}

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(CallerId(user_id))
    }
}
