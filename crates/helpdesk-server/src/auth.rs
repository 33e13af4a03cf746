//! Request authentication

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use helpdesk_core::{Error, Identity};

use crate::{ApiError, AppState};

/// Header carrying the caller's token
pub const AUTH_HEADER: &str = "x-auth-token";

/// Identity of the caller, resolved from the `x-auth-token` header
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Unauthorized("no token, authorization denied".to_string()))?;

        let identity = state.service.authenticator().authenticate(token).await?;
        Ok(Self(identity))
    }
}
