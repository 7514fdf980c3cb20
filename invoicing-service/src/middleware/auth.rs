use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use service_core::error::AppError;

use crate::services::{Identity, IdentityError};
use crate::startup::AppState;

/// Caller identity resolved from the `Authorization` header.
///
/// Both `Bearer <token>` and a bare token are accepted.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(IdentityError::MissingCredential)?;

        let identity = state.identity.verify(credential).await?;

        tracing::Span::current().record("user_id", identity.user_id.as_str());

        Ok(AuthUser(identity))
    }
}
