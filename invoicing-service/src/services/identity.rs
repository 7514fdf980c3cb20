//! Bearer credential verification.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use thiserror::Error;

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingCredential => {
                AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
            }
            IdentityError::InvalidCredential(_) => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a raw `Authorization` value (with or without `Bearer `).
    async fn verify(&self, credential: &str) -> Result<Identity, IdentityError>;
}

/// Strip an optional `Bearer ` prefix; `None` when nothing usable remains.
pub fn extract_token(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Claims carried by access tokens.
///
/// Older tokens name the subject `id`; both spellings are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(alias = "id")]
    pub sub: String,
    pub email: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// HS256 verifier sharing its secret with the token issuer.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &Secret<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<Identity, IdentityError> {
        let token = extract_token(credential).ok_or(IdentityError::MissingCredential)?;

        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                IdentityError::InvalidCredential(e.to_string())
            })?;

        Ok(Identity {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn provider() -> JwtIdentityProvider {
        JwtIdentityProvider::new(&Secret::new(SECRET.to_string()))
    }

    fn token(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn valid_claims() -> serde_json::Value {
        serde_json::json!({
            "sub": "user-1",
            "email": "alice@x",
            "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
        })
    }

    #[test]
    fn extract_token_handles_both_forms() {
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("abc"), Some("abc"));
        assert_eq!(extract_token("Bearer "), None);
        assert_eq!(extract_token("   "), None);
    }

    #[tokio::test]
    async fn accepts_token_with_and_without_bearer_prefix() {
        let jwt = token(&valid_claims(), SECRET);

        let bare = provider().verify(&jwt).await.unwrap();
        let prefixed = provider().verify(&format!("Bearer {}", jwt)).await.unwrap();

        assert_eq!(bare, prefixed);
        assert_eq!(bare.user_id, "user-1");
        assert_eq!(bare.email, "alice@x");
    }

    #[tokio::test]
    async fn accepts_legacy_id_claim() {
        let claims = serde_json::json!({
            "id": "legacy-7",
            "email": "bob@x",
            "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
        });

        let identity = provider().verify(&token(&claims, SECRET)).await.unwrap();
        assert_eq!(identity.user_id, "legacy-7");
    }

    #[tokio::test]
    async fn rejects_wrong_secret_and_expired_tokens() {
        let forged = token(&valid_claims(), "other-secret");
        assert!(matches!(
            provider().verify(&forged).await,
            Err(IdentityError::InvalidCredential(_))
        ));

        let expired = serde_json::json!({
            "sub": "user-1",
            "email": "alice@x",
            "exp": (Utc::now() - Duration::hours(1)).timestamp(),
        });
        assert!(matches!(
            provider().verify(&token(&expired, SECRET)).await,
            Err(IdentityError::InvalidCredential(_))
        ));
    }

    #[tokio::test]
    async fn empty_credential_is_missing() {
        assert!(matches!(
            provider().verify("Bearer ").await,
            Err(IdentityError::MissingCredential)
        ));
    }
}
