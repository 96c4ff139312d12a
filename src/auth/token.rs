use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Error types for credential validation
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("wrong token type: expected access, got {0}")]
    WrongTokenType(String),

    #[error("invalid token subject: {0}")]
    InvalidSubject(String),
}

/// JWT claims issued by the auth subsystem.
/// `sub` is the user id, `type` distinguishes access from refresh tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// Credential-validator seam for the WebSocket handshake. Token issuance and
/// rotation live in the auth subsystem; this side only verifies.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<UserId, AuthError>;
}

/// HS256 JWT validator matching the platform's access-token shape.
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl CredentialValidator for JwtValidator {
    fn validate(&self, token: &str) -> Result<UserId, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })?;

        if data.claims.token_type != "access" {
            return Err(AuthError::WrongTokenType(data.claims.token_type));
        }

        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidSubject(data.claims.sub))
    }
}
