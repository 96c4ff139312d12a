pub mod token;

/// Stable identity of an authenticated principal.
pub type UserId = uuid::Uuid;

pub use token::{AuthError, Claims, CredentialValidator, JwtValidator};
