use crate::feed::FeedConfig;

/// Error types for startup configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET_KEY is not set")]
    MissingJwtSecret,

    #[error("JWT_SECRET_KEY must be at least 32 characters long (got {0})")]
    JwtSecretTooShort(usize),

    #[error("JWT_SECRET_KEY cannot use a default/example value")]
    JwtSecretInsecure,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: String,
    /// Secret used to verify access tokens on the WebSocket handshake
    pub jwt_secret: String,
    /// News feed (AMQP) settings
    pub feed: FeedConfig,
    /// Subscribe to the feed at startup rather than waiting for the control API
    pub feed_auto_start: bool,
}

impl AppConfig {
    /// Read configuration from the environment. The JWT secret is the only
    /// required value; everything else has workable development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            std::env::var("JWT_SECRET_KEY").map_err(|_| ConfigError::MissingJwtSecret)?;
        validate_jwt_secret(&jwt_secret)?;

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            jwt_secret,
            feed: FeedConfig::from_env(),
            feed_auto_start: std::env::var("FEED_AUTO_START")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        })
    }
}

/// Reject placeholder secrets that ship in example env files, and anything
/// too short to be a real key.
fn validate_jwt_secret(secret: &str) -> Result<(), ConfigError> {
    const INSECURE_DEFAULTS: [&str; 4] = [
        "your-super-secret-jwt-key-change-in-production",
        "change-me",
        "secret",
        "jwt-secret",
    ];

    if INSECURE_DEFAULTS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(secret))
    {
        return Err(ConfigError::JwtSecretInsecure);
    }
    if secret.len() < 32 {
        return Err(ConfigError::JwtSecretTooShort(secret.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_long_random_secret() {
        assert!(validate_jwt_secret("0123456789abcdef0123456789abcdef").is_ok());
    }

    #[test]
    fn test_rejects_short_secret() {
        assert!(matches!(
            validate_jwt_secret("too-short"),
            Err(ConfigError::JwtSecretTooShort(9))
        ));
    }

    #[test]
    fn test_rejects_placeholder_secrets() {
        assert!(matches!(
            validate_jwt_secret("your-super-secret-jwt-key-change-in-production"),
            Err(ConfigError::JwtSecretInsecure)
        ));
        // case-insensitive, and the placeholder check runs before the length check
        assert!(matches!(
            validate_jwt_secret("SECRET"),
            Err(ConfigError::JwtSecretInsecure)
        ));
    }
}
