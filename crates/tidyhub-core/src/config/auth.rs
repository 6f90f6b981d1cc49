//! Bearer token verification configuration.
//!
//! Tokens are issued by the external auth provider; TidyHub only verifies
//! them.

use serde::{Deserialize, Serialize};

/// Access token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC-SHA256 secret used by the auth provider to sign tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Expected `iss` claim, if any.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected `aud` claim, if any.
    #[serde(default)]
    pub audience: Option<String>,
    /// Allowed clock skew in seconds when checking `exp`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: None,
            audience: None,
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_leeway() -> u64 {
    30
}
