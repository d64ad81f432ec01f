//! Access token signing settings.
//!
//! - `JWT_SECRET`: HMAC secret (a development placeholder when unset)
//! - `JWT_ACCESS_EXPIRY`: Token lifetime in seconds (default: 3600)

use std::env;

const DEV_SECRET: &str = "rollbook-dev-secret-change-me";
const DEFAULT_ACCESS_EXPIRY: i64 = 3600;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEV_SECRET.to_string());

        let access_token_expiry = lookup("JWT_ACCESS_EXPIRY")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_ACCESS_EXPIRY);

        Self {
            secret,
            access_token_expiry,
        }
    }

    /// True while the placeholder secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}
