use anyhow::{ensure, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Longest token lifetime accepted from `TOKEN_TTL_HOURS` (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Base64 of a PKCS#8 PEM Ed25519 private key
    pub signing_key: String,
    pub port: u16,
    pub token_issuer: String,
    pub token_ttl_hours: i64,
    pub request_timeout_secs: u64,
    pub private_api_key: Option<String>,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_verify_service_sid: String,
    pub test_identifier_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            signing_key: env::var("SIGNING_KEY").context("SIGNING_KEY must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            token_issuer: env::var("TOKEN_ISSUER")
                .unwrap_or_else(|_| "authorization-service".to_string()),
            token_ttl_hours: parse_ttl_hours(
                &env::var("TOKEN_TTL_HOURS").unwrap_or_else(|_| "24".to_string()),
            )?,
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a valid number")?,
            private_api_key: env::var("PRIVATE_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID")
                .context("TWILIO_ACCOUNT_SID must be set")?,
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN")
                .context("TWILIO_AUTH_TOKEN must be set")?,
            twilio_verify_service_sid: env::var("TWILIO_VERIFY_SERVICE_SID")
                .context("TWILIO_VERIFY_SERVICE_SID must be set")?,
            test_identifier_enabled: env::var("TEST_IDENTIFIER_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_ttl_hours(value: &str) -> Result<i64> {
    let hours: i64 = value
        .trim()
        .parse()
        .context("TOKEN_TTL_HOURS must be a valid number")?;
    ensure!(
        (1..=MAX_TOKEN_TTL_HOURS).contains(&hours),
        "TOKEN_TTL_HOURS must be between 1 and {}, got {}",
        MAX_TOKEN_TTL_HOURS,
        hours
    );
    Ok(hours)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_ttl_hours_in_range() {
        assert_eq!(parse_ttl_hours("24").unwrap(), 24);
        assert_eq!(parse_ttl_hours(" 1 ").unwrap(), 1);
        assert_eq!(parse_ttl_hours("8760").unwrap(), MAX_TOKEN_TTL_HOURS);
    }

    #[test]
    fn test_ttl_hours_out_of_range_is_fatal() {
        for value in ["0", "-5", "8761", "10000000000", "abc", ""] {
            assert!(parse_ttl_hours(value).is_err(), "{:?} should be rejected", value);
        }
    }
}
