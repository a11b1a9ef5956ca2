// https://www.twilio.com/docs/verify/api

use std::collections::HashMap;

pub mod models;
use reqwest::{header, Client, StatusCode};

use crate::models::{OTPResponse, OTPVerifyResponse};

const VERIFY_BASE_URL: &str = "https://verify.twilio.com/v2";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
}

/// Failure modes of the Twilio Verify API, split so callers can tell a
/// rejected code apart from a provider outage.
#[derive(Debug, thiserror::Error)]
pub enum TwilioError {
    /// The code was wrong, expired, or no pending verification exists.
    #[error("verification not approved")]
    NotApproved,

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("twilio returned an error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("request to twilio failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Start a verification: Twilio delivers a one-time code to the recipient.
    pub async fn send_otp(&self, recipient: &str) -> Result<OTPResponse, TwilioError> {
        let url = format!(
            "{base}/Services/{serv_id}/Verifications",
            base = VERIFY_BASE_URL,
            serv_id = self.options.service_id
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Channel", channel_for(recipient));

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "twilio rejected verification request");
            return Err(classify_send_failure(status, body));
        }

        Ok(response.json::<OTPResponse>().await?)
    }

    /// Check a code against the pending verification for the recipient.
    pub async fn verify_otp(&self, recipient: &str, code: &str) -> Result<(), TwilioError> {
        let url = format!(
            "{base}/Services/{serv_id}/VerificationCheck",
            base = VERIFY_BASE_URL,
            serv_id = self.options.service_id,
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Code", code);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "twilio rejected verification check");
            return Err(classify_check_failure(status, body));
        }

        let result = response.json::<OTPVerifyResponse>().await?;
        if result.is_approved() {
            Ok(())
        } else {
            Err(TwilioError::NotApproved)
        }
    }
}

// Determine channel based on recipient format (email vs phone)
fn channel_for(recipient: &str) -> &'static str {
    if recipient.contains('@') {
        "email"
    } else {
        "sms"
    }
}

fn classify_send_failure(status: StatusCode, body: String) -> TwilioError {
    match status {
        StatusCode::BAD_REQUEST => TwilioError::InvalidRecipient(body),
        _ => TwilioError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

// Twilio answers 404 when no pending verification matches (expired,
// already approved, or never started).
fn classify_check_failure(status: StatusCode, body: String) -> TwilioError {
    match status {
        StatusCode::NOT_FOUND => TwilioError::NotApproved,
        StatusCode::BAD_REQUEST => TwilioError::InvalidRecipient(body),
        _ => TwilioError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_selection() {
        assert_eq!(channel_for("+15551234567"), "sms");
        assert_eq!(channel_for("user@example.com"), "email");
    }

    #[test]
    fn test_check_not_found_is_not_approved() {
        let err = classify_check_failure(StatusCode::NOT_FOUND, String::new());
        assert!(matches!(err, TwilioError::NotApproved));
    }

    #[test]
    fn test_bad_request_is_invalid_recipient() {
        let err = classify_send_failure(StatusCode::BAD_REQUEST, "bad To".to_string());
        assert!(matches!(err, TwilioError::InvalidRecipient(body) if body == "bad To"));

        let err = classify_check_failure(StatusCode::BAD_REQUEST, String::new());
        assert!(matches!(err, TwilioError::InvalidRecipient(_)));
    }

    #[test]
    fn test_server_errors_are_api_errors() {
        let err = classify_send_failure(StatusCode::SERVICE_UNAVAILABLE, "down".to_string());
        assert!(matches!(err, TwilioError::Api { status: 503, .. }));

        let err = classify_check_failure(StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(err, TwilioError::Api { status: 429, .. }));
    }
}
