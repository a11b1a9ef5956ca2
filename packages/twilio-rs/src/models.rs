use serde::{Deserialize, Serialize};

/// Response body of `POST /Services/{sid}/Verifications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OTPResponse {
    pub sid: String,
    pub status: String,
    pub to: String,
    pub channel: String,
    #[serde(default)]
    pub valid: bool,
}

/// Response body of `POST /Services/{sid}/VerificationCheck`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OTPVerifyResponse {
    pub status: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub to: Option<String>,
}

impl OTPVerifyResponse {
    pub fn is_approved(&self) -> bool {
        self.status == "approved"
    }
}
