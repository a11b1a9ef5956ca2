use thiserror::Error;

/// Credential authority errors
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("err user failed to authenticate")]
    Unauthenticated,

    #[error("err invalid phone number")]
    InvalidPhone,

    #[error("err invalid access token")]
    InvalidToken,

    #[error("err authenticating {phone}: {source}")]
    Gateway {
        phone: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("err signing token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("err verifying token: {0}")]
    Internal(#[source] jsonwebtoken::errors::Error),
}
