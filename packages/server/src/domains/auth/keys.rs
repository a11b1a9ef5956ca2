//! Signing key loading
//!
//! The private key arrives as base64 of a PKCS#8 PEM Ed25519 key (the form
//! `keygen` prints and `SIGNING_KEY` holds). The public half used for
//! verification is derived from the same key and never leaves this module.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey, KeypairBytes};
use ed25519_dalek::SigningKey;
use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;

/// Key material errors. Fatal at startup.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("signing key not set")]
    Missing,

    #[error("signing key is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("signing key is not a UTF-8 PEM document")]
    NotPem,

    #[error("unable to decode Ed25519 private key: {0}")]
    Pkcs8(#[from] ed25519_dalek::pkcs8::Error),

    #[error("unable to build token verification key: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Ed25519 key pair in the forms `jsonwebtoken` signs and verifies with.
pub struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    /// Load from base64-encoded PKCS#8 PEM.
    pub fn from_encoded(encoded: &str) -> Result<Self, KeyError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(KeyError::Missing);
        }

        let pem_bytes = STANDARD.decode(encoded)?;
        let pem = std::str::from_utf8(&pem_bytes).map_err(|_| KeyError::NotPem)?;
        let signing_key = SigningKey::from_pkcs8_pem(pem)?;

        Self::from_signing_key(&signing_key)
    }

    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self, KeyError> {
        // v1 document (no embedded public key) is what ring accepts unconditionally
        let keypair = KeypairBytes {
            secret_key: signing_key.to_bytes(),
            public_key: None,
        };
        let der = keypair.to_pkcs8_der()?;
        let encoding = EncodingKey::from_ed_der(der.as_bytes());

        let x = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().as_bytes());
        let decoding = DecodingKey::from_ed_components(&x)?;

        Ok(Self { encoding, decoding })
    }

    pub(crate) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Encode a signing key the way `SigningKeys::from_encoded` expects it.
pub fn encode_signing_key(signing_key: &SigningKey) -> Result<String, KeyError> {
    let pem = signing_key.to_pkcs8_pem(LineEnding::LF)?;
    Ok(STANDARD.encode(pem.as_bytes()))
}
