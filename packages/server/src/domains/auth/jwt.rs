use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Result, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};

use super::keys::SigningKeys;
use crate::common::{TokenId, UserId};

/// The only algorithm tokens are signed with or accepted under.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::EdDSA;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub iat: i64,    // Issued at timestamp
    pub exp: i64,    // Expiration timestamp
    pub iss: String, // Issuer
    pub jti: String, // JWT ID (unique token identifier)
}

/// Token signer - creates and verifies EdDSA-signed JWTs
pub struct TokenSigner {
    keys: SigningKeys,
    issuer: String,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(keys: SigningKeys, issuer: String, ttl: Duration) -> Self {
        Self { keys, issuer, ttl }
    }

    /// Create a new token whose subject is the given user.
    pub fn create_token(&self, subject: UserId) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.ttl;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            jti: TokenId::new().to_string(),
        };

        encode(&Header::new(TOKEN_ALGORITHM), &claims, self.keys.encoding())
    }

    /// Verify and decode a token.
    ///
    /// The accepted algorithm list is pinned to EdDSA, so a token whose header
    /// names any other algorithm (HS256 signed with the public key, `none`,
    /// RS256, ...) is refused before the key is used.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, self.keys.decoding(), &self.validation()).map(|data| data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}
