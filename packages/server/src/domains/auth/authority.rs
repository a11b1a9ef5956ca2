//! Credential authority
//!
//! Sole owner of the signing keys. Couples the verification gateway to token
//! issuance and verifies presented tokens.
//!
//! `sign_in` never persists anything: the HTTP handler upserts the identity
//! only after a token has been minted, so a stored record always corresponds
//! to a completed authentication.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use tracing::{debug, info, warn};

use super::errors::CredentialError;
use super::jwt::TokenSigner;
use crate::common::UserId;
use crate::domains::identity::Identity;
use crate::kernel::{BaseVerificationGateway, GatewayError};

/// Resolves a bearer token to its subject. Implemented by the authority;
/// the access gate depends only on this.
pub trait TokenParser: Send + Sync {
    fn parse_token(&self, token: &str) -> Result<UserId, CredentialError>;
}

pub struct CredentialAuthority {
    gateway: Arc<dyn BaseVerificationGateway>,
    signer: TokenSigner,
}

impl CredentialAuthority {
    pub fn new(gateway: Arc<dyn BaseVerificationGateway>, signer: TokenSigner) -> Self {
        Self { gateway, signer }
    }

    /// Trigger the out-of-band challenge for the identity's phone.
    ///
    /// Calling again re-triggers the challenge.
    pub async fn start_authentication(&self, identity: &Identity) -> Result<(), CredentialError> {
        match self.gateway.verify(&identity.phone).await {
            Ok(()) => {
                debug!(phone = %identity.phone, "verification challenge triggered");
                Ok(())
            }
            Err(GatewayError::InvalidPhone) => Err(CredentialError::InvalidPhone),
            // Not meaningful before a code exists; report as provider failure
            Err(GatewayError::Unauthenticated) => Err(CredentialError::Gateway {
                phone: identity.phone.to_string(),
                source: anyhow::anyhow!("provider refused to start verification"),
            }),
            Err(GatewayError::Provider(source)) => Err(CredentialError::Gateway {
                phone: identity.phone.to_string(),
                source,
            }),
        }
    }

    /// Confirm the challenge and mint a token whose subject is `identity.id`.
    pub async fn sign_in(&self, identity: &Identity, code: &str) -> Result<String, CredentialError> {
        match self.gateway.authenticate(&identity.phone, code).await {
            Ok(()) => {}
            Err(GatewayError::Unauthenticated) => {
                info!(phone = %identity.phone, "verification code rejected");
                return Err(CredentialError::Unauthenticated);
            }
            Err(GatewayError::InvalidPhone) => return Err(CredentialError::InvalidPhone),
            Err(GatewayError::Provider(source)) => {
                let err = CredentialError::Gateway {
                    phone: identity.phone.to_string(),
                    source,
                };
                warn!("{}", err);
                return Err(err);
            }
        }

        let token = self.issue_token(identity.id)?;
        info!(user_id = %identity.id, "token issued");
        Ok(token)
    }

    /// Mint a token for a subject without a verification round trip.
    pub fn issue_token(&self, subject: UserId) -> Result<String, CredentialError> {
        self.signer
            .create_token(subject)
            .map_err(CredentialError::Signing)
    }
}

impl TokenParser for CredentialAuthority {
    fn parse_token(&self, token: &str) -> Result<UserId, CredentialError> {
        let claims = self.signer.verify_token(token).map_err(|e| match e.kind() {
            ErrorKind::InvalidKeyFormat | ErrorKind::Crypto(_) => CredentialError::Internal(e),
            _ => {
                debug!(error = %e, "token rejected");
                CredentialError::InvalidToken
            }
        })?;

        UserId::parse(&claims.sub).map_err(|_| {
            debug!(sub = %claims.sub, "token subject is not a user id");
            CredentialError::InvalidToken
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PhoneNumber;
    use crate::domains::auth::jwt::{Claims, TOKEN_ALGORITHM};
    use crate::kernel::test_dependencies::{test_authority, StubGateway};
    use chrono::Utc;
    use ed25519_dalek::SigningKey;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    fn identity() -> Identity {
        Identity::new(PhoneNumber::parse("+15551234").unwrap())
    }

    fn claims_for(subject: &str, issuer: &str, exp: i64) -> Claims {
        Claims {
            sub: subject.to_string(),
            iat: Utc::now().timestamp(),
            exp,
            iss: issuer.to_string(),
            jti: "test".to_string(),
        }
    }

    fn sign_with_seed(seed: u8, claims: &Claims) -> String {
        let keys = crate::domains::auth::keys::SigningKeys::from_signing_key(
            &SigningKey::from_bytes(&[seed; 32]),
        )
        .unwrap();
        encode(&Header::new(TOKEN_ALGORITHM), claims, keys.encoding()).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_token_resolves_to_identity() {
        let gateway = Arc::new(StubGateway::accepting());
        let authority = test_authority(gateway.clone(), 7);
        let identity = identity();

        let token = authority.sign_in(&identity, "0000").await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(authority.parse_token(&token).unwrap(), identity.id);
        assert_eq!(
            gateway.authenticate_calls(),
            vec![("+15551234".to_string(), "0000".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rejected_code_yields_no_token() {
        let authority = test_authority(Arc::new(StubGateway::rejecting()), 7);
        let result = authority.sign_in(&identity(), "9999").await;
        assert!(matches!(result, Err(CredentialError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_wrapped() {
        let authority = test_authority(Arc::new(StubGateway::failing()), 7);
        let result = authority.sign_in(&identity(), "0000").await;
        match result {
            Err(CredentialError::Gateway { phone, .. }) => assert_eq!(phone, "+15551234"),
            other => panic!("expected gateway error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_phone_from_gateway() {
        let authority = test_authority(Arc::new(StubGateway::invalid_phone()), 7);
        assert!(matches!(
            authority.sign_in(&identity(), "0000").await,
            Err(CredentialError::InvalidPhone)
        ));
        assert!(matches!(
            authority.start_authentication(&identity()).await,
            Err(CredentialError::InvalidPhone)
        ));
    }

    #[tokio::test]
    async fn test_start_authentication_retriggers() {
        let gateway = Arc::new(StubGateway::accepting());
        let authority = test_authority(gateway.clone(), 7);
        let identity = identity();

        authority.start_authentication(&identity).await.unwrap();
        authority.start_authentication(&identity).await.unwrap();
        assert_eq!(gateway.verify_calls(), vec!["+15551234", "+15551234"]);
    }

    #[tokio::test]
    async fn test_start_authentication_provider_failure() {
        let authority = test_authority(Arc::new(StubGateway::failing()), 7);
        assert!(matches!(
            authority.start_authentication(&identity()).await,
            Err(CredentialError::Gateway { .. })
        ));
    }

    #[test]
    fn test_issue_token_round_trip() {
        let authority = test_authority(Arc::new(StubGateway::accepting()), 7);
        let id = UserId::new();
        let token = authority.issue_token(id).unwrap();
        assert_eq!(authority.parse_token(&token).unwrap(), id);
    }

    #[test]
    fn test_token_from_other_key_pair_is_invalid() {
        let issuer_a = test_authority(Arc::new(StubGateway::accepting()), 7);
        let issuer_b = test_authority(Arc::new(StubGateway::accepting()), 8);

        let token = issuer_a.issue_token(UserId::new()).unwrap();
        assert!(matches!(
            issuer_b.parse_token(&token),
            Err(CredentialError::InvalidToken)
        ));
    }

    #[test]
    fn test_hmac_token_signed_with_public_key_is_rejected() {
        let authority = test_authority(Arc::new(StubGateway::accepting()), 7);
        let public_key = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        let claims = claims_for(
            &UserId::new().to_string(),
            "test_issuer",
            Utc::now().timestamp() + 3600,
        );

        for alg in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let token = encode(
                &Header::new(alg),
                &claims,
                &EncodingKey::from_secret(public_key.as_bytes()),
            )
            .unwrap();
            assert!(
                matches!(authority.parse_token(&token), Err(CredentialError::InvalidToken)),
                "{:?} token must be rejected",
                alg
            );
        }
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine as _;

        let authority = test_authority(Arc::new(StubGateway::accepting()), 7);
        let claims = claims_for(
            &UserId::new().to_string(),
            "test_issuer",
            Utc::now().timestamp() + 3600,
        );
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{}.{}.", header, payload);

        assert!(matches!(
            authority.parse_token(&token),
            Err(CredentialError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let authority = test_authority(Arc::new(StubGateway::accepting()), 7);
        let claims = claims_for(
            &UserId::new().to_string(),
            "test_issuer",
            Utc::now().timestamp() - 3600,
        );
        let token = sign_with_seed(7, &claims);
        assert!(matches!(
            authority.parse_token(&token),
            Err(CredentialError::InvalidToken)
        ));
    }

    #[test]
    fn test_subject_must_be_user_id() {
        let authority = test_authority(Arc::new(StubGateway::accepting()), 7);
        let claims = claims_for("not-a-uuid", "test_issuer", Utc::now().timestamp() + 3600);
        let token = sign_with_seed(7, &claims);
        assert!(matches!(
            authority.parse_token(&token),
            Err(CredentialError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_is_invalid_token() {
        let authority = test_authority(Arc::new(StubGateway::accepting()), 7);
        for token in ["", "invalid_token", "a.b.c", "....."] {
            assert!(matches!(
                authority.parse_token(token),
                Err(CredentialError::InvalidToken)
            ));
        }
    }
}
