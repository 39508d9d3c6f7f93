//! # Identity merge tokens
//!
//! A merge token proves that a client held a given guest identity a short while ago. It is an HS256 JWT whose subject
//! is the guest client id. The token is also stored in the cache when it is issued, and removed when it is redeemed,
//! so every token can be used at most once even though the JWT itself stays valid until it expires.
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MERGE_TOKEN_LIFETIME_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeClaims {
    /// The guest client id the token was issued to
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Error)]
pub enum MergeTokenError {
    #[error("The merge token has expired")]
    Expired,
    #[error("The merge token is invalid. {0}")]
    Invalid(String),
    #[error("The merge token has already been used, or was never issued")]
    NotIssued,
    #[error("Could not sign the merge token. {0}")]
    SigningFailed(String),
}

#[derive(Clone)]
pub struct MergeTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl MergeTokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: Duration::minutes(MERGE_TOKEN_LIFETIME_MINUTES),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, guest_id: &str, now: DateTime<Utc>) -> Result<String, MergeTokenError> {
        let claims = MergeClaims {
            sub: guest_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| MergeTokenError::SigningFailed(e.to_string()))
    }

    /// Checks the signature and expiry of the token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<MergeClaims, MergeTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);
        let data = decode::<MergeClaims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => MergeTokenError::Expired,
            _ => MergeTokenError::Invalid(e.to_string()),
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn issue_and_verify() {
        let issuer = MergeTokenIssuer::new(b"a-secret-that-is-long-enough-for-hs256");
        let token = issuer.issue("guest-1", Utc::now()).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "guest-1");
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = MergeTokenIssuer::new(b"a-secret-that-is-long-enough-for-hs256");
        let token = issuer.issue("guest-1", Utc::now() - Duration::minutes(11)).unwrap();
        assert!(matches!(issuer.verify(&token), Err(MergeTokenError::Expired)));
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let issuer = MergeTokenIssuer::new(b"a-secret-that-is-long-enough-for-hs256");
        let other = MergeTokenIssuer::new(b"some-other-secret-of-reasonable-length");
        let token = other.issue("guest-1", Utc::now()).unwrap();
        assert!(matches!(issuer.verify(&token), Err(MergeTokenError::Invalid(_))));
        assert!(matches!(issuer.verify("not.a.jwt"), Err(MergeTokenError::Invalid(_))));
    }
}
