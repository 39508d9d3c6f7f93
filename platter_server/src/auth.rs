//! Request authentication.
//!
//! Restaurant endpoints expect an HS256 bearer token carrying [`RestaurantClaims`]. The tenant id in the claims is the
//! only source of truth for which restaurant a request acts on.
//!
//! Guest endpoints identify the client by the `x-guest-client-id` header. The id is device-local and unauthenticated;
//! it only scopes what the guest can see.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use platter_engine::db_types::CustomerIdentity;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const RESTAURANT_AUDIENCE: &str = "platter:restaurant";
pub const GUEST_ID_HEADER: &str = "x-guest-client-id";
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantClaims {
    /// The staff member or service the token was issued to
    pub sub: String,
    pub restaurant_id: i64,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self { encoding_key: EncodingKey::from_secret(secret), decoding_key: DecodingKey::from_secret(secret) }
    }

    /// Issues a new access token for the given restaurant.
    /// This method DOES NOT check that `subject` is allowed to act for the restaurant. That must be done prior to
    /// calling `issue_token`.
    pub fn issue_token(
        &self,
        restaurant_id: i64,
        subject: &str,
        duration: Option<Duration>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let duration = duration.unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));
        let claims = RestaurantClaims {
            sub: subject.to_string(),
            restaurant_id,
            aud: RESTAURANT_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + duration).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<RestaurantClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[RESTAURANT_AUDIENCE]);
        validation.set_required_spec_claims(&["sub", "exp", "aud"]);
        let data = decode::<RestaurantClaims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        Ok(data.claims)
    }
}

fn restaurant_claims(req: &HttpRequest) -> Result<RestaurantClaims, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::ConfigurationError("No token issuer has been configured".to_string()))?;
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a bearer token".to_string()))?;
    let claims = issuer.verify(token.trim()).map_err(|e| {
        debug!("💻️ Rejected restaurant access token. {e}");
        e
    })?;
    trace!("💻️ Request authenticated for restaurant #{} ({})", claims.restaurant_id, claims.sub);
    Ok(claims)
}

impl FromRequest for RestaurantClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(restaurant_claims(req))
    }
}

/// The guest client id taken from the `x-guest-client-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestId(String);

impl GuestId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn identity(&self) -> CustomerIdentity {
        CustomerIdentity::Guest(self.0.clone())
    }
}

impl FromRequest for GuestId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .headers()
            .get(GUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| GuestId(s.to_string()))
            .ok_or(ServerError::AuthenticationError(AuthError::MissingGuestId));
        ready(id)
    }
}
