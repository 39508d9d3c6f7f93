//! # Identity merge protocol
//!
//! Guest clients are identified by a device-local id. When a client's id changes (for example after clearing local
//! storage and then restoring it from a backup), the client can carry its orders and cart over to the new id:
//!
//! 1. While still holding the old id, the client asks for a merge token ([`IdentityMergeApi::issue_merge_token`]). The
//!    token is signed and also stored in the guest cache for ten minutes.
//! 2. Using the new id, the client presents the token ([`IdentityMergeApi::verify_merge_token`]). The cached copy is
//!    removed in the same step, so a token can only be redeemed once.
//! 3. An [`IdentityMergeEvent`] is published. Independent consumers move food orders, combo orders and the cart. They
//!    run in the background; the caller does not wait for them.
use std::{fmt::Debug, sync::Arc};

use chrono::Utc;
use futures_util::FutureExt;
use log::*;
use thiserror::Error;

use crate::{
    api::guest_cart_api::GuestCartApi,
    db_types::LineKind,
    events::{EventProducers, Handler, IdentityMergeEvent},
    helpers::{MergeTokenError, MergeTokenIssuer},
    traits::{CacheError, ErrorKind, GuestCache},
};

#[derive(Debug, Clone, Error)]
pub enum IdentityMergeError {
    #[error("{0}")]
    Token(#[from] MergeTokenError),
    #[error("{0}")]
    Cache(#[from] CacheError),
    #[error("Invalid guest id. {0}")]
    InvalidGuestId(String),
}

impl IdentityMergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityMergeError::Token(MergeTokenError::SigningFailed(_)) => ErrorKind::Internal,
            IdentityMergeError::Token(_) => ErrorKind::Unauthorized,
            IdentityMergeError::Cache(_) => ErrorKind::Internal,
            IdentityMergeError::InvalidGuestId(_) => ErrorKind::InvalidInput,
        }
    }
}

pub fn merge_token_key(guest_id: &str) -> String {
    format!("merge_token:{guest_id}")
}

pub struct IdentityMergeApi {
    cache: Arc<dyn GuestCache>,
    issuer: MergeTokenIssuer,
    producers: EventProducers,
}

impl Debug for IdentityMergeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityMergeApi")
    }
}

impl Clone for IdentityMergeApi {
    fn clone(&self) -> Self {
        Self { cache: Arc::clone(&self.cache), issuer: self.issuer.clone(), producers: self.producers.clone() }
    }
}

fn check_guest_id(guest_id: &str) -> Result<(), IdentityMergeError> {
    if guest_id.trim().is_empty() {
        return Err(IdentityMergeError::InvalidGuestId("The guest id cannot be empty".to_string()));
    }
    Ok(())
}

impl IdentityMergeApi {
    pub fn new(cache: Arc<dyn GuestCache>, issuer: MergeTokenIssuer, producers: EventProducers) -> Self {
        Self { cache, issuer, producers }
    }

    /// Issues a single-use merge token for the current guest id. Issuing a new token replaces any earlier one.
    pub async fn issue_merge_token(&self, guest_id: &str) -> Result<String, IdentityMergeError> {
        check_guest_id(guest_id)?;
        let token = self.issuer.issue(guest_id, Utc::now())?;
        let ttl = self.issuer.lifetime().to_std().ok();
        self.cache.set(&merge_token_key(guest_id), &token, ttl).await?;
        debug!("🪪️ Merge token issued for guest {guest_id}");
        Ok(token)
    }

    /// Redeems a merge token on behalf of `new_guest_id` and returns the guest id the client should use from now on.
    ///
    /// If the token was issued to `new_guest_id` itself, there is nothing to merge and the token is left in place.
    /// Otherwise the token is consumed and an [`IdentityMergeEvent`] is published.
    pub async fn verify_merge_token(&self, token: &str, new_guest_id: &str) -> Result<String, IdentityMergeError> {
        check_guest_id(new_guest_id)?;
        let claims = self.issuer.verify(token)?;
        let old_guest_id = claims.sub;
        if old_guest_id == new_guest_id {
            trace!("🪪️ Merge token for {new_guest_id} presented by its own subject. Nothing to merge.");
            return Ok(new_guest_id.to_string());
        }
        match self.cache.take(&merge_token_key(&old_guest_id)).await? {
            Some(stored) if stored == token => {},
            Some(_) => {
                // A newer token was issued in the meantime; the presented one is stale.
                warn!("🪪️ Stale merge token presented to merge {old_guest_id} into {new_guest_id}");
                return Err(MergeTokenError::NotIssued.into());
            },
            None => {
                warn!("🪪️ Unknown or already redeemed merge token presented for {old_guest_id}");
                return Err(MergeTokenError::NotIssued.into());
            },
        }
        info!("🪪️ Merging guest {old_guest_id} into {new_guest_id}");
        self.producers.publish_identity_merge(IdentityMergeEvent::new(old_guest_id.as_str(), new_guest_id)).await;
        Ok(new_guest_id.to_string())
    }
}

/// Builds the identity merge consumer that moves guest orders of one line kind.
#[cfg(feature = "sqlite")]
pub fn order_merge_hook(db: crate::SqliteDatabase, kind: LineKind) -> Handler<IdentityMergeEvent> {
    use crate::traits::OrderLifecycleDatabase;
    Arc::new(move |ev: IdentityMergeEvent| {
        let db = db.clone();
        async move {
            match db.reassign_guest_orders(kind, &ev.old_guest_id, &ev.new_guest_id).await {
                Ok(n) => info!("🪪️ {n} {kind} orders moved from {} to {}", ev.old_guest_id, ev.new_guest_id),
                Err(e) => {
                    error!("🪪️ Could not move {kind} orders from {} to {}: {e}", ev.old_guest_id, ev.new_guest_id)
                },
            }
        }
        .boxed()
    })
}

/// Builds the identity merge consumer that merges guest carts.
pub fn cart_merge_hook(cart: GuestCartApi) -> Handler<IdentityMergeEvent> {
    Arc::new(move |ev: IdentityMergeEvent| {
        let cart = cart.clone();
        async move {
            match cart.merge(&ev.old_guest_id, &ev.new_guest_id).await {
                Ok(entries) => debug!("🪪️ Cart merged into {}. {} entries", ev.new_guest_id, entries.len()),
                Err(e) => error!("🪪️ Could not merge cart of {} into {}: {e}", ev.old_guest_id, ev.new_guest_id),
            }
        }
        .boxed()
    })
}
