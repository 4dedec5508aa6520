//! Outcome resolution strategies
//!
//! The strategy is picked once when the engine is built; the engine only ever
//! talks to the [`OutcomeResolver`] trait.

use crate::config::{EngineConfig, ResolverMode};
use crate::games::types::Side;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

/// Domain-separation tag mixed into every hashed preimage
const HASH_DOMAIN: &str = "satoshi-flipper:coinflip:v1";

static NONCE_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Round context handed to a resolver
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub round_id: u64,
    pub player_id: &'a str,
    pub timestamp: DateTime<Utc>,
    /// Distinguishes independent draws made for the same round
    pub scope: &'a str,
}

/// Produces a binary outcome for one round
pub trait OutcomeResolver: Send + Sync {
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Side;

    fn name(&self) -> &'static str;
}

/// Hash-derived outcome simulating on-chain randomness
pub struct HashResolver {
    include_nonce: bool,
}

impl HashResolver {
    /// Mixes a high-resolution nonce into every preimage
    pub fn new() -> Self {
        Self { include_nonce: true }
    }

    /// Outcome depends on the round context alone and can be recomputed
    pub fn reproducible() -> Self {
        Self { include_nonce: false }
    }

    pub fn includes_nonce(&self) -> bool {
        self.include_nonce
    }

    /// Exact bytes hashed for a round
    pub fn preimage(ctx: &ResolveContext<'_>, nonce: Option<u128>) -> Vec<u8> {
        let mut message = format!(
            "{}:{}:{}:{}:{}",
            ctx.round_id,
            ctx.player_id,
            ctx.timestamp.timestamp_millis(),
            HASH_DOMAIN,
            ctx.scope
        );
        if let Some(nonce) = nonce {
            message.push(':');
            message.push_str(&nonce.to_string());
        }
        message.into_bytes()
    }

    pub fn digest(preimage: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(preimage);
        hasher.finalize().into()
    }

    /// Least-significant bit of the final digest byte: 0 heads, 1 tails
    pub fn side_from_digest(digest: &[u8]) -> Side {
        let last_byte = digest.last().copied().unwrap_or(0);
        Side::from_code(last_byte & 1)
    }

    /// Hex digest a verifier would recompute for a reproducible round
    pub fn audit_digest(ctx: &ResolveContext<'_>) -> String {
        hex::encode(Self::digest(&Self::preimage(ctx, None)))
    }

    fn nonce() -> u128 {
        NONCE_EPOCH.elapsed().as_nanos()
    }
}

impl Default for HashResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeResolver for HashResolver {
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Side {
        let nonce = self.include_nonce.then(Self::nonce);
        let digest = Self::digest(&Self::preimage(ctx, nonce));
        Self::side_from_digest(&digest)
    }

    fn name(&self) -> &'static str {
        if self.include_nonce {
            "hash"
        } else {
            "hash-reproducible"
        }
    }
}

/// Uniform draw from the thread-local CSPRNG
#[derive(Default)]
pub struct RandomResolver;

impl OutcomeResolver for RandomResolver {
    fn resolve(&self, _ctx: &ResolveContext<'_>) -> Side {
        if rand::random::<bool>() {
            Side::Heads
        } else {
            Side::Tails
        }
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Replays a fixed sequence of sides, wrapping around at the end.
///
/// Lets callers force wins and losses in simulations and tests.
pub struct ScriptedResolver {
    sides: Vec<Side>,
    cursor: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(sides: Vec<Side>) -> Self {
        let sides = if sides.is_empty() { vec![Side::Heads] } else { sides };
        Self {
            sides,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn always(side: Side) -> Self {
        Self::new(vec![side])
    }
}

impl OutcomeResolver for ScriptedResolver {
    fn resolve(&self, _ctx: &ResolveContext<'_>) -> Side {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.sides[index % self.sides.len()]
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Build the resolver selected by configuration
pub fn resolver_for(config: &EngineConfig) -> Arc<dyn OutcomeResolver> {
    match config.resolver {
        ResolverMode::Random => Arc::new(RandomResolver),
        ResolverMode::Hash if config.hash_nonce => Arc::new(HashResolver::new()),
        ResolverMode::Hash => Arc::new(HashResolver::reproducible()),
    }
}
