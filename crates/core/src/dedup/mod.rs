//! Transaction deduplication.
//!
//! Identity is the content fingerprint from [`fingerprint`], not the
//! provider's transaction hash alone: a provider resync that re-serializes
//! a transaction with a new confirmation count must still map to the
//! original fingerprint, so only rounding-stable fields participate.
//!
//! The index layers an in-process cache over an optional shared cache over
//! the ledger itself, populated lazily per portfolio. The whole stack sits
//! behind one [`Cache`] interface so the index logic never knows which
//! backend it is talking to.

pub mod cache;
pub mod dedup_service;
pub mod fingerprint;
pub mod similarity;

pub use cache::{Cache, LocalCache};
pub use dedup_service::{DedupStats, DeduplicationIndex, DEFAULT_HASH_TTL};
pub use fingerprint::compute_fingerprint;
pub use similarity::{similarity, SimilarityWeights, DUPLICATE_SIMILARITY_THRESHOLD};
