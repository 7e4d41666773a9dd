//! Deterministic merge of contract interface entry lists.
//!
//! Several compiled contracts (a main registry plus logic shards) expose
//! one combined external API. This crate merges their JSON ABI entry
//! lists into a single deduplicated list and computes a checksum over
//! the raw inputs for drift detection. It performs no I/O.

mod digest;
mod entry;
mod inspection;
mod merger;

pub use digest::{
    canonical_bytes, is_digest_hex, sha256_hex, AggregateChecksum, EntryFingerprint,
    DIGEST_HEX_LEN,
};
pub use entry::{
    CollectionError, EntryError, EntryKind, InterfaceCollection, InterfaceEntry, Mutability,
    RESERVED_KEYS,
};
pub use inspection::{InspectionSet, DEFAULT_INSPECTION_FUNCTIONS};
pub use merger::{
    aggregate_checksum, collection_digest, merge, MergeError, MergeOutput, MergeStats, Merger,
};
