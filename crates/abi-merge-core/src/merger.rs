//! Interface merge.
//!
//! Checksum the raw inputs, then walk every entry in input order,
//! keeping the first occurrence of each fingerprint and forcing `view`
//! on inspection functions. Fingerprints are taken before the
//! mutability rewrite; for inspection functions the declared
//! mutability is left out of the key, so copies that differ only there
//! collapse into one entry.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::digest::{canonical_bytes, sha256_hex, AggregateChecksum, EntryFingerprint};
use crate::entry::{EntryError, InterfaceCollection, InterfaceEntry};
use crate::inspection::InspectionSet;

/// Merge failures. All are fatal for the run.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("malformed entry {entry} in collection {collection}: {reason}")]
    MalformedEntry {
        /// Zero-based index of the collection in the input list
        collection: usize,
        /// Zero-based index of the entry within that collection
        entry: usize,
        #[source]
        reason: EntryError,
    },

    #[error("canonical serialization of inputs failed: {0}")]
    Canonicalization(String),
}

/// Counters describing one merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub collections: usize,
    pub entries_in: usize,
    pub entries_out: usize,
    pub duplicates_dropped: usize,
    pub mutability_overrides: usize,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutput {
    /// Deduplicated entries in first-seen order
    pub entries: Vec<InterfaceEntry>,
    /// Checksum of the raw inputs
    pub checksum: AggregateChecksum,
    pub stats: MergeStats,
}

impl MergeOutput {
    /// SHA-256 over the JCS form of the merged entry list.
    ///
    /// Unlike `checksum`, this covers the normalized output.
    pub fn merged_checksum(&self) -> Result<AggregateChecksum, MergeError> {
        let bytes = canonical_bytes(&self.entries)
            .map_err(|e| MergeError::Canonicalization(e.to_string()))?;
        Ok(AggregateChecksum::from_canonical(&bytes))
    }
}

/// Merger bound to an inspection set.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    inspection: InspectionSet,
}

impl Merger {
    pub fn new(inspection: InspectionSet) -> Self {
        Self { inspection }
    }

    pub fn inspection(&self) -> &InspectionSet {
        &self.inspection
    }

    /// Merge collections in the given order.
    pub fn merge(&self, collections: &[InterfaceCollection]) -> Result<MergeOutput, MergeError> {
        let checksum = aggregate_checksum(collections)?;

        let mut seen: HashSet<EntryFingerprint> = HashSet::new();
        let mut entries = Vec::new();
        let mut stats = MergeStats {
            collections: collections.len(),
            ..MergeStats::default()
        };

        for (ci, collection) in collections.iter().enumerate() {
            for (ei, entry) in collection.iter().enumerate() {
                stats.entries_in += 1;

                let fingerprint = self.dedup_key(entry).map_err(|reason| {
                    MergeError::MalformedEntry {
                        collection: ci,
                        entry: ei,
                        reason,
                    }
                })?;

                if !seen.insert(fingerprint) {
                    stats.duplicates_dropped += 1;
                    debug!(collection = ci, entry = ei, member = %entry.label(), "dropping duplicate entry");
                    continue;
                }

                let mut entry = entry.clone();
                let declared = entry.state_mutability;
                if self.inspection.normalize(&mut entry) {
                    stats.mutability_overrides += 1;
                    debug!(
                        member = %entry.label(),
                        declared = ?declared,
                        "forcing view mutability on inspection function"
                    );
                }
                entries.push(entry);
            }
        }

        stats.entries_out = entries.len();
        debug!(
            collections = stats.collections,
            entries_in = stats.entries_in,
            entries_out = stats.entries_out,
            duplicates = stats.duplicates_dropped,
            overrides = stats.mutability_overrides,
            checksum = %checksum,
            "merge complete"
        );

        Ok(MergeOutput {
            entries,
            checksum,
            stats,
        })
    }

    /// Fingerprint used for deduplication.
    ///
    /// Raw fingerprint, except that inspection functions drop their
    /// declared mutability since the override makes it irrelevant.
    pub fn dedup_key(&self, entry: &InterfaceEntry) -> Result<EntryFingerprint, EntryError> {
        if self.inspection.applies_to(entry) && entry.state_mutability.is_some() {
            let mut key = entry.clone();
            key.state_mutability = None;
            return EntryFingerprint::of(&key);
        }
        EntryFingerprint::of(entry)
    }
}

/// Merge collections with an explicit inspection set.
pub fn merge(
    collections: &[InterfaceCollection],
    inspection: &InspectionSet,
) -> Result<MergeOutput, MergeError> {
    Merger::new(inspection.clone()).merge(collections)
}

/// Checksum of the raw, ordered inputs: SHA-256 of JCS of the list of
/// collections. Validates every entry first so failures carry indices.
pub fn aggregate_checksum(
    collections: &[InterfaceCollection],
) -> Result<AggregateChecksum, MergeError> {
    validate_all(collections)?;
    let bytes =
        canonical_bytes(collections).map_err(|e| MergeError::Canonicalization(e.to_string()))?;
    Ok(AggregateChecksum::from_canonical(&bytes))
}

fn validate_all(collections: &[InterfaceCollection]) -> Result<(), MergeError> {
    for (ci, collection) in collections.iter().enumerate() {
        for (ei, entry) in collection.iter().enumerate() {
            entry
                .validate()
                .map_err(|reason| MergeError::MalformedEntry {
                    collection: ci,
                    entry: ei,
                    reason,
                })?;
        }
    }
    Ok(())
}

/// Digest of one collection on its own. Used for per-source reporting.
pub fn collection_digest(collection: &InterfaceCollection) -> Result<String, MergeError> {
    let bytes =
        canonical_bytes(collection).map_err(|e| MergeError::Canonicalization(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}
