//! abi-merge - master interface generation
//!
//! Merges the JSON ABIs of a contract family (a main registry plus its
//! logic shards) into one deduplicated interface, renders it through
//! an external generator and stamps it with a checksum of the inputs so
//! stale interfaces can be detected later.

pub mod artifact;
pub mod config;
pub mod header;
pub mod pipeline;
pub mod report;
pub mod toolchain;

pub use abi_merge_core::{
    merge, AggregateChecksum, EntryKind, InspectionSet, InterfaceCollection, InterfaceEntry,
    MergeError, MergeOutput, Merger, Mutability,
};
pub use config::{EffectiveConfig, Settings, TargetConfig};
pub use header::{read_checksum, read_checksum_with_prefix, ChecksumHeader};
pub use pipeline::{CheckOutcome, DriftStatus, GenerationOutcome, Pipeline, PipelineError};
pub use report::GenerationReport;
pub use toolchain::{Compiler, Formatter, Renderer, Toolchain};
