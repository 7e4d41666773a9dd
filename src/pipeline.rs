//! Generation pipeline
//!
//! For each configured target:
//! - Compile (optional) and load the source collections in order
//! - Merge them into one deduplicated entry list
//! - Render, prefix the checksum header, format
//! - Publish atomically over the output path
//!
//! `check` reruns only the load and checksum steps and compares the
//! result against the header of the existing artifact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use abi_merge_core::{
    aggregate_checksum, collection_digest, AggregateChecksum, InterfaceCollection, MergeError,
    MergeStats, Merger,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, Settings, TargetConfig};
use crate::header::{read_checksum_with_prefix, ChecksumHeader};
use crate::toolchain::{ToolError, Toolchain};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{interface}: {source}")]
    Tool {
        interface: String,
        #[source]
        source: ToolError,
    },

    #[error("{interface}: source {source_name}: {source}")]
    Source {
        interface: String,
        source_name: String,
        #[source]
        source: ToolError,
    },

    #[error("{interface}: {source}")]
    Merge {
        interface: String,
        #[source]
        source: MergeError,
    },

    #[error(
        "{interface}: formatter removed the checksum header; {} left unchanged",
        output.display()
    )]
    HeaderLost { interface: String, output: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 3,
            PipelineError::Tool { .. } | PipelineError::Source { .. } => 4,
            PipelineError::Merge { .. } => 5,
            PipelineError::HeaderLost { .. } => 4,
            PipelineError::Io { .. } => 6,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// One input collection as it contributed to a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Source as configured (contract name or path)
    pub source: String,
    pub entries: usize,
    /// SHA-256 of the collection's canonical form
    pub digest: String,
}

/// Result of generating one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub interface_name: String,
    pub output: PathBuf,
    /// Checksum of the raw inputs, recorded in the header
    pub input_checksum: AggregateChecksum,
    /// Checksum of the merged, normalized entry list
    pub merged_checksum: AggregateChecksum,
    pub sources: Vec<SourceSummary>,
    pub stats: MergeStats,
}

/// Drift state of an existing artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DriftStatus {
    UpToDate,
    Stale {
        expected: AggregateChecksum,
        found: AggregateChecksum,
    },
    MissingHeader,
    MissingOutput,
}

impl DriftStatus {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, DriftStatus::UpToDate)
    }
}

/// Result of checking one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub interface_name: String,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: DriftStatus,
}

/// Runs targets against a toolchain
pub struct Pipeline {
    settings: Settings,
    toolchain: Toolchain,
}

impl Pipeline {
    pub fn new(settings: Settings, toolchain: Toolchain) -> Self {
        Self {
            settings,
            toolchain,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Generate every selected target, stopping at the first failure.
    pub fn generate_all(&self, name: Option<&str>) -> PipelineResult<Vec<GenerationOutcome>> {
        let targets = self.settings.select_targets(name)?;
        targets.into_iter().map(|t| self.generate(t)).collect()
    }

    /// Check every selected target, stopping at the first failure.
    pub fn check_all(&self, name: Option<&str>) -> PipelineResult<Vec<CheckOutcome>> {
        let targets = self.settings.select_targets(name)?;
        targets.into_iter().map(|t| self.check(t)).collect()
    }

    /// Generate one target. Nothing is written to `target.output`
    /// unless every step succeeds.
    pub fn generate(&self, target: &TargetConfig) -> PipelineResult<GenerationOutcome> {
        let interface = target.interface_name.as_str();
        let (collections, sources) = self.load_sources(target)?;

        let merger = Merger::new(self.settings.inspection_for(target));
        let merged = merger
            .merge(&collections)
            .map_err(|source| merge_error(interface, source))?;
        let merged_checksum = merged
            .merged_checksum()
            .map_err(|source| merge_error(interface, source))?;

        let body = self
            .toolchain
            .renderer
            .render(&merged.entries, interface)
            .map_err(|source| tool_error(interface, source))?;

        let header = ChecksumHeader::new(merged.checksum.clone(), &self.settings.header_prefix);
        self.publish(target, &header, &header.prepend(&body))?;

        info!(
            interface,
            output = %target.output.display(),
            entries = merged.stats.entries_out,
            duplicates = merged.stats.duplicates_dropped,
            checksum = %merged.checksum,
            "generated interface"
        );

        Ok(GenerationOutcome {
            interface_name: interface.to_string(),
            output: target.output.clone(),
            input_checksum: merged.checksum,
            merged_checksum,
            sources,
            stats: merged.stats,
        })
    }

    /// Compare the current input checksum with the one recorded in
    /// the existing artifact.
    pub fn check(&self, target: &TargetConfig) -> PipelineResult<CheckOutcome> {
        let interface = target.interface_name.as_str();
        let (collections, _) = self.load_sources(target)?;
        let expected =
            aggregate_checksum(&collections).map_err(|source| merge_error(interface, source))?;

        let status = match fs::read_to_string(&target.output) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => DriftStatus::MissingOutput,
            Err(source) => {
                return Err(PipelineError::Io {
                    path: target.output.clone(),
                    source,
                })
            }
            Ok(text) => match read_checksum_with_prefix(&text, &self.settings.header_prefix) {
                None => DriftStatus::MissingHeader,
                Some(found) if found == expected => DriftStatus::UpToDate,
                Some(found) => DriftStatus::Stale { expected, found },
            },
        };

        match &status {
            DriftStatus::UpToDate => info!(interface, "interface is up to date"),
            other => warn!(interface, status = ?other, "interface is stale"),
        }

        Ok(CheckOutcome {
            interface_name: interface.to_string(),
            output: target.output.clone(),
            status,
        })
    }

    fn load_sources(
        &self,
        target: &TargetConfig,
    ) -> PipelineResult<(Vec<InterfaceCollection>, Vec<SourceSummary>)> {
        let interface = target.interface_name.as_str();
        self.toolchain
            .compiler
            .prepare()
            .map_err(|source| tool_error(interface, source))?;

        let mut collections = Vec::with_capacity(target.sources.len());
        let mut summaries = Vec::with_capacity(target.sources.len());

        for source_name in &target.sources {
            let collection = self
                .toolchain
                .compiler
                .compile(source_name)
                .map_err(|source| PipelineError::Source {
                    interface: interface.to_string(),
                    source_name: source_name.clone(),
                    source,
                })?;
            let digest =
                collection_digest(&collection).map_err(|source| merge_error(interface, source))?;

            debug!(interface, source = %source_name, entries = collection.len(), "source loaded");
            summaries.push(SourceSummary {
                source: source_name.clone(),
                entries: collection.len(),
                digest,
            });
            collections.push(collection);
        }

        Ok((collections, summaries))
    }

    /// Write to a sibling temp file, format it, confirm the header
    /// survived, then rename over the output.
    fn publish(
        &self,
        target: &TargetConfig,
        header: &ChecksumHeader,
        bytes: &[u8],
    ) -> PipelineResult<()> {
        let interface = target.interface_name.as_str();
        let output = target.output.as_path();
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        let tmp = temp_path(output);
        let result = self
            .write_formatted(interface, output, &tmp, header, bytes)
            .and_then(|()| fs::rename(&tmp, output).map_err(|source| io_error(output, source)));

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_formatted(
        &self,
        interface: &str,
        output: &Path,
        tmp: &Path,
        header: &ChecksumHeader,
        bytes: &[u8],
    ) -> PipelineResult<()> {
        fs::write(tmp, bytes).map_err(|source| io_error(tmp, source))?;
        self.toolchain
            .formatter
            .format(tmp)
            .map_err(|source| tool_error(interface, source))?;

        let formatted = fs::read_to_string(tmp).map_err(|source| io_error(tmp, source))?;
        let found = read_checksum_with_prefix(&formatted, &self.settings.header_prefix);
        if found.as_ref() != Some(header.checksum()) {
            return Err(PipelineError::HeaderLost {
                interface: interface.to_string(),
                output: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// `dir/.Name.abi-merge-tmp.ext`: same directory, same extension, so
/// formatters pick the right parser and the rename stays on one device.
pub fn temp_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!(".{}.abi-merge-tmp.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.abi-merge-tmp", stem),
    };
    output.with_file_name(name)
}

fn tool_error(interface: &str, source: ToolError) -> PipelineError {
    PipelineError::Tool {
        interface: interface.to_string(),
        source,
    }
}

fn merge_error(interface: &str, source: MergeError) -> PipelineError {
    PipelineError::Merge {
        interface: interface.to_string(),
        source,
    }
}

fn io_error(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}
