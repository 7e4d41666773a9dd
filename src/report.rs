//! Generation report (report.json)
//!
//! Machine-readable record of one `generate` run: checksums, per-source
//! digests and merge counters for every target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::pipeline::GenerationOutcome;

/// Schema version for report.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "abi-merge/report@1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub schema_version: u32,
    pub schema_id: String,

    /// When the run finished
    pub created_at: DateTime<Utc>,

    /// SHA-256 of the config file bytes, if one was loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_digest: Option<String>,

    pub targets: Vec<GenerationOutcome>,
}

impl GenerationReport {
    pub fn new(config_digest: Option<String>, targets: Vec<GenerationOutcome>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config_digest,
            targets,
        }
    }

    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SourceSummary;
    use abi_merge_core::{AggregateChecksum, MergeStats};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_outcome() -> GenerationOutcome {
        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        GenerationOutcome {
            interface_name: "IAutomationRegistryMaster".to_string(),
            output: PathBuf::from("IAutomationRegistryMaster.sol"),
            input_checksum: AggregateChecksum::from_hex(digest).unwrap(),
            merged_checksum: AggregateChecksum::from_hex(digest).unwrap(),
            sources: vec![SourceSummary {
                source: "AutomationRegistry2_1".to_string(),
                entries: 12,
                digest: digest.to_string(),
            }],
            stats: MergeStats {
                collections: 1,
                entries_in: 12,
                entries_out: 12,
                duplicates_dropped: 0,
                mutability_overrides: 1,
            },
        }
    }

    #[test]
    fn test_serialization() {
        let report = GenerationReport::new(Some("cafe".to_string()), vec![sample_outcome()]);
        let json = report.to_json().unwrap();

        assert!(json.contains("\"schema_id\": \"abi-merge/report@1\""));
        assert!(json.contains("\"config_digest\": \"cafe\""));
        assert!(json.contains("\"mutability_overrides\": 1"));
    }

    #[test]
    fn test_config_digest_omitted_when_absent() {
        let report = GenerationReport::new(None, vec![]);
        assert!(!report.to_json().unwrap().contains("config_digest"));
    }

    impl GenerationReport {
        fn from_json(json: &str) -> Result<Self, serde_json::Error> {
            serde_json::from_str(json)
        }

        fn find_target(&self, interface_name: &str) -> Option<&GenerationOutcome> {
            self.targets
                .iter()
                .find(|t| t.interface_name == interface_name)
        }
    }

    #[test]
    fn test_write_and_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let report = GenerationReport::new(None, vec![sample_outcome()]);
        report.write_to_file(&path).unwrap();

        let parsed = GenerationReport::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
        let target = parsed.find_target("IAutomationRegistryMaster").unwrap();
        assert_eq!(target.sources[0].entries, 12);
        assert!(parsed.find_target("IOther").is_none());
    }
}
