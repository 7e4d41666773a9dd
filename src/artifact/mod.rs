//! Compiled artifact loading
//!
//! Turns a configured source into an [`InterfaceCollection`]. A source
//! ending in `.json` is a file path; anything else is a contract name
//! looked up as `<Name>.json` under the artifacts directory. Both the
//! Hardhat/Foundry layout (`{"abi": [...]}`) and a bare ABI array are
//! accepted.

use abi_merge_core::{CollectionError, InterfaceCollection};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Hardhat writes build metadata here; never an ABI artifact.
const BUILD_INFO_DIR: &str = "build-info";

/// Errors for artifact loading
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("cannot read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {} has no ABI array", path.display())]
    MissingAbi { path: PathBuf },

    #[error("artifact {}: {source}", path.display())]
    Collection {
        path: PathBuf,
        #[source]
        source: CollectionError,
    },

    #[error("no artifact named {name}.json under {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("artifact name {name} is ambiguous: {}", format_candidates(candidates))]
    Ambiguous {
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A loaded collection with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    /// Source string as configured
    pub source: String,
    /// Resolved artifact path
    pub path: PathBuf,
    pub collection: InterfaceCollection,
}

/// Resolves and loads artifacts from a directory tree
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a configured source to an artifact path.
    pub fn resolve(&self, source: &str) -> Result<PathBuf, ArtifactError> {
        if is_path_source(source) {
            return Ok(PathBuf::from(source));
        }

        let file_name = format!("{}.json", source);
        let mut candidates = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != BUILD_INFO_DIR)
        {
            let entry = entry?;
            if entry.file_type().is_file() && entry.file_name() == file_name.as_str() {
                trace!(path = %entry.path().display(), "artifact candidate");
                candidates.push(entry.into_path());
            }
        }

        match candidates.len() {
            0 => Err(ArtifactError::NotFound {
                name: source.to_string(),
                dir: self.root.clone(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => {
                candidates.sort();
                Err(ArtifactError::Ambiguous {
                    name: source.to_string(),
                    candidates,
                })
            }
        }
    }

    /// Resolve and load one source.
    pub fn load(&self, source: &str) -> Result<LoadedArtifact, ArtifactError> {
        let path = self.resolve(source)?;
        let collection = load_artifact(&path)?;
        debug!(
            source,
            path = %path.display(),
            entries = collection.len(),
            "loaded interface collection"
        );
        Ok(LoadedArtifact {
            source: source.to_string(),
            path,
            collection,
        })
    }
}

/// Whether a configured source names a file rather than a contract.
pub fn is_path_source(source: &str) -> bool {
    source.ends_with(".json")
}

/// Load the ABI of one artifact file.
pub fn load_artifact(path: &Path) -> Result<InterfaceCollection, ArtifactError> {
    let contents = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let abi = extract_abi(value).ok_or_else(|| ArtifactError::MissingAbi {
        path: path.to_path_buf(),
    })?;

    InterfaceCollection::from_value(abi).map_err(|source| ArtifactError::Collection {
        path: path.to_path_buf(),
        source,
    })
}

/// Pull the ABI array out of an artifact document.
pub fn extract_abi(value: Value) -> Option<Value> {
    match value {
        abi @ Value::Array(_) => Some(abi),
        Value::Object(mut map) => match map.remove("abi") {
            Some(abi @ Value::Array(_)) => Some(abi),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_json(path: &Path, value: &Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn hardhat_artifact(name: &str) -> Value {
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "abi": [
                {"type": "function", "name": "checkUpkeep", "stateMutability": "nonpayable",
                 "inputs": [], "outputs": []}
            ],
            "bytecode": "0x"
        })
    }

    #[test]
    fn test_extract_abi_layouts() {
        assert!(extract_abi(json!([])).is_some());
        assert!(extract_abi(json!({"abi": []})).is_some());
        assert!(extract_abi(json!({"abi": {}})).is_none());
        assert!(extract_abi(json!({"bytecode": "0x"})).is_none());
        assert!(extract_abi(json!("abi")).is_none());
    }

    #[test]
    fn test_resolve_by_contract_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contracts/Registry.sol/Registry.json");
        write_json(&path, &hardhat_artifact("Registry"));
        write_json(
            &dir.path().join("contracts/Registry.sol/Registry.dbg.json"),
            &json!({"buildInfo": "x"}),
        );

        let store = ArtifactStore::new(dir.path());
        assert_eq!(store.resolve("Registry").unwrap(), path);

        let loaded = store.load("Registry").unwrap();
        assert_eq!(loaded.collection.len(), 1);
        assert_eq!(loaded.source, "Registry");
    }

    #[test]
    fn test_build_info_skipped() {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join("build-info/Registry.json"),
            &json!({"input": {}}),
        );
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.resolve("Registry"),
            Err(ArtifactError::NotFound { .. })
        ));
    }

    #[test]
    fn test_ambiguous_name() {
        let dir = TempDir::new().unwrap();
        write_json(&dir.path().join("v2_1/Logic.sol/Logic.json"), &hardhat_artifact("Logic"));
        write_json(&dir.path().join("v2_2/Logic.sol/Logic.json"), &hardhat_artifact("Logic"));

        let store = ArtifactStore::new(dir.path());
        match store.resolve("Logic") {
            Err(ArtifactError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0] < candidates[1]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_path_source_loads_bare_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abi.json");
        write_json(
            &path,
            &json!([{"type": "event", "name": "Paused", "inputs": [], "anonymous": false}]),
        );

        let store = ArtifactStore::new("unused");
        let source = path.to_string_lossy().to_string();
        let loaded = store.load(&source).unwrap();
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.collection.len(), 1);
    }

    #[test]
    fn test_missing_abi() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Bad.json");
        write_json(&path, &json!({"bytecode": "0x"}));
        assert!(matches!(
            load_artifact(&path),
            Err(ArtifactError::MissingAbi { .. })
        ));
    }

    #[test]
    fn test_malformed_entry_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Bad.json");
        write_json(&path, &json!({"abi": [{"type": "function", "name": "f", "stateMutability": "view"}, {"type": "bogus"}]}));

        let err = load_artifact(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Bad.json"));
        assert!(message.contains("entry 1"));
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_artifact(&path), Err(ArtifactError::Json { .. })));
    }
}
