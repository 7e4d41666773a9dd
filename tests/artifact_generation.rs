//! End-to-end generation from compiled artifacts on disk
//!
//! Config file -> effective settings -> artifact store -> merge ->
//! JSON renderer -> checksummed output -> report.

use std::fs;
use std::path::Path;

use abi_merge::artifact::{load_artifact, ArtifactError, ArtifactStore};
use abi_merge::config::{ConfigError, EffectiveConfig};
use abi_merge::{read_checksum, DriftStatus, GenerationReport, Pipeline, Toolchain};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write_artifact(root: &Path, contract: &str, abi: Value) {
    let dir = root.join(format!("{}.sol", contract));
    fs::create_dir_all(&dir).unwrap();
    let artifact = json!({
        "abi": abi,
        "bytecode": {"object": "0x"},
        "metadata": {"compiler": {"version": "0.8.19"}}
    });
    fs::write(
        dir.join(format!("{}.json", contract)),
        serde_json::to_string_pretty(&artifact).unwrap(),
    )
    .unwrap();
}

/// Foundry-style `out/` tree with a registry and one logic shard
fn create_artifacts(root: &Path) {
    write_artifact(
        root,
        "KeeperRegistry2_1",
        json!([
            {"type": "function", "name": "checkUpkeep", "stateMutability": "nonpayable",
             "inputs": [{"internalType": "uint256", "name": "id", "type": "uint256"}],
             "outputs": [{"internalType": "bool", "name": "upkeepNeeded", "type": "bool"}]},
            {"type": "event", "name": "OwnershipTransferred", "anonymous": false, "inputs": []},
            {"type": "fallback", "stateMutability": "payable"}
        ]),
    );
    write_artifact(
        root,
        "KeeperRegistryLogicA2_1",
        json!([
            {"type": "event", "name": "OwnershipTransferred", "anonymous": false, "inputs": []},
            {"type": "function", "name": "checkCallback", "stateMutability": "nonpayable",
             "inputs": [], "outputs": []}
        ]),
    );

    // Build metadata that must never be picked up as an artifact
    let build_info = root.join("build-info");
    fs::create_dir_all(&build_info).unwrap();
    fs::write(build_info.join("KeeperRegistry2_1.json"), "{}").unwrap();
}

fn write_config(dir: &Path, artifacts: &Path, output: &Path) -> std::path::PathBuf {
    let config = format!(
        r#"
artifacts_dir = '{}'

[renderer]
kind = "json"

[[targets]]
interface_name = "IKeeperRegistryMaster"
output = '{}'
sources = ["KeeperRegistry2_1", "KeeperRegistryLogicA2_1"]
"#,
        artifacts.display(),
        output.display()
    );
    let path = dir.join("abi-merge.toml");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_generate_and_check_from_artifacts() {
    let dir = TempDir::new().unwrap();
    let artifacts = dir.path().join("out");
    create_artifacts(&artifacts);
    let output = dir.path().join("generated").join("IKeeperRegistryMaster.json");
    let config_path = write_config(dir.path(), &artifacts, &output);

    let effective = EffectiveConfig::build(Some(&config_path), true, None).unwrap();
    let settings = effective.settings().unwrap();
    let toolchain = Toolchain::from_settings(&settings).unwrap();
    let pipeline = Pipeline::new(settings, toolchain);

    let outcome = pipeline.generate_all(None).unwrap().remove(0);
    assert_eq!(outcome.stats.entries_out, 4);
    assert_eq!(outcome.stats.mutability_overrides, 2);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(read_checksum(&text), Some(outcome.input_checksum.clone()));
    assert!(text.starts_with("// abi-checksum: "));
    // Header line first, JSON document after it
    assert!(serde_json::from_str::<Value>(&text).is_err());

    let body: String = text.lines().skip(1).collect::<Vec<_>>().join("\n");
    let abi: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(abi.as_array().unwrap().len(), 4);
    assert_eq!(abi[0]["stateMutability"], "view");
    assert_eq!(abi[3]["name"], "checkCallback");
    assert_eq!(abi[3]["stateMutability"], "view");

    let check = pipeline.check_all(None).unwrap().remove(0);
    assert_eq!(check.status, DriftStatus::UpToDate);

    // Touch a source artifact
    write_artifact(
        &artifacts,
        "KeeperRegistryLogicA2_1",
        json!([
            {"type": "function", "name": "checkCallback", "stateMutability": "view",
             "inputs": [], "outputs": []}
        ]),
    );
    let check = pipeline.check_all(None).unwrap().remove(0);
    assert!(matches!(check.status, DriftStatus::Stale { .. }));

    let report = GenerationReport::new(effective.file_digest().map(str::to_string), vec![outcome]);
    let report_path = dir.path().join("report.json");
    report.write_to_file(&report_path).unwrap();
    let parsed: GenerationReport =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(parsed.config_digest.as_deref().map(str::len), Some(64));
    assert_eq!(parsed.targets[0].interface_name, "IKeeperRegistryMaster");
    assert_eq!(parsed.targets[0].sources[0].source, "KeeperRegistry2_1");
}

#[test]
fn test_missing_artifact_is_tool_error() {
    let dir = TempDir::new().unwrap();
    let artifacts = dir.path().join("out");
    fs::create_dir_all(&artifacts).unwrap();
    let output = dir.path().join("IKeeperRegistryMaster.json");
    let config_path = write_config(dir.path(), &artifacts, &output);

    let settings = EffectiveConfig::build(Some(&config_path), true, None)
        .unwrap()
        .settings()
        .unwrap();
    let toolchain = Toolchain::from_settings(&settings).unwrap();
    let err = Pipeline::new(settings, toolchain).generate_all(None).unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("KeeperRegistry2_1"));
    assert!(!output.exists());
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = EffectiveConfig::build(Some(&missing), true, None).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));

    // The default lookup tolerates a missing file
    let effective = EffectiveConfig::build(Some(&missing), false, None).unwrap();
    assert!(effective.file_digest().is_none());
    assert!(effective.settings().unwrap().targets.is_empty());
}

#[test]
fn test_cli_override_wins_over_file() {
    let dir = TempDir::new().unwrap();
    let artifacts = dir.path().join("out");
    let output = dir.path().join("IKeeperRegistryMaster.json");
    let config_path = write_config(dir.path(), &artifacts, &output);

    let overrides = json!({"artifacts_dir": "elsewhere", "compiler": null});
    let settings = EffectiveConfig::build(Some(&config_path), true, Some(overrides))
        .unwrap()
        .settings()
        .unwrap();

    assert_eq!(settings.artifacts_dir, Path::new("elsewhere"));
    assert!(settings.compiler.is_none());
    assert_eq!(settings.targets.len(), 1);
}

#[test]
fn test_store_resolves_by_contract_name() {
    let dir = TempDir::new().unwrap();
    create_artifacts(dir.path());
    let store = ArtifactStore::new(dir.path());

    let path = store.resolve("KeeperRegistry2_1").unwrap();
    assert!(path.ends_with("KeeperRegistry2_1.sol/KeeperRegistry2_1.json"));

    let loaded = store.load("KeeperRegistryLogicA2_1").unwrap();
    assert_eq!(loaded.collection.len(), 2);

    assert!(matches!(
        store.resolve("Unknown").unwrap_err(),
        ArtifactError::NotFound { .. }
    ));
}

#[test]
fn test_store_reports_ambiguous_names() {
    let dir = TempDir::new().unwrap();
    write_artifact(&dir.path().join("a"), "Shared", json!([]));
    write_artifact(&dir.path().join("b"), "Shared", json!([]));

    match ArtifactStore::new(dir.path()).resolve("Shared").unwrap_err() {
        ArtifactError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_bare_abi_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("IERC20.json");
    fs::write(
        &path,
        r#"[{"type":"function","name":"totalSupply","stateMutability":"view","inputs":[],"outputs":[]}]"#,
    )
    .unwrap();

    let collection = load_artifact(&path).unwrap();
    assert_eq!(collection.len(), 1);
}
