//! Built-in defaults (layer 1)

use abi_merge_core::DEFAULT_INSPECTION_FUNCTIONS;
use serde::{Deserialize, Serialize};

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "abi-merge.toml";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Directory holding compiled JSON artifacts (default: "artifacts")
    pub artifacts_dir: String,

    /// Functions forced to `view` in the merged interface
    pub inspection_functions: Vec<String>,

    /// Comment leader written before `abi-checksum:` (default: "// ")
    pub header_prefix: String,

    /// Solidity pragma handed to the renderer (default: "^0.8.4")
    pub solidity_version: String,

    /// SPDX license handed to the renderer (default: "MIT")
    pub license: String,

    /// Renderer command template
    pub renderer_command: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            artifacts_dir: "artifacts".to_string(),
            inspection_functions: DEFAULT_INSPECTION_FUNCTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            header_prefix: "// ".to_string(),
            solidity_version: "^0.8.4".to_string(),
            license: "MIT".to_string(),
            renderer_command: [
                "pnpm",
                "abi-to-sol",
                "--solidity-version",
                "{solidity_version}",
                "--license",
                "{license}",
                "{interface_name}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "artifacts_dir": self.artifacts_dir,
            "inspection_functions": self.inspection_functions,
            "header_prefix": self.header_prefix,
            "solidity_version": self.solidity_version,
            "license": self.license,
            "compiler": null,
            "renderer": {
                "kind": "command",
                "command": self.renderer_command
            },
            "formatter": null,
            "targets": []
        })
    }
}
