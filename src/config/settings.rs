//! Typed view of the merged configuration.

use abi_merge_core::InspectionSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use super::effective::ConfigError;

/// An external command template. Arguments may contain `{placeholders}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub command: Vec<String>,
}

/// Renderer selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Pipe merged JSON into an external interface generator
    #[default]
    Command,
    /// Emit the merged JSON ABI itself
    Json,
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub kind: RendererKind,

    /// Command template (required for `kind = "command"`)
    #[serde(default)]
    pub command: Vec<String>,
}

/// One merged interface to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Name of the generated interface, e.g. `IAutomationRegistryMaster`
    pub interface_name: String,

    /// Path of the rendered artifact
    pub output: PathBuf,

    /// Contract names or artifact paths, in precedence order
    pub sources: Vec<String>,

    /// Replaces the global inspection list for this target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection_functions: Option<Vec<String>>,
}

/// Fully merged settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub artifacts_dir: PathBuf,
    pub inspection_functions: Vec<String>,
    pub header_prefix: String,
    pub solidity_version: String,
    pub license: String,

    #[serde(default)]
    pub compiler: Option<CommandConfig>,

    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub formatter: Option<CommandConfig>,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Settings {
    /// Check internal consistency. Targets may be empty here; commands
    /// that need them call [`Settings::require_targets`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(compiler) = &self.compiler {
            if compiler.command.is_empty() {
                return Err(ConfigError::Invalid(
                    "compiler.command must not be empty".to_string(),
                ));
            }
        }
        if let Some(formatter) = &self.formatter {
            if formatter.command.is_empty() {
                return Err(ConfigError::Invalid(
                    "formatter.command must not be empty".to_string(),
                ));
            }
        }
        if self.header_prefix.contains(['\n', '\r']) {
            return Err(ConfigError::Invalid(
                "header_prefix must fit on one line".to_string(),
            ));
        }
        if self.renderer.kind == RendererKind::Command && self.renderer.command.is_empty() {
            return Err(ConfigError::Invalid(
                "renderer.command must not be empty when renderer.kind = \"command\"".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if target.interface_name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "target interface_name must not be empty".to_string(),
                ));
            }
            if !names.insert(target.interface_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate target '{}'",
                    target.interface_name
                )));
            }
            if target.output.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "target '{}' has no output path",
                    target.interface_name
                )));
            }
            if target.sources.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "target '{}' has no sources",
                    target.interface_name
                )));
            }
        }
        Ok(())
    }

    pub fn require_targets(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid(
                "no [[targets]] configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Targets to process: all of them, or the one named.
    pub fn select_targets(&self, name: Option<&str>) -> Result<Vec<&TargetConfig>, ConfigError> {
        self.require_targets()?;
        match name {
            None => Ok(self.targets.iter().collect()),
            Some(name) => self
                .targets
                .iter()
                .find(|t| t.interface_name == name)
                .map(|t| vec![t])
                .ok_or_else(|| ConfigError::UnknownTarget(name.to_string())),
        }
    }

    /// Inspection set for a target: its own list if given, else the global one.
    pub fn inspection_for(&self, target: &TargetConfig) -> InspectionSet {
        let names = target
            .inspection_functions
            .as_ref()
            .unwrap_or(&self.inspection_functions);
        InspectionSet::new(names.iter().cloned())
    }
}
