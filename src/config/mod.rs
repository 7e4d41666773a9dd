//! Configuration
//!
//! Three layers merged as JSON values, last wins:
//! 1. Built-in defaults
//! 2. Config file (abi-merge.toml)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::{BuiltinDefaults, DEFAULT_CONFIG_PATH};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use settings::{CommandConfig, RendererConfig, RendererKind, Settings, TargetConfig};
