//! External collaborators
//!
//! Compilation, rendering and formatting are delegated to external
//! tools behind three narrow synchronous traits, so the merge pipeline
//! can be driven with in-memory fakes.

mod command;

pub use command::{CommandSpec, Placeholders};

use abi_merge_core::{InterfaceCollection, InterfaceEntry};
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::config::{RendererKind, Settings};

/// Errors from external tools
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} command is empty")]
    EmptyCommand { tool: &'static str },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("renderer produced no output for {interface_name}")]
    EmptyOutput { interface_name: String },

    #[error("stdin writer thread panicked")]
    StdinThread,

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Produces one interface collection per compiled contract unit.
pub trait Compiler {
    /// Build step run once before any unit is loaded.
    fn prepare(&self) -> Result<(), ToolError> {
        Ok(())
    }

    fn compile(&self, unit: &str) -> Result<InterfaceCollection, ToolError>;
}

/// Turns a merged entry list into interface-definition source.
pub trait Renderer {
    fn render(&self, merged: &[InterfaceEntry], interface_name: &str) -> Result<Vec<u8>, ToolError>;
}

/// Rewrites a rendered file in place.
pub trait Formatter {
    fn format(&self, path: &Path) -> Result<(), ToolError>;
}

/// Loads compiled artifacts, optionally running a build command first.
#[derive(Debug)]
pub struct ArtifactCompiler {
    build: Option<CommandSpec>,
    store: ArtifactStore,
    built: OnceLock<()>,
}

impl ArtifactCompiler {
    pub fn new(store: ArtifactStore, build: Option<CommandSpec>) -> Self {
        Self {
            build,
            store,
            built: OnceLock::new(),
        }
    }
}

impl Compiler for ArtifactCompiler {
    fn prepare(&self) -> Result<(), ToolError> {
        let Some(build) = &self.build else {
            return Ok(());
        };
        if self.built.get().is_some() {
            return Ok(());
        }
        info!(command = %build.display(), "compiling contracts");
        build.run(None)?;
        let _ = self.built.set(());
        Ok(())
    }

    fn compile(&self, unit: &str) -> Result<InterfaceCollection, ToolError> {
        Ok(self.store.load(unit)?.collection)
    }
}

/// Pipes the merged JSON ABI into an external generator, e.g. abi-to-sol.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    template: Vec<String>,
    vars: Placeholders,
}

impl CommandRenderer {
    pub fn new(template: Vec<String>, vars: Placeholders) -> Self {
        Self { template, vars }
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, merged: &[InterfaceEntry], interface_name: &str) -> Result<Vec<u8>, ToolError> {
        let vars = self.vars.clone().with("interface_name", interface_name);
        let spec = CommandSpec::from_template("renderer", &self.template, &vars)?;
        let stdout = spec.run(Some(serde_json::to_vec(merged)?))?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(ToolError::EmptyOutput {
                interface_name: interface_name.to_string(),
            });
        }
        Ok(stdout)
    }
}

/// Emits the merged entries as a pretty-printed JSON ABI.
///
/// The pipeline prefixes every artifact with the checksum header, so a
/// published `.json` file is a header line followed by the JSON document.
/// Consumers parse from the second line on.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, merged: &[InterfaceEntry], _interface_name: &str) -> Result<Vec<u8>, ToolError> {
        let mut bytes = serde_json::to_vec_pretty(merged)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Runs a formatter command with `{path}` bound to the file.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    template: Vec<String>,
}

impl CommandFormatter {
    pub fn new(template: Vec<String>) -> Self {
        Self { template }
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, path: &Path) -> Result<(), ToolError> {
        let vars = Placeholders::new().with("path", path.to_string_lossy());
        CommandSpec::from_template("formatter", &self.template, &vars)?.run(None)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, _path: &Path) -> Result<(), ToolError> {
        Ok(())
    }
}

/// The three collaborators a pipeline runs with.
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub renderer: Box<dyn Renderer>,
    pub formatter: Box<dyn Formatter>,
}

impl Toolchain {
    pub fn new(
        compiler: Box<dyn Compiler>,
        renderer: Box<dyn Renderer>,
        formatter: Box<dyn Formatter>,
    ) -> Self {
        Self {
            compiler,
            renderer,
            formatter,
        }
    }

    /// Command-backed collaborators as configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, ToolError> {
        let vars = Placeholders::new()
            .with("solidity_version", settings.solidity_version.as_str())
            .with("license", settings.license.as_str());

        let build = settings
            .compiler
            .as_ref()
            .map(|c| CommandSpec::from_template("compiler", &c.command, &vars))
            .transpose()?;
        let compiler = ArtifactCompiler::new(ArtifactStore::new(&settings.artifacts_dir), build);

        let renderer: Box<dyn Renderer> = match settings.renderer.kind {
            RendererKind::Json => Box::new(JsonRenderer),
            RendererKind::Command => {
                if settings.renderer.command.is_empty() {
                    return Err(ToolError::EmptyCommand { tool: "renderer" });
                }
                Box::new(CommandRenderer::new(settings.renderer.command.clone(), vars))
            }
        };

        let formatter: Box<dyn Formatter> = match &settings.formatter {
            Some(f) => Box::new(CommandFormatter::new(f.command.clone())),
            None => Box::new(NoopFormatter),
        };

        Ok(Self::new(Box::new(compiler), renderer, formatter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi_merge_core::Mutability;

    #[test]
    fn test_json_renderer_roundtrips() {
        let merged = vec![InterfaceEntry::function("checkUpkeep", Mutability::View)];
        let bytes = JsonRenderer.render(&merged, "IMaster").unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));

        let parsed: Vec<InterfaceEntry> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, merged);
    }

    #[test]
    fn test_compiler_without_build_loads_only() {
        let compiler = ArtifactCompiler::new(ArtifactStore::new("missing-dir"), None);
        assert!(compiler.prepare().is_ok());
        assert!(matches!(
            compiler.compile("Nope"),
            Err(ToolError::Artifact(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_passes_interface_name() {
        let renderer = CommandRenderer::new(
            vec!["sh".into(), "-c".into(), "cat >/dev/null; echo interface $0".into(), "{interface_name}".into()],
            Placeholders::new(),
        );
        let out = renderer.render(&[], "IMaster").unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "interface IMaster");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_rejects_empty_output() {
        let renderer = CommandRenderer::new(
            vec!["sh".into(), "-c".into(), "cat >/dev/null".into()],
            Placeholders::new(),
        );
        assert!(matches!(
            renderer.render(&[], "IMaster"),
            Err(ToolError::EmptyOutput { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_build_runs_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("count");
        let build = CommandSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                format!("echo x >> {}", marker.display()),
            ],
        };
        let compiler = ArtifactCompiler::new(ArtifactStore::new(dir.path()), Some(build));
        compiler.prepare().unwrap();
        compiler.prepare().unwrap();

        let runs = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(runs.lines().count(), 1);
    }
}
