//! External command templates

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, trace};

use super::ToolError;

/// Values substituted for `{name}` in command arguments.
#[derive(Debug, Clone, Default)]
pub struct Placeholders(BTreeMap<&'static str, String>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    /// Replace every known `{key}` in `arg`. Unknown braces are left as is.
    pub fn expand(&self, arg: &str) -> String {
        let mut out = arg.to_string();
        for (key, value) in &self.0 {
            out = out.replace(&format!("{{{}}}", key), value);
        }
        out
    }
}

/// A resolved program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Expand a template; the first element is the program.
    pub fn from_template(
        tool: &'static str,
        template: &[String],
        vars: &Placeholders,
    ) -> Result<Self, ToolError> {
        let (program, args) = template
            .split_first()
            .ok_or(ToolError::EmptyCommand { tool })?;
        Ok(Self {
            program: vars.expand(program),
            args: args.iter().map(|a| vars.expand(a)).collect(),
        })
    }

    /// Shell-like rendering for logs and errors
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion, optionally feeding `input` on stdin.
    ///
    /// Returns stdout. A non-zero exit is an error carrying stderr.
    pub fn run(&self, input: Option<Vec<u8>>) -> Result<Vec<u8>, ToolError> {
        debug!(command = %self.display(), "running external tool");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // The child may fill stdout before it has read all of stdin.
        let writer = match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => Some(thread::spawn(move || stdin.write_all(&bytes))),
            _ => None,
        };

        let output = child.wait_with_output()?;

        if let Some(handle) = writer {
            match handle.join() {
                // Broken pipe here surfaces through the exit status.
                Ok(Err(e)) => trace!(error = %e, "stdin write interrupted"),
                Ok(Ok(())) => {}
                Err(_) => return Err(ToolError::StdinThread),
            }
        }

        if !output.status.success() {
            return Err(ToolError::Failed {
                command: self.display(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
