//! Checksum header of emitted artifacts
//!
//! Every artifact starts with one comment line recording the input
//! checksum, e.g. `// abi-checksum: 3f1c...`. Later runs recompute the
//! checksum and compare to detect stale interfaces.

use abi_merge_core::AggregateChecksum;
use regex_lite::Regex;
use std::sync::OnceLock;

/// Literal key of the header line
pub const CHECKSUM_KEY: &str = "abi-checksum:";

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?://+|#+|;+|--)\s*)?abi-checksum:\s*([0-9a-fA-F]{64})\s*$")
            .expect("static regex is valid")
    })
}

/// Header line for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumHeader {
    checksum: AggregateChecksum,
    prefix: String,
}

impl ChecksumHeader {
    pub fn new(checksum: AggregateChecksum, prefix: impl Into<String>) -> Self {
        Self {
            checksum,
            prefix: prefix.into(),
        }
    }

    pub fn checksum(&self) -> &AggregateChecksum {
        &self.checksum
    }

    /// The header line, without newline.
    pub fn line(&self) -> String {
        format!("{}{} {}", self.prefix, CHECKSUM_KEY, self.checksum)
    }

    /// Header line, newline, then the rendered body.
    pub fn prepend(&self, body: &[u8]) -> Vec<u8> {
        let line = self.line();
        let mut out = Vec::with_capacity(line.len() + 1 + body.len());
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(body);
        out
    }
}

/// Find the recorded checksum in an artifact, if any.
///
/// Recognizes the `//`, `#`, `;` and `--` comment leaders.
pub fn read_checksum(text: &str) -> Option<AggregateChecksum> {
    find_checksum(header_regex(), text)
}

/// Like [`read_checksum`], but also recognizes lines led by `prefix`,
/// the configured leader the header was written with.
pub fn read_checksum_with_prefix(text: &str, prefix: &str) -> Option<AggregateChecksum> {
    let leader = prefix.trim();
    if leader.is_empty() {
        return read_checksum(text);
    }
    let pattern = format!(
        r"^\s*{}\s*abi-checksum:\s*([0-9a-fA-F]{{64}})\s*$",
        regex_lite::escape(leader)
    );
    match Regex::new(&pattern) {
        Ok(re) => find_checksum(&re, text).or_else(|| read_checksum(text)),
        Err(_) => read_checksum(text),
    }
}

fn find_checksum(re: &Regex, text: &str) -> Option<AggregateChecksum> {
    text.lines()
        .find_map(|line| re.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str()))
        .and_then(AggregateChecksum::from_hex)
}
