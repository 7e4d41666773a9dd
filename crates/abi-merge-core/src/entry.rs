//! Interface entry types.
//!
//! An entry mirrors one element of a compiled contract's JSON ABI. The
//! typed fields are the ones the merger interprets; everything else is
//! kept verbatim in `fields` so entries round-trip to the shape they
//! were read in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// JSON keys owned by the typed fields of [`InterfaceEntry`].
pub const RESERVED_KEYS: &[&str] = &["type", "name", "stateMutability"];

/// Discriminant of an interface entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Function,
    Event,
    Error,
    Constructor,
    Fallback,
    Receive,
}

impl EntryKind {
    /// Whether entries of this kind must carry a name.
    pub fn is_named(self) -> bool {
        matches!(self, EntryKind::Function | EntryKind::Event | EntryKind::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Function => "function",
            EntryKind::Event => "event",
            EntryKind::Error => "error",
            EntryKind::Constructor => "constructor",
            EntryKind::Fallback => "fallback",
            EntryKind::Receive => "receive",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared read/write classification of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl Mutability {
    pub fn as_str(self) -> &'static str {
        match self {
            Mutability::Pure => "pure",
            Mutability::View => "view",
            Mutability::Nonpayable => "nonpayable",
            Mutability::Payable => "payable",
        }
    }
}

impl std::fmt::Display for Mutability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an entry cannot be canonically serialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// The opaque field bag shadows a typed field
    #[error("field '{0}' is reserved and may not appear in the field bag")]
    ReservedField(String),

    /// A function, event or error without a name
    #[error("{0} entry has no name")]
    MissingName(EntryKind),

    /// JCS serialization rejected the entry
    #[error("canonical serialization failed: {0}")]
    Canonicalization(String),
}

/// One contract-level member: function, event, error, constructor,
/// fallback or receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceEntry {
    /// Entry discriminant (`type` in the JSON ABI)
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Member name (absent for constructor, fallback and receive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Declared mutability (`stateMutability` in the JSON ABI)
    #[serde(
        rename = "stateMutability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<Mutability>,

    /// Remaining descriptive fields: inputs, outputs, anonymous, ...
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl InterfaceEntry {
    /// Create an entry with no descriptive fields.
    pub fn new(kind: EntryKind, name: Option<&str>, state_mutability: Option<Mutability>) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
            state_mutability,
            fields: Map::new(),
        }
    }

    /// Shorthand for a named function entry.
    pub fn function(name: &str, state_mutability: Mutability) -> Self {
        Self::new(EntryKind::Function, Some(name), Some(state_mutability))
    }

    /// Attach a descriptive field.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Check the entry can be serialized without ambiguity.
    pub fn validate(&self) -> Result<(), EntryError> {
        if let Some(key) = RESERVED_KEYS.iter().find(|k| self.fields.contains_key(**k)) {
            return Err(EntryError::ReservedField((*key).to_string()));
        }
        if self.kind.is_named() && self.name.as_deref().map_or(true, str::is_empty) {
            return Err(EntryError::MissingName(self.kind));
        }
        Ok(())
    }

    /// Human-readable label used in diagnostics, e.g. `function checkUpkeep`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", self.kind, name),
            None => self.kind.to_string(),
        }
    }
}

/// Problems turning raw JSON into a collection.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("interface collection must be a JSON array, found {found}")]
    NotAnArray { found: &'static str },

    #[error("entry {index} is not a valid interface entry: {source}")]
    MalformedEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Ordered entry list from one compiled contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceCollection(Vec<InterfaceEntry>);

impl InterfaceCollection {
    pub fn new(entries: Vec<InterfaceEntry>) -> Self {
        Self(entries)
    }

    /// Decode a JSON ABI array, reporting the first entry that fails.
    pub fn from_value(value: Value) -> Result<Self, CollectionError> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(CollectionError::NotAnArray {
                    found: json_type_name(&other),
                })
            }
        };

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item)
                    .map_err(|source| CollectionError::MalformedEntry { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[InterfaceEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterfaceEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<InterfaceEntry>> for InterfaceCollection {
    fn from(entries: Vec<InterfaceEntry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a InterfaceCollection {
    type Item = &'a InterfaceEntry;
    type IntoIter = std::slice::Iter<'a, InterfaceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
