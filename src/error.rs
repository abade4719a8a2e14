use thiserror::Error;

use crate::core::Hl7Version;

#[derive(Error, Debug)]
pub enum Hl7Error {
    #[error("Slot '{name}' is already declared in '{table}'")]
    DuplicateSlot { table: String, name: String },

    #[error("'{container}' has no slot named '{name}'")]
    UnknownSlot { container: String, name: String },

    #[error("Element {index} doesn't exist in {arity}-element composite '{type_name}'")]
    IndexOutOfRange {
        type_name: String,
        index: i64,
        arity: usize,
    },

    #[error(
        "Can't create repetition {requested} of '{slot}' in '{container}': only {count} repetition(s) exist"
    )]
    RepetitionOutOfSequence {
        container: String,
        slot: String,
        requested: usize,
        count: usize,
    },

    #[error(
        "Can't create repetition {requested} of '{slot}' in '{container}': at most {max_occurs} allowed"
    )]
    MaxOccursExceeded {
        container: String,
        slot: String,
        requested: usize,
        max_occurs: u32,
    },

    #[error("Expected a {expected} node, found a {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unknown {kind} '{name}' in HL7 {version}")]
    UnknownStructure {
        kind: &'static str,
        name: String,
        version: Hl7Version,
    },

    #[error("'{owner}' refers to unknown {kind} '{name}'")]
    UnresolvedReference {
        owner: String,
        kind: &'static str,
        name: String,
    },

    #[error("Data type '{name}' contains itself")]
    RecursiveDataType { name: String },

    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("No schema library registered for HL7 {version}")]
    UnsupportedVersion { version: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Hl7Error {
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for the errors raised by the structure repository itself: bad
    /// names, bad repetitions and bad ordinals.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSlot { .. }
                | Self::UnknownSlot { .. }
                | Self::IndexOutOfRange { .. }
                | Self::RepetitionOutOfSequence { .. }
                | Self::MaxOccursExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Hl7Error>;
