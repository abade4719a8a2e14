//! # OctoFHIR HL7 v2
//!
//! A schema-driven structure repository for HL7 v2.x messages.
//!
//! Messages, groups and segments are built on demand from per-version slot
//! tables. Each table lists the named children a structure may hold, with
//! their cardinality and length limits. Nodes are created the first time
//! they are reached and are never removed. Repetitions are appended strictly
//! in order and within the declared bound.
//!
//! ## Features
//!
//! - **Schema tables as data**: versions ship as JSON documents resolved into
//!   immutable [`SchemaLibrary`] values shared by every message
//! - **Lazy materialization**: `get_*` accessors create what they reach,
//!   `peek` and friends never do
//! - **Primitive and composite elements** with HL7 one-based component access
//! - **Terser-style paths** such as `/PATIENT_RESULT/ORDER_OBSERVATION/OBX(1)-5`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octofhir_hl7v2::*;
//!
//! # fn example() -> Result<()> {
//! let registry = SchemaRegistry::embedded()?;
//! let mut message = registry.new_message(Hl7Version::V2_5, "ADT_A01")?;
//!
//! message.set("/MSH-9-1", "ADT")?;
//! message.set("/PID-5-1-1", "Doe")?;
//!
//! let pid = message.get_first(message.root(), "PID")?;
//! assert_eq!(message.count_repetitions(pid, "Patient Name")?, 1);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod model;
pub mod provider;
pub mod types;

pub use crate::core::{Hl7Version, LengthPolicy, ModelConfig};
pub use error::{Hl7Error, Result};
pub use model::{
    BranchingContainer, Field, FieldSpec, Group, Hl7Path, LengthViolation, Lookup, Message, Node,
    NodeId, PathStep, Segment, VacantRepetition,
};
pub use provider::SchemaRegistry;
pub use types::*;
