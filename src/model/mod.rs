pub mod container;
pub mod message;
pub mod node;
pub mod path;

pub use container::{BranchingContainer, Lookup, VacantRepetition};
pub use message::{LengthViolation, Message};
pub use node::{Field, Group, Node, NodeId, Segment};
pub use path::{FieldSpec, Hl7Path, PathStep};
