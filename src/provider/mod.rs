pub mod embedded;
pub mod registry;

pub use embedded::{embedded_library, embedded_source, embedded_versions};
pub use registry::SchemaRegistry;
