pub mod element;
pub mod schema;
pub mod slot;

pub use element::{Component, Composite, Element, Primitive};
pub use schema::{
    ChildDefinition, ComponentDefinition, DataTypeDefinition, FieldDefinition, GroupDefinition,
    SchemaDocument, SchemaLibrary, SchemaLibraryBuilder, SegmentDefinition,
};
pub use slot::{MaxOccurs, SlotDeclaration, SlotKind, SlotTable};
