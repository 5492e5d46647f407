pub mod document;
pub mod index;
pub mod types;

pub use document::{strip_namespaces, DataModel, SchemaDocument};
pub use index::{ExternalFields, IndexOptions, LinkedSets, SchemaIndex, DEFAULT_ROOT_SCHEMA};

// Re-export all types at the datamodel module level
pub use types::{
    ClassDecl, ExternalFieldDescriptor, FieldDecl, FieldKind, LinkedSetDescriptor, Relationship,
};
