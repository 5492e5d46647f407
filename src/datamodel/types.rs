//! Declarations and relationship descriptors of the iTop data model
//!
//! `ClassDecl` and `FieldDecl` are the load-time view of the document; the
//! descriptor types are what `SchemaIndex` hands out after resolving a
//! schema's relationships.

use serde::{Deserialize, Serialize};

/// Type tag of an external (denormalized display) field
pub const EXTERNAL_FIELD: &str = "AttributeExternalField";
/// Type tag of a foreign key to another class
pub const EXTERNAL_KEY: &str = "AttributeExternalKey";
/// Type tag of a self-referencing parent pointer
pub const HIERARCHICAL_KEY: &str = "AttributeHierarchicalKey";
/// Type tag of an n:n relation materialized through a link class
pub const LINKED_SET_INDIRECT: &str = "AttributeLinkedSetIndirect";

/// Closed classification of a `<field>` declaration.
///
/// Sub-elements stay optional here: a missing one only becomes an error
/// when a relationship query actually needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    ExternalField {
        key_field: Option<String>,
        target_field: Option<String>,
    },
    ExternalKey {
        target_class: Option<String>,
    },
    HierarchicalKey,
    LinkedSetIndirect {
        linked_class: Option<String>,
        key_to_me: Option<String>,
        key_to_remote: Option<String>,
    },
    Other(String),
}

impl FieldKind {
    /// The raw type tag this kind was classified from
    pub fn type_tag(&self) -> &str {
        match self {
            FieldKind::ExternalField { .. } => EXTERNAL_FIELD,
            FieldKind::ExternalKey { .. } => EXTERNAL_KEY,
            FieldKind::HierarchicalKey => HIERARCHICAL_KEY,
            FieldKind::LinkedSetIndirect { .. } => LINKED_SET_INDIRECT,
            FieldKind::Other(tag) => tag,
        }
    }
}

/// One `<field>` of a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub id: String,
    pub kind: FieldKind,
}

/// One class of the data model, with its parent pointer and own fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub id: String,
    pub parent: Option<String>,
    pub fields: Vec<FieldDecl>,
}

impl ClassDecl {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Looks up one of this class's own fields
    pub fn field(&self, id: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// A field that denotes "the `target_field` of a related `target_schema` record".
///
/// The remote service wants `foreign_key_field` set to the related id instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalFieldDescriptor {
    pub foreign_key_field: String,
    pub target_schema: String,
    pub target_field: String,
}

/// A field holding join-table rows of `join_schema`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkedSetDescriptor {
    pub join_schema: String,
    pub key_to_owner: String,
    pub key_to_remote: String,
}

/// Either kind of relationship a field can carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relationship {
    External(ExternalFieldDescriptor),
    LinkedSet(LinkedSetDescriptor),
}
