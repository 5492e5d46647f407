//! Relationship index over a loaded data model
//!
//! `SchemaIndex` answers "which fields of this class are external fields /
//! linked sets" and memoizes every answer per class name. The document is
//! immutable, so cache entries are never invalidated. Concurrent first
//! access to the same class may compute the entry twice; both results are
//! equal and the first one stored wins.

use dashmap::DashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::document::{DataModel, SchemaDocument};
use super::types::{
    ClassDecl, ExternalFieldDescriptor, FieldKind, LinkedSetDescriptor, Relationship,
};
use crate::error::{ItopError, ItopResult};

/// Default universal root of the iTop class tree
pub const DEFAULT_ROOT_SCHEMA: &str = "cmdbAbstractObject";

pub type ExternalFields = HashMap<String, ExternalFieldDescriptor>;
pub type LinkedSets = HashMap<String, LinkedSetDescriptor>;

/// Options controlling relationship resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Ancestor that contributes no inherited relationships
    pub root_schema: String,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            root_schema: DEFAULT_ROOT_SCHEMA.to_string(),
        }
    }
}

/// Lazily populated, per-class relationship cache over a data model
pub struct SchemaIndex<D: DataModel = SchemaDocument> {
    model: D,
    options: IndexOptions,
    external_fields: DashMap<String, Arc<ExternalFields>>,
    linked_sets: DashMap<String, Arc<LinkedSets>>,
}

impl SchemaIndex<SchemaDocument> {
    /// Parses a data-model document and builds an empty index over it
    pub fn load(xml: &str) -> ItopResult<Self> {
        Ok(Self::new(SchemaDocument::parse(xml)?, IndexOptions::default()))
    }

    /// Reads a data-model file and builds an index over it
    pub fn from_file<P: AsRef<Path>>(path: P, options: IndexOptions) -> ItopResult<Self> {
        Ok(Self::new(SchemaDocument::from_file(path)?, options))
    }
}

impl<D: DataModel> SchemaIndex<D> {
    pub fn new(model: D, options: IndexOptions) -> Self {
        Self {
            model,
            options,
            external_fields: DashMap::new(),
            linked_sets: DashMap::new(),
        }
    }

    /// The underlying document accessor
    pub fn model(&self) -> &D {
        &self.model
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// All identified classes, in document order
    pub fn schemas(&self) -> Vec<String> {
        self.model.schemas()
    }

    /// External fields of `schema`, merged down its inheritance chain.
    ///
    /// A class's own declarations override inherited ones with the same
    /// field id. The configured root schema contributes nothing.
    pub fn external_fields(&self, schema: &str) -> ItopResult<Arc<ExternalFields>> {
        if let Some(hit) = self.external_fields.get(schema) {
            return Ok(Arc::clone(hit.value()));
        }

        let class = self.class(schema)?;
        let mut own = ExternalFields::new();
        for field in &class.fields {
            if let FieldKind::ExternalField {
                key_field,
                target_field,
            } = &field.kind
            {
                let key_field = required(schema, &field.id, key_field, "extkey_attcode")?;
                let target_field = required(schema, &field.id, target_field, "target_attcode")?;
                let target_schema = self.key_target(class, &key_field)?;
                own.insert(
                    field.id.clone(),
                    ExternalFieldDescriptor {
                        foreign_key_field: key_field,
                        target_schema,
                        target_field,
                    },
                );
            }
        }

        let merged = match self.inherited_parent(class) {
            Some(parent) => {
                let mut merged = (*self.external_fields(parent)?).clone();
                merged.extend(own);
                merged
            }
            None => own,
        };

        debug!("Cached {} external fields for '{}'", merged.len(), schema);
        let entry = self
            .external_fields
            .entry(schema.to_string())
            .or_insert_with(|| Arc::new(merged));
        Ok(Arc::clone(entry.value()))
    }

    /// Indirect linked sets declared directly on `schema` (not inherited)
    pub fn linked_sets(&self, schema: &str) -> ItopResult<Arc<LinkedSets>> {
        if let Some(hit) = self.linked_sets.get(schema) {
            return Ok(Arc::clone(hit.value()));
        }

        let class = self.class(schema)?;
        let mut own = LinkedSets::new();
        for field in &class.fields {
            if let FieldKind::LinkedSetIndirect {
                linked_class,
                key_to_me,
                key_to_remote,
            } = &field.kind
            {
                own.insert(
                    field.id.clone(),
                    LinkedSetDescriptor {
                        join_schema: required(schema, &field.id, linked_class, "linked_class")?,
                        key_to_owner: required(schema, &field.id, key_to_me, "ext_key_to_me")?,
                        key_to_remote: required(
                            schema,
                            &field.id,
                            key_to_remote,
                            "ext_key_to_remote",
                        )?,
                    },
                );
            }
        }

        debug!("Cached {} linked sets for '{}'", own.len(), schema);
        let entry = self
            .linked_sets
            .entry(schema.to_string())
            .or_insert_with(|| Arc::new(own));
        Ok(Arc::clone(entry.value()))
    }

    /// Both relationship kinds of `schema` as one tagged map
    pub fn relationships(&self, schema: &str) -> ItopResult<HashMap<String, Relationship>> {
        let mut relationships: HashMap<String, Relationship> = self
            .external_fields(schema)?
            .iter()
            .map(|(field, descriptor)| (field.clone(), Relationship::External(descriptor.clone())))
            .collect();
        for (field, descriptor) in self.linked_sets(schema)?.iter() {
            relationships.insert(field.clone(), Relationship::LinkedSet(descriptor.clone()));
        }
        Ok(relationships)
    }

    fn class(&self, schema: &str) -> ItopResult<&ClassDecl> {
        self.model
            .class(schema)
            .ok_or_else(|| ItopError::SchemaNotFound(schema.to_string()))
    }

    // Parent whose relationships are merged in; None at the root or when the
    // parent is not declared in this document.
    fn inherited_parent<'a>(&self, class: &'a ClassDecl) -> Option<&'a str> {
        let parent = class.parent.as_deref()?;
        if parent == self.options.root_schema {
            return None;
        }
        if self.model.class(parent).is_none() {
            warn!(
                "Parent '{}' of '{}' is not declared, treating '{}' as a root",
                parent, class.id, class.id
            );
            return None;
        }
        Some(parent)
    }

    // Resolves the class an external key points to. The key is searched on
    // the class itself first, then up the inheritance chain.
    fn key_target(&self, class: &ClassDecl, key_field: &str) -> ItopResult<String> {
        let mut current = Some(class);
        while let Some(decl) = current {
            if let Some(key) = decl.field(key_field) {
                return match &key.kind {
                    FieldKind::HierarchicalKey => Ok(class.id.clone()),
                    FieldKind::ExternalKey {
                        target_class: Some(target),
                    } => Ok(target.clone()),
                    FieldKind::ExternalKey { target_class: None } => Err(ItopError::malformed(
                        &decl.id,
                        key_field,
                        "external key lacks <target_class>",
                    )),
                    other => Err(ItopError::malformed(
                        &decl.id,
                        key_field,
                        format!("{} is not an external key", other.type_tag()),
                    )),
                };
            }
            current = decl.parent.as_deref().and_then(|p| self.model.class(p));
        }
        Err(ItopError::malformed(
            &class.id,
            key_field,
            "key field is not declared on the class or its ancestors",
        ))
    }
}

fn required(
    schema: &str,
    field: &str,
    value: &Option<String>,
    element: &str,
) -> ItopResult<String> {
    value
        .clone()
        .ok_or_else(|| ItopError::malformed(schema, field, format!("missing <{}>", element)))
}
