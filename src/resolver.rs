//! Rewrites client objects into the foreign-key form the REST API accepts
//!
//! iTop refuses to create or update an object through an external field
//! (`org_name`); it wants the external key (`org_id`) instead. The resolver
//! looks related records up through a [`Finder`] and swaps the fields. Rows
//! of indirect linked sets get the same treatment against their link class,
//! one level deep.

use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::datamodel::{DataModel, SchemaDocument, SchemaIndex};
use crate::error::{ItopError, ItopResult};

/// A client-side object: field name to value
pub type Object = Map<String, Value>;

/// Looks up a single record id by one field's value.
///
/// Timeouts and transient failures belong to the implementation; `Ok(None)`
/// means the record definitively does not exist.
#[async_trait]
pub trait Finder: Send + Sync {
    async fn find_one(&self, schema: &str, field: &str, value: &Value)
        -> ItopResult<Option<Value>>;
}

/// True for null, empty strings, `false`, zero and empty containers
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Applies a `SchemaIndex` to objects before they are written
pub struct ObjectResolver<D: DataModel = SchemaDocument> {
    index: Arc<SchemaIndex<D>>,
}

impl<D: DataModel> Clone for ObjectResolver<D> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
        }
    }
}

impl<D: DataModel> ObjectResolver<D> {
    pub fn new(index: Arc<SchemaIndex<D>>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &SchemaIndex<D> {
        &self.index
    }

    /// Rewrites `object` of class `schema` in place.
    ///
    /// External fields become their external keys, caller-supplied blank
    /// keys are dropped, and every row of a linked set is rewritten against
    /// the set's link class. A missing related record is a hard
    /// [`ItopError::Lookup`].
    pub async fn resolve<F>(&self, schema: &str, object: &mut Object, finder: &F) -> ItopResult<()>
    where
        F: Finder + ?Sized,
    {
        self.rewrite_external_fields(schema, object, finder).await?;

        let linked_sets = self.index.linked_sets(schema)?;
        for (field, linked_set) in linked_sets.iter() {
            let Some(Value::Array(rows)) = object.get_mut(field) else {
                continue;
            };
            for row in rows.iter_mut() {
                match row {
                    Value::Object(nested) => {
                        self.rewrite_external_fields(&linked_set.join_schema, nested, finder)
                            .await?
                    }
                    other => debug!("Leaving non-object row in '{}' untouched: {}", field, other),
                }
            }
        }
        Ok(())
    }

    /// Owned variant of [`ObjectResolver::resolve`]
    pub async fn resolved<F>(
        &self,
        schema: &str,
        mut object: Object,
        finder: &F,
    ) -> ItopResult<Object>
    where
        F: Finder + ?Sized,
    {
        self.resolve(schema, &mut object, finder).await?;
        Ok(object)
    }

    async fn rewrite_external_fields<F>(
        &self,
        schema: &str,
        object: &mut Object,
        finder: &F,
    ) -> ItopResult<()>
    where
        F: Finder + ?Sized,
    {
        let external_fields = self.index.external_fields(schema)?;

        let present: Vec<String> = object
            .keys()
            .filter(|field| external_fields.contains_key(*field))
            .cloned()
            .collect();

        let mut derived = HashSet::new();
        for field in present {
            let descriptor = &external_fields[&field];
            let value = object.remove(&field).unwrap_or(Value::Null);

            let key = if is_blank(&value) {
                Value::Null
            } else {
                debug!(
                    "Looking up {}.{} = {} for '{}'",
                    descriptor.target_schema, descriptor.target_field, value, field
                );
                finder
                    .find_one(&descriptor.target_schema, &descriptor.target_field, &value)
                    .await?
                    .ok_or_else(|| ItopError::Lookup {
                        field: field.clone(),
                        value: display_value(&value),
                        schema: descriptor.target_schema.clone(),
                        target_field: descriptor.target_field.clone(),
                    })?
            };

            object.insert(descriptor.foreign_key_field.clone(), key);
            derived.insert(descriptor.foreign_key_field.clone());
        }

        // Blank keys supplied by the caller would clear optional relations.
        let blank_keys: Vec<String> = external_fields
            .values()
            .map(|d| &d.foreign_key_field)
            .filter(|key| !derived.contains(*key))
            .filter(|key| object.get(*key).map(is_blank).unwrap_or(false))
            .cloned()
            .collect();
        for key in blank_keys {
            object.remove(&key);
        }

        Ok(())
    }
}
