//! Per-class operations: find, insert, update, remove, sync

use log::{debug, info};
use serde_json::Value;

use super::envelope::Request;
use super::ItopClient;
use crate::error::{ItopError, ItopResult};
use crate::parallel::bounded_map;
use crate::resolver::{is_blank, Object};

const SEVERAL_ITEMS: &str = "Several items";
const NO_ITEM_FOUND: &str = "No item found";

/// Behaviour of [`SchemaHandle::update`] when the query does not match
/// exactly one object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert `query` + `changes` when nothing matches
    pub upsert: bool,
    /// Update every match when several objects match
    pub multi: bool,
}

/// Operations on one class of an `ItopClient`
#[derive(Clone, Copy)]
pub struct SchemaHandle<'a> {
    client: &'a ItopClient,
    name: &'a str,
}

impl<'a> SchemaHandle<'a> {
    pub(super) fn new(client: &'a ItopClient, name: &'a str) -> Self {
        Self { client, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// The `key` member selecting what `query` describes: the id when the
    /// query carries one, the whole class when it is empty, otherwise the
    /// query itself as search criteria.
    pub fn key_for(&self, query: &Object) -> Value {
        if let Some(id) = query.get("id") {
            return id.clone();
        }
        if query.is_empty() {
            return Value::String(format!("SELECT {}", self.name));
        }
        Value::Object(query.clone())
    }

    /// Objects matching `query`, restricted to `projection` when non-empty
    pub async fn find(&self, query: &Object, projection: &[&str]) -> ItopResult<Vec<Object>> {
        let output_fields = if projection.is_empty() {
            "*".to_string()
        } else {
            projection.join(", ")
        };

        let request = Request::get(self.name, self.key_for(query), &output_fields);
        let mut objects = self.client.request(&request).await?;

        if !projection.is_empty() {
            for object in objects.iter_mut() {
                let dropped: Vec<String> = object
                    .keys()
                    .filter(|k| !projection.contains(&k.as_str()))
                    .cloned()
                    .collect();
                for key in dropped {
                    object.remove(&key);
                }
            }
        }
        Ok(objects)
    }

    /// Creates every object, at most `workers` requests in flight.
    ///
    /// Field names lose a leading `_` (reserved words), blank values are
    /// dropped, and relationships are resolved when a data model is loaded.
    /// Every object is attempted; the first failure is reported afterwards.
    pub async fn insert(&self, objects: Vec<Object>) -> ItopResult<Vec<Object>> {
        let total = objects.len();
        let results = bounded_map(objects, self.client.config().workers, |object| async move {
            let fields = self.prepare(clean(object)).await?;
            self.client
                .request(&Request::create(self.name, fields))
                .await
        })
        .await;

        let created = flatten(results)?;
        info!("Created {} of {} {} objects", created.len(), total, self.name);
        Ok(created)
    }

    /// Applies `changes` to the object selected by `query`
    pub async fn update(
        &self,
        query: &Object,
        changes: Object,
        options: UpdateOptions,
    ) -> ItopResult<Vec<Object>> {
        let changes = self.prepare(changes).await?;
        let request = Request::update(self.name, self.key_for(query), changes.clone());

        match self.client.request(&request).await {
            Ok(updated) => Ok(updated),
            Err(e) if e.api_message_contains(SEVERAL_ITEMS) && options.multi => {
                let matches = self.find(query, &["id"]).await?;
                debug!("Updating {} matches of {} one by one", matches.len(), self.name);
                let results = bounded_map(matches, self.client.config().workers, |found| {
                    let changes = changes.clone();
                    async move {
                        let key = found.get("id").cloned().unwrap_or(Value::Null);
                        self.client
                            .request(&Request::update(self.name, key, changes))
                            .await
                    }
                })
                .await;
                flatten(results)
            }
            Err(e) if e.api_message_contains(NO_ITEM_FOUND) => {
                if !options.upsert {
                    return Ok(Vec::new());
                }
                let mut object = query.clone();
                object.extend(changes);
                self.insert(vec![object]).await
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes the objects selected by `query`
    pub async fn remove(&self, query: &Object) -> ItopResult<Vec<Object>> {
        let request = Request::delete(self.name, self.key_for(query));
        self.client.request(&request).await
    }

    /// Upserts every object, matching existing ones on `keys`
    /// (`["name"]` when empty).
    pub async fn sync(&self, objects: Vec<Object>, keys: &[&str]) -> ItopResult<Vec<Object>> {
        let keys: Vec<&str> = if keys.is_empty() {
            vec!["name"]
        } else {
            keys.to_vec()
        };
        let keys = &keys;

        let options = UpdateOptions {
            upsert: true,
            multi: false,
        };
        let results = bounded_map(objects, self.client.config().workers, |object| async move {
            let query: Object = object
                .iter()
                .filter(|(field, _)| keys.contains(&field.as_str()))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect();
            if query.is_empty() {
                return Err(ItopError::InvalidQuery(format!(
                    "object carries none of the sync keys {:?}",
                    keys
                )));
            }
            self.update(&query, object, options).await
        })
        .await;
        flatten(results)
    }

    async fn prepare(&self, object: Object) -> ItopResult<Object> {
        match self.client.resolver() {
            Some(resolver) => resolver.resolved(self.name, object, self.client).await,
            None => Ok(object),
        }
    }
}

// Strips the reserved-word underscore and drops blank values.
fn clean(object: Object) -> Object {
    object
        .into_iter()
        .filter(|(_, value)| !is_blank(value))
        .map(|(field, value)| match field.strip_prefix('_') {
            Some(stripped) => (stripped.to_string(), value),
            None => (field, value),
        })
        .collect()
}

fn flatten(results: Vec<ItopResult<Vec<Object>>>) -> ItopResult<Vec<Object>> {
    let mut objects = Vec::new();
    for result in results {
        objects.extend(result?);
    }
    Ok(objects)
}
