//! Shared fixtures for the integration tests
//!
//! In-memory stand-ins for the remote side (`MockFinder`, `ScriptedTransport`)
//! and a document accessor that counts how often it is consulted.

#![allow(dead_code)]

use async_trait::async_trait;
use itop_client::datamodel::{ClassDecl, DataModel, SchemaDocument};
use itop_client::{Finder, ItopResult, Object, Request, Response};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// The iTop data-model fixture shared by all tests
pub const DATAMODEL: &str = include_str!("fixtures/datamodel.xml");

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn document() -> SchemaDocument {
    SchemaDocument::parse(DATAMODEL).expect("fixture data model parses")
}

/// Builds an `Object` from a `json!` literal
pub fn object(value: Value) -> Object {
    value
        .as_object()
        .cloned()
        .expect("object literal")
}

/// `DataModel` wrapper counting class lookups
pub struct CountingModel {
    inner: SchemaDocument,
    lookups: AtomicUsize,
}

impl CountingModel {
    pub fn new(inner: SchemaDocument) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DataModel for CountingModel {
    fn schemas(&self) -> Vec<String> {
        self.inner.schemas()
    }

    fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.class(name)
    }
}

/// `Finder` answering from a fixed table of (schema, field, value) -> id
#[derive(Default)]
pub struct MockFinder {
    records: HashMap<(String, String, String), Value>,
    calls: Mutex<Vec<(String, String, Value)>>,
}

impl MockFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, schema: &str, field: &str, value: Value, id: Value) -> Self {
        self.records
            .insert((schema.to_string(), field.to_string(), value.to_string()), id);
        self
    }

    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Finder for MockFinder {
    async fn find_one(
        &self,
        schema: &str,
        field: &str,
        value: &Value,
    ) -> ItopResult<Option<Value>> {
        self.calls
            .lock()
            .unwrap()
            .push((schema.to_string(), field.to_string(), value.clone()));
        let key = (schema.to_string(), field.to_string(), value.to_string());
        Ok(self.records.get(&key).cloned())
    }
}

type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// `Transport` recording every request and answering through a handler
pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than the credential check
    pub fn operations(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.operation != "core/check_credentials")
            .collect()
    }
}

#[async_trait]
impl itop_client::Transport for ScriptedTransport {
    async fn send(&self, request: &Request) -> ItopResult<Response> {
        self.requests.lock().unwrap().push(request.clone());
        Ok((self.handler)(request))
    }
}

/// Successful reply carrying `(class, key, fields)` objects
pub fn ok_response(objects: Vec<(&str, Value, Value)>) -> Response {
    let mut map = serde_json::Map::new();
    for (class, key, fields) in objects {
        let key_text = match &key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        map.insert(
            format!("{}::{}", class, key_text),
            json!({ "code": 0, "message": "", "class": class, "key": key, "fields": fields }),
        );
    }
    serde_json::from_value(json!({ "code": 0, "message": "", "objects": map }))
        .expect("valid response")
}

/// Failed reply with the given code and message
pub fn error_response(code: i64, message: &str) -> Response {
    serde_json::from_value(json!({ "code": code, "message": message, "objects": null }))
        .expect("valid response")
}

/// Reply to `core/check_credentials`
pub fn credentials_response(authorized: bool) -> Response {
    serde_json::from_value(json!({ "code": 0, "message": "", "authorized": authorized }))
        .expect("valid response")
}
