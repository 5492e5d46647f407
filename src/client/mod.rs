//! Client for the iTop REST/JSON API
//!
//! `ItopClient` owns the transport and, when a data model is configured,
//! the `ObjectResolver` applied to every create and update. It is also the
//! `Finder` the resolver uses to look related records up.

pub mod envelope;
pub mod schema;
pub mod transport;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::datamodel::SchemaIndex;
use crate::error::{ItopError, ItopResult};
use crate::resolver::{Finder, Object, ObjectResolver};

pub use envelope::{Request, Response, ReturnCode};
pub use schema::{SchemaHandle, UpdateOptions};
pub use transport::{HttpTransport, Transport};

/// Connection to one iTop instance
pub struct ItopClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    resolver: Option<ObjectResolver>,
}

impl ItopClient {
    /// Connects over HTTP, checking the credentials and loading the
    /// configured data model.
    pub async fn connect(config: ClientConfig) -> ItopResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport)).await
    }

    /// Same as [`ItopClient::connect`] over an arbitrary transport
    pub async fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> ItopResult<Self> {
        config.validate()?;
        let mut client = Self {
            config,
            transport,
            resolver: None,
        };
        client.check_credentials().await?;

        if let Some(path) = client.config.data_model.clone() {
            let index = SchemaIndex::from_file(&path, client.config.index_options())?;
            info!(
                "Relationship resolution enabled with {} classes from {}",
                index.model().len(),
                path.display()
            );
            client.resolver = Some(ObjectResolver::new(Arc::new(index)));
        }
        Ok(client)
    }

    /// Uses `index` to resolve relationships on create and update
    pub fn with_data_model(mut self, index: SchemaIndex) -> Self {
        self.resolver = Some(ObjectResolver::new(Arc::new(index)));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resolver(&self) -> Option<&ObjectResolver> {
        self.resolver.as_ref()
    }

    /// Classes declared by the loaded data model, empty without one
    pub fn schemas(&self) -> Vec<String> {
        self.resolver
            .as_ref()
            .map(|r| r.index().schemas())
            .unwrap_or_default()
    }

    /// Handle for find/insert/update/remove/sync on one class
    pub fn schema<'a>(&'a self, name: &'a str) -> SchemaHandle<'a> {
        SchemaHandle::new(self, name)
    }

    /// Sends a request and flattens the returned objects
    pub async fn request(&self, request: &Request) -> ItopResult<Vec<Object>> {
        debug!(
            "{} {}",
            request.operation,
            request.class.as_deref().unwrap_or_default()
        );
        self.transport.send(request).await?.into_objects()
    }

    async fn check_credentials(&self) -> ItopResult<()> {
        let request = Request::check_credentials(&self.config.auth_user, &self.config.auth_pwd);
        let response = self.transport.send(&request).await?;
        if !ReturnCode(response.code).is_ok() {
            return Err(ItopError::Api {
                code: ReturnCode(response.code),
                message: response.message.unwrap_or_default(),
            });
        }
        // The endpoint answers code 0 with `authorized: false` for bad logins.
        if response.authorized == Some(false) {
            return Err(ItopError::Api {
                code: ReturnCode(1),
                message: format!("Invalid credentials for user '{}'", self.config.auth_user),
            });
        }
        info!("Authenticated against {}", self.config.url);
        Ok(())
    }
}

#[async_trait]
impl Finder for ItopClient {
    async fn find_one(
        &self,
        schema: &str,
        field: &str,
        value: &Value,
    ) -> ItopResult<Option<Value>> {
        let request = Request::get(schema, json!({ field: value }), "id");
        let objects = self.request(&request).await?;
        if objects.len() > 1 {
            warn!(
                "{} records of {} match {} = {}, using the first",
                objects.len(),
                schema,
                field,
                value
            );
        }
        Ok(objects.into_iter().next().and_then(|mut o| o.remove("id")))
    }
}
