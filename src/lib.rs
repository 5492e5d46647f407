//! Client library for the iTop REST/JSON API
//!
//! The REST API accepts writes only through external keys, while callers
//! naturally speak in external fields (`org_name`) and linked-set rows. This
//! crate reads the iTop XML data model into a [`SchemaIndex`] and uses an
//! [`ObjectResolver`] to rewrite objects into the form the API accepts
//! before [`ItopClient`] sends them.

pub mod client;
pub mod config;
pub mod datamodel;
pub mod error;
pub mod parallel;
pub mod resolver;

// Re-export main types for convenience
pub use client::{
    HttpTransport, ItopClient, Request, Response, ReturnCode, SchemaHandle, Transport,
    UpdateOptions,
};
pub use config::ClientConfig;
pub use datamodel::{
    DataModel, ExternalFieldDescriptor, IndexOptions, LinkedSetDescriptor, Relationship,
    SchemaDocument, SchemaIndex,
};
pub use error::{ItopError, ItopResult};
pub use resolver::{is_blank, Finder, Object, ObjectResolver};
