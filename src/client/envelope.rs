//! Request/response envelope of the iTop REST/JSON API
//!
//! Every call is a single POST carrying `version`, `auth_user`, `auth_pwd`
//! and a `json_data` document naming the operation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{ItopError, ItopResult};
use crate::resolver::Object;

/// Return code of the REST API, displayed with its meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCode(pub i64);

impl ReturnCode {
    pub const OK: ReturnCode = ReturnCode(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, describe_code(self.0))
    }
}

/// Meaning of a REST API return code
pub fn describe_code(code: i64) -> &'static str {
    match code {
        0 => "OK - No issue has been encountered",
        1 => "UNAUTHORIZED - Missing/wrong credentials or the user does not have enough rights to perform the requested operation",
        2 => "MISSING_VERSION - The parameter 'version' is missing",
        3 => "MISSING_JSON - The parameter 'json_data' is missing",
        4 => "INVALID_JSON - The input structure is not valid JSON string",
        5 => "MISSING_AUTH_USER - The parameter 'auth_user' is missing",
        6 => "MISSING_AUTH_PWD - The parameter 'auth_pwd' is missing",
        10 => "UNSUPPORTED_VERSION - No operation is available for the specified version",
        11 => "UNKNOWN_OPERATION - The requested operation is not valid for the specified version",
        12 => "UNSAFE - The requested operation cannot be performed because it can cause data (integrity) loss",
        100 => "INTERNAL_ERROR - The operation could not be performed, see the message for troubleshooting",
        _ => "UNKNOWN_ERROR - Not specified by iTop",
    }
}

/// The `json_data` document of one API call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Request {
    fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            comment: None,
            class: None,
            key: None,
            output_fields: None,
            fields: None,
            user: None,
            password: None,
        }
    }

    pub fn check_credentials(user: &str, password: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            password: Some(password.to_string()),
            ..Self::new("core/check_credentials")
        }
    }

    pub fn get(class: &str, key: Value, output_fields: &str) -> Self {
        Self {
            comment: Some(format!("Get {}", class)),
            class: Some(class.to_string()),
            key: Some(key),
            output_fields: Some(output_fields.to_string()),
            ..Self::new("core/get")
        }
    }

    pub fn create(class: &str, fields: Object) -> Self {
        Self {
            comment: Some(format!("Create {}", class)),
            class: Some(class.to_string()),
            output_fields: Some("*".to_string()),
            fields: Some(fields),
            ..Self::new("core/create")
        }
    }

    pub fn update(class: &str, key: Value, fields: Object) -> Self {
        Self {
            comment: Some(format!("Update {}", class)),
            class: Some(class.to_string()),
            key: Some(key),
            output_fields: Some("*".to_string()),
            fields: Some(fields),
            ..Self::new("core/update")
        }
    }

    pub fn delete(class: &str, key: Value) -> Self {
        Self {
            comment: Some(format!("Delete {}", class)),
            class: Some(class.to_string()),
            key: Some(key),
            ..Self::new("core/delete")
        }
    }
}

/// One entry of the `objects` map in a response
#[derive(Debug, Clone, Deserialize)]
struct ResponseObject {
    key: Value,
    #[serde(default)]
    fields: Object,
}

/// Raw reply of the REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub objects: Option<Map<String, Value>>,
    /// Only set by `core/check_credentials`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,
}

impl Response {
    /// Fails on a non-zero code, otherwise flattens every returned object to
    /// its fields plus `id`.
    pub fn into_objects(self) -> ItopResult<Vec<Object>> {
        let code = ReturnCode(self.code);
        if !code.is_ok() {
            return Err(ItopError::Api {
                code,
                message: self.message.unwrap_or_default(),
            });
        }

        let Some(objects) = self.objects else {
            return Ok(Vec::new());
        };

        objects
            .into_iter()
            .map(|(_, raw)| -> ItopResult<Object> {
                let entry: ResponseObject = serde_json::from_value(raw)?;
                let mut object = entry.fields;
                object.insert("id".to_string(), entry.key);
                Ok(object)
            })
            .collect()
    }
}
