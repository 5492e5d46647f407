use async_trait::async_trait;
use log::debug;

use super::envelope::{Request, Response};
use crate::config::ClientConfig;
use crate::error::{ItopError, ItopResult};

/// Delivers one request to the REST endpoint and returns its raw reply
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> ItopResult<Response>;
}

/// `Transport` posting form-encoded requests over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    version: String,
    auth_user: String,
    auth_pwd: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ItopResult<Self> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            url: config.url.clone(),
            version: config.version.clone(),
            auth_user: config.auth_user.clone(),
            auth_pwd: config.auth_pwd.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> ItopResult<Response> {
        let json_data = serde_json::to_string(request)?;
        debug!("POST {} operation={}", self.url, request.operation);

        let form = [
            ("version", self.version.as_str()),
            ("auth_user", self.auth_user.as_str()),
            ("auth_pwd", self.auth_pwd.as_str()),
            ("json_data", json_data.as_str()),
        ];
        let response = self
            .http
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ItopError::Http(format!("Connection refused. {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItopError::Http(format!(
                "Could not connect. HTTP code {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ItopError::Serialization(format!(
                "Not a valid JSON, maybe the page is returning other data: {}",
                e
            ))
        })
    }
}
