use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use super::Registry;
use crate::core::config::RegistryConfig;
use crate::core::error::RegistryError;

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Consul KV over its HTTP API.
pub struct ConsulRegistry {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ConsulRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let base = url::Url::parse(&format!("{}://{}", config.protocol, config.location))
            .with_context(|| format!("invalid registry location {}", config.location))?;
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .context("failed to build registry HTTP client")?;

        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn kv_url(&self, key: &str) -> String {
        format!("{}/v1/kv/{}", self.base, key.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.kv_url(key));
        match &self.token {
            Some(token) => req.header(TOKEN_HEADER, token),
            None => req,
        }
    }

    async fn send(
        &self,
        method: &'static str,
        key: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RegistryError> {
        let resp = req.send().await.map_err(|source| RegistryError::Http {
            key: key.to_string(),
            source,
        })?;

        let status = resp.status();
        // a missing key is an answer, not a failure
        if status.is_success() || (method == "GET" && status == StatusCode::NOT_FOUND) {
            Ok(resp)
        } else {
            Err(RegistryError::Status {
                method,
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistryError> {
        let req = self.request(reqwest::Method::GET, key).query(&[("raw", "")]);
        let resp = self.send("GET", key, req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.bytes().await.map_err(|source| RegistryError::Http {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(body.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError> {
        let req = self.request(reqwest::Method::PUT, key).body(value);
        self.send("PUT", key, req).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        let req = self.request(reqwest::Method::DELETE, key);
        self.send("DELETE", key, req).await?;
        Ok(())
    }
}
