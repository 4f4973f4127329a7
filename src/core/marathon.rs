use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::MarathonConfig;
use super::error::SyncError;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

const VERSION_ATTEMPTS: u32 = 3;
const VERSION_RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP client for the parts of the Marathon API the event path needs.
#[derive(Clone)]
pub struct Marathon {
    client: reqwest::Client,
    base: url::Url,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    version: String,
}

impl Marathon {
    pub fn new(config: &MarathonConfig) -> Result<Self> {
        let mut base = url::Url::parse(&format!("{}://{}", config.protocol, config.location))
            .with_context(|| format!("invalid Marathon location {}", config.location))?;

        if let Some(username) = config.username.as_deref().filter(|u| !u.is_empty()) {
            base.set_username(username)
                .map_err(|_| anyhow::anyhow!("cannot set credentials on {}", base))?;
            base.set_password(config.password.as_deref())
                .map_err(|_| anyhow::anyhow!("cannot set credentials on {}", base))?;
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .context("failed to build Marathon HTTP client")?;

        Ok(Self { client, base })
    }

    pub fn url(&self, path: &str) -> String {
        let mut url = self.base.clone();
        url.set_path(path);
        url.to_string()
    }

    /// The running Marathon's version from `/v2/info`, retried a few times before
    /// giving up.
    pub async fn version(&self) -> Result<semver::Version> {
        self.version_with_retries(VERSION_ATTEMPTS, VERSION_RETRY_DELAY).await
    }

    async fn version_with_retries(
        &self,
        attempts: u32,
        delay: Duration,
    ) -> Result<semver::Version> {
        let mut attempt = 1;
        loop {
            match self.fetch_version().await {
                Ok(version) => return Ok(version),
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "could not read Marathon version, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_version(&self) -> Result<semver::Version> {
        debug!(url = %self.url("/v2/info"), "asking Marathon for its version");
        let info: InfoResponse = self
            .client
            .get(self.url("/v2/info"))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("failed to reach Marathon")?
            .error_for_status()
            .context("Marathon /v2/info returned an error")?
            .json()
            .await
            .context("could not decode Marathon /v2/info")?;

        parse_version(&info.version)
    }

    /// Open the `/v2/events` feed. Non-success statuses count as a failed connect.
    pub async fn event_stream(&self) -> Result<reqwest::Response, SyncError> {
        let resp = self
            .client
            .get(self.url("/v2/events"))
            .header(reqwest::header::ACCEPT, EVENT_STREAM_CONTENT_TYPE)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp)
    }
}

/// Marathon reports versions like `0.8.1` or `0.9`; missing components count as zero.
pub fn parse_version(raw: &str) -> Result<semver::Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    let (core, rest) = match raw.find(['-', '+']) {
        Some(i) => raw.split_at(i),
        None => (raw, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }

    let normalized = format!("{}{}", parts.join("."), rest);
    semver::Version::parse(&normalized)
        .with_context(|| format!("unparseable Marathon version '{}'", raw))
}
