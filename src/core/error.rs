use thiserror::Error;

/// Failures raised while turning an orchestrator event into registry writes.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no event")]
    NoEventKind,

    #[error("malformed event body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("unknown event type: {0}")]
    UnknownEventKind(String),

    #[error("unknown task status: {0}")]
    UnknownTaskStatus(String),

    #[error("no task at {0} to update health for")]
    MissingTask(String),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("event stream: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("request to {key} failed: {source}")]
    Http {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {key} returned HTTP {status}")]
    Status {
        method: &'static str,
        key: String,
        status: u16,
    },

    #[error("stored record at {key} is unreadable: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode record for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
