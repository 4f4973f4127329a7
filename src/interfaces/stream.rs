//! Follows Marathon's `/v2/events` feed for the life of the process.
//!
//! Two states: connecting (retried forever with a fixed backoff) and reading
//! (line by line until the connection fails or closes). Any failure goes back to
//! connecting. Events missed while disconnected are not recovered here.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;
use tracing::{error, info};

use crate::core::dispatch::{Dispatcher, Outcome};
use crate::core::error::SyncError;
use crate::core::marathon::Marathon;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

pub type FeedReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Source of a line-oriented event feed.
#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn connect(&self) -> Result<FeedReader, SyncError>;
}

#[async_trait]
impl EventFeed for Marathon {
    async fn connect(&self) -> Result<FeedReader, SyncError> {
        let resp = self.event_stream().await?;
        let stream = Box::pin(
            resp.bytes_stream()
                .map(|r| r.map_err(std::io::Error::other)),
        );
        Ok(Box::new(BufReader::new(StreamReader::new(stream))))
    }
}

/// Delay between a failure and the next connect attempt.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self);
}

pub struct FixedBackoff(pub Duration);

#[async_trait]
impl Backoff for FixedBackoff {
    async fn wait(&self) {
        tokio::time::sleep(self.0).await;
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    /// Blank line Marathon sends to keep the connection open.
    KeepAlive,
    /// `event:` header. The data blob names its own type, so this is dropped.
    Label,
    Data(&'a [u8]),
    Other,
}

pub fn classify(line: &[u8]) -> Line<'_> {
    let trimmed = line.trim_ascii_end();
    if trimmed.is_empty() {
        Line::KeepAlive
    } else if trimmed.starts_with(b"event:") {
        Line::Label
    } else if let Some(data) = trimmed.strip_prefix(b"data:") {
        Line::Data(data.strip_prefix(b" ").unwrap_or(data))
    } else {
        Line::Other
    }
}

pub struct StreamIngestor<F, B> {
    feed: F,
    dispatcher: Dispatcher,
    backoff: B,
}

impl<F: EventFeed, B: Backoff> StreamIngestor<F, B> {
    pub fn new(feed: F, dispatcher: Dispatcher, backoff: B) -> Self {
        Self {
            feed,
            dispatcher,
            backoff,
        }
    }

    /// Never returns.
    pub async fn run(&self) {
        loop {
            let reader = self.connect().await;
            let err = self.read(reader).await;
            error!(error = %err, "error reading from event stream!");
            self.backoff.wait().await;
            info!("reconnecting...");
        }
    }

    async fn connect(&self) -> FeedReader {
        loop {
            match self.feed.connect().await {
                Ok(reader) => {
                    info!("connected to /v2/events endpoint");
                    return reader;
                }
                Err(e) => {
                    error!(error = %e, "error connecting to event stream!");
                    self.backoff.wait().await;
                    info!("reconnecting...");
                }
            }
        }
    }

    /// Dispatch every `data:` line in arrival order until the feed fails. Returns
    /// the failure that ended the session.
    pub async fn read(&self, mut reader: FeedReader) -> SyncError {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => return SyncError::Transport("event stream closed".to_string()),
                Ok(_) => {}
                Err(e) => return SyncError::Transport(e.to_string()),
            }

            let Line::Data(body) = classify(&buf) else {
                continue;
            };
            match self.dispatcher.dispatch(body).await {
                Ok(Outcome::Handled(_)) | Ok(Outcome::Ignored(_)) => {}
                Err(e) => error!(error = %e, "body generated error"),
            }
        }
    }
}
