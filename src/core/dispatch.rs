use tracing::{debug, info};

use super::error::SyncError;
use super::events::{self, Event, EventKind};
use super::registry::Mirror;

/// What happened to a well-formed event body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Handled(EventKind),
    /// The body named a kind we deliberately do not mirror.
    Ignored(String),
}

/// Turns raw event bodies into registry writes. Shared by the stream ingestor and
/// the webhook receiver.
#[derive(Clone)]
pub struct Dispatcher {
    mirror: Mirror,
}

impl Dispatcher {
    pub fn new(mirror: Mirror) -> Self {
        Self { mirror }
    }

    pub async fn dispatch(&self, body: &[u8]) -> Result<Outcome, SyncError> {
        let event = match events::decode(body) {
            Ok(event) => event,
            Err(SyncError::UnknownEventKind(kind)) => {
                info!(event_kind = %kind, "not handling event");
                return Ok(Outcome::Ignored(kind));
            }
            Err(e) => return Err(e),
        };

        let kind = event.kind();
        info!(event_kind = %kind, "handling event");
        debug!(body = %String::from_utf8_lossy(body), "event body");
        self.apply(&event).await?;
        Ok(Outcome::Handled(kind))
    }

    /// Apply a decoded event. Multi-app events stop at the first failing write;
    /// earlier writes stay in place.
    pub async fn apply(&self, event: &Event) -> Result<(), SyncError> {
        match event {
            Event::ApiPost(_) | Event::DeploymentInfo(_) => {
                for app in event.apps() {
                    self.mirror.update_app(&app).await?;
                }
                Ok(())
            }
            Event::AppTerminated(_) => {
                for app in event.apps() {
                    self.mirror.delete_app(&app).await?;
                }
                Ok(())
            }
            Event::StatusUpdate(task) => {
                if task.task_status.is_terminal() {
                    self.mirror.delete_task(task).await
                } else if task.task_status.is_live() {
                    self.mirror.update_task(task).await
                } else {
                    Err(SyncError::UnknownTaskStatus(
                        task.task_status.as_str().to_string(),
                    ))
                }
            }
            Event::HealthStatusChanged(health) => self.mirror.update_health(health).await,
        }
    }
}
