use semver::Version;
use tracing::{info, warn};

/// First Marathon release that serves `/v2/events` as a stream.
pub const MIN_EVENT_STREAM_VERSION: Version = Version::new(0, 9, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Subscribe to `/v2/events` and follow it for the life of the process.
    EventStream,
    /// Wait for Marathon to POST events to us.
    Webhook,
}

/// Pick how events reach us. An unknown version is assumed new enough so a
/// flaky `/v2/info` never blocks startup.
pub fn select(version: anyhow::Result<Version>) -> Transport {
    let version = version.unwrap_or_else(|e| {
        warn!(
            error = %e,
            "version detection failed, assuming >= {}", MIN_EVENT_STREAM_VERSION
        );
        MIN_EVENT_STREAM_VERSION
    });

    if version >= MIN_EVENT_STREAM_VERSION {
        info!("detected Marathon v{} with /v2/events endpoint", version);
        Transport::EventStream
    } else {
        info!(
            "detected Marathon v{} -- make sure to set up an eventSubscription for this process",
            version
        );
        Transport::Webhook
    }
}
