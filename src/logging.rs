use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the process-wide subscriber. A second call keeps the first subscriber.
pub(crate) fn init(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
