use tracing_subscriber::EnvFilter;
use crate::config::LoggingSettings;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Format is `pretty` or `json`
/// (anything else falls back to json). Returns `false` if a subscriber was
/// already installed.
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    let installed = if settings.format == "pretty" {
        subscriber.pretty().try_init()
    } else {
        subscriber.json().try_init()
    };

    installed.is_ok()
}
