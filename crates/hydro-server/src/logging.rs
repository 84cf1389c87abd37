use crate::state::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEV_FILTER: &str = "hydro_server=debug,tower_http=debug,webrtc=warn";
const PROD_FILTER: &str = "hydro_server=info,tower_http=info,webrtc=error";

/// Install the global subscriber: human-readable output in development,
/// one JSON object per line otherwise. `RUST_LOG` overrides the filter.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let default_filter = if config.is_development() {
        DEV_FILTER
    } else {
        PROD_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);

    if config.is_development() {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .flatten_event(true),
            )
            .try_init()?;
    }

    Ok(())
}
