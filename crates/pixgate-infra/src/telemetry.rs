use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "pixgate=debug,tower_http=debug";

/// Initialize tracing.
///
/// `RUST_LOG` overrides the default filter. With `json` set, events are written as
/// one JSON object per line.
pub fn init_telemetry(json: bool) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let json_layer = json.then(|| fmt::layer().json());
    let text_layer = (!json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!(json = json, "Tracing initialized");
    Ok(())
}
