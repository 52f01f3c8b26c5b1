use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber for binaries.
///
/// `RUST_LOG` wins over `default_directive`. With `json` set, events are
/// written as flattened JSON objects.
pub fn init_tracing(default_directive: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| anyhow!("invalid log filter {default_directive:?}: {err}"))?;
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder
            .json()
            .flatten_event(true)
            .try_init()
            .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
    } else {
        builder
            .compact()
            .try_init()
            .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
    }
}
