use std::str::FromStr;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{prelude::*, reload, EnvFilter, Registry};

static RELOAD_HANDLE: OnceCell<reload::Handle<EnvFilter, Registry>> = OnceCell::new();

/// Initializes the global tracing subscriber. Calling this more than once only
/// reloads the filter, so tests can call it freely.
pub fn init(level: &str, json: bool) -> Result<()> {
    let reload = RELOAD_HANDLE.get_or_try_init(|| -> Result<_> {
        let (filter, handle) = reload::Layer::new(EnvFilter::from_str(level)?);

        let registry = tracing_subscriber::registry().with(filter);

        let fmt = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true);

        if json {
            registry.with(fmt.json()).try_init()?;
        } else {
            registry.with(fmt).try_init()?;
        }

        Ok(handle)
    })?;

    reload.reload(EnvFilter::from_str(level)?)?;

    Ok(())
}
