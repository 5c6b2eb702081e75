//! Logger initialization

use crate::Result;
use log::LevelFilter;

/// Initializes `env_logger` at `level`.
///
/// `RUST_LOG` is read first, then `level` overrides the global filter. Chatty
/// dependencies are held at `info`.
pub fn init_logger(level: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("sqlx", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("ip_proxy_checker", level);

    builder.format_timestamp_millis();
    builder.try_init()?;
    Ok(())
}
