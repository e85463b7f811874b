use tracing_subscriber::{filter::LevelFilter, prelude::*, registry, EnvFilter};

/// Installs a console logger receiving the `log` records of this crate and of Burn.
///
/// The level defaults to `info` and can be overridden with `RUST_LOG`.
pub fn install_logger() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter);

    if let Err(err) = registry().with(layer).try_init() {
        eprintln!("Failed to install the logger: {err}");
    }
}
