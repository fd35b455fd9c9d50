//! Logging setup for hosts and the headless binary

/// Filter used when `RUST_LOG` is unset. wgpu is chatty at `info` during
/// device creation and pipeline compilation, so it is held to warnings.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Install env_logger with [`DEFAULT_FILTER`]; `RUST_LOG` overrides it.
///
/// ```no_run
/// sward::core::logging::init();
/// log::info!("Grass subsystem starting");
/// ```
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
        .format_timestamp_millis()
        .init();
}

/// Logger for unit tests: captured by the harness, safe to call repeatedly
#[cfg(test)]
pub fn init_test() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
