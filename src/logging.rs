use env_logger::Env;

/// Install the global logger: `info` unless `RUST_LOG` says otherwise,
/// with a timestamp on every line.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_target(false)
        .init();
}
