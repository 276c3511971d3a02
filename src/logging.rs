use log::LevelFilter;

/// Install the process logger. Output goes to stderr; `RUST_LOG` overrides
/// `default_level`.
pub fn init(default_level: LevelFilter) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(default_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized: {}", e);
    }
}
