use std::sync::Once;

use log::LevelFilter;

/// Module path of the engine's own log records.
const ENGINE_TARGET: &str = "retroframe_engine";

/// GPU and windowing crates whose internals are noisy at `info`.
const BACKEND_TARGETS: [&str; 4] = ["wgpu_core", "wgpu_hal", "naga", "winit"];

/// Logger setup for `init_logging`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Complete `env_logger` filter, e.g. `"warn,retroframe_engine::tilemap=debug"`.
    /// Takes precedence over `RUST_LOG` and the levels below.
    pub filter: Option<String>,
    /// Level for everything not named below, the game included.
    pub level: LevelFilter,
    /// Level for the engine's own modules.
    pub engine_level: LevelFilter,
    /// Level for wgpu, naga and winit.
    pub backend_level: LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            level: LevelFilter::Info,
            engine_level: LevelFilter::Info,
            backend_level: LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger; later calls are ignored.
///
/// Filter precedence: `config.filter`, then a non-empty `RUST_LOG`, then the
/// per-target levels of `config`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let directives = filter_directives(&config, std::env::var("RUST_LOG").ok());
        let installed = env_logger::Builder::new()
            .parse_filters(&directives)
            .write_style(config.write_style)
            .format_timestamp_millis()
            .try_init();

        match installed {
            Ok(()) => log::debug!("logging: {directives}"),
            Err(err) => eprintln!("retroframe: logger already installed ({err})"),
        }
    });
}

fn filter_directives(config: &LoggingConfig, env: Option<String>) -> String {
    if let Some(filter) = &config.filter {
        return filter.clone();
    }
    if let Some(filter) = env.filter(|f| !f.trim().is_empty()) {
        return filter;
    }

    let level = |l: LevelFilter| l.to_string().to_ascii_lowercase();
    let mut directives = format!("{},{ENGINE_TARGET}={}", level(config.level), level(config.engine_level));
    for target in BACKEND_TARGETS {
        directives.push_str(&format!(",{target}={}", level(config.backend_level)));
    }
    directives
}
