mod settings;

use config::{Config, ConfigError};

pub use settings::{BrokerSettings, ServerSettings, Settings};

/// Builds the runtime settings.
///
/// Built-in defaults form the bottom layer; the listen port given on the
/// command line is applied on top. There is no file or environment source.
pub fn load_config(port: u16) -> Result<Settings, ConfigError> {
    let default = Settings::default();

    let config = Config::builder()
        .set_default("server.host", default.server.host)?
        .set_default("server.port", i64::from(default.server.port))?
        .set_default(
            "broker.max_connections",
            default.broker.max_connections as u64,
        )?
        .set_default(
            "broker.liveness_interval_ms",
            default.broker.liveness_interval_ms,
        )?
        .set_override("server.port", i64::from(port))?
        .build()?;

    config.try_deserialize()
}
