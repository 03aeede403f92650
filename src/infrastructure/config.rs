use crate::domain::message::{KIND_KEY, TIMESTAMP_KEY};
use crate::infrastructure::line_decoder::COUNTER_EXT_FIELD;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub serial: SerialSettings,
    pub server: ServerSettings,
    pub stream: StreamSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub columns: Vec<String>,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    pub series_capacity: usize,
    pub log_capacity: usize,
    pub broadcast_buffer: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),
    #[error("serial.columns must name at least one column")]
    NoColumns,
    #[error("serial.columns may not use the reserved name {0:?}")]
    ReservedColumn(String),
    #[error("serial.columns names {0:?} more than once")]
    DuplicateColumn(String),
}

const RESERVED_COLUMNS: [&str; 3] = [KIND_KEY, TIMESTAMP_KEY, COUNTER_EXT_FIELD];

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.columns.is_empty() {
            return Err(ConfigError::NoColumns);
        }
        let mut seen = HashSet::new();
        for column in &self.serial.columns {
            if RESERVED_COLUMNS.contains(&column.as_str()) {
                return Err(ConfigError::ReservedColumn(column.clone()));
            }
            if !seen.insert(column.as_str()) {
                return Err(ConfigError::DuplicateColumn(column.clone()));
            }
        }
        let limits = [
            ("stream.series_capacity", self.stream.series_capacity),
            ("stream.log_capacity", self.stream.log_capacity),
            ("stream.broadcast_buffer", self.stream.broadcast_buffer),
        ];
        for (key, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroLimit(key));
            }
        }
        Ok(())
    }
}

/// Load settings from defaults, `config/monitor.*`, `MONITOR__*` environment variables,
/// and finally the positional `<port> <baud>` arguments.
pub fn load_monitor_config(args: &[String]) -> anyhow::Result<MonitorConfig> {
    let settings = config::Config::builder()
        .set_default("serial.port", "COM5")?
        .set_default("serial.baud", 9600_i64)?
        .set_default("serial.columns", vec!["counter", "temperature", "voltage"])?
        .set_default("serial.read_timeout_ms", 1000_i64)?
        .set_default("server.bind", "0.0.0.0:8000")?
        .set_default("server.static_dir", "public")?
        .set_default("stream.series_capacity", 600_i64)?
        .set_default("stream.log_capacity", 2000_i64)?
        .set_default("stream.broadcast_buffer", 256_i64)?
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(config::Environment::with_prefix("MONITOR").separator("__"))
        .set_override_option("serial.port", args.first().cloned())?
        .set_override_option("serial.baud", args.get(1).cloned())?
        .build()?;

    let config: MonitorConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
