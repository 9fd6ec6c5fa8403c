use std::env;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub report: ReportConfig,
    pub time: TimeConfig,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            report: ReportConfig::default(),
            time: TimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Ceiling on the number of outer buckets an evaluation may return.
    pub bucket_limit: usize,
    /// Render format for date bucket keys (ISO-8601 with offset).
    pub key_date_format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            bucket_limit: 1000,
            key_date_format: "%Y-%m-%dT%H:%M:%S%.3f%z".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Timezone for calendar alignment (None = UTC).
    pub timezone: Option<String>,
    /// First day of the week for week truncation.
    pub week_start: Weekday,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            week_start: Weekday::Mon,
        }
    }
}

impl TimeConfig {
    pub fn parse_timezone(&self) -> Option<Tz> {
        self.timezone.as_ref().and_then(|tz| tz.parse().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stdout_level: String,
    pub file_level: String,
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stdout_level: "info".to_string(),
            file_level: "debug".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("PROCSIGHT_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
