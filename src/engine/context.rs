use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::engine::errors::ConfigError;
use crate::report::descriptor::{DistributedByDef, GroupByDef, ReportDescriptor, ViewDef};
use crate::shared::clock::Clock;
use crate::shared::config::Settings;
use crate::shared::datetime::bucketing::DateBucketer;

/// Immutable per-evaluation bundle: the descriptor, the pinned evaluation
/// instant, the effective timezone and the effective bucket ceiling. Owned
/// by exactly one evaluation; never shared.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub descriptor: ReportDescriptor,
    pub now: DateTime<Utc>,
    pub timezone: Tz,
    pub bucket_limit: usize,
    pub bucketer: DateBucketer,
}

impl ExecutionContext {
    pub fn new(
        descriptor: ReportDescriptor,
        clock: &Clock,
        settings: &Settings,
    ) -> Result<Self, ConfigError> {
        let timezone = match &descriptor.configuration.timezone {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(raw.clone()))?,
            None => settings.time.parse_timezone().unwrap_or(chrono_tz::UTC),
        };
        let bucket_limit = descriptor
            .configuration
            .bucket_limit
            .unwrap_or(settings.report.bucket_limit);
        let bucketer = DateBucketer::new(
            timezone,
            settings.time.week_start,
            settings.report.key_date_format.clone(),
        );

        Ok(Self {
            descriptor,
            now: clock.now(),
            timezone,
            bucket_limit,
            bucketer,
        })
    }

    pub fn now_millis(&self) -> i64 {
        self.now.timestamp_millis()
    }

    pub fn view(&self) -> Result<&ViewDef, ConfigError> {
        self.descriptor.view.as_ref().ok_or(ConfigError::MissingView)
    }

    pub fn group_by(&self) -> Result<&GroupByDef, ConfigError> {
        self.descriptor
            .group_by
            .as_ref()
            .ok_or(ConfigError::MissingGroupBy)
    }

    pub fn distributed_by(&self) -> Result<&DistributedByDef, ConfigError> {
        self.descriptor
            .distributed_by
            .as_ref()
            .ok_or(ConfigError::MissingDistributedBy)
    }
}
