use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDateTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;

use crate::report::descriptor::DateUnit;

/// Calendar-aware alignment of instants to date-unit buckets in a fixed
/// timezone. Day and coarser units align to local midnight; hour and minute
/// truncate exactly.
#[derive(Debug, Clone)]
pub struct DateBucketer {
    tz: Tz,
    week_start: Weekday,
    key_format: String,
}

impl DateBucketer {
    pub fn new(tz: Tz, week_start: Weekday, key_format: impl Into<String>) -> Self {
        Self {
            tz,
            week_start,
            key_format: key_format.into(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Start of the bucket containing `instant` for the given unit.
    pub fn truncate(&self, instant: DateTime<Utc>, unit: DateUnit) -> DateTime<Tz> {
        let dt = instant.with_timezone(&self.tz);
        let naive = match unit {
            DateUnit::Minute => dt
                .date_naive()
                .and_hms_opt(dt.hour(), dt.minute(), 0)
                .unwrap(),
            DateUnit::Hour => dt.date_naive().and_hms_opt(dt.hour(), 0, 0).unwrap(),
            DateUnit::Day => dt.date_naive().and_hms_opt(0, 0, 0).unwrap(),
            DateUnit::Week => {
                let days_back = (dt.weekday().num_days_from_monday() + 7
                    - self.week_start.num_days_from_monday())
                    % 7;
                (dt.date_naive() - Duration::days(days_back as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            }
            DateUnit::Month => dt
                .date_naive()
                .with_day(1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            DateUnit::Year => dt
                .date_naive()
                .with_month(1)
                .unwrap()
                .with_day(1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            // Automatic is resolved to a fixed interval before truncation;
            // the month alignment here is the documented fallback.
            DateUnit::Automatic => dt
                .date_naive()
                .with_day(1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        self.resolve(naive)
    }

    pub fn truncate_millis(&self, millis: i64, unit: DateUnit) -> i64 {
        let instant = DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH);
        self.truncate(instant, unit).timestamp_millis()
    }

    /// Start of the bucket following `bucket_start`.
    pub fn next(&self, bucket_start: DateTime<Tz>, unit: DateUnit) -> DateTime<Tz> {
        match unit {
            DateUnit::Minute => bucket_start + Duration::minutes(1),
            DateUnit::Hour => bucket_start + Duration::hours(1),
            DateUnit::Day => {
                self.resolve((bucket_start.date_naive() + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap())
            }
            DateUnit::Week => {
                self.resolve((bucket_start.date_naive() + Duration::days(7)).and_hms_opt(0, 0, 0).unwrap())
            }
            DateUnit::Month | DateUnit::Automatic => self.resolve(
                (bucket_start.date_naive() + Months::new(1))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            DateUnit::Year => self.resolve(
                (bucket_start.date_naive() + Months::new(12))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
        }
    }

    /// Start of the bucket `count` units before `bucket_start`.
    pub fn minus(&self, bucket_start: DateTime<Tz>, unit: DateUnit, count: u32) -> DateTime<Tz> {
        let date = bucket_start.date_naive();
        match unit {
            DateUnit::Minute => bucket_start - Duration::minutes(count as i64),
            DateUnit::Hour => bucket_start - Duration::hours(count as i64),
            DateUnit::Day => {
                self.resolve((date - Duration::days(count as i64)).and_hms_opt(0, 0, 0).unwrap())
            }
            DateUnit::Week => self.resolve(
                (date - Duration::days(7 * count as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            DateUnit::Month | DateUnit::Automatic => {
                self.resolve((date - Months::new(count)).and_hms_opt(0, 0, 0).unwrap())
            }
            DateUnit::Year => {
                self.resolve((date - Months::new(12 * count)).and_hms_opt(0, 0, 0).unwrap())
            }
        }
    }

    pub fn next_millis(&self, bucket_start_millis: i64, unit: DateUnit) -> i64 {
        let start = DateTime::from_timestamp_millis(bucket_start_millis)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&self.tz);
        self.next(start, unit).timestamp_millis()
    }

    /// Canonical bucket-key rendering (ISO-8601 with offset).
    pub fn format_key(&self, dt: DateTime<Tz>) -> String {
        dt.format(&self.key_format).to_string()
    }

    pub fn format_key_millis(&self, millis: i64) -> String {
        let dt = DateTime::from_timestamp_millis(millis)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&self.tz);
        self.format_key(dt)
    }

    /// Maps a wall-clock time to the timezone, taking the earlier of
    /// ambiguous times and skipping forward across DST gaps.
    fn resolve(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match naive.and_local_timezone(self.tz) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earlier, _) => earlier,
            LocalResult::None => (naive + Duration::hours(1))
                .and_local_timezone(self.tz)
                .earliest()
                .unwrap_or_else(|| self.tz.from_utc_datetime(&naive)),
        }
    }
}
