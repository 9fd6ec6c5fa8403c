use chrono::{DateTime, Utc};

/// Source of the evaluation instant. Every evaluation pins "now" once and
/// threads it through its execution context, so running-instance math and
/// relative date filters are deterministic for a given clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock.
    System,
    /// Frozen instant, for tests and replayed evaluations.
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }

    /// Frozen clock from epoch milliseconds.
    pub fn fixed_millis(millis: i64) -> Self {
        Clock::Fixed(
            DateTime::from_timestamp_millis(millis).unwrap_or_else(|| DateTime::UNIX_EPOCH),
        )
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}
