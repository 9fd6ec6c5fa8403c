/// Target bucket count for automatically sized date histograms.
pub const AUTO_BUCKET_COUNT: i64 = 80;

/// Fixed-width histogram interval derived from an observed `[min, max]`
/// millisecond span. Bucket widths are whole milliseconds, so short spans
/// yield fewer than `AUTO_BUCKET_COUNT` buckets; the span is always covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoInterval {
    pub start_millis: i64,
    pub end_millis: i64,
    pub interval_millis: i64,
}

impl AutoInterval {
    pub fn from_span(min_millis: i64, max_millis: i64) -> Self {
        let span = (max_millis - min_millis).max(0) + 1;
        let interval = ((span + AUTO_BUCKET_COUNT - 1) / AUTO_BUCKET_COUNT).max(1);
        Self {
            start_millis: min_millis,
            end_millis: max_millis,
            interval_millis: interval,
        }
    }

    pub fn bucket_count(&self) -> usize {
        let span = (self.end_millis - self.start_millis).max(0) + 1;
        ((span + self.interval_millis - 1) / self.interval_millis) as usize
    }

    /// Start timestamps of every bucket, in ascending order.
    pub fn bucket_starts(&self) -> Vec<i64> {
        (0..self.bucket_count() as i64)
            .map(|i| self.start_millis + i * self.interval_millis)
            .collect()
    }

    /// Bucket index for a timestamp inside the span.
    pub fn bucket_index(&self, millis: i64) -> Option<usize> {
        if millis < self.start_millis || millis > self.end_millis {
            return None;
        }
        Some(((millis - self.start_millis) / self.interval_millis) as usize)
    }
}
