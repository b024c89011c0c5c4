use chrono::{DateTime, Utc};

/// Current time in milliseconds since the Unix epoch
pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamps are stored as epoch milliseconds; out-of-range values clamp to the epoch.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip() {
        let now = current_time_millis();
        assert_eq!(from_millis(now).timestamp_millis(), now);
    }
}
