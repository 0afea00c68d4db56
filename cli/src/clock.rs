use chrono::{NaiveDate, Utc};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Trusted source of the current time. Handlers read "now" from here and
/// never from caller input.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;

    /// Start of the current UTC day.
    fn today(&self) -> i64 {
        day_start(self.now())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

pub fn day_start(timestamp: i64) -> i64 {
    timestamp.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}

/// Midnight UTC of `date` as a Unix timestamp.
pub fn date_timestamp(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_to_utc_midnight() {
        // 2024-05-01T13:45:10Z
        let clock = FixedClock(1_714_571_110);
        assert_eq!(clock.today(), 1_714_521_600);
        assert_eq!(day_start(1_714_521_600), 1_714_521_600);
        assert_eq!(day_start(-1), -SECONDS_PER_DAY);
    }

    #[test]
    fn date_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(date_timestamp(date), 1_714_521_600);
    }
}
