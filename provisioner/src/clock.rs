//! Time source for group names and migration tags

use chrono::{DateTime, Utc};

/// `YYYYMMDD-HHMMSS`, used in the group name and the `MigrationDate` tag
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_timestamp() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap());
        assert_eq!(clock.timestamp(), "20240307-090501");
    }

    #[test]
    fn test_system_clock_timestamp_shape() {
        let stamp = SystemClock.timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'-');
        assert!(stamp.chars().filter(|c| *c != '-').all(|c| c.is_ascii_digit()));
    }
}
