//! Wall-clock time of day used for appointment slots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::DatabaseError;

/// Minutes since midnight. Rendered as zero-padded `HH:MM`, so the stored
/// text sorts in chronological order.
///
/// ```
/// use medflow_database::TimeOfDay;
///
/// let start: TimeOfDay = "9:05".parse().unwrap();
/// assert_eq!(start.to_string(), "09:05");
/// assert!(start < "10:00".parse().unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn new(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then(|| Self(hour * 60 + minute))
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }
}

impl FromStr for TimeOfDay {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DatabaseError::invalid_value("time", s);
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;

        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }

        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = DatabaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalises_single_digit_hours() {
        let time: TimeOfDay = "7:30".parse().unwrap();
        assert_eq!(time.to_string(), "07:30");
        assert_eq!(time.hour(), 7);
        assert_eq!(time.minute(), 30);
    }

    #[test]
    fn rejects_out_of_range_and_malformed_values() {
        for raw in ["24:00", "12:60", "1230", "12:3", "ab:cd", "", "123:00"] {
            assert!(raw.parse::<TimeOfDay>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn ordering_follows_the_clock() {
        let morning: TimeOfDay = "09:15".parse().unwrap();
        let noon: TimeOfDay = "12:00".parse().unwrap();
        assert!(morning < noon);
        assert!(morning.to_string() < noon.to_string());
    }
}
