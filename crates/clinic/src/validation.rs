//! Request validation.
//!
//! Field problems are collected rather than reported one at a time, so a
//! client gets every message for a form in a single 400 response.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use medflow_database::{DatabaseError, TimeOfDay};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ClinicError, ClinicResult};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    email.len() <= 255 && EMAIL.is_match(email)
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok` holds. The first message per field wins.
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.into());
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), format!("{field} is required"))
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.required(field, value);
        self.check(field, is_valid_email(value), "Invalid email format")
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            field,
            value.chars().count() >= MIN_PASSWORD_LENGTH,
            format!("{field} must be at least {MIN_PASSWORD_LENGTH} characters"),
        )
    }

    /// Parse an enumerated value, recording an error when it is not recognised.
    pub fn parse<T>(&mut self, field: &str, value: Option<&str>) -> Option<T>
    where
        T: FromStr<Err = DatabaseError>,
    {
        let raw = value?;
        match raw.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.check(field, false, format!("Invalid {field}: {raw}"));
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(&mut self) -> ClinicResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ClinicError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// `YYYY-MM-DD`; a trailing time part such as `T00:00:00Z` is ignored.
pub fn parse_date(field: &str, raw: &str) -> ClinicResult<NaiveDate> {
    let date = raw.trim().get(..10).unwrap_or(raw.trim());
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ClinicError::bad_request(format!("Invalid {field}: expected YYYY-MM-DD")))
}

pub fn parse_time(field: &str, raw: &str) -> ClinicResult<TimeOfDay> {
    raw.parse()
        .map_err(|_| ClinicError::bad_request(format!("Invalid {field}: expected HH:MM")))
}

/// Treat blank optional strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use medflow_database::Role;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("dr.smith@medflow.com"));
        assert!(is_valid_email(" padded@example.org "));
        assert!(!is_valid_email("missing-at.example.com"));
        assert!(!is_valid_email("no-tld@example"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn validator_collects_one_message_per_field() {
        let mut v = Validator::new();
        v.required("firstName", "")
            .email("email", "nope")
            .password("password", "abc");

        let Err(ClinicError::Validation(details)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(details.len(), 3);
        assert_eq!(details["firstName"], "firstName is required");
        assert_eq!(details["email"], "Invalid email format");
        assert!(details["password"].contains("at least 6"));
    }

    #[test]
    fn validator_parses_enums() {
        let mut v = Validator::new();
        let role: Option<Role> = v.parse("role", Some("doctor"));
        assert_eq!(role, Some(Role::Doctor));
        assert!(v.is_empty());

        let bad: Option<Role> = v.parse("role", Some("janitor"));
        assert!(bad.is_none());
        assert!(v.finish().is_err());
    }

    #[test]
    fn dates_and_times() {
        assert_eq!(
            parse_date("appointmentDate", "2024-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert_eq!(
            parse_date("appointmentDate", "2024-01-10T00:00:00.000Z").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert!(parse_date("appointmentDate", "10/01/2024").is_err());
        assert_eq!(parse_time("startTime", "9:00").unwrap().to_string(), "09:00");
        assert!(parse_time("startTime", "25:00").is_err());
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" x ".into())), Some("x".into()));
        assert_eq!(non_blank(None), None);
    }
}
