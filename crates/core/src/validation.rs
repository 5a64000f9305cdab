//! Input validation utilities.
//!
//! This module contains functions for validating dates, appointment times and
//! free-text fields before they are committed to the directory store. Checks
//! are purely syntactic plus the clinic's business rules; calendar
//! correctness (e.g. "2025-02-31") is deliberately not enforced here.

use crate::constants::{CLOSING_HOUR, OPENING_HOUR, SLOT_INCREMENT_MINUTES};
use crate::{ClinicError, ClinicResult};

/// Validates that a date string has exactly the shape `YYYY-MM-DD`.
///
/// Only the shape is checked: four digits, a hyphen, two digits, a hyphen,
/// two digits. Out-of-range days such as `2025-01-32` pass; stored dates are
/// opaque slot labels, not calendar values.
pub fn validate_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    if bytes.len() != 10 {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// Validates an appointment time string against the clinic's slot rules.
///
/// The string must be exactly `HH:MM` with hour 00-23 and minute 00-59.
/// On top of the syntax, business rules apply:
///
/// - the hour must be within opening hours (09-17),
/// - the final hour admits only minute 00 (`17:00` is the last slot),
/// - minutes must fall on a 10-minute increment.
pub fn validate_appointment_time(time: &str) -> bool {
    let Some((hour, minute)) = parse_hh_mm(time) else {
        return false;
    };

    if hour < OPENING_HOUR || hour > CLOSING_HOUR {
        return false;
    }
    if hour == CLOSING_HOUR && minute > 0 {
        return false;
    }

    minute % SLOT_INCREMENT_MINUTES == 0
}

/// Parses `HH:MM` with hour 00-23 and minute 00-59, rejecting anything else.
fn parse_hh_mm(time: &str) -> Option<(u32, u32)> {
    let bytes = time.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    if !bytes[0].is_ascii_digit()
        || !bytes[1].is_ascii_digit()
        || !bytes[3].is_ascii_digit()
        || !bytes[4].is_ascii_digit()
    {
        return None;
    }

    let hour = (bytes[0] - b'0') as u32 * 10 + (bytes[1] - b'0') as u32;
    let minute = (bytes[3] - b'0') as u32 * 10 + (bytes[4] - b'0') as u32;

    if hour > 23 || minute > 59 {
        return None;
    }

    Some((hour, minute))
}

/// Rejects empty or whitespace-only required fields.
///
/// # Errors
///
/// Returns `ClinicError::Validation` naming the offending field.
pub fn require_non_empty(field: &'static str, value: &str) -> ClinicResult<()> {
    if value.trim().is_empty() {
        return Err(ClinicError::Validation(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_date_accepts_yyyy_mm_dd() {
        assert!(validate_date("2025-01-02"));
        assert!(validate_date("1999-12-31"));
        // Shape-only: calendar nonsense still passes.
        assert!(validate_date("2025-01-32"));
        assert!(validate_date("2025-13-01"));
    }

    #[test]
    fn test_validate_date_rejects_wrong_shapes() {
        assert!(!validate_date(""));
        assert!(!validate_date("2025-1-02"));
        assert!(!validate_date("25-01-02"));
        assert!(!validate_date("2025/01/02"));
        assert!(!validate_date("2025-01-02 "));
        assert!(!validate_date("2O25-01-02"));
    }

    #[test]
    fn test_validate_appointment_time_accepts_business_slots() {
        assert!(validate_appointment_time("09:00"));
        assert!(validate_appointment_time("12:30"));
        assert!(validate_appointment_time("16:50"));
        assert!(validate_appointment_time("17:00"));
    }

    #[test]
    fn test_validate_appointment_time_rejects_out_of_hours() {
        assert!(!validate_appointment_time("08:50"));
        assert!(!validate_appointment_time("17:10"));
        assert!(!validate_appointment_time("18:00"));
        assert!(!validate_appointment_time("00:00"));
    }

    #[test]
    fn test_validate_appointment_time_rejects_off_increment_minutes() {
        assert!(!validate_appointment_time("12:35"));
        assert!(!validate_appointment_time("09:01"));
    }

    #[test]
    fn test_validate_appointment_time_rejects_bad_syntax() {
        assert!(!validate_appointment_time("25:00"));
        assert!(!validate_appointment_time("12:60"));
        assert!(!validate_appointment_time("9:00"));
        assert!(!validate_appointment_time("12-30"));
        assert!(!validate_appointment_time("12:3O"));
        assert!(!validate_appointment_time(""));
    }

    #[test]
    fn test_exactly_48_slots_per_day() {
        let mut slots = 0;
        for hour in 0..24 {
            for minute in 0..60 {
                if validate_appointment_time(&format!("{hour:02}:{minute:02}")) {
                    slots += 1;
                }
            }
        }
        assert_eq!(slots, 48);
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("name", "Alice").is_ok());
        let err = require_non_empty("name", "   ").expect_err("should reject whitespace");
        assert!(matches!(err, ClinicError::Validation(msg) if msg.contains("name")));
    }
}
