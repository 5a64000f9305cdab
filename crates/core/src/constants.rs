//! Business rules shared across the core.

/// First bookable hour of the working day (inclusive).
pub const OPENING_HOUR: u32 = 9;

/// Last bookable hour. Only the exact hour (`17:00`) is bookable; later
/// minutes within this hour are rejected.
pub const CLOSING_HOUR: u32 = 17;

/// Appointments are booked on fixed 10-minute increments, giving 48 legal
/// slots per day (09:00, 09:10, ..., 16:50, 17:00).
pub const SLOT_INCREMENT_MINUTES: u32 = 10;

/// An inventory mutation that leaves fewer than this many units on hand
/// emits a low-stock notification.
pub const LOW_STOCK_THRESHOLD: i64 = 10;
