//! Time-relative event status.
//!
//! `event_status` is a pure function of the event start and an explicit
//! "now"; callers pass the clock in so rendering stays deterministic.

use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Starts on the current calendar day and has already begun.
    HappeningNow,
    /// Started on an earlier calendar day.
    Finished,
    /// Starts later on the current calendar day.
    Today,
    Tomorrow,
    /// Starts this many calendar days from now (always at least two).
    InDays(i64),
}

impl EventStatus {
    pub fn label(&self) -> String {
        match self {
            EventStatus::HappeningNow => "Happening Now".to_string(),
            EventStatus::Finished => "Finished".to_string(),
            EventStatus::Today => "Today".to_string(),
            EventStatus::Tomorrow => "Tomorrow".to_string(),
            EventStatus::InDays(days) => format!("In {days} days"),
        }
    }

    /// Stable token for styling hooks.
    pub fn css_class(&self) -> &'static str {
        match self {
            EventStatus::HappeningNow => "status-live",
            EventStatus::Finished => "status-finished",
            EventStatus::Today | EventStatus::Tomorrow | EventStatus::InDays(_) => {
                "status-upcoming"
            }
        }
    }
}

/// Derive the status of an event starting at `date` as seen at `now`.
///
/// Calendar days are compared in `now`'s offset. A date that cannot be
/// shifted into that offset keeps its own calendar day.
pub fn event_status(date: OffsetDateTime, now: OffsetDateTime) -> EventStatus {
    let event_day = date
        .checked_to_offset(now.offset())
        .unwrap_or(date)
        .date();
    let today = now.date();

    if event_day < today {
        return EventStatus::Finished;
    }

    if event_day == today {
        return if date <= now {
            EventStatus::HappeningNow
        } else {
            EventStatus::Today
        };
    }

    match (event_day - today).whole_days() {
        1 => EventStatus::Tomorrow,
        days => EventStatus::InDays(days),
    }
}

/// Time left until an event starts, split into display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn is_elapsed(&self) -> bool {
        *self == Self::default()
    }
}

/// Whole days, hours, minutes and seconds from `now` until `date`.
///
/// All zero once the start has passed.
pub fn countdown(date: OffsetDateTime, now: OffsetDateTime) -> Countdown {
    let remaining = date - now;
    if remaining <= Duration::ZERO {
        return Countdown::default();
    }

    let total = remaining.whole_seconds();
    Countdown {
        days: total / 86_400,
        hours: total % 86_400 / 3_600,
        minutes: total % 3_600 / 60,
        seconds: total % 60,
    }
}
