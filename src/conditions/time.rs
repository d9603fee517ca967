//! time-of-day and weekday specs for the time conditions
//!
//! supports formats:
//! - time ranges: "09:00-17:00", "9:00AM-5:00PM", "9AM-5PM"
//! - multiple ranges: "09:00-12:00,14:00-18:00"
//! - overnight ranges: "22:00-06:00"
//! - day specs: "mon", "mon-fri", "mon,wed,fri", "fri-mon"
//!
//! all matching is against an explicit timestamp supplied by the state, never
//! the system clock, so the same state always yields the same answer

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// half-open range of minutes from midnight, possibly wrapping past midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u16,
    pub end: u16,
}

impl TimeRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, minute: u16) -> bool {
        if self.start <= self.end {
            (self.start..self.end).contains(&minute)
        } else {
            minute >= self.start || minute < self.end
        }
    }
}

/// parse "17:00", "5PM", "5:30pm" into minutes from midnight
pub fn parse_time(s: &str) -> Option<u16> {
    let s = s.trim().to_ascii_uppercase();

    let (clock, meridiem) = match s.strip_suffix("AM") {
        Some(rest) => (rest.trim_end(), Some(false)),
        None => match s.strip_suffix("PM") {
            Some(rest) => (rest.trim_end(), Some(true)),
            None => (s.as_str(), None),
        },
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u16>().ok()?, m.parse::<u16>().ok()?),
        None => (clock.parse::<u16>().ok()?, 0),
    };
    if minute >= 60 {
        return None;
    }

    let hour = match meridiem {
        Some(_) if hour == 0 || hour > 12 => return None,
        Some(false) => hour % 12,
        Some(true) => hour % 12 + 12,
        None => hour,
    };
    let total = hour.checked_mul(60)?.checked_add(minute)?;
    (total < MINUTES_PER_DAY).then_some(total)
}

/// parse "09:00-17:00" style range
pub fn parse_time_range(s: &str) -> Option<TimeRange> {
    let (start, end) = s.trim().split_once('-')?;
    Some(TimeRange::new(parse_time(start)?, parse_time(end)?))
}

/// parse a comma separated list of ranges; any malformed part rejects the spec
pub fn parse_time_ranges(s: &str) -> Option<Vec<TimeRange>> {
    let ranges = s
        .split(',')
        .map(parse_time_range)
        .collect::<Option<Vec<_>>>()?;
    (!ranges.is_empty()).then_some(ranges)
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// parse a day spec into distinct weekdays, in the order they appear
pub fn parse_days(s: &str) -> Option<Vec<Weekday>> {
    let mut days: Vec<Weekday> = Vec::new();

    for part in s.split(',') {
        match part.split_once('-') {
            Some((from, to)) => {
                let (mut day, last) = (parse_weekday(from)?, parse_weekday(to)?);
                loop {
                    if !days.contains(&day) {
                        days.push(day);
                    }
                    if day == last {
                        break;
                    }
                    day = day.succ();
                }
            }
            None => {
                let day = parse_weekday(part)?;
                if !days.contains(&day) {
                    days.push(day);
                }
            }
        }
    }

    (!days.is_empty()).then_some(days)
}

fn minute_of_day(at: &NaiveDateTime) -> u16 {
    // hour < 24 and minute < 60, so this always fits
    (at.hour() * 60 + at.minute()) as u16
}

/// true if `at` falls in any range of the spec; malformed specs never match
pub fn time_spec_matches(spec: &str, at: &NaiveDateTime) -> bool {
    let minute = minute_of_day(at);
    parse_time_ranges(spec)
        .map(|ranges| ranges.iter().any(|r| r.contains(minute)))
        .unwrap_or(false)
}

/// true if the weekday of `at` is named by the spec; malformed specs never match
pub fn day_spec_matches(spec: &str, at: &NaiveDateTime) -> bool {
    parse_days(spec)
        .map(|days| days.contains(&at.weekday()))
        .unwrap_or(false)
}
