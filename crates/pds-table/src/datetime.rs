//! Date and time grammar validation, keyed by the declared date/time kind.

use chrono::{NaiveDate, NaiveTime};
use pds_model::FieldType;
use regex::Regex;

/// The consumed date/time validation capability.
pub trait DateTimeChecker {
    fn is_valid(&self, kind: FieldType, value: &str) -> bool;
}

/// Human-readable list of the patterns accepted for a date/time kind, used
/// verbatim in mismatch messages.
pub fn accepted_patterns(kind: FieldType) -> &'static str {
    match kind {
        FieldType::AsciiDateDoy => "YYYY[Z], YYYY-DOY[Z]",
        FieldType::AsciiDateTimeDoy => {
            "YYYY[Z], YYYY-DOYThh[Z], YYYY-DOYThh:mm[Z], YYYY-DOYThh:mm:ss[.ffffff][Z]"
        }
        FieldType::AsciiDateTimeDoyUtc => {
            "YYYYZ, YYYY-DOYThhZ, YYYY-DOYThh:mmZ, YYYY-DOYThh:mm:ss[.ffffff]Z"
        }
        FieldType::AsciiDateTimeYmd => {
            "YYYY[Z], YYYY-MM-DDThh[Z], YYYY-MM-DDThh:mm[Z], YYYY-MM-DDThh:mm:ss[.ffffff][Z]"
        }
        FieldType::AsciiDateTimeYmdUtc => {
            "YYYYZ, YYYY-MM-DDThhZ, YYYY-MM-DDThh:mmZ, YYYY-MM-DDThh:mm:ss[.ffffff]Z"
        }
        FieldType::AsciiDateYmd => "YYYY[Z], YYYY-MM[Z], YYYY-MM-DD[Z]",
        FieldType::AsciiTime => "hh:mm:ss[.ffffff][Z]",
        _ => "",
    }
}

/// Grammar-level checker: a regular-expression grammar per kind plus
/// calendar range checks on the captured components.
pub struct GrammarDateTimeChecker {
    date_doy: Regex,
    date_time_doy: Regex,
    date_ymd: Regex,
    date_time_ymd: Regex,
    time: Regex,
}

impl GrammarDateTimeChecker {
    pub fn new() -> Self {
        Self {
            date_doy: Regex::new(r"^(\d{4})(?:-(\d{3}))?Z?$").expect("valid pattern"),
            date_time_doy: Regex::new(
                r"^(\d{4})(?:-(\d{3})(?:T(\d{2})(?::(\d{2})(?::(\d{2})(?:\.\d{1,6})?)?)?)?)?Z?$",
            )
            .expect("valid pattern"),
            date_ymd: Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?Z?$").expect("valid pattern"),
            date_time_ymd: Regex::new(
                r"^(\d{4})(?:-(\d{2})-(\d{2})(?:T(\d{2})(?::(\d{2})(?::(\d{2})(?:\.\d{1,6})?)?)?)?)?Z?$",
            )
            .expect("valid pattern"),
            time: Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(?:\.\d{1,6})?Z?$").expect("valid pattern"),
        }
    }

    fn check_doy(&self, pattern: &Regex, value: &str) -> bool {
        let Some(caps) = pattern.captures(value) else {
            return false;
        };
        let year: i32 = match caps[1].parse() {
            Ok(y) => y,
            Err(_) => return false,
        };
        if let Some(doy) = caps.get(2) {
            let doy: u32 = match doy.as_str().parse() {
                Ok(d) => d,
                Err(_) => return false,
            };
            if NaiveDate::from_yo_opt(year, doy).is_none() {
                return false;
            }
        }
        clock_in_range(&caps, 3)
    }

    fn check_ymd(&self, pattern: &Regex, value: &str) -> bool {
        let Some(caps) = pattern.captures(value) else {
            return false;
        };
        let year: i32 = match caps[1].parse() {
            Ok(y) => y,
            Err(_) => return false,
        };
        match (caps.get(2), caps.get(3)) {
            (Some(month), Some(day)) => {
                let (Ok(month), Ok(day)) = (month.as_str().parse(), day.as_str().parse()) else {
                    return false;
                };
                if NaiveDate::from_ymd_opt(year, month, day).is_none() {
                    return false;
                }
            }
            (Some(month), None) => {
                let Ok(month) = month.as_str().parse::<u32>() else {
                    return false;
                };
                if !(1..=12).contains(&month) {
                    return false;
                }
            }
            _ => {}
        }
        clock_in_range(&caps, 4)
    }

    fn check_time(&self, value: &str) -> bool {
        let Some(caps) = self.time.captures(value) else {
            return false;
        };
        let (Ok(hour), Ok(minute), Ok(second)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        else {
            return false;
        };
        NaiveTime::from_hms_opt(hour, minute, second).is_some()
    }
}

impl Default for GrammarDateTimeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl DateTimeChecker for GrammarDateTimeChecker {
    fn is_valid(&self, kind: FieldType, value: &str) -> bool {
        match kind {
            FieldType::AsciiDateDoy => self.check_doy(&self.date_doy, value),
            FieldType::AsciiDateTimeDoy => self.check_doy(&self.date_time_doy, value),
            FieldType::AsciiDateTimeDoyUtc => {
                value.ends_with('Z') && self.check_doy(&self.date_time_doy, value)
            }
            FieldType::AsciiDateYmd => self.check_ymd(&self.date_ymd, value),
            FieldType::AsciiDateTimeYmd => self.check_ymd(&self.date_time_ymd, value),
            FieldType::AsciiDateTimeYmdUtc => {
                value.ends_with('Z') && self.check_ymd(&self.date_time_ymd, value)
            }
            FieldType::AsciiTime => self.check_time(value),
            _ => false,
        }
    }
}

/// Range-check optional hour/minute/second capture groups starting at the
/// given group index.
fn clock_in_range(caps: &regex::Captures<'_>, first_group: usize) -> bool {
    let component = |index: usize| -> Option<u32> {
        caps.get(first_group + index)
            .and_then(|m| m.as_str().parse().ok())
    };
    if let Some(hour) = component(0) {
        if hour > 23 {
            return false;
        }
    }
    if let Some(minute) = component(1) {
        if minute > 59 {
            return false;
        }
    }
    if let Some(second) = component(2) {
        if second > 59 {
            return false;
        }
    }
    true
}
