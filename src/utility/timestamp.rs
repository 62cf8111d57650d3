// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Local wall-clock timestamps with second resolution
//!
//! Readings and status checks are stamped with the local time formatted as
//! `YYYY-MM-DD HH:MM:SS`. The format sorts lexicographically in
//! chronological order, which the reading log relies on for range queries.

use chrono::{Local, NaiveDateTime, Timelike};

/// Storage and wire format of every timestamp
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to the second
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format(timestamp: &NaiveDateTime) -> String {
    timestamp.format(FORMAT).to_string()
}

pub fn parse(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, FORMAT)
}

/// Start of a window covering the last `hours` hours, saturating at the
/// earliest representable time
pub fn hours_ago(hours: u32) -> NaiveDateTime {
    now()
        .checked_sub_signed(chrono::Duration::hours(i64::from(hours)))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Serde adapter for `NaiveDateTime` fields using [`FORMAT`]
pub mod local_seconds {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `NaiveDateTime` fields using [`FORMAT`]
pub mod local_seconds_option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&super::format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| super::parse(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_round_trip() {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 3)
            .unwrap();
        assert_eq!(format(&ts), "2025-03-09 07:05:03");
        assert_eq!(parse("2025-03-09 07:05:03").unwrap(), ts);
    }

    #[test]
    fn test_now_has_no_subseconds() {
        assert_eq!(now().nanosecond(), 0);
    }

    #[test]
    fn test_format_sorts_chronologically() {
        let earlier = parse("2025-01-09 23:59:59").unwrap();
        let later = parse("2025-01-10 00:00:00").unwrap();
        assert!(format(&earlier) < format(&later));
    }

    #[test]
    fn test_hours_ago_saturates() {
        assert!(hours_ago(1) < now());
        assert_eq!(hours_ago(u32::MAX), NaiveDateTime::MIN);
        assert!(format(&hours_ago(u32::MAX)) < format(&now()));
    }
}
