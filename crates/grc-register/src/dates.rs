// dates.rs: Calendar-date handling for due dates and workshop dates.
//
// Every rule in the register compares dates at day granularity in local
// time: a workshop held later today is still open, and an extension due
// today is still acceptable. Stored documents may carry either a plain
// `YYYY-MM-DD` or a full ISO-8601 timestamp; both collapse to a NaiveDate.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Today's local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Read a calendar date from a plain date or an ISO-8601 timestamp.
///
/// Timestamps with an offset are converted to local time before the time of
/// day is dropped. Returns `None` for anything unparseable.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local).date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Serde adapter for a required calendar date field.
pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_calendar_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

/// Serde adapter for an optional calendar date field (`null` or absent → None).
pub mod optional_calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_calendar_date(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_date_parses() {
        assert_eq!(
            parse_calendar_date("2025-03-14"),
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
    }

    #[test]
    fn naive_timestamp_keeps_its_date() {
        assert_eq!(
            parse_calendar_date("2025-03-14T23:59:59.000"),
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
    }

    #[test]
    fn rfc3339_timestamp_parses() {
        assert!(parse_calendar_date("2025-03-14T10:00:00Z").is_some());
    }

    #[test]
    fn garbage_and_empty_are_rejected() {
        assert!(parse_calendar_date("next tuesday").is_none());
        assert!(parse_calendar_date("2025-13-40").is_none());
        assert!(parse_calendar_date("   ").is_none());
    }
}
