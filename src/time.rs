//! Time bucketing for SQL backends
//!
//! A granularity is expanded into the time parts (year, month, ...) needed to
//! identify a bucket. The converter groups by those parts; the reconciler turns
//! the projected part values back into the bucket start instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc, Weekday};

use crate::error::{Result, SqlBackendError};
use crate::query::{Granularity, Interval};

/// One component extracted from a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePart {
    Year,
    Quarter,
    Month,
    DayOfYear,
    Hour,
    Minute,
    /// ISO-8601 week-numbering year
    IsoYear,
    /// ISO-8601 week of the year (1..=53)
    IsoWeek,
}

impl TimePart {
    /// Column alias under which the part is projected
    pub fn alias(&self) -> &'static str {
        match self {
            TimePart::Year => "__year",
            TimePart::Quarter => "__quarter",
            TimePart::Month => "__month",
            TimePart::DayOfYear => "__dayofyear",
            TimePart::Hour => "__hour",
            TimePart::Minute => "__minute",
            TimePart::IsoYear => "__isoyear",
            TimePart::IsoWeek => "__isoweek",
        }
    }
}

/// Maps a granularity onto time parts and back
#[derive(Debug, Clone, PartialEq)]
pub struct SqlTimeConverter {
    granularity: Granularity,
    /// Bucket start reported for `all`
    origin: DateTime<Utc>,
}

impl SqlTimeConverter {
    pub fn new(granularity: Granularity, intervals: &[Interval]) -> Self {
        let origin = intervals
            .iter()
            .map(|i| i.start)
            .min()
            .unwrap_or_default();
        Self { granularity, origin }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Time parts grouped on, in projection order
    pub fn time_parts(&self) -> &'static [TimePart] {
        use TimePart::*;
        match self.granularity {
            Granularity::All | Granularity::None => &[],
            Granularity::Minute => &[Year, DayOfYear, Hour, Minute],
            Granularity::Hour => &[Year, DayOfYear, Hour],
            Granularity::Day => &[Year, DayOfYear],
            Granularity::Week => &[IsoYear, IsoWeek],
            Granularity::Month => &[Year, Month],
            Granularity::Quarter => &[Year, Quarter],
            Granularity::Year => &[Year],
        }
    }

    /// Whether the statement groups by the raw timestamp instead of time parts
    pub fn groups_by_raw_timestamp(&self) -> bool {
        self.granularity == Granularity::None
    }

    /// Number of leading result columns that only carry time information
    pub fn leading_time_columns(&self) -> usize {
        if self.groups_by_raw_timestamp() {
            1
        } else {
            self.time_parts().len()
        }
    }

    /// Bucket start for `all`, which projects no time columns
    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    /// Rebuild the bucket start from projected part values, in `time_parts()` order
    pub fn bucket_start(&self, values: &[i64]) -> Result<DateTime<Utc>> {
        let parts = self.time_parts();
        if parts.is_empty() {
            return Ok(self.origin);
        }
        if values.len() != parts.len() {
            return Err(SqlBackendError::execution(format!(
                "expected {} time part value(s) for granularity '{}', got {}",
                parts.len(),
                self.granularity,
                values.len()
            )));
        }

        let part = |p: TimePart| -> i64 {
            parts
                .iter()
                .position(|candidate| *candidate == p)
                .map(|i| values[i])
                .unwrap_or(0)
        };
        let narrow = |v: i64| -> Result<u32> {
            u32::try_from(v).map_err(|_| SqlBackendError::execution(format!("time part out of range: {}", v)))
        };
        let year = i32::try_from(part(TimePart::Year))
            .map_err(|_| SqlBackendError::execution("year out of range"))?;

        let date = match self.granularity {
            Granularity::Minute | Granularity::Hour | Granularity::Day => {
                NaiveDate::from_yo_opt(year, narrow(part(TimePart::DayOfYear))?)
            }
            Granularity::Week => {
                let iso_year = i32::try_from(part(TimePart::IsoYear))
                    .map_err(|_| SqlBackendError::execution("ISO year out of range"))?;
                NaiveDate::from_isoywd_opt(iso_year, narrow(part(TimePart::IsoWeek))?, Weekday::Mon)
            }
            Granularity::Month => NaiveDate::from_ymd_opt(year, narrow(part(TimePart::Month))?, 1),
            Granularity::Quarter => {
                let quarter = narrow(part(TimePart::Quarter))?;
                if !(1..=4).contains(&quarter) {
                    return Err(SqlBackendError::execution(format!("invalid quarter: {}", quarter)));
                }
                NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
            }
            Granularity::Year => NaiveDate::from_ymd_opt(year, 1, 1),
            Granularity::All | Granularity::None => None,
        }
        .ok_or_else(|| SqlBackendError::execution(format!("invalid time parts {:?}", values)))?;

        let (hour, minute) = match self.granularity {
            Granularity::Minute => (narrow(part(TimePart::Hour))?, narrow(part(TimePart::Minute))?),
            Granularity::Hour => (narrow(part(TimePart::Hour))?, 0),
            _ => (0, 0),
        };
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| SqlBackendError::execution(format!("invalid time of day {}:{}", hour, minute)))?;

        Ok(NaiveDateTime::new(date, time).and_utc())
    }
}

/// Parse a timestamp as rendered by common SQL engines
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format an instant the way the native engine reports bucket timestamps
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
