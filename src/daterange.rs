use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DateRangeError;

/// Display form of the period a report was generated for.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct DateRange {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl DateRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        DateRange {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Self {
        DateRange::new(format_date(from), format_date(to))
    }

    /// "`from` to `to`", as printed under the report title.
    pub fn label(&self) -> String {
        format!("{} to {}", self.from, self.to)
    }
}

/// `dd-mm-yyyy`, the format the reporting backend expects.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Accepts `dd-mm-yyyy` and the ISO `yyyy-mm-dd` a date input submits.
pub fn parse_date(s: &str) -> Result<NaiveDate, DateRangeError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| DateRangeError::Unparseable(s.to_string()))
}

/// Predefined periods offered next to the custom date picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickRange {
    Today,
    Yesterday,
    CurrentMonth,
    PreviousMonth,
}

impl FromStr for QuickRange {
    type Err = DateRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(QuickRange::Today),
            "yesterday" => Ok(QuickRange::Yesterday),
            "current_month" => Ok(QuickRange::CurrentMonth),
            "previous_month" => Ok(QuickRange::PreviousMonth),
            other => Err(DateRangeError::UnknownPreset(other.to_string())),
        }
    }
}

impl QuickRange {
    pub fn resolve(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let month_start = today.with_day(1).unwrap_or(today);
        match self {
            QuickRange::Today => (today, today),
            QuickRange::Yesterday => {
                let yesterday = today.pred_opt().unwrap_or(today);
                (yesterday, yesterday)
            }
            QuickRange::CurrentMonth => (month_start, today),
            QuickRange::PreviousMonth => {
                let last = month_start.pred_opt().unwrap_or(month_start);
                (last.with_day(1).unwrap_or(last), last)
            }
        }
    }

    pub fn range(self, today: NaiveDate) -> DateRange {
        let (from, to) = self.resolve(today);
        DateRange::from_dates(from, to)
    }
}

/// Validates a user-picked range. Single-date reports only look at `from`.
pub fn custom_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    single_date: bool,
) -> Result<DateRange, DateRangeError> {
    if single_date {
        let day = from.ok_or(DateRangeError::MissingDate)?;
        return Ok(DateRange::from_dates(day, day));
    }

    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(DateRangeError::Inverted),
        (Some(from), Some(to)) => Ok(DateRange::from_dates(from, to)),
        _ => Err(DateRangeError::MissingDates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn formats_day_first() {
        assert_eq!(format_date(d(2024, 3, 7)), "07-03-2024");
        assert_eq!(DateRange::from_dates(d(2024, 1, 1), d(2024, 1, 31)).label(), "01-01-2024 to 31-01-2024");
    }

    #[test]
    fn parses_both_input_formats() {
        assert_eq!(parse_date("05-06-2023").unwrap(), d(2023, 6, 5));
        assert_eq!(parse_date("2023-06-05").unwrap(), d(2023, 6, 5));
        assert!(matches!(parse_date("June 5"), Err(DateRangeError::Unparseable(_))));
    }

    #[test]
    fn quick_ranges() {
        let today = d(2024, 3, 15);
        assert_eq!(QuickRange::Today.resolve(today), (today, today));
        assert_eq!(QuickRange::Yesterday.resolve(today), (d(2024, 3, 14), d(2024, 3, 14)));
        assert_eq!(QuickRange::CurrentMonth.resolve(today), (d(2024, 3, 1), today));
        // Leap February
        assert_eq!(QuickRange::PreviousMonth.resolve(today), (d(2024, 2, 1), d(2024, 2, 29)));
        // January rolls back into the previous year
        assert_eq!(QuickRange::PreviousMonth.resolve(d(2024, 1, 10)), (d(2023, 12, 1), d(2023, 12, 31)));
        assert_eq!(QuickRange::Yesterday.resolve(d(2024, 3, 1)).0, d(2024, 2, 29));
    }

    #[test]
    fn quick_range_names() {
        assert_eq!("previous_month".parse::<QuickRange>().unwrap(), QuickRange::PreviousMonth);
        assert!("last_week".parse::<QuickRange>().is_err());
    }

    #[test]
    fn custom_range_validation() {
        assert_eq!(custom_range(None, None, true), Err(DateRangeError::MissingDate));
        assert_eq!(
            custom_range(Some(d(2024, 5, 2)), None, true).unwrap(),
            DateRange::new("02-05-2024", "02-05-2024")
        );
        assert_eq!(custom_range(Some(d(2024, 5, 2)), None, false), Err(DateRangeError::MissingDates));
        assert_eq!(
            custom_range(Some(d(2024, 5, 3)), Some(d(2024, 5, 2)), false),
            Err(DateRangeError::Inverted)
        );
        assert!(custom_range(Some(d(2024, 5, 2)), Some(d(2024, 5, 2)), false).is_ok());
    }
}
