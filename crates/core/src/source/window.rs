//! Inclusive date window selected for one daily run.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::SourceError;

/// Inclusive `[begin, end]` calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    begin: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Creates a window, rejecting `begin > end`.
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Result<Self, SourceError> {
        if begin > end {
            return Err(SourceError::InvalidWindow { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Resolves the window for a run happening on `today`.
    ///
    /// The window always ends yesterday. With an explicit `days_back` it
    /// starts `days_back` days before today; otherwise it starts three days
    /// back on Mondays (covering the weekend) and two days back on any other
    /// day.
    pub fn resolve(today: NaiveDate, days_back: Option<u32>) -> Result<Self, SourceError> {
        let days_back = match days_back {
            Some(days) => u64::from(days),
            None if today.weekday() == Weekday::Mon => 3,
            None => 2,
        };
        let begin = today
            .checked_sub_days(Days::new(days_back))
            .ok_or(SourceError::WindowOutOfRange { days_back })?;
        let end = today
            .checked_sub_days(Days::new(1))
            .ok_or(SourceError::WindowOutOfRange { days_back: 1 })?;
        Self::new(begin, end)
    }

    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// End date as digits only (`YYYYMMDD`), used to name the output file.
    pub fn end_tag(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ~ {}",
            self.begin.format("%Y/%m/%d"),
            self.end.format("%Y/%m/%d")
        )
    }
}
