//! # Report Windows
//!
//! Reports read sales, inventory or activity rows created inside a time
//! window. The window is chosen by the caller and resolved against "now".
//!
//! ```text
//!   week   ──►  [now - 7d,   now)
//!   month  ──►  [now - 30d,  now)
//!   year   ──►  [now - 365d, now)
//!   custom ──►  [start,      end)     start < end
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};

/// Which collection a report reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Sales,
    Inventory,
    Activity,
}

impl ReportKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Sales => "sales",
            ReportKind::Inventory => "inventory",
            ReportKind::Activity => "activity",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales" => Ok(ReportKind::Sales),
            "inventory" => Ok(ReportKind::Inventory),
            "activity" | "activity-logs" => Ok(ReportKind::Activity),
            other => Err(CoreError::UnknownReport(other.to_string())),
        }
    }
}

/// A report window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    Week,
    Month,
    Year,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl ReportWindow {
    /// Builds a window from its wire name and optional custom bounds.
    ///
    /// ```rust
    /// use hq_core::ReportWindow;
    ///
    /// assert_eq!(ReportWindow::parse("week", None, None).unwrap(), ReportWindow::Week);
    /// assert!(ReportWindow::parse("custom", None, None).is_err());
    /// ```
    pub fn parse(
        name: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        match name {
            "week" => Ok(ReportWindow::Week),
            "month" => Ok(ReportWindow::Month),
            "year" => Ok(ReportWindow::Year),
            "custom" => {
                let start = start.ok_or_else(|| ValidationError::required("start"))?;
                let end = end.ok_or_else(|| ValidationError::required("end"))?;
                Ok(ReportWindow::Custom { start, end })
            }
            other => Err(ValidationError::InvalidFormat {
                field: "window".to_string(),
                reason: format!("'{other}' is not one of week, month, year, custom"),
            }),
        }
    }

    /// Resolves the window to a concrete range ending at `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<TimeRange, ValidationError> {
        match *self {
            ReportWindow::Week => Ok(TimeRange::trailing(now, Duration::days(7))),
            ReportWindow::Month => Ok(TimeRange::trailing(now, Duration::days(30))),
            ReportWindow::Year => Ok(TimeRange::trailing(now, Duration::days(365))),
            ReportWindow::Custom { start, end } => TimeRange::new(start, end),
        }
    }
}

/// A half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyRange);
        }
        Ok(TimeRange { start, end })
    }

    fn trailing(now: DateTime<Utc>, span: Duration) -> Self {
        TimeRange {
            start: now - span,
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}
