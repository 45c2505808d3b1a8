//! CRM summary lines and the minute-bucketed report log.
//!
//! Every line starts with a `[YYYY-MM-DD HH:MM]` bucket. Writing a line replaces any
//! earlier line for the same bucket, so re-running the job within a minute never
//! duplicates entries.

use crate::domain::CrmTotals;
use crate::error::Result;
use chrono::{NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

pub const BUCKET_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Truncates to the start of the minute.
pub fn minute_bucket(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// `[YYYY-MM-DD HH:MM]`
pub fn bucket_key(at: NaiveDateTime) -> String {
    format!("[{}]", minute_bucket(at).format(BUCKET_FORMAT))
}

fn format_revenue(revenue: Decimal) -> String {
    let mut rounded = revenue.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportLine {
    Totals { at: NaiveDateTime, totals: CrmTotals },
    Failure { at: NaiveDateTime, message: String },
}

impl ReportLine {
    pub fn totals(at: NaiveDateTime, totals: CrmTotals) -> Self {
        ReportLine::Totals { at, totals }
    }

    pub fn failure(at: NaiveDateTime, message: impl Into<String>) -> Self {
        ReportLine::Failure {
            at,
            message: message.into(),
        }
    }

    pub fn at(&self) -> NaiveDateTime {
        match self {
            ReportLine::Totals { at, .. } | ReportLine::Failure { at, .. } => *at,
        }
    }

    pub fn key(&self) -> String {
        bucket_key(self.at())
    }

    /// Renders the line without a trailing newline.
    pub fn render(&self) -> String {
        match self {
            ReportLine::Totals { at, totals } => format!(
                "{} {} customers, {} orders, ${} revenue",
                bucket_key(*at),
                totals.total_customers,
                totals.total_orders,
                format_revenue(totals.total_revenue)
            ),
            ReportLine::Failure { at, message } => {
                // keep the log one-entry-per-line
                let message = message.replace(['\r', '\n'], " ");
                format!("{} report error: {}", bucket_key(*at), message)
            }
        }
    }
}

/// Drops every line of `existing` in the same bucket as `line`, then appends `line`.
pub fn merge_line(existing: &str, line: &ReportLine) -> String {
    let key = line.key();
    let mut out = String::with_capacity(existing.len() + 64);
    for kept in existing
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with(&key))
    {
        out.push_str(kept);
        out.push('\n');
    }
    out.push_str(&line.render());
    out.push('\n');
    out
}

/// Merges `line` into the log at `path` and replaces the file via a temp sibling.
pub fn write_report_line(path: &Path, line: &ReportLine) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let merged = merge_line(&existing, line);

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, merged)?;
    fs::rename(&tmp, path)?;
    debug!("Wrote report line for {} to {}", line.key(), path.display());
    Ok(())
}
