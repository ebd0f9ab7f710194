use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("malformed date '{date}': expected seconds since the epoch")]
    Malformed { date: String },
}

/// Resolves the stored textual date (seconds since the epoch) to a point in time.
pub fn resolve(date: &str) -> Result<DateTime<Utc>, DateError> {
    let malformed = || DateError::Malformed {
        date: date.to_string(),
    };
    let seconds = date.trim().parse::<i64>().map_err(|_| malformed())?;
    DateTime::from_timestamp(seconds, 0).ok_or_else(malformed)
}

/// Calendar date shown on chart axes and used in file names.
pub fn calendar_date(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}
