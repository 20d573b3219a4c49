use crate::model::TargetConfig;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub const MISSING_DATE_TIME: &str = "Por favor, seleciona fecha y hora";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("{}", MISSING_DATE_TIME)]
    MissingDateTime,
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("invalid time (use HH:MM): {0}")]
    InvalidTime(String),
}

/// Validates the setter form. Date and time are required, the message may
/// be empty.
pub fn parse_submission(date: &str, time: &str, message: &str) -> Result<TargetConfig, FormError> {
    let date = date.trim();
    let time = time.trim();
    if date.is_empty() || time.is_empty() {
        return Err(FormError::MissingDateTime);
    }
    let day = parse_date(date)?;
    let clock = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| FormError::InvalidTime(time.to_string()))?;
    Ok(TargetConfig::new(NaiveDateTime::new(day, clock), message))
}

pub fn parse_date(input: &str) -> Result<NaiveDate, FormError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| FormError::InvalidDate(trimmed.to_string()))
}
