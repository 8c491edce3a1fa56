use crate::error::{Result, SimulationError};
use chrono::{Datelike, Days, NaiveDate};

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(NaiveDate::MAX)
}

/// Calendar bucket key used to group transactions, e.g. "2024-03".
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Parses a "YYYY-MM" key back into its first and last day.
pub fn parse_month_key(key: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start_str = format!("{}-01", key.trim());
    let start = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        SimulationError::DateError(format!("Invalid month key: {}. Expected YYYY-MM", key))
    })?;
    let end = last_day_of_month(start.year(), start.month());
    Ok((start, end))
}

/// Label of the zero-based projected month `index`.
pub fn projection_label(index: usize) -> String {
    format!("Month {}", index + 1)
}

/// `numerator / denominator`, or 0 when the denominator is zero.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// `part` as a percentage of `whole`, or 0 when `whole` is not positive.
pub fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Formats an amount as dollars with thousands separators, e.g. "$1,234.50".
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
