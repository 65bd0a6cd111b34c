use crate::error::ParseError;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

// Month names are matched case-insensitively by chrono; %b also takes full names.
// Slash dates are tried month-first, so a first field over 12 falls through to day-first.
const DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

const TIME_FORMATS: [&str; 4] = ["%I:%M %p", "%I:%M:%S %p", "%H:%M", "%H:%M:%S"];

/// Parse a marketplace date such as `2025-12-15`, `December 15, 2025`,
/// `15th Dec 2025`, `15/12/2025` or `Dec 15, 2025 at 2:00 PM`.
/// A date without a year falls in the current year.
pub fn parse_departure_date(text: &str) -> Result<NaiveDate, ParseError> {
    parse_departure_date_in(text, Local::now().year())
}

/// As [`parse_departure_date`], with `default_year` for dates that omit one
pub fn parse_departure_date_in(text: &str, default_year: i32) -> Result<NaiveDate, ParseError> {
    let trimmed = text.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Ok(date);
        }
    }

    let tokens = date_tokens(trimmed);
    let simplified = tokens.join(" ");
    if let Some(date) = parse_with_formats(&simplified) {
        return Ok(date);
    }

    let has_year = tokens
        .iter()
        .any(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit()));
    if !has_year && !tokens.is_empty() {
        if let Some(date) = parse_with_formats(&format!("{} {}", simplified, default_year)) {
            return Ok(date);
        }
    }

    Err(ParseError::Date(text.to_string()))
}

fn parse_with_formats(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse a `Departure Time:` value: `2:00 PM`, `2pm`, `14:00`.
pub fn parse_departure_time(text: &str) -> Result<NaiveTime, ParseError> {
    let simplified = simplify_time(text);
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&simplified, fmt).ok())
        .ok_or_else(|| ParseError::Time(text.to_string()))
}

/// Date words only: commas, ordinals, a leading weekday and any trailing
/// time of day (with its `at`) are dropped.
fn date_tokens(text: &str) -> Vec<String> {
    let cleaned = text.replace(',', " ");
    let mut tokens: Vec<String> = Vec::new();

    for token in cleaned.split_whitespace() {
        let lower = token.to_lowercase();
        if lower == "at" || looks_like_time(&lower) {
            break;
        }
        tokens.push(strip_ordinal(token));
    }

    if let Some(first) = tokens.first() {
        let lower = first.to_lowercase();
        let is_weekday = WEEKDAYS.iter().any(|day| lower.starts_with(day));
        if is_weekday && !lower.chars().any(|c| c.is_ascii_digit()) {
            tokens.remove(0);
        }
    }

    tokens
}

/// `2:00`, `14:00:00`, `2pm`, `am`
fn looks_like_time(lower: &str) -> bool {
    let starts_with_digit = lower.starts_with(|c: char| c.is_ascii_digit());
    let meridiem = ["am", "pm", "a.m.", "p.m."].iter().any(|m| lower.ends_with(m));
    lower.contains(':') || (meridiem && (starts_with_digit || lower.len() <= 4))
}

/// `15th` -> `15`; anything else is returned unchanged
fn strip_ordinal(token: &str) -> String {
    let lower = token.to_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(number) = lower.strip_suffix(suffix) {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                return number.to_string();
            }
        }
    }
    token.to_string()
}

fn simplify_time(text: &str) -> String {
    let upper = text.trim().to_uppercase().replace('.', "");
    let (clock, meridiem) = match upper.strip_suffix("AM") {
        Some(rest) => (rest.trim().to_string(), Some("AM")),
        None => match upper.strip_suffix("PM") {
            Some(rest) => (rest.trim().to_string(), Some("PM")),
            None => (upper, None),
        },
    };

    match meridiem {
        Some(m) if clock.contains(':') => format!("{} {}", clock, m),
        Some(m) => format!("{}:00 {}", clock, m),
        None => clock,
    }
}
