use chrono::{Datelike, Days, NaiveDate, Weekday};

pub const FORM_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_DATE_FORMAT: &str = "%d %B %Y";

/// Days between resignation and relieving, counted on the calendar.
pub const NOTICE_PERIOD_DAYS: u64 = 30;

/// Parses a `YYYY-MM-DD` form value. Blank or malformed input yields `None`.
pub fn parse_form_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, FORM_DATE_FORMAT).ok()
}

/// "05 March 2024"
pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn is_workday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Steps back one calendar day at a time until `days_before` Monday–Friday
/// days have been counted. `None` when that walks off the calendar.
pub fn previous_workday(date: NaiveDate, days_before: u32) -> Option<NaiveDate> {
    let mut counted = 0;
    let mut current = date;
    while counted < days_before {
        current = current.checked_sub_days(Days::new(1))?;
        if is_workday(current) {
            counted += 1;
        }
    }
    Some(current)
}

/// `None` for resignations within the notice period of the last
/// representable date.
pub fn relieving_date(resignation: NaiveDate) -> Option<NaiveDate> {
    resignation.checked_add_days(Days::new(NOTICE_PERIOD_DAYS))
}

/// "january" -> "January 2024"
pub fn month_label(month: &str, year: i32) -> String {
    let month = month.trim();
    let mut chars = month.chars();
    let titled: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    format!("{titled} {year}")
}
