// Parsing and formatting helpers.
//
// All the forgiving CSV handling lives here so the loader and the
// aggregations can work with typed `Option` values.
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_format::{Locale, ToFormattedString};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Markers the bookings export uses for "no value".
const NULL_MARKERS: [&str; 4] = ["null", "nan", "na", "none"];

/// Trim a text cell and map empty strings and null markers to `None`.
///
/// Exports of this dataset wrap some identifiers in literal quotes
/// (`"\"CNR123\""`), so those are stripped too.
pub fn clean_text(s: Option<&str>) -> Option<String> {
    let s = s?.trim().trim_matches('"').trim();
    if s.is_empty() || NULL_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return None;
    }
    Some(s.to_string())
}

/// Parse a numeric cell, tolerating thousands separators and padding.
///
/// Anything containing letters (`null`, `NaN`, `12km`) is treated as missing.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

pub fn parse_time_safe(s: Option<&str>) -> Option<NaiveTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
}

pub fn average(v: &[f64]) -> f64 {
    // Returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Mean of the values, or `None` when there is nothing to average.
pub fn mean_opt(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        None
    } else {
        Some(average(v))
    }
}

/// Trailing moving average where point `i` averages the last
/// `min(window, i + 1)` values. The output has the same length as the input.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let n = (i + 1).min(window);
            values[i + 1 - n..=i].iter().sum::<f64>() / n as f64
        })
        .collect()
}

pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_money(n: f64) -> String {
    format!("₹{}", format_number(n, 2))
}

pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) => format_number(v, decimals),
        None => "n/a".to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_markers_become_none() {
        assert_eq!(clean_text(Some("null")), None);
        assert_eq!(clean_text(Some("  ")), None);
        assert_eq!(clean_text(Some("\"CNR5884300\"")), Some("CNR5884300".to_string()));
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("1,250.5")), Some(1250.5));
    }

    #[test]
    fn dates_accept_several_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 23);
        assert_eq!(parse_date_safe(Some("2024-03-23")), expected);
        assert_eq!(parse_date_safe(Some("23-03-2024")), expected);
        assert_eq!(parse_date_safe(Some("2024-03-23 12:29:38")), expected);
        assert_eq!(parse_date_safe(Some("March 23")), None);
    }

    #[test]
    fn trailing_mean_uses_partial_windows() {
        let values = [7.0, 1.0, 4.0, 8.0];
        let out = trailing_mean(&values, 3);
        assert_eq!(out, vec![7.0, 4.0, 4.0, 13.0 / 3.0]);
    }

    #[test]
    fn trailing_mean_is_exact_per_window() {
        assert_eq!(trailing_mean(&[0.1, 0.2, 0.3], 1), vec![0.1, 0.2, 0.3]);
        assert_eq!(trailing_mean(&[1e17, 1.0], 1), vec![1e17, 1.0]);
        assert_eq!(
            trailing_mean(&[0.1, 0.2, 0.3], 2),
            vec![0.1, (0.1 + 0.2) / 2.0, (0.2 + 0.3) / 2.0]
        );
        let out = trailing_mean(&[1e17, 1.0, 3.0, 5.0], 2);
        assert_eq!(out[2], 2.0);
        assert_eq!(out[3], 4.0);
    }

    #[test]
    fn trailing_mean_zero_window_is_identity() {
        let values = [2.0, 5.0];
        assert_eq!(trailing_mean(&values, 0), vec![2.0, 5.0]);
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_money(300.0), "₹300.00");
        assert_eq!(format_opt(None, 2), "n/a");
        assert_eq!(percent(2, 3), 2.0 / 3.0 * 100.0);
        assert_eq!(percent(1, 0), 0.0);
    }
}
