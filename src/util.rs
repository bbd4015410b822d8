// Parsing, statistics and formatting helpers.
//
// Everything that touches raw CSV text or floating-point edge cases lives here
// so the aggregation code can work with typed values and explicit `Metric`s.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use serde::Serializer;
use std::cmp::Ordering;

/// A derived figure that may be undefined (zero denominator, too few samples).
/// `None` is rendered as [`NOT_AVAILABLE`] everywhere it is shown.
pub type Metric = Option<f64>;

pub const NOT_AVAILABLE: &str = "N/A";

/// Parse a numeric CSV field.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
pub fn parse_f64_strict(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let v = s.replace(',', "").parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

pub fn days_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// `numerator / denominator`, or `None` when the result would not be finite.
pub fn ratio(numerator: f64, denominator: f64) -> Metric {
    if denominator == 0.0 {
        return None;
    }
    let r = numerator / denominator;
    r.is_finite().then_some(r)
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().sum();
    Some(sum / v.len() as f64)
}

/// Mean over metrics; undefined as soon as one member is undefined.
pub fn average_metric(v: &[Metric]) -> Metric {
    let values: Option<Vec<f64>> = v.iter().copied().collect();
    average(&values?)
}

/// Sample standard deviation (n - 1 denominator). Needs at least two values.
pub fn sample_std_dev(v: &[f64]) -> Metric {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v)?;
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (v.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn min_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Two decimals, halves to the even neighbour (`10.125` -> `10.12`).
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round_ties_even() / 100.0
}

pub fn round_metric(m: Metric) -> Metric {
    m.map(round2)
}

/// Share of `part` in `total` as a percentage, rounded to 2 decimals.
pub fn market_share(part: f64, total: f64) -> Metric {
    round_metric(ratio(part, total).map(|r| r * 100.0))
}

/// Descending rank with ties sharing the mean of the positions they span,
/// so two values tied for the top both get 1.5.
pub fn average_rank_desc(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start+1 ..= end, 1-based
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale thousands separators, e.g. `1,234,567.89`.
    let s = format!("{:.*}", decimals, n.abs());
    let (int_part, frac) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let mut res = group_thousands(int_part, Locale::en.separator());
    if let Some(frac) = frac {
        res.push('.');
        res.push_str(frac);
    }
    let is_zero = s.trim_start_matches(['0', '.']).is_empty();
    if n.is_sign_negative() && !is_zero {
        format!("-{}", res)
    } else {
        res
    }
}

fn group_thousands(digits: &str, sep: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * sep.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(c);
    }
    out
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn display_metric(m: &Metric) -> String {
    match m {
        Some(v) => v.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn serialize_metric<S>(m: &Metric, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match m {
        Some(v) => s.serialize_f64(*v),
        None => s.serialize_str(NOT_AVAILABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_strict() {
        assert_eq!(parse_f64_strict(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_f64_strict("42"), Some(42.0));
        assert_eq!(parse_f64_strict(""), None);
        assert_eq!(parse_f64_strict("abc"), None);
        assert_eq!(parse_f64_strict("12x"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("2024/01/15"), Some(expected));
        assert_eq!(parse_date("2024-01-15 08:30:00"), Some(expected));
        assert_eq!(parse_date("15th of January"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_ratio_guards_zero() {
        assert_eq!(ratio(10.0, 4.0), Some(2.5));
        assert_eq!(ratio(10.0, 0.0), None);
        assert_eq!(ratio(0.0, 0.0), None);
    }

    #[test]
    fn test_average_metric_propagates_missing() {
        assert_eq!(average_metric(&[Some(1.0), Some(3.0)]), Some(2.0));
        assert_eq!(average_metric(&[Some(1.0), None]), None);
        assert_eq!(average_metric(&[]), None);
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[5.0]), None);
        let sd = sample_std_dev(&[100.0, 200.0]).unwrap();
        assert!((sd - 70.710678).abs() < 1e-5);
    }

    #[test]
    fn test_average_rank_desc_ties() {
        assert_eq!(average_rank_desc(&[10.0, 30.0, 20.0]), vec![3.0, 1.0, 2.0]);
        assert_eq!(average_rank_desc(&[5.0, 5.0, 1.0]), vec![1.5, 1.5, 3.0]);
        assert_eq!(average_rank_desc(&[2.0, 2.0, 2.0]), vec![2.0, 2.0, 2.0]);
        assert!(average_rank_desc(&[]).is_empty());
    }

    #[test]
    fn test_market_share_rounding() {
        assert_eq!(market_share(3500.0, 6500.0), Some(53.85));
        assert_eq!(market_share(1.0, 0.0), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 2), "-1,500.00");
        assert_eq!(format_number(12.34, 1), "12.3");
        assert_eq!(format_number(7.0, 0), "7");
        assert_eq!(format_int(9855), "9,855");
    }

    #[test]
    fn test_format_number_large_and_near_zero() {
        assert_eq!(format_number(1e20, 2), "100,000,000,000,000,000,000.00");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(-0.0, 2), "0.00");
        assert_eq!(format_number(-0.005001, 2), "-0.01");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(1000.0, 0), "1,000");
    }

    #[test]
    fn test_round2_halves_to_even() {
        assert_eq!(round2(10.125), 10.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-2.625), -2.62);
        assert_eq!(round2(1.2345678), 1.23);
    }

    #[test]
    fn test_display_metric() {
        assert_eq!(display_metric(&Some(1.5)), "1.5");
        assert_eq!(display_metric(&None), "N/A");
    }
}
