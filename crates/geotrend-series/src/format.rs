//! Value normalization and display formatting
//!
//! Both halves are pure. Display strings follow en-US conventions:
//! grouped thousands, `$` currency without cents, `%` suffix for
//! percentages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a variable's values are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Plain,
    Percentage,
    Money,
}

/// Fractional digits shown for plain numbers
const PLAIN_FRACTION_DIGITS: usize = 3;

/// Parse a raw attribute scalar into a finite number
///
/// Numbers and numeric strings parse; null, empty strings, booleans and
/// anything non-finite do not.
#[must_use]
pub fn parse_raw(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Round half up to one decimal place
#[inline]
#[must_use]
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Normalize an already-parsed value: missing becomes 0, else one decimal
#[inline]
#[must_use]
pub fn normalize_number(value: Option<f64>) -> f64 {
    value.map_or(0.0, round_tenth)
}

/// Normalize a raw attribute scalar for charting
///
/// Null, empty and non-numeric input yields `0.0`; numbers are rounded to
/// one decimal place. Normalization is currently identical for every
/// [`ValueType`].
#[must_use]
pub fn normalize_value(raw: &Value, _value_type: ValueType) -> f64 {
    normalize_number(parse_raw(raw))
}

/// Render a value for axis ticks and tooltips
#[must_use]
pub fn format_display(value: f64, value_type: ValueType) -> String {
    // -0 renders as 0
    let value = if value == 0.0 { 0.0 } else { value };
    match value_type {
        ValueType::Percentage => format!("{value}%"),
        ValueType::Money => format_money(value),
        ValueType::Plain => format_grouped(value, PLAIN_FRACTION_DIGITS),
    }
}

fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return format_grouped(value, 0);
    }
    let rounded = value.abs().round();
    // a negative that rounds to zero prints as "$0", never "-$0"
    let sign = if value < 0.0 && rounded != 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(&format!("{rounded:.0}")))
}

fn format_grouped(value: f64, max_fraction: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let scale = 10f64.powi(i32::try_from(max_fraction).unwrap_or(0));
    let rounded = (value.abs() * scale).round() / scale;
    let fixed = format!("{rounded:.max_fraction$}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let sign = if value < 0.0 && rounded != 0.0 { "-" } else { "" };
    let mut out = format!("{sign}{}", group_thousands(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Insert `,` every three digits from the right
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
