//! Rendering coerced numbers into string outputs

use crate::numeric::{Floating, Integer};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Most decimal places a string output carries; larger requests are clamped.
pub const MAX_PLACES: u32 = 17;

/// Formats `value` in `base` with lowercase digits.
///
/// `base` must be in `2..=36`; builders reject anything else before a
/// chain can reach this point.
#[must_use]
pub fn format_integer<T: Integer>(value: T, base: u32) -> String {
    if base == 10 {
        return value.to_string();
    }

    let wide = value.widen();
    let mut magnitude = wide.unsigned_abs();
    let radix = u128::from(base.clamp(2, 36));
    let mut digits = Vec::new();
    loop {
        // `magnitude % radix` is below 36.
        digits.push(DIGITS[(magnitude % radix) as usize]);
        magnitude /= radix;
        if magnitude == 0 {
            break;
        }
    }
    if wide < 0 {
        digits.push(b'-');
    }
    digits.iter().rev().map(|&b| char::from(b)).collect()
}

/// How a float is rendered into a string output.
///
/// Place counts above [`MAX_PLACES`] render as [`MAX_PLACES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatStyle {
    /// Exactly this many decimal places, zero padded.
    Fixed(u32),
    /// At most this many decimal places, trailing zeros trimmed.
    Rounded(u32),
    /// Shortest form that round-trips, capped at the type's reliable
    /// significant digits.
    Shortest,
}

/// Formats `value` according to `style`.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::numeric::{FloatStyle, format_float};
///
/// assert_eq!(format_float(123.456_f64, FloatStyle::Fixed(2)), "123.46");
/// assert_eq!(format_float(2.50_f64, FloatStyle::Rounded(2)), "2.5");
/// assert_eq!(format_float(0.1_f64 + 0.2, FloatStyle::Shortest), "0.3");
/// ```
#[must_use]
pub fn format_float<T: Floating>(value: T, style: FloatStyle) -> String {
    match style {
        FloatStyle::Fixed(places) => format!("{:.*}", clamp_places(places), value),
        FloatStyle::Rounded(places) => {
            let fixed = format!("{:.*}", clamp_places(places), value);
            trim_fraction(fixed)
        }
        FloatStyle::Shortest => shortest(value),
    }
}

fn clamp_places(places: u32) -> usize {
    places.min(MAX_PLACES) as usize
}

fn trim_fraction(mut text: String) -> String {
    if text.contains('.') {
        let kept = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(kept);
    }
    text
}

fn shortest<T: Floating>(value: T) -> String {
    let text = value.to_string();
    if !value.to_f64().is_finite() || significant_digits(&text) <= T::DIGITS {
        return text;
    }

    let capped = format!("{:.*e}", T::DIGITS - 1, value);
    capped
        .parse::<T>()
        .map_or(text, |reduced| reduced.to_string())
}

fn significant_digits(text: &str) -> usize {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0xBEEF_i64, 16, "beef")]
    #[case(-255_i64, 16, "-ff")]
    #[case(0_i64, 2, "0")]
    #[case(5_i64, 2, "101")]
    #[case(35_i64, 36, "z")]
    #[case(-42_i64, 10, "-42")]
    fn test_format_integer(#[case] value: i64, #[case] base: u32, #[case] expected: &str) {
        assert_eq!(format_integer(value, base), expected);
    }

    #[test]
    fn test_format_integer_extremes() {
        assert_eq!(format_integer(i64::MIN, 16), "-8000000000000000");
        assert_eq!(format_integer(u64::MAX, 16), "ffffffffffffffff");
    }

    #[rstest]
    #[case(123.456, FloatStyle::Fixed(2), "123.46")]
    #[case(1.0, FloatStyle::Fixed(3), "1.000")]
    #[case(2.5, FloatStyle::Rounded(2), "2.5")]
    #[case(2.0, FloatStyle::Rounded(2), "2")]
    #[case(1.25, FloatStyle::Rounded(0), "1")]
    #[case(0.1 + 0.2, FloatStyle::Shortest, "0.3")]
    #[case(1.5, FloatStyle::Shortest, "1.5")]
    #[case(100.0, FloatStyle::Shortest, "100")]
    fn test_format_f64(#[case] value: f64, #[case] style: FloatStyle, #[case] expected: &str) {
        assert_eq!(format_float(value, style), expected);
    }

    #[test]
    fn test_places_are_clamped() {
        let fixed = format_float(0.5_f64, FloatStyle::Fixed(u32::MAX));
        assert_eq!(fixed, "0.50000000000000000");
        assert_eq!(format_float(0.5_f64, FloatStyle::Rounded(u32::MAX)), "0.5");
    }

    #[test]
    fn test_format_f32_shortest() {
        assert_eq!(format_float(0.1_f32, FloatStyle::Shortest), "0.1");
        assert_eq!(format_float(16_777_215_f32, FloatStyle::Shortest), "16777220");
    }

    #[test]
    fn test_non_finite_passthrough() {
        assert_eq!(format_float(f64::INFINITY, FloatStyle::Shortest), "inf");
        assert_eq!(format_float(f64::NAN, FloatStyle::Shortest), "NaN");
    }

    #[test]
    fn test_significant_digits() {
        assert_eq!(significant_digits("0.30000000000000004"), 17);
        assert_eq!(significant_digits("-1200"), 2);
        assert_eq!(significant_digits("0.001"), 1);
    }
}
