//! Lossless conversions between numeric representations

use std::any::Any;
use std::borrow::Cow;
use std::num::IntErrorKind;

use crate::foundation::{Context, ErrorCode, ValidationError};
use crate::numeric::{Floating, Integer, Rounding};

/// Largest distance from a whole number a float may have and still convert
/// to an integer without a rounding policy.
const INTEGER_TOLERANCE: f64 = 1e-9;

// ============================================================================
// COERCION ERROR
// ============================================================================

/// Why a value could not be converted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    /// The source type has no conversion to the target.
    #[error("cannot convert {from} to {to}")]
    Type {
        /// Source type.
        from: &'static str,
        /// Target type.
        to: &'static str,
    },

    /// The value is too large or too small for the target.
    #[error("{value} is out of range for {to}")]
    Range {
        /// Rendered source value.
        value: String,
        /// Target type.
        to: &'static str,
    },

    /// A float with a fractional part where a whole number is needed.
    #[error("{value} is not a whole number")]
    Fractional {
        /// Rendered source value.
        value: String,
    },

    /// The target cannot hold the value without changing it.
    #[error("{value} cannot be represented exactly as {to}")]
    Inexact {
        /// Rendered source value.
        value: String,
        /// Target type.
        to: &'static str,
    },

    /// Text that does not parse as the target.
    #[error("\"{text}\" is not a valid {to}")]
    Syntax {
        /// The offending text.
        text: String,
        /// Target type.
        to: &'static str,
    },
}

impl CoercionError {
    /// `Range` for magnitude failures, `Coercion` for everything else.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Range { .. } => ErrorCode::Range,
            _ => ErrorCode::Coercion,
        }
    }

    /// Converts into a validation error attributed to `ctx`.
    pub fn in_context(&self, ctx: &Context) -> ValidationError {
        ValidationError::in_context(ctx, self.code(), self.to_string())
    }
}

// ============================================================================
// SCALAR CLASSIFICATION
// ============================================================================

/// A raw input reduced to the categories the coercion rules distinguish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar<'a> {
    Int(i128, &'static str),
    F32(f32),
    F64(f64),
    Text(&'a str),
    Bool(bool),
    Null,
    Unsupported,
}

impl Scalar<'_> {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_, name) => name,
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Text(_) => "string",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Unsupported => "unsupported type",
        }
    }
}

macro_rules! classify_ints {
    ($input:ident; $($t:ty),*) => {$(
        if let Some(v) = $input.downcast_ref::<$t>() {
            return Scalar::Int(v.widen(), stringify!($t));
        }
    )*};
}

/// Classifies a raw input. JSON values classify by their content.
pub(crate) fn scalar(input: &dyn Any) -> Scalar<'_> {
    classify_ints!(input; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

    if let Some(v) = input.downcast_ref::<f64>() {
        return Scalar::F64(*v);
    }
    if let Some(v) = input.downcast_ref::<f32>() {
        return Scalar::F32(*v);
    }
    if let Some(v) = input.downcast_ref::<String>() {
        return Scalar::Text(v);
    }
    if let Some(v) = input.downcast_ref::<&'static str>() {
        return Scalar::Text(v);
    }
    if let Some(v) = input.downcast_ref::<Cow<'static, str>>() {
        return Scalar::Text(v);
    }
    if let Some(v) = input.downcast_ref::<Box<str>>() {
        return Scalar::Text(v);
    }
    if let Some(v) = input.downcast_ref::<bool>() {
        return Scalar::Bool(*v);
    }
    if input.is::<()>() {
        return Scalar::Null;
    }
    if let Some(value) = input.downcast_ref::<serde_json::Value>() {
        return json_scalar(value);
    }
    Scalar::Unsupported
}

fn json_scalar(value: &serde_json::Value) -> Scalar<'_> {
    use serde_json::Value;

    match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(*b),
        Value::String(s) => Scalar::Text(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Scalar::Int(i128::from(i), "i64")
            } else if let Some(u) = n.as_u64() {
                Scalar::Int(i128::from(u), "u64")
            } else {
                n.as_f64().map_or(Scalar::Unsupported, Scalar::F64)
            }
        }
        Value::Array(_) | Value::Object(_) => Scalar::Unsupported,
    }
}

// ============================================================================
// INTEGER TARGETS
// ============================================================================

/// Converts `input` to the integer type `T`.
///
/// Strings are parsed in `base`; floats go through `rounding`.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::numeric::{Rounding, coerce_integer};
///
/// assert_eq!(coerce_integer::<i32>(&"BeEf", 16, Rounding::None), Ok(0xBEEF));
/// assert!(coerce_integer::<i8>(&1024_i16, 10, Rounding::None).is_err());
/// assert_eq!(coerce_integer::<u8>(&2.5_f64, 10, Rounding::HalfEven), Ok(2));
/// ```
pub fn coerce_integer<T: Integer>(
    input: &dyn Any,
    base: u32,
    rounding: Rounding,
) -> Result<T, CoercionError> {
    if let Some(v) = input.downcast_ref::<T>() {
        return Ok(*v);
    }

    match scalar(input) {
        Scalar::Int(v, _) => int_to_int(v),
        Scalar::F32(v) => float_to_int(f64::from(v), rounding),
        Scalar::F64(v) => float_to_int(v, rounding),
        Scalar::Text(text) => parse_int(text, base),
        other => Err(CoercionError::Type {
            from: other.type_name(),
            to: T::NAME,
        }),
    }
}

fn int_to_int<T: Integer>(value: i128) -> Result<T, CoercionError> {
    T::narrow(value).ok_or_else(|| CoercionError::Range {
        value: value.to_string(),
        to: T::NAME,
    })
}

fn float_to_int<T: Integer>(value: f64, rounding: Rounding) -> Result<T, CoercionError> {
    let whole = if rounding == Rounding::None {
        let nearest = value.round();
        if (value - nearest).abs() > INTEGER_TOLERANCE {
            return Err(CoercionError::Fractional {
                value: value.to_string(),
            });
        }
        nearest
    } else {
        rounding.round(value)
    };

    if whole.is_nan() {
        return Err(CoercionError::Fractional {
            value: value.to_string(),
        });
    }

    // `as` saturates, and a saturated i128 never fits a supported width.
    T::narrow(whole as i128).ok_or_else(|| CoercionError::Range {
        value: value.to_string(),
        to: T::NAME,
    })
}

fn parse_int<T: Integer>(text: &str, base: u32) -> Result<T, CoercionError> {
    T::parse_radix(text, base).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CoercionError::Range {
            value: text.to_owned(),
            to: T::NAME,
        },
        _ => CoercionError::Syntax {
            text: text.to_owned(),
            to: T::NAME,
        },
    })
}

// ============================================================================
// FLOATING TARGETS
// ============================================================================

/// Converts `input` to the floating point type `T`.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::numeric::coerce_float;
///
/// assert_eq!(coerce_float::<f32>(&0.5_f64), Ok(0.5));
/// assert!(coerce_float::<f32>(&0.1_f64).is_err());
/// assert!(coerce_float::<f64>(&(1_i64 << 60)).is_err());
/// ```
pub fn coerce_float<T: Floating>(input: &dyn Any) -> Result<T, CoercionError> {
    if let Some(v) = input.downcast_ref::<T>() {
        return Ok(*v);
    }

    match scalar(input) {
        Scalar::Int(v, _) => int_to_float(v),
        Scalar::F32(v) => float_to_float(f64::from(v), |t: T| t.to_f64() as f32 == v),
        Scalar::F64(v) => float_to_float(v, |t: T| t.to_f64() == v),
        Scalar::Text(text) => parse_float(text),
        other => Err(CoercionError::Type {
            from: other.type_name(),
            to: T::NAME,
        }),
    }
}

fn int_to_float<T: Floating>(value: i128) -> Result<T, CoercionError> {
    let range = || CoercionError::Range {
        value: value.to_string(),
        to: T::NAME,
    };

    if value.unsigned_abs() > T::EXACT_INTEGER_BOUND {
        return Err(range());
    }
    let converted = T::from_i128(value);
    if converted.to_i128() != value {
        return Err(range());
    }
    Ok(converted)
}

fn float_to_float<T: Floating>(
    value: f64,
    round_trips: impl FnOnce(T) -> bool,
) -> Result<T, CoercionError> {
    let inexact = || CoercionError::Inexact {
        value: value.to_string(),
        to: T::NAME,
    };

    if !value.is_finite() {
        return Err(inexact());
    }
    let converted = T::from_f64(value);
    if !converted.to_f64().is_finite() {
        return Err(CoercionError::Range {
            value: value.to_string(),
            to: T::NAME,
        });
    }
    if !round_trips(converted) {
        return Err(inexact());
    }
    Ok(converted)
}

fn parse_float<T: Floating>(text: &str) -> Result<T, CoercionError> {
    let parsed: T = text.parse().map_err(|_| CoercionError::Syntax {
        text: text.to_owned(),
        to: T::NAME,
    })?;

    // Overflowing literals parse as infinity; spelled-out infinities do not
    // count as overflow.
    if parsed.to_f64().is_infinite() && !is_infinity_literal(text) {
        return Err(CoercionError::Range {
            value: text.to_owned(),
            to: T::NAME,
        });
    }
    Ok(parsed)
}

fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn int<T: Integer>(input: &dyn Any) -> Result<T, CoercionError> {
        coerce_integer::<T>(input, 10, Rounding::None)
    }

    #[test]
    fn test_same_type_is_identity() {
        assert_eq!(int::<i8>(&-128_i8), Ok(-128));
        assert_eq!(coerce_float::<f64>(&f64::MAX), Ok(f64::MAX));
        assert!(coerce_float::<f64>(&f64::NAN).unwrap().is_nan());
    }

    #[test]
    fn test_int_widening_and_narrowing() {
        assert_eq!(int::<i64>(&42_u8), Ok(42));
        assert_eq!(int::<u8>(&255_i32), Ok(255));

        let err = int::<i8>(&1024_i16).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Range);
        assert_eq!(err.to_string(), "1024 is out of range for i8");

        assert_eq!(int::<u32>(&-1_i64).unwrap_err().code(), ErrorCode::Range);
        assert_eq!(int::<i64>(&u64::MAX).unwrap_err().code(), ErrorCode::Range);
    }

    #[test]
    fn test_float_to_int_without_rounding() {
        assert_eq!(int::<i32>(&3.0_f64), Ok(3));
        assert_eq!(int::<i32>(&(3.0_f64 + 1e-12)), Ok(3));

        let err = int::<i32>(&3.5_f64).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Coercion);
        assert!(matches!(err, CoercionError::Fractional { .. }));

        assert_eq!(int::<i32>(&f64::NAN).unwrap_err().code(), ErrorCode::Coercion);
        assert_eq!(int::<i8>(&300.0_f32).unwrap_err().code(), ErrorCode::Range);
    }

    #[rstest]
    #[case(Rounding::Floor, 2.7, 2)]
    #[case(Rounding::Ceil, 2.1, 3)]
    #[case(Rounding::HalfUp, 2.5, 3)]
    #[case(Rounding::HalfEven, 2.5, 2)]
    #[case(Rounding::HalfEven, -3.5, -4)]
    fn test_float_to_int_rounding(#[case] mode: Rounding, #[case] input: f64, #[case] expected: i64) {
        assert_eq!(coerce_integer::<i64>(&input, 10, mode), Ok(expected));
    }

    #[test]
    fn test_rounded_value_still_range_checked() {
        let err = coerce_integer::<u8>(&255.6_f64, 10, Rounding::HalfUp).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Range);
        let err = coerce_integer::<i64>(&f64::INFINITY, 10, Rounding::Floor).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Range);
    }

    #[test]
    fn test_parse_int_with_base() {
        assert_eq!(coerce_integer::<i64>(&"BeEf", 16, Rounding::None), Ok(0xBEEF));
        assert_eq!(coerce_integer::<u8>(&String::from("101"), 2, Rounding::None), Ok(5));

        let err = coerce_integer::<i64>(&"xyz", 10, Rounding::None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Coercion);

        let err = coerce_integer::<i8>(&"200", 10, Rounding::None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Range);
    }

    #[test]
    fn test_int_to_float_bounds() {
        assert_eq!(coerce_float::<f32>(&16_777_216_i64), Ok(16_777_216.0));
        assert_eq!(
            coerce_float::<f32>(&16_777_217_i64).unwrap_err().code(),
            ErrorCode::Range
        );
        assert_eq!(coerce_float::<f64>(&(1_i64 << 53)), Ok(9_007_199_254_740_992.0));
        assert_eq!(
            coerce_float::<f64>(&((1_i64 << 53) + 2)).unwrap_err().code(),
            ErrorCode::Range
        );
        assert_eq!(coerce_float::<f64>(&-7_i8), Ok(-7.0));
    }

    #[test]
    fn test_float_to_float() {
        assert_eq!(coerce_float::<f32>(&0.5_f64), Ok(0.5));
        assert_eq!(coerce_float::<f64>(&0.1_f32), Ok(f64::from(0.1_f32)));

        let err = coerce_float::<f32>(&0.1_f64).unwrap_err();
        assert!(matches!(err, CoercionError::Inexact { .. }));

        let err = coerce_float::<f32>(&1e300_f64).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Range);

        assert!(coerce_float::<f32>(&f64::NAN).is_err());
        assert!(coerce_float::<f32>(&f64::INFINITY).is_err());
        assert!(coerce_float::<f64>(&f32::NAN).is_err());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(coerce_float::<f64>(&"123.456"), Ok(123.456));
        assert_eq!(coerce_float::<f32>(&"0.1"), Ok(0.1_f32));
        assert_eq!(coerce_float::<f64>(&"1.5x").unwrap_err().code(), ErrorCode::Coercion);
        assert_eq!(coerce_float::<f32>(&"1e39").unwrap_err().code(), ErrorCode::Range);
        assert!(coerce_float::<f64>(&"-inf").unwrap().is_infinite());
    }

    #[test]
    fn test_unsupported_sources() {
        let err = int::<i64>(&true).unwrap_err();
        assert_eq!(
            err,
            CoercionError::Type {
                from: "bool",
                to: "i64"
            }
        );
        assert_eq!(int::<i64>(&vec![1_u8]).unwrap_err().code(), ErrorCode::Coercion);
        assert_eq!(coerce_float::<f64>(&()).unwrap_err().code(), ErrorCode::Coercion);
    }

    #[test]
    fn test_json_sources() {
        assert_eq!(int::<u16>(&json!(512)), Ok(512));
        assert_eq!(int::<u64>(&json!(u64::MAX)), Ok(u64::MAX));
        assert_eq!(int::<i8>(&json!(512)).unwrap_err().code(), ErrorCode::Range);
        assert_eq!(coerce_float::<f64>(&json!(1.25)), Ok(1.25));
        assert_eq!(coerce_integer::<i32>(&json!("ff"), 16, Rounding::None), Ok(255));
        assert!(int::<i32>(&json!([1])).is_err());
    }

    #[test]
    fn test_error_in_context() {
        let ctx = Context::new().with_index(1);
        let err = int::<i8>(&1024_i16).unwrap_err().in_context(&ctx);
        assert_eq!(err.code, ErrorCode::Range);
        assert_eq!(err.path.as_deref(), Some("[1]"));
    }
}
