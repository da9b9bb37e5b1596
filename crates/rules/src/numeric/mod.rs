//! Numeric coercion engine
//!
//! Shared by the integer and floating rule families. Conversions are
//! written once per category and instantiated for every width through the
//! sealed [`Integer`] and [`Floating`] traits.
//!
//! A conversion succeeds only when no information is lost:
//!
//! | source → target   | check                                              |
//! |-------------------|----------------------------------------------------|
//! | integer → integer | value fits the target, else `Range`                |
//! | float → integer   | rounding policy, else within `1e-9` of an integer  |
//! | integer → float   | magnitude ≤ 2^24 / 2^53 and round trip             |
//! | float → float     | round trip reproduces the value                    |
//! | string → number   | parse; syntax → `Coercion`, magnitude → `Range`    |

mod coerce;
mod format;

use std::fmt::{Debug, Display, LowerExp};
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use coerce::{CoercionError, coerce_float, coerce_integer};
pub(crate) use coerce::{Scalar, scalar};
pub use format::{FloatStyle, MAX_PLACES, format_float, format_integer};

mod sealed {
    pub trait Sealed {}
}

// ============================================================================
// INTEGER
// ============================================================================

/// Primitive integer types a rule set can target.
///
/// Every implementor converts to `i128` without loss, which is what makes
/// the range check exact.
pub trait Integer:
    sealed::Sealed + Copy + PartialOrd + Display + Debug + Default + Send + Sync + 'static
{
    /// Rust name of the type, used in messages.
    const NAME: &'static str;

    /// Widens to `i128`.
    fn widen(self) -> i128;

    /// Narrows from `i128`, or `None` if the value does not fit.
    fn narrow(value: i128) -> Option<Self>;

    /// Parses `text` in `radix`.
    fn parse_radix(text: &str, radix: u32) -> Result<Self, ParseIntError>;
}

macro_rules! integer {
    ($($t:ty),* $(,)?) => {$(
        impl sealed::Sealed for $t {}

        impl Integer for $t {
            const NAME: &'static str = stringify!($t);

            #[inline]
            fn widen(self) -> i128 {
                self as i128
            }

            #[inline]
            fn narrow(value: i128) -> Option<Self> {
                Self::try_from(value).ok()
            }

            fn parse_radix(text: &str, radix: u32) -> Result<Self, ParseIntError> {
                Self::from_str_radix(text, radix)
            }
        }
    )*};
}

integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// ============================================================================
// FLOATING
// ============================================================================

/// Primitive floating point types a rule set can target.
pub trait Floating:
    sealed::Sealed
    + Copy
    + PartialOrd
    + Display
    + LowerExp
    + Debug
    + Default
    + FromStr<Err = ParseFloatError>
    + Send
    + Sync
    + 'static
{
    /// Rust name of the type, used in messages.
    const NAME: &'static str;

    /// Largest integer magnitude every smaller magnitude of which is exactly
    /// representable.
    const EXACT_INTEGER_BOUND: u128;

    /// Significant decimal digits the type reliably carries.
    const DIGITS: usize;

    /// Converts from `f64`, rounding to nearest.
    fn from_f64(value: f64) -> Self;

    /// Widens to `f64` (exact).
    fn to_f64(self) -> f64;

    /// Converts from `i128`, rounding to nearest.
    fn from_i128(value: i128) -> Self;

    /// Truncates toward zero, saturating at the `i128` bounds.
    fn to_i128(self) -> i128;
}

macro_rules! floating {
    ($($t:ty => bound: $bound:expr, digits: $digits:expr);* $(;)?) => {$(
        impl sealed::Sealed for $t {}

        impl Floating for $t {
            const NAME: &'static str = stringify!($t);
            const EXACT_INTEGER_BOUND: u128 = $bound;
            const DIGITS: usize = $digits;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_i128(value: i128) -> Self {
                value as $t
            }

            #[inline]
            fn to_i128(self) -> i128 {
                self as i128
            }
        }
    )*};
}

floating! {
    f32 => bound: 1 << 24, digits: 7;
    f64 => bound: 1 << 53, digits: 15;
}

// ============================================================================
// ROUNDING
// ============================================================================

/// How a fractional value is brought to a whole number (or to a number of
/// decimal places).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// No rounding: fractional input is rejected by integer targets.
    #[default]
    None,
    /// Toward negative infinity.
    Floor,
    /// Toward positive infinity.
    Ceil,
    /// To nearest, ties away from zero.
    HalfUp,
    /// To nearest, ties to even.
    HalfEven,
}

impl Rounding {
    /// Rounds to a whole number. `None` returns the value unchanged.
    #[must_use]
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::Floor => value.floor(),
            Self::Ceil => value.ceil(),
            Self::HalfUp => value.round(),
            Self::HalfEven => value.round_ties_even(),
        }
    }

    /// Rounds to `places` decimal places.
    ///
    /// Ties are judged on `value * 10^places` as computed in binary, so
    /// `2.675` rounds half-even to `2.68` and `1.005` rounds half-up to `1`.
    ///
    /// Values whose scaled form is not finite are returned unchanged.
    #[must_use]
    pub fn round_places(self, value: f64, places: u32) -> f64 {
        if self == Self::None {
            return value;
        }
        let scale = 10f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
        let scaled = value * scale;
        if !scaled.is_finite() {
            return value;
        }
        self.round(scaled) / scale
    }
}

impl Display for Rounding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Floor => "Floor",
            Self::Ceil => "Ceil",
            Self::HalfUp => "HalfUp",
            Self::HalfEven => "HalfEven",
        };
        f.write_str(name)
    }
}
