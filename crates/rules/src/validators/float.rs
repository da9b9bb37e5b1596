//! Floating point rule family

use std::any::Any;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::foundation::chain::{Link, Step, shared_root};
use crate::foundation::conflict::ConflictType;
use crate::foundation::{BuildError, Context, Rule, RuleSet, ValidationError, ValidationErrors};
use crate::numeric::{FloatStyle, Floating, Rounding, coerce_float, format_float};
use crate::validators::any::WrapAny;
use crate::validators::common::{
    BoundKind, Input, Presence, allowed_step, bound_step, classify, rejected_step, write_output,
};
use crate::validators::macros::common_builders;

#[derive(Debug, Clone, Copy, Default)]
struct FloatFlags {
    presence: Presence,
    strict: bool,
    rounding: Option<(Rounding, u32)>,
    fixed: Option<u32>,
}

impl FloatFlags {
    fn style(&self) -> FloatStyle {
        match (self.fixed, self.rounding) {
            (Some(places), _) => FloatStyle::Fixed(places),
            (None, Some((_, places))) => FloatStyle::Rounded(places),
            (None, None) => FloatStyle::Shortest,
        }
    }
}

/// A persistent chain of rules for the floating point type `T`.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::prelude::*;
///
/// let rules = float64().with_fixed_output(2);
/// let mut out = String::new();
/// rules.apply(&Context::new(), &123.456_f64, &mut out)?;
/// assert_eq!(out, "123.46");
/// ```
pub struct FloatRules<T: Floating> {
    head: Arc<Link<T, FloatFlags>>,
}

impl<T: Floating> Clone for FloatRules<T> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
        }
    }
}

impl<T: Floating> fmt::Debug for FloatRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FloatRules").field(&self.head.render()).finish()
    }
}

/// Rules for `f32`.
pub fn float32() -> FloatRules<f32> {
    root("float32()")
}

/// Rules for `f64`.
pub fn float64() -> FloatRules<f64> {
    root("float64()")
}

/// Rules for any supported floating point type.
pub fn floating<T: Floating>() -> FloatRules<T> {
    root("floating()")
}

fn root<T: Floating>(label: &'static str) -> FloatRules<T> {
    shared_root(label, || FloatRules {
        head: Link::root(FloatFlags::default(), label),
    })
}

impl<T: Floating> FloatRules<T> {
    fn push(&self, step: Step<T>, edit: impl FnOnce(&mut FloatFlags)) -> Self {
        Self {
            head: Link::push(&self.head, step, edit),
        }
    }

    common_builders!(T, strict);

    /// Requires the value to be at least `min`.
    pub fn with_min(&self, min: T) -> Self {
        self.push(bound_step(BoundKind::Min, min, min.to_string()), |_| {})
    }

    /// Requires the value to be at most `max`.
    pub fn with_max(&self, max: T) -> Self {
        self.push(bound_step(BoundKind::Max, max, max.to_string()), |_| {})
    }

    /// Requires the value to be strictly greater than `min`.
    pub fn with_min_exclusive(&self, min: T) -> Self {
        self.push(
            bound_step(BoundKind::MinExclusive, min, min.to_string()),
            |_| {},
        )
    }

    /// Requires the value to be strictly less than `max`.
    pub fn with_max_exclusive(&self, max: T) -> Self {
        self.push(
            bound_step(BoundKind::MaxExclusive, max, max.to_string()),
            |_| {},
        )
    }

    /// Requires `min <= value <= max`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max` or either bound is NaN.
    pub fn with_range(&self, min: T, max: T) -> Self {
        match self.try_with_range(min, max) {
            Ok(rules) => rules,
            Err(e) => panic!("{e}"),
        }
    }

    /// Requires `min <= value <= max`, or fails if the bounds are not an
    /// ordered pair.
    pub fn try_with_range(&self, min: T, max: T) -> Result<Self, BuildError> {
        if !matches!(min.partial_cmp(&max), Some(Ordering::Less | Ordering::Equal)) {
            return Err(BuildError::InvertedRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(self.with_min(min).with_max(max))
    }

    /// Rounds the coerced value to `places` decimal places with `rounding`.
    /// String output keeps at most `places` decimals, trailing zeros
    /// trimmed.
    pub fn with_rounding(&self, rounding: Rounding, places: u32) -> Self {
        self.push(
            Step::flag(
                ConflictType::Rounding,
                format!("with_rounding({rounding}, {places})"),
            ),
            |flags| flags.rounding = Some((rounding, places)),
        )
    }

    /// Renders string output with exactly `places` decimal places.
    pub fn with_fixed_output(&self, places: u32) -> Self {
        self.push(
            Step::flag(
                ConflictType::FixedOutput,
                format!("with_fixed_output({places})"),
            ),
            |flags| flags.fixed = Some(places),
        )
    }

    /// Requires the value to be one of `values`.
    pub fn with_allowed_values(&self, values: impl IntoIterator<Item = T>) -> Self {
        let values = values.into_iter().collect();
        self.push(allowed_step(values, T::to_string), |_| {})
    }

    /// Requires the value not to be one of `values`.
    pub fn with_rejected_values(&self, values: impl IntoIterator<Item = T>) -> Self {
        let values = values.into_iter().collect();
        self.push(rejected_step(values, T::to_string), |_| {})
    }

    /// Erases the value type so the chain can sit beside other families.
    pub fn any(&self) -> WrapAny<T> {
        WrapAny::new(self.clone())
    }
}

impl<T: Floating> Rule<T> for FloatRules<T> {
    fn evaluate(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors> {
        self.head.evaluate(ctx, value)
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.head.render())
    }
}

impl<T: Floating> RuleSet<T> for FloatRules<T> {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        let flags = self.head.flags();
        let mut value = match classify::<T>(input) {
            Input::Null => return flags.presence.on_null::<T>(ctx, output),
            Input::Exact(value) => *value,
            Input::Other(_) if flags.strict => {
                return Err(ValidationError::type_mismatch(ctx, T::NAME).into());
            }
            Input::Other(raw) => coerce_float::<T>(raw).map_err(|e| e.in_context(ctx))?,
        };

        if let Some((rounding, places)) = flags.rounding {
            value = T::from_f64(rounding.round_places(value.to_f64(), places));
        }

        let style = flags.style();
        write_output(ctx, output, &value, |v| format_float(*v, style))?;
        self.head.evaluate(ctx, &value)
    }

    fn is_required(&self) -> bool {
        self.head.flags().presence.required
    }
}

impl<T: Floating> fmt::Display for FloatRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::ErrorCode;
    use rstest::rstest;

    fn codes(result: Result<(), ValidationErrors>) -> Vec<ErrorCode> {
        result.err().map(|e| e.codes()).unwrap_or_default()
    }

    #[test]
    fn test_fixed_output() {
        let mut out = String::new();
        let result = float64()
            .with_fixed_output(2)
            .apply(&Context::new(), &123.456_f64, &mut out);
        assert!(result.is_ok());
        assert_eq!(out, "123.46");
    }

    // Rounding works on the scaled binary value: `2.675 * 100.0` is exactly
    // `267.5` and ties to even, while `1.005 * 100.0` lands just below the tie.
    #[rstest]
    #[case(1.005, "1")]
    #[case(2.675, "2.68")]
    #[case(0.125, "0.12")]
    #[case(0.375, "0.38")]
    #[case(-0.625, "-0.62")]
    #[case(-1.5, "-1.5")]
    fn test_half_even_rounding_to_string(#[case] input: f64, #[case] expected: &str) {
        let rules = float64().with_rounding(Rounding::HalfEven, 2);
        let mut out = String::new();
        assert!(rules.apply(&Context::new(), &input, &mut out).is_ok());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_huge_place_counts_are_clamped() {
        let ctx = Context::new();
        let mut out = String::new();
        let fixed = float64().with_fixed_output(u32::MAX);
        assert!(fixed.apply(&ctx, &1.25_f64, &mut out).is_ok());
        assert_eq!(out, "1.25000000000000000");

        let rounded = float64().with_rounding(Rounding::HalfUp, u32::MAX);
        assert!(rounded.apply(&ctx, &1.25_f64, &mut out).is_ok());
        assert_eq!(out, "1.25");
    }

    #[test]
    fn test_rounding_applies_to_typed_output() {
        let rules = float64().with_rounding(Rounding::Floor, 1);
        let mut out = 0.0_f64;
        assert!(rules.apply(&Context::new(), &2.99_f64, &mut out).is_ok());
        assert_eq!(out, 2.9);
    }

    #[test]
    fn test_shortest_output() {
        let ctx = Context::new();
        let mut out = String::new();
        assert!(float64().apply(&ctx, &(0.1_f64 + 0.2), &mut out).is_ok());
        assert_eq!(out, "0.3");

        assert!(float64().apply(&ctx, &0.1_f32, &mut out).is_ok());
        assert_eq!(out, "0.100000001490116");
    }

    #[test]
    fn test_coercion_errors() {
        let ctx = Context::new();
        let mut out = 0.0_f32;
        assert_eq!(
            codes(float32().apply(&ctx, &0.1_f64, &mut out)),
            vec![ErrorCode::Coercion]
        );
        assert_eq!(
            codes(float32().apply(&ctx, &1e300_f64, &mut out)),
            vec![ErrorCode::Range]
        );
        assert_eq!(
            codes(float64().apply(&ctx, &(1_i64 << 60), &mut 0.0_f64)),
            vec![ErrorCode::Range]
        );
        assert_eq!(out, 0.0);
    }

    #[test]
    fn test_bounds_render_and_evaluate() {
        let rules = float64().with_min(0.5).with_max_exclusive(2.0);
        assert_eq!(rules.to_string(), "float64().with_min(0.5).with_max_exclusive(2)");

        let ctx = Context::new();
        assert!(rules.evaluate(&ctx, &1.0).is_ok());
        assert_eq!(
            codes(rules.evaluate(&ctx, &2.0)),
            vec![ErrorCode::MaxExclusive]
        );
        assert_eq!(codes(rules.evaluate(&ctx, &f64::NAN)).len(), 2);
    }

    #[test]
    fn test_try_with_range_rejects_nan() {
        assert!(float64().try_with_range(f64::NAN, 1.0).is_err());
        assert!(float64().try_with_range(2.0, 1.0).is_err());
        assert!(float64().try_with_range(1.0, 1.0).is_ok());
    }

    #[test]
    fn test_string_input() {
        let mut out = 0.0_f64;
        assert!(float64().apply(&Context::new(), &"2.5", &mut out).is_ok());
        assert_eq!(out, 2.5);
    }

    #[test]
    fn test_rejected_values() {
        let rules = float32().with_rejected_values([0.0]);
        assert_eq!(
            codes(rules.evaluate(&Context::new(), &0.0)),
            vec![ErrorCode::Denied]
        );
    }
}
