//! Integer rule family
//!
//! One generic [`IntRules<T>`] serves every primitive integer width. Input
//! is coerced through [`coerce_integer`], so `"ff"` with base 16, `255.0`,
//! `255_u8` and JSON `255` all reach an `i64` chain as `255`.
//!
//! # Examples
//!
//! ```rust,ignore
//! use nebula_rules::prelude::*;
//!
//! let rules = int().with_base(16).with_min(0);
//! let mut out = 0_i64;
//! rules.apply(&Context::new(), &"BeEf", &mut out)?;
//! assert_eq!(out, 0xBEEF);
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::foundation::chain::{Link, Step, shared_root};
use crate::foundation::conflict::ConflictType;
use crate::foundation::{BuildError, Context, Rule, RuleSet, ValidationError, ValidationErrors};
use crate::numeric::{Integer, Rounding, coerce_integer, format_integer};
use crate::validators::any::WrapAny;
use crate::validators::common::{
    BoundKind, Input, Presence, allowed_step, bound_step, classify, rejected_step, write_output,
};
use crate::validators::macros::common_builders;

#[derive(Debug, Clone, Copy)]
struct IntFlags {
    presence: Presence,
    strict: bool,
    base: u32,
    rounding: Rounding,
}

impl Default for IntFlags {
    fn default() -> Self {
        Self {
            presence: Presence::default(),
            strict: false,
            base: 10,
            rounding: Rounding::None,
        }
    }
}

/// A persistent chain of rules for the integer type `T`.
pub struct IntRules<T: Integer> {
    head: Arc<Link<T, IntFlags>>,
}

impl<T: Integer> Clone for IntRules<T> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
        }
    }
}

impl<T: Integer> fmt::Debug for IntRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntRules").field(&self.head.render()).finish()
    }
}

/// Rules for `i64`.
pub fn int() -> IntRules<i64> {
    root("int()")
}

/// Rules for `i8`.
pub fn int8() -> IntRules<i8> {
    root("int8()")
}

/// Rules for `i16`.
pub fn int16() -> IntRules<i16> {
    root("int16()")
}

/// Rules for `i32`.
pub fn int32() -> IntRules<i32> {
    root("int32()")
}

/// Rules for `i64`.
pub fn int64() -> IntRules<i64> {
    root("int64()")
}

/// Rules for `u64`.
pub fn uint() -> IntRules<u64> {
    root("uint()")
}

/// Rules for `u8`.
pub fn uint8() -> IntRules<u8> {
    root("uint8()")
}

/// Rules for `u16`.
pub fn uint16() -> IntRules<u16> {
    root("uint16()")
}

/// Rules for `u32`.
pub fn uint32() -> IntRules<u32> {
    root("uint32()")
}

/// Rules for `u64`.
pub fn uint64() -> IntRules<u64> {
    root("uint64()")
}

/// Rules for any supported integer type, e.g. `integer::<usize>()`.
pub fn integer<T: Integer>() -> IntRules<T> {
    root("integer()")
}

fn root<T: Integer>(label: &'static str) -> IntRules<T> {
    shared_root(label, || IntRules {
        head: Link::root(IntFlags::default(), label),
    })
}

impl<T: Integer> IntRules<T> {
    fn push(&self, step: Step<T>, edit: impl FnOnce(&mut IntFlags)) -> Self {
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
    /// Panics if `min > max`. Use [`try_with_range`](Self::try_with_range)
    /// to handle that case.
    pub fn with_range(&self, min: T, max: T) -> Self {
        match self.try_with_range(min, max) {
            Ok(rules) => rules,
            Err(e) => panic!("{e}"),
        }
    }

    /// Requires `min <= value <= max`, or fails if the range is inverted.
    pub fn try_with_range(&self, min: T, max: T) -> Result<Self, BuildError> {
        if min > max {
            return Err(BuildError::InvertedRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(self.with_min(min).with_max(max))
    }

    /// Parses string input in `base` and renders string output in it.
    ///
    /// # Panics
    ///
    /// Panics if `base` is outside `2..=36`.
    pub fn with_base(&self, base: u32) -> Self {
        match self.try_with_base(base) {
            Ok(rules) => rules,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`with_base`](Self::with_base), returning an error instead of
    /// panicking.
    pub fn try_with_base(&self, base: u32) -> Result<Self, BuildError> {
        if !(2..=36).contains(&base) {
            return Err(BuildError::InvalidBase(base));
        }
        Ok(self.push(
            Step::flag(ConflictType::Base, format!("with_base({base})")),
            |flags| flags.base = base,
        ))
    }

    /// Converts fractional float input with `rounding` instead of
    /// rejecting it.
    pub fn with_rounding(&self, rounding: Rounding) -> Self {
        self.push(
            Step::flag(ConflictType::Rounding, format!("with_rounding({rounding})")),
            |flags| flags.rounding = rounding,
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

impl<T: Integer> Rule<T> for IntRules<T> {
    fn evaluate(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors> {
        self.head.evaluate(ctx, value)
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.head.render())
    }
}

impl<T: Integer> RuleSet<T> for IntRules<T> {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        let flags = self.head.flags();
        let value = match classify::<T>(input) {
            Input::Null => return flags.presence.on_null::<T>(ctx, output),
            Input::Exact(value) => *value,
            Input::Other(_) if flags.strict => {
                return Err(ValidationError::type_mismatch(ctx, T::NAME).into());
            }
            Input::Other(raw) => coerce_integer::<T>(raw, flags.base, flags.rounding)
                .map_err(|e| e.in_context(ctx))?,
        };

        write_output(ctx, output, &value, |v| format_integer(*v, flags.base))?;
        self.head.evaluate(ctx, &value)
    }

    fn is_required(&self) -> bool {
        self.head.flags().presence.required
    }
}

impl<T: Integer> fmt::Display for IntRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::ErrorCode;
    use pretty_assertions::assert_eq;

    fn apply<T: Integer>(rules: &IntRules<T>, input: &dyn Any, out: &mut dyn Any) -> Vec<ErrorCode> {
        rules
            .apply(&Context::new(), input, out)
            .err()
            .map(|e| e.codes())
            .unwrap_or_default()
    }

    #[test]
    fn test_factories_share_roots() {
        assert!(Arc::ptr_eq(&int().head, &int().head));
        assert!(!Arc::ptr_eq(&int().head, &int64().head));
        assert_eq!(int().to_string(), "int()");
        assert_eq!(uint8().to_string(), "uint8()");
        assert_eq!(integer::<usize>().to_string(), "integer()");
    }

    #[test]
    fn test_conflicting_min_is_replaced() {
        let rules = int().with_min(3).with_max(10).with_min(2);
        assert_eq!(rules.to_string(), "int().with_max(10).with_min(2)");
    }

    #[test]
    fn test_exclusive_and_inclusive_bounds_conflict() {
        let rules = int().with_min(1).with_min_exclusive(0);
        assert_eq!(rules.to_string(), "int().with_min_exclusive(0)");
        assert!(rules.evaluate(&Context::new(), &0).is_err());
        assert!(rules.evaluate(&Context::new(), &1).is_ok());
    }

    #[test]
    fn test_hex_parsing_and_rendering() {
        let rules = int().with_base(16);
        let mut out = 0_i64;
        assert!(apply(&rules, &"BeEf", &mut out).is_empty());
        assert_eq!(out, 0xBEEF);

        let mut text = String::new();
        assert!(apply(&rules, &48_879_i64, &mut text).is_empty());
        assert_eq!(text, "beef");
    }

    #[test]
    fn test_out_of_range_leaves_output() {
        let mut out = 7_i8;
        assert_eq!(apply(&int8(), &1024_i16, &mut out), vec![ErrorCode::Range]);
        assert_eq!(out, 7);
    }

    #[test]
    fn test_rule_errors_accumulate_after_write() {
        let rules = int().with_min(10).with_rejected_values([3]);
        let mut out = 0_i64;
        let codes = apply(&rules, &3_u8, &mut out);
        assert_eq!(codes, vec![ErrorCode::Denied, ErrorCode::Min]);
        assert_eq!(out, 3);
    }

    #[test]
    fn test_strict_rejects_other_types() {
        let rules = int32().with_strict();
        let mut out = 0_i32;
        assert_eq!(apply(&rules, &5_i64, &mut out), vec![ErrorCode::Coercion]);
        assert!(apply(&rules, &5_i32, &mut out).is_empty());
        assert!(apply(&rules, &Some(6_i32), &mut out).is_empty());
        assert_eq!(out, 6);
    }

    #[test]
    fn test_rounding() {
        let mut out = 0_i64;
        assert_eq!(apply(&int(), &2.5_f64, &mut out), vec![ErrorCode::Coercion]);

        let rules = int().with_rounding(Rounding::HalfEven);
        assert!(apply(&rules, &2.5_f64, &mut out).is_empty());
        assert_eq!(out, 2);
        assert_eq!(rules.to_string(), "int().with_rounding(HalfEven)");
    }

    #[test]
    fn test_null_handling() {
        let mut out = Some(1_i64);
        assert_eq!(apply(&int(), &(), &mut out), vec![ErrorCode::Null]);
        assert_eq!(
            apply(&int().with_required(), &None::<i64>, &mut out),
            vec![ErrorCode::Required]
        );
        assert!(apply(&int().with_nil(), &(), &mut out).is_empty());
        assert_eq!(out, None);
    }

    #[test]
    fn test_forbidden() {
        let rules = int().with_forbidden();
        let mut out: Option<i64> = None;
        assert_eq!(apply(&rules, &1_i64, &mut out), vec![ErrorCode::Forbidden]);
        assert!(apply(&rules, &(), &mut out).is_empty());
    }

    #[test]
    fn test_incompatible_output() {
        let mut out = 0.0_f64;
        assert_eq!(apply(&int(), &1_i64, &mut out), vec![ErrorCode::Internal]);
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(
            int().try_with_range(5, 1),
            Err(BuildError::InvertedRange { .. })
        ));
        assert!(matches!(int().try_with_base(1), Err(BuildError::InvalidBase(1))));
        assert_eq!(
            int().with_range(1, 5).to_string(),
            "int().with_min(1).with_max(5)"
        );
    }

    #[test]
    #[should_panic(expected = "invalid base 37")]
    fn test_with_base_panics() {
        let _ = int().with_base(37);
    }

    #[test]
    fn test_allowed_values_latest_wins() {
        let rules = uint8().with_allowed_values([1, 2]).with_allowed_values([3]);
        assert_eq!(rules.to_string(), "uint8().with_allowed_values(3)");
        assert!(rules.evaluate(&Context::new(), &3).is_ok());
        assert!(rules.evaluate(&Context::new(), &1).is_err());
    }

    #[test]
    fn test_user_rules() {
        let rules = int()
            .with_rule_func(|ctx: &Context, v: &i64| {
                if v % 2 == 0 {
                    Ok(())
                } else {
                    Err(ctx.error(ErrorCode::Unknown, "must be even").into())
                }
            })
            .with_max(100);
        assert_eq!(rules.to_string(), "int().with_rule_func(..).with_max(100)");

        let errors = rules.evaluate(&Context::new(), &101).unwrap_err();
        assert_eq!(errors.codes(), vec![ErrorCode::Max, ErrorCode::Unknown]);
    }
}
