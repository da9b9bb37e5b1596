//! Untyped rule sets
//!
//! [`AnyRules`] validates values of unknown type with presence flags and
//! custom `Rule<dyn Any>` rules. [`WrapAny`] lifts any typed chain into a
//! `RuleSet<dyn Any>`, so chains of different value types can live in one
//! collection:
//!
//! ```rust,ignore
//! use nebula_rules::prelude::*;
//!
//! let fields: Vec<(&str, Box<dyn RuleSet<dyn Any>>)> = vec![
//!     ("age", Box::new(int().with_min(0).any())),
//!     ("name", Box::new(string().with_min_len(1).any())),
//! ];
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::foundation::chain::{Link, Step, shared_root};
use crate::foundation::{Context, ErrorCode, Rule, RuleSet, ValidationError, ValidationErrors};
use crate::validators::common::{Presence, is_null};
use crate::validators::macros::common_builders;

// ============================================================================
// ANY RULES
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct AnyFlags {
    presence: Presence,
}

/// A persistent chain of rules for values of any type.
///
/// Values are never copied: `apply` validates in place and only accepts
/// `()` as its output.
#[derive(Clone)]
pub struct AnyRules {
    head: Arc<Link<dyn Any, AnyFlags>>,
}

impl fmt::Debug for AnyRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyRules").field(&self.head.render()).finish()
    }
}

/// Rules for values of any type.
pub fn any() -> AnyRules {
    shared_root("any()", || AnyRules {
        head: Link::root(AnyFlags::default(), "any()"),
    })
}

impl AnyRules {
    fn push(&self, step: Step<dyn Any>, edit: impl FnOnce(&mut AnyFlags)) -> Self {
        Self {
            head: Link::push(&self.head, step, edit),
        }
    }

    common_builders!(dyn Any);
}

impl Rule<dyn Any> for AnyRules {
    fn evaluate(&self, ctx: &Context, value: &dyn Any) -> Result<(), ValidationErrors> {
        self.head.evaluate(ctx, value)
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.head.render())
    }
}

impl RuleSet<dyn Any> for AnyRules {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        if !output.is::<()>() {
            let message = "untyped rules only accept `()` as output";
            return Err(ValidationError::internal(ctx, message).into());
        }
        if is_null(input) {
            return self.head.flags().presence.on_null::<()>(ctx, output);
        }
        self.head.evaluate(ctx, input)
    }

    fn is_required(&self) -> bool {
        self.head.flags().presence.required
    }
}

impl fmt::Display for AnyRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head.render())
    }
}

// ============================================================================
// WRAP ANY
// ============================================================================

/// A typed chain seen through `dyn Any`, created by the families' `any()`.
///
/// Rules added to the wrapper run on the coerced value after the wrapped
/// chain accepted it.
pub struct WrapAny<T: ?Sized> {
    inner: Arc<dyn RuleSet<T>>,
    head: Arc<Link<T, ()>>,
}

impl<T: ?Sized> Clone for WrapAny<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            head: Arc::clone(&self.head),
        }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for WrapAny<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WrapAny").field(&self.to_string()).finish()
    }
}

impl<T: 'static> WrapAny<T> {
    pub(crate) fn new(inner: impl RuleSet<T>) -> Self {
        Self {
            inner: Arc::new(inner),
            head: Link::root((), "any()"),
        }
    }

    /// Appends a rule evaluated against the coerced value.
    pub fn with_rule(&self, rule: impl Rule<T>) -> Self {
        let label = format!("with_rule({})", rule.describe());
        self.push(Step::user(Arc::new(rule), label))
    }

    /// Appends a closure evaluated against the coerced value.
    pub fn with_rule_func<F>(&self, func: F) -> Self
    where
        F: Fn(&Context, &T) -> Result<(), ValidationErrors> + Send + Sync + 'static,
    {
        self.push(Step::user(
            Arc::new(crate::foundation::RuleFunc::new(func)),
            "with_rule_func(..)",
        ))
    }

    fn push(&self, step: Step<T>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            head: Link::push(&self.head, step, |_| {}),
        }
    }

    fn evaluate_own(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors> {
        self.head.evaluate(ctx, value)
    }
}

impl<T: 'static> Rule<dyn Any> for WrapAny<T> {
    fn evaluate(&self, ctx: &Context, value: &dyn Any) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(value) = value.downcast_ref::<T>() {
            errors.absorb(self.inner.evaluate(ctx, value));
            errors.absorb(self.evaluate_own(ctx, value));
            return errors.into_result(());
        }

        let mut slot: Option<T> = None;
        errors.absorb(self.inner.apply(ctx, value, &mut slot));
        if let Some(value) = &slot {
            errors.absorb(self.evaluate_own(ctx, value));
        }
        errors.into_result(())
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.to_string())
    }
}

impl<T: 'static> RuleSet<dyn Any> for WrapAny<T> {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        if output.is::<()>() {
            return self.evaluate(ctx, input);
        }
        if !self.head.has_rules() {
            return self.inner.apply(ctx, input, output);
        }

        let mut errors = ValidationErrors::new();
        let mut slot: Option<T> = None;
        errors.absorb(self.inner.apply(ctx, input, &mut slot));
        let Some(value) = slot else {
            // Null or not coercible: the wrapped chain owns the outcome.
            return self.inner.apply(ctx, input, output);
        };
        errors.absorb(self.evaluate_own(ctx, &value));

        if let Some(out) = output.downcast_mut::<T>() {
            *out = value;
        } else if let Some(out) = output.downcast_mut::<Option<T>>() {
            *out = Some(value);
        } else if let Err(rendered) = self.inner.apply(ctx, input, output)
            && rendered.codes() == [ErrorCode::Internal]
        {
            // String outputs hold the wrapped chain's rendering. A lone
            // internal error means the location rejected it.
            return Err(rendered);
        }
        errors.into_result(())
    }

    fn is_required(&self) -> bool {
        self.inner.is_required()
    }
}

impl<T: ?Sized + 'static> fmt::Display for WrapAny<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.inner, self.head.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{int, slice, string};
    use insta::assert_snapshot;

    fn codes(result: Result<(), ValidationErrors>) -> Vec<ErrorCode> {
        result.err().map(|e| e.codes()).unwrap_or_default()
    }

    #[test]
    fn test_any_rules_accept_unit_output_only() {
        let ctx = Context::new();
        assert!(any().apply(&ctx, &5_i32, &mut ()).is_ok());
        assert_eq!(
            codes(any().apply(&ctx, &5_i32, &mut 0_i32)),
            vec![ErrorCode::Internal]
        );
    }

    #[test]
    fn test_any_rules_presence() {
        let ctx = Context::new();
        assert_eq!(codes(any().apply(&ctx, &(), &mut ())), vec![ErrorCode::Null]);
        assert_eq!(
            codes(any().with_required().apply(&ctx, &(), &mut ())),
            vec![ErrorCode::Required]
        );
        assert!(any().with_nil().apply(&ctx, &(), &mut ()).is_ok());
        assert_eq!(
            codes(any().with_forbidden().apply(&ctx, &"x", &mut ())),
            vec![ErrorCode::Forbidden]
        );
    }

    #[test]
    fn test_any_rules_custom_rule() {
        let rules = any().with_rule_func(|ctx: &Context, value: &dyn Any| {
            if value.is::<String>() {
                Ok(())
            } else {
                Err(ctx.error(ErrorCode::Unknown, "expected an owned string").into())
            }
        });
        let ctx = Context::new();
        assert!(rules.apply(&ctx, &"a".to_owned(), &mut ()).is_ok());
        assert_eq!(codes(rules.apply(&ctx, &1_u8, &mut ())), vec![ErrorCode::Unknown]);
        assert_snapshot!(rules.to_string(), @"any().with_rule_func(..)");
    }

    #[test]
    fn test_wrap_any_exact_and_coerced() {
        let wrapped = int().with_min(10).any();
        let ctx = Context::new();
        assert!(wrapped.evaluate(&ctx, &12_i64).is_ok());
        assert!(wrapped.evaluate(&ctx, &"12").is_ok());
        assert_eq!(codes(wrapped.evaluate(&ctx, &9_u8)), vec![ErrorCode::Min]);
        assert_eq!(codes(wrapped.evaluate(&ctx, &"x")), vec![ErrorCode::Coercion]);
    }

    fn odd_denied() -> WrapAny<i64> {
        int().with_max(100).any().with_rule_func(|ctx: &Context, v: &i64| {
            if v % 2 == 1 {
                Err(ctx.error(ErrorCode::Denied, "must be even").into())
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn test_wrap_any_own_rules_run_on_coerced_value() {
        let wrapped = odd_denied();
        assert_snapshot!(wrapped.to_string(), @"int().with_max(100).any().with_rule_func(..)");

        let ctx = Context::new();
        let mut out = 0_i64;
        assert_eq!(codes(wrapped.apply(&ctx, &"13", &mut out)), vec![ErrorCode::Denied]);
        assert_eq!(out, 13);

        let mut text = String::new();
        assert_eq!(codes(wrapped.apply(&ctx, &13_u8, &mut text)), vec![ErrorCode::Denied]);
        assert_eq!(text, "13");

        let mut slot: Option<i64> = None;
        assert!(wrapped.apply(&ctx, &"42", &mut slot).is_ok());
        assert_eq!(slot, Some(42));
    }

    #[test]
    fn test_wrap_any_collects_inner_and_own_errors() {
        let wrapped = odd_denied();
        let ctx = Context::new();
        let both = vec![ErrorCode::Max, ErrorCode::Denied];

        let mut out = 0_i64;
        assert_eq!(codes(wrapped.apply(&ctx, &501_i64, &mut out)), both);
        assert_eq!(out, 501);

        let mut text: Option<String> = None;
        assert_eq!(codes(wrapped.apply(&ctx, &"501", &mut text)), both);
        assert_eq!(text.as_deref(), Some("501"));

        assert_eq!(codes(wrapped.evaluate(&ctx, &501_i64)), both);
        assert_eq!(codes(wrapped.evaluate(&ctx, &"501")), both);
        assert_eq!(codes(wrapped.apply(&ctx, &501_i64, &mut ())), both);
    }

    #[test]
    fn test_wrap_any_stops_when_nothing_is_coerced() {
        let wrapped = odd_denied();
        let ctx = Context::new();

        let mut out = 7_i64;
        assert_eq!(codes(wrapped.apply(&ctx, &"x", &mut out)), vec![ErrorCode::Coercion]);
        assert_eq!(out, 7);
        assert_eq!(codes(wrapped.evaluate(&ctx, &"x")), vec![ErrorCode::Coercion]);
        assert_eq!(codes(wrapped.apply(&ctx, &(), &mut out)), vec![ErrorCode::Null]);

        let mut wrong = 0_u8;
        assert_eq!(codes(wrapped.apply(&ctx, &"3", &mut wrong)), vec![ErrorCode::Internal]);
    }

    #[test]
    fn test_heterogeneous_collection() {
        let fields: Vec<(&str, Box<dyn RuleSet<dyn Any>>)> = vec![
            ("age", Box::new(int().with_min(0).any())),
            ("name", Box::new(string().with_min_len(1).any())),
            ("tags", Box::new(slice::<String>().with_max_len(2).any())),
        ];
        let values: Vec<Box<dyn Any>> = vec![
            Box::new(-1_i64),
            Box::new(String::new()),
            Box::new(vec!["a".to_owned()]),
        ];

        let root = Context::new();
        let mut errors = ValidationErrors::new();
        for ((name, rules), value) in fields.iter().zip(&values) {
            errors.absorb(rules.apply(&root.with_field(*name), value.as_ref(), &mut ()));
        }

        assert_eq!(errors.codes(), vec![ErrorCode::Min, ErrorCode::MinLen]);
        assert_eq!(errors.for_path("age").count(), 1);
        assert_eq!(errors.for_path("name").count(), 1);
    }

    #[test]
    fn test_required_passes_through() {
        assert!(int().with_required().any().is_required());
        assert!(!int().any().is_required());
    }
}
