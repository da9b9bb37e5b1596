//! Core traits for the validation system
//!
//! - [`Rule`]: evaluates one value of a known type.
//! - [`RuleSet`]: a rule that can also coerce raw input and write it to an
//!   output location.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::foundation::{Context, ValidationErrors};

// ============================================================================
// RULE
// ============================================================================

/// A leaf validation rule for values of type `T`.
///
/// Rules are `Any` so that [`replaces`](Rule::replaces) can downcast the
/// rule it is compared against.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::prelude::*;
///
/// struct Even;
///
/// impl Rule<i64> for Even {
///     fn evaluate(&self, ctx: &Context, value: &i64) -> Result<(), ValidationErrors> {
///         if value % 2 == 0 {
///             Ok(())
///         } else {
///             Err(ctx.error(ErrorCode::Unknown, "must be even").into())
///         }
///     }
///
///     fn replaces(&self, other: &dyn Rule<i64>) -> bool {
///         is_rule::<Self, i64>(other)
///     }
/// }
///
/// let rules = int().with_rule(Even);
/// ```
pub trait Rule<T: ?Sized>: Any + Send + Sync {
    /// Validates `value`, returning every error found.
    fn evaluate(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors>;

    /// Returns true when appending `self` to a chain should drop `other`.
    fn replaces(&self, _other: &dyn Rule<T>) -> bool {
        false
    }

    /// Token used when a chain containing this rule is rendered.
    fn describe(&self) -> Cow<'static, str> {
        Cow::Borrowed("..")
    }
}

/// Returns true when `rule` is a `R`.
pub fn is_rule<R: Rule<T>, T: ?Sized + 'static>(rule: &dyn Rule<T>) -> bool {
    let any: &dyn Any = rule;
    any.is::<R>()
}

// ============================================================================
// RULE SET
// ============================================================================

/// A composable, evaluable chain of rules for values of type `T`.
///
/// `Display` renders the active chain as a diagnostic expression such as
/// `int().with_max(10).with_min(2)`.
pub trait RuleSet<T: ?Sized>: Rule<T> + fmt::Display {
    /// Coerces `input` toward `T`, writes the result into `output`, then runs
    /// every rule of the chain.
    ///
    /// `output` must be a location the family can write to (usually `T`,
    /// `Option<T>` or `String`); anything else yields a single
    /// [`ErrorCode::Internal`](crate::foundation::ErrorCode::Internal) error.
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors>;

    /// Returns true if the chain requires a value to be present.
    fn is_required(&self) -> bool;
}

// ============================================================================
// RULE FUNC
// ============================================================================

/// Adapts a closure into a [`Rule`].
pub struct RuleFunc<T: ?Sized, F> {
    func: F,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F> RuleFunc<T, F>
where
    F: Fn(&Context, &T) -> Result<(), ValidationErrors>,
{
    /// Wraps `func`.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> Rule<T> for RuleFunc<T, F>
where
    T: ?Sized + 'static,
    F: Fn(&Context, &T) -> Result<(), ValidationErrors> + Send + Sync + 'static,
{
    fn evaluate(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors> {
        (self.func)(ctx, value)
    }
}

impl<T: ?Sized, F> fmt::Debug for RuleFunc<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleFunc").finish_non_exhaustive()
    }
}

/// Creates a rule from a closure.
pub fn rule_func<T, F>(func: F) -> RuleFunc<T, F>
where
    T: ?Sized,
    F: Fn(&Context, &T) -> Result<(), ValidationErrors>,
{
    RuleFunc::new(func)
}

// ============================================================================
// TESTS
// ============================================================================
