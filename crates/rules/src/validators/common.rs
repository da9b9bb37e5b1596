//! Pieces shared by every rule family: input classification, null
//! handling, output writing and the built-in leaf rules.

use std::any::{Any, type_name};

use crate::foundation::chain::Step;
use crate::foundation::conflict::ConflictType;
use crate::foundation::{Context, ErrorCode, Rule, ValidationError, ValidationErrors};
use crate::validators::macros::leaf_rule;

// ============================================================================
// INPUT
// ============================================================================

/// A raw input as seen by a family targeting `T`.
pub(crate) enum Input<'a, T> {
    /// `()`, `None` or JSON `null`.
    Null,
    /// Already a `T` (possibly inside `Some`).
    Exact(&'a T),
    /// Anything else; needs coercion.
    Other(&'a dyn Any),
}

pub(crate) fn classify<T: 'static>(input: &dyn Any) -> Input<'_, T> {
    if let Some(value) = input.downcast_ref::<T>() {
        return Input::Exact(value);
    }
    if let Some(value) = input.downcast_ref::<Option<T>>() {
        return value.as_ref().map_or(Input::Null, Input::Exact);
    }
    if is_null(input) {
        Input::Null
    } else {
        Input::Other(input)
    }
}

/// Returns true for the null forms every family understands.
pub(crate) fn is_null(input: &dyn Any) -> bool {
    input.is::<()>()
        || input
            .downcast_ref::<serde_json::Value>()
            .is_some_and(serde_json::Value::is_null)
}

// ============================================================================
// PRESENCE
// ============================================================================

/// Presence flags carried by every family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Presence {
    pub(crate) required: bool,
    pub(crate) nil: bool,
    pub(crate) forbidden: bool,
}

impl Presence {
    /// Handles a null input for a family targeting `T`.
    pub(crate) fn on_null<T: 'static>(
        self,
        ctx: &Context,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        if self.nil || self.forbidden {
            if let Some(slot) = output.downcast_mut::<Option<T>>() {
                *slot = None;
            } else if let Some(slot) = output.downcast_mut::<Option<String>>() {
                *slot = None;
            }
            return Ok(());
        }

        let error = if self.required {
            ValidationError::required(ctx)
        } else {
            ValidationError::null(ctx)
        };
        Err(error.into())
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Writes `value` into `output`.
///
/// Accepted locations are `T`, `Option<T>`, `String` and `Option<String>`;
/// string locations receive `render(value)`.
pub(crate) fn write_output<T: Clone + 'static>(
    ctx: &Context,
    output: &mut dyn Any,
    value: &T,
    render: impl FnOnce(&T) -> String,
) -> Result<(), ValidationError> {
    if let Some(slot) = output.downcast_mut::<T>() {
        *slot = value.clone();
    } else if let Some(slot) = output.downcast_mut::<Option<T>>() {
        *slot = Some(value.clone());
    } else if let Some(slot) = output.downcast_mut::<String>() {
        *slot = render(value);
    } else if let Some(slot) = output.downcast_mut::<Option<String>>() {
        *slot = Some(render(value));
    } else {
        return Err(incompatible_output::<T>(ctx));
    }
    Ok(())
}

pub(crate) fn incompatible_output<T>(ctx: &Context) -> ValidationError {
    ValidationError::internal(
        ctx,
        format!("output cannot receive a value of type {}", type_name::<T>()),
    )
}

// ============================================================================
// BUILT-IN RULES
// ============================================================================

/// Which side of a bound a value must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundKind {
    Min,
    MinExclusive,
    Max,
    MaxExclusive,
}

impl BoundKind {
    fn conflict(self) -> ConflictType {
        match self {
            Self::Min => ConflictType::Min,
            Self::MinExclusive => ConflictType::MinExclusive,
            Self::Max => ConflictType::Max,
            Self::MaxExclusive => ConflictType::MaxExclusive,
        }
    }

    fn builder(self) -> &'static str {
        match self {
            Self::Min => "with_min",
            Self::MinExclusive => "with_min_exclusive",
            Self::Max => "with_max",
            Self::MaxExclusive => "with_max_exclusive",
        }
    }

    fn code(self) -> ErrorCode {
        match self {
            Self::Min => ErrorCode::Min,
            Self::MinExclusive => ErrorCode::MinExclusive,
            Self::Max => ErrorCode::Max,
            Self::MaxExclusive => ErrorCode::MaxExclusive,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Self::Min => "at least",
            Self::MinExclusive => "greater than",
            Self::Max => "at most",
            Self::MaxExclusive => "less than",
        }
    }

    /// Incomparable values (NaN) never hold.
    fn holds<T: PartialOrd>(self, value: &T, limit: &T) -> bool {
        match self {
            Self::Min => value >= limit,
            Self::MinExclusive => value > limit,
            Self::Max => value <= limit,
            Self::MaxExclusive => value < limit,
        }
    }
}

leaf_rule! {
    /// An inclusive or exclusive bound.
    pub(crate) Bound<T: PartialOrd> { kind: BoundKind, limit: T, shown: String } for T;
    rule(self, input) { self.kind.holds(input, &self.limit) }
    error(self, ctx, input) {
        ctx.error(self.kind.code(), format!("must be {} {}", self.kind.phrase(), self.shown))
            .with_param("limit", &self.shown)
    }
}

/// A bound link. `shown` is the limit as it appears in labels and messages.
pub(crate) fn bound_step<T>(kind: BoundKind, limit: T, shown: String) -> Step<T>
where
    T: PartialOrd + Send + Sync + 'static,
{
    let label = format!("{}({shown})", kind.builder());
    Step::builtin(kind.conflict(), Bound { kind, limit, shown }, label)
}

leaf_rule! {
    /// The value must be one of `values`.
    pub(crate) AllowList<T: PartialEq> { values: Vec<T>, shown: String } for T;
    rule(self, input) { self.values.contains(input) }
    error(self, ctx, input) {
        ctx.error(ErrorCode::NotAllowed, format!("must be one of {}", self.shown))
            .with_param("allowed", &self.shown)
    }
}

leaf_rule! {
    /// The value must not be one of `values`.
    pub(crate) DenyList<T: PartialEq> { values: Vec<T>, shown: String } for T;
    rule(self, input) { !self.values.contains(input) }
    error(self, ctx, input) {
        ctx.error(ErrorCode::Denied, "value is not permitted")
            .with_param("denied", &self.shown)
    }
}

/// Allow-list link. A newer allow list replaces an older one.
pub(crate) fn allowed_step<T>(values: Vec<T>, show: impl Fn(&T) -> String) -> Step<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    let shown = join(&values, show);
    let label = format!("with_allowed_values({shown})");
    Step::builtin(ConflictType::Allowed, AllowList { values, shown }, label)
}

/// Deny-list link. A newer deny list replaces an older one.
pub(crate) fn rejected_step<T>(values: Vec<T>, show: impl Fn(&T) -> String) -> Step<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    let shown = join(&values, show);
    let label = format!("with_rejected_values({shown})");
    Step::builtin(ConflictType::Rejected, DenyList { values, shown }, label)
}

fn join<T>(values: &[T], show: impl Fn(&T) -> String) -> String {
    values.iter().map(show).collect::<Vec<_>>().join(", ")
}

/// Rejects any value that reaches it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Forbidden;

impl<T: ?Sized> Rule<T> for Forbidden {
    fn evaluate(&self, ctx: &Context, _value: &T) -> Result<(), ValidationErrors> {
        Err(ctx.error(ErrorCode::Forbidden, "value is forbidden").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_unwraps_option() {
        assert!(matches!(classify::<i64>(&Some(3_i64)), Input::Exact(&3)));
        assert!(matches!(classify::<i64>(&None::<i64>), Input::Null));
        assert!(matches!(classify::<i64>(&()), Input::Null));
        assert!(matches!(classify::<i64>(&json!(null)), Input::Null));
        assert!(matches!(classify::<i64>(&json!(3)), Input::Other(_)));
        assert!(matches!(classify::<i64>(&3_i32), Input::Other(_)));
    }

    #[test]
    fn test_on_null() {
        let ctx = Context::new();
        let mut slot = Some(5_i64);

        let nil = Presence {
            nil: true,
            ..Presence::default()
        };
        assert!(nil.on_null::<i64>(&ctx, &mut slot).is_ok());
        assert_eq!(slot, None);

        let required = Presence {
            required: true,
            ..Presence::default()
        };
        let errors = required.on_null::<i64>(&ctx, &mut slot).unwrap_err();
        assert_eq!(errors.codes(), vec![ErrorCode::Required]);

        let errors = Presence::default().on_null::<i64>(&ctx, &mut slot).unwrap_err();
        assert_eq!(errors.codes(), vec![ErrorCode::Null]);
    }

    #[test]
    fn test_write_output_locations() {
        let ctx = Context::new();
        let render = |v: &i64| format!("#{v}");

        let mut exact = 0_i64;
        write_output(&ctx, &mut exact, &7, render).unwrap();
        assert_eq!(exact, 7);

        let mut optional: Option<i64> = None;
        write_output(&ctx, &mut optional, &7, render).unwrap();
        assert_eq!(optional, Some(7));

        let mut text = String::new();
        write_output(&ctx, &mut text, &7, render).unwrap();
        assert_eq!(text, "#7");

        let mut wrong = 0_u8;
        let err = write_output(&ctx, &mut wrong, &7_i64, render).unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(wrong, 0);
    }

    #[test]
    fn test_bound_rule() {
        let ctx = Context::new();
        let rule = Bound {
            kind: BoundKind::MinExclusive,
            limit: 3_i64,
            shown: "3".into(),
        };
        assert!(rule.evaluate(&ctx, &4).is_ok());

        let errors = rule.evaluate(&ctx, &3).unwrap_err();
        let error = errors.first().unwrap();
        assert_eq!(error.code, ErrorCode::MinExclusive);
        assert_eq!(error.message, "must be greater than 3");
        assert_eq!(error.param("limit"), Some("3"));
    }

    #[test]
    fn test_bound_rejects_nan() {
        let rule = Bound {
            kind: BoundKind::Max,
            limit: 1.0_f64,
            shown: "1".into(),
        };
        assert!(rule.evaluate(&Context::new(), &f64::NAN).is_err());
    }

    #[test]
    fn test_allow_and_deny_lists() {
        let ctx = Context::new();
        let allow = AllowList {
            values: vec![1_i64, 2],
            shown: "1, 2".into(),
        };
        assert!(allow.evaluate(&ctx, &2).is_ok());
        assert_eq!(
            allow.evaluate(&ctx, &3).unwrap_err().codes(),
            vec![ErrorCode::NotAllowed]
        );

        let deny = DenyList {
            values: vec![1_i64],
            shown: "1".into(),
        };
        assert_eq!(
            deny.evaluate(&ctx, &1).unwrap_err().codes(),
            vec![ErrorCode::Denied]
        );
    }

    #[test]
    fn test_forbidden_rejects_anything() {
        let ctx = Context::new().with_field("secret");
        let errors = Rule::<str>::evaluate(&Forbidden, &ctx, "x").unwrap_err();
        assert_eq!(errors.first().unwrap().path.as_deref(), Some("secret"));
    }
}
