//! String rule family

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::foundation::chain::{Link, Step, shared_root};
use crate::foundation::conflict::ConflictType;
use crate::foundation::{
    BuildError, Context, ErrorCode, Rule, RuleSet, ValidationError, ValidationErrors,
};
use crate::numeric::{FloatStyle, Scalar, format_float, scalar};
use crate::validators::any::WrapAny;
use crate::validators::common::{
    BoundKind, Input, Presence, allowed_step, bound_step, classify, rejected_step, write_output,
};
use crate::validators::macros::{common_builders, leaf_rule};

leaf_rule! {
    /// Lower bound on the number of characters.
    pub(crate) MinChars { min: usize } for String;
    rule(self, input) { input.chars().count() >= self.min }
    error(self, ctx, input) {
        ctx.error(
            ErrorCode::MinLen,
            format!("must be at least {} characters long", self.min),
        )
        .with_param("min", self.min)
        .with_param("actual", input.chars().count())
    }
}

leaf_rule! {
    /// Upper bound on the number of characters.
    pub(crate) MaxChars { max: usize } for String;
    rule(self, input) { input.chars().count() <= self.max }
    error(self, ctx, input) {
        ctx.error(
            ErrorCode::MaxLen,
            format!("must be at most {} characters long", self.max),
        )
        .with_param("max", self.max)
        .with_param("actual", input.chars().count())
    }
}

leaf_rule! {
    /// The whole value must match somewhere in `regex`.
    pub(crate) Pattern { regex: Regex } for String;
    rule(self, input) { self.regex.is_match(input) }
    error(self, ctx, input) {
        ctx.error(
            ErrorCode::Pattern,
            format!("must match pattern {}", self.regex.as_str()),
        )
        .with_param("pattern", self.regex.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct StringFlags {
    presence: Presence,
    strict: bool,
}

/// A persistent chain of rules for strings.
///
/// Text input is taken as is; numbers and booleans are rendered to their
/// canonical text unless the chain is strict. A strict chain accepts only
/// `String` and `Option<String>`: borrowed `&str` and JSON strings are
/// rejected with a type mismatch like any other input.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::prelude::*;
///
/// let rules = string().with_min_len(1).with_regex(r"^[a-z]+$");
/// assert!(rules.evaluate(&Context::new(), &"abc".to_string()).is_ok());
/// ```
#[derive(Clone)]
pub struct StringRules {
    head: Arc<Link<String, StringFlags>>,
}

impl fmt::Debug for StringRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringRules").field(&self.head.render()).finish()
    }
}

/// Rules for strings.
pub fn string() -> StringRules {
    shared_root("string()", || StringRules {
        head: Link::root(StringFlags::default(), "string()"),
    })
}

impl StringRules {
    fn push(&self, step: Step<String>, edit: impl FnOnce(&mut StringFlags)) -> Self {
        Self {
            head: Link::push(&self.head, step, edit),
        }
    }

    common_builders!(String, strict);

    /// Requires the value to sort at or after `min` (byte-wise).
    pub fn with_min(&self, min: impl Into<String>) -> Self {
        let min = min.into();
        let shown = format!("{min:?}");
        self.push(bound_step(BoundKind::Min, min, shown), |_| {})
    }

    /// Requires the value to sort at or before `max` (byte-wise).
    pub fn with_max(&self, max: impl Into<String>) -> Self {
        let max = max.into();
        let shown = format!("{max:?}");
        self.push(bound_step(BoundKind::Max, max, shown), |_| {})
    }

    /// Requires at least `min` characters.
    pub fn with_min_len(&self, min: usize) -> Self {
        self.push(
            Step::builtin(
                ConflictType::MinLen,
                MinChars { min },
                format!("with_min_len({min})"),
            ),
            |_| {},
        )
    }

    /// Requires at most `max` characters.
    pub fn with_max_len(&self, max: usize) -> Self {
        self.push(
            Step::builtin(
                ConflictType::MaxLen,
                MaxChars { max },
                format!("with_max_len({max})"),
            ),
            |_| {},
        )
    }

    /// Requires the value to match `pattern`. Several patterns may be
    /// chained; all must match.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    pub fn with_regex(&self, pattern: &str) -> Self {
        match self.try_with_regex(pattern) {
            Ok(rules) => rules,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`with_regex`](Self::with_regex), returning an error instead of
    /// panicking.
    pub fn try_with_regex(&self, pattern: &str) -> Result<Self, BuildError> {
        let regex = Regex::new(pattern)?;
        Ok(self.push(
            Step::builtin(
                ConflictType::None,
                Pattern { regex },
                format!("with_regex({pattern:?})"),
            ),
            |_| {},
        ))
    }

    /// Requires the value to be one of `values`.
    pub fn with_allowed_values<S: Into<String>>(
        &self,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(allowed_step(values, |v: &String| format!("{v:?}")), |_| {})
    }

    /// Requires the value not to be one of `values`.
    pub fn with_rejected_values<S: Into<String>>(
        &self,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(rejected_step(values, |v: &String| format!("{v:?}")), |_| {})
    }

    /// Erases the value type so the chain can sit beside other families.
    pub fn any(&self) -> WrapAny<String> {
        WrapAny::new(self.clone())
    }
}

fn coerce_text(ctx: &Context, raw: &dyn Any) -> Result<String, ValidationError> {
    match scalar(raw) {
        Scalar::Text(text) => Ok(text.to_owned()),
        Scalar::Int(value, _) => Ok(value.to_string()),
        Scalar::F32(value) => Ok(format_float(value, FloatStyle::Shortest)),
        Scalar::F64(value) => Ok(format_float(value, FloatStyle::Shortest)),
        Scalar::Bool(value) => Ok(value.to_string()),
        Scalar::Null | Scalar::Unsupported => Err(ValidationError::type_mismatch(ctx, "string")),
    }
}

impl Rule<String> for StringRules {
    fn evaluate(&self, ctx: &Context, value: &String) -> Result<(), ValidationErrors> {
        self.head.evaluate(ctx, value)
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.head.render())
    }
}

impl RuleSet<String> for StringRules {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        let flags = self.head.flags();
        let value = match classify::<String>(input) {
            Input::Null => return flags.presence.on_null::<String>(ctx, output),
            Input::Exact(value) => value.clone(),
            Input::Other(_) if flags.strict => {
                return Err(ValidationError::type_mismatch(ctx, "String").into());
            }
            Input::Other(raw) => coerce_text(ctx, raw)?,
        };

        write_output(ctx, output, &value, String::clone)?;
        self.head.evaluate(ctx, &value)
    }

    fn is_required(&self) -> bool {
        self.head.flags().presence.required
    }
}

impl fmt::Display for StringRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head.render())
    }
}
