//! Boolean rule family

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::foundation::chain::{Link, Step, shared_root};
use crate::foundation::conflict::ConflictType;
use crate::foundation::{Context, ErrorCode, Rule, RuleSet, ValidationError, ValidationErrors};
use crate::numeric::{Scalar, scalar};
use crate::validators::any::WrapAny;
use crate::validators::common::{Input, Presence, classify, write_output};
use crate::validators::macros::{common_builders, leaf_rule};

leaf_rule! {
    /// The value must equal `expected`.
    pub(crate) Equals { expected: bool } for bool;
    rule(self, input) { *input == self.expected }
    error(self, ctx, input) {
        ctx.error(ErrorCode::NotAllowed, format!("must be {}", self.expected))
            .with_param("expected", self.expected)
    }
}

/// Parses the textual forms accepted for booleans.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn coerce_bool(ctx: &Context, raw: &dyn Any) -> Result<bool, ValidationError> {
    let invalid = |shown: String| {
        ctx.error(ErrorCode::Coercion, format!("{shown} is not a valid bool"))
    };
    match scalar(raw) {
        Scalar::Bool(value) => Ok(value),
        Scalar::Text(text) => parse_bool(text).ok_or_else(|| invalid(format!("{text:?}"))),
        Scalar::Int(0, _) => Ok(false),
        Scalar::Int(1, _) => Ok(true),
        Scalar::Int(value, _) => Err(invalid(value.to_string())),
        other => Err(ValidationError::type_mismatch(ctx, "bool")
            .with_param("actual", other.type_name())),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BoolFlags {
    presence: Presence,
    strict: bool,
}

/// A persistent chain of rules for booleans.
///
/// Accepts `bool`, the integers `0` and `1`, and the strings `"1"`, `"0"`,
/// `"t"`, `"f"`, `"true"`, `"false"` in lower, upper and title case.
#[derive(Clone)]
pub struct BoolRules {
    head: Arc<Link<bool, BoolFlags>>,
}

impl fmt::Debug for BoolRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoolRules").field(&self.head.render()).finish()
    }
}

/// Rules for booleans.
pub fn boolean() -> BoolRules {
    shared_root("boolean()", || BoolRules {
        head: Link::root(BoolFlags::default(), "boolean()"),
    })
}

impl BoolRules {
    fn push(&self, step: Step<bool>, edit: impl FnOnce(&mut BoolFlags)) -> Self {
        Self {
            head: Link::push(&self.head, step, edit),
        }
    }

    common_builders!(bool, strict);

    /// Requires the value to be exactly `expected`.
    pub fn with_value(&self, expected: bool) -> Self {
        self.push(
            Step::builtin(
                ConflictType::Allowed,
                Equals { expected },
                format!("with_value({expected})"),
            ),
            |_| {},
        )
    }

    /// Erases the value type so the chain can sit beside other families.
    pub fn any(&self) -> WrapAny<bool> {
        WrapAny::new(self.clone())
    }
}

impl Rule<bool> for BoolRules {
    fn evaluate(&self, ctx: &Context, value: &bool) -> Result<(), ValidationErrors> {
        self.head.evaluate(ctx, value)
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.head.render())
    }
}

impl RuleSet<bool> for BoolRules {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        let flags = self.head.flags();
        let value = match classify::<bool>(input) {
            Input::Null => return flags.presence.on_null::<bool>(ctx, output),
            Input::Exact(value) => *value,
            Input::Other(_) if flags.strict => {
                return Err(ValidationError::type_mismatch(ctx, "bool").into());
            }
            Input::Other(raw) => coerce_bool(ctx, raw)?,
        };

        write_output(ctx, output, &value, bool::to_string)?;
        self.head.evaluate(ctx, &value)
    }

    fn is_required(&self) -> bool {
        self.head.flags().presence.required
    }
}

impl fmt::Display for BoolRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head.render())
    }
}
