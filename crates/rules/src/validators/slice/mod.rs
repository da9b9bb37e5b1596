//! Sequence rule family
//!
//! A [`SliceRules<T>`] combines an optional per-item rule set with length
//! bounds and whole-sequence rules. Items are validated one by one; item
//! failures never stop the walk, while exceeding the maximum length does,
//! before the offending item is looked at.
//!
//! Two entry points share these semantics:
//!
//! - [`RuleSet::apply`] and [`Rule::evaluate`], synchronous, for nesting
//!   inside other chains.
//! - [`SliceRules::apply_stream`], asynchronous and channel based, for
//!   producers and consumers that should not buffer the whole sequence.

mod stream;

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::foundation::chain::{Link, Step, shared_root};
use crate::foundation::conflict::ConflictType;
use crate::foundation::{Context, ErrorCode, Rule, RuleSet, ValidationError, ValidationErrors};
use crate::validators::any::WrapAny;
use crate::validators::common::{Input, Presence, classify, incompatible_output};
use crate::validators::macros::common_builders;

pub use stream::{Item, SliceInput, SliceOutput};

struct SliceFlags<T> {
    presence: Presence,
    min_len: Option<usize>,
    max_len: Option<usize>,
    items: Option<Arc<dyn RuleSet<T>>>,
    buffer: usize,
}

impl<T> Clone for SliceFlags<T> {
    fn clone(&self) -> Self {
        Self {
            presence: self.presence,
            min_len: self.min_len,
            max_len: self.max_len,
            items: self.items.clone(),
            buffer: self.buffer,
        }
    }
}

impl<T> Default for SliceFlags<T> {
    fn default() -> Self {
        Self {
            presence: Presence::default(),
            min_len: None,
            max_len: None,
            items: None,
            buffer: 1,
        }
    }
}

/// A persistent chain of rules for sequences of `T`.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::prelude::*;
///
/// let rules = slice::<i64>()
///     .with_item_rules(int().with_min(0))
///     .with_max_len(3);
///
/// let mut out: Vec<i64> = Vec::new();
/// let input = vec!["1", "2"];
/// rules.apply(&Context::new(), &input, &mut out)?;
/// ```
pub struct SliceRules<T> {
    head: Arc<Link<Vec<T>, SliceFlags<T>>>,
}

impl<T> Clone for SliceRules<T> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> fmt::Debug for SliceRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SliceRules").field(&self.head.render()).finish()
    }
}

/// Rules for sequences of `T`.
pub fn slice<T: Clone + Send + Sync + 'static>() -> SliceRules<T> {
    shared_root("slice()", || SliceRules {
        head: Link::root(SliceFlags::default(), "slice()"),
    })
}

impl<T: Clone + Send + Sync + 'static> SliceRules<T> {
    fn push(&self, step: Step<Vec<T>>, edit: impl FnOnce(&mut SliceFlags<T>)) -> Self {
        Self {
            head: Link::push(&self.head, step, edit),
        }
    }

    common_builders!(Vec<T>);

    /// Requires at least `min` items.
    pub fn with_min_len(&self, min: usize) -> Self {
        self.push(
            Step::flag(ConflictType::MinLen, format!("with_min_len({min})")),
            |flags| flags.min_len = Some(min),
        )
    }

    /// Allows at most `max` items. Receiving one more stops validation.
    pub fn with_max_len(&self, max: usize) -> Self {
        self.push(
            Step::flag(ConflictType::MaxLen, format!("with_max_len({max})")),
            |flags| flags.max_len = Some(max),
        )
    }

    /// Validates and coerces every item with `rules`.
    pub fn with_item_rules(&self, rules: impl RuleSet<T>) -> Self {
        let label = format!("with_item_rules({rules})");
        let rules: Arc<dyn RuleSet<T>> = Arc::new(rules);
        self.push(Step::flag(ConflictType::ItemRules, label), |flags| {
            flags.items = Some(rules);
        })
    }

    /// Sets the capacity of the channels [`apply_stream`](Self::apply_stream)
    /// creates. Values below 1 are treated as 1.
    pub fn with_buffer(&self, capacity: usize) -> Self {
        self.push(
            Step::flag(ConflictType::Buffer, format!("with_buffer({capacity})")),
            |flags| flags.buffer = capacity.max(1),
        )
    }

    /// Erases the value type so the chain can sit beside other families.
    pub fn any(&self) -> WrapAny<Vec<T>> {
        WrapAny::new(self.clone())
    }

    fn flags(&self) -> &SliceFlags<T> {
        self.head.flags()
    }

    /// Returns true once `received` items fill the maximum length.
    fn is_full(&self, received: usize) -> bool {
        self.flags().max_len.is_some_and(|max| received >= max)
    }

    fn max_len_error(&self, ctx: &Context) -> ValidationError {
        let max = self.flags().max_len.unwrap_or_default();
        ctx.error(
            ErrorCode::MaxLen,
            format!("must contain at most {max} items"),
        )
        .with_param("max", max)
    }

    fn check_min_len(&self, ctx: &Context, count: usize) -> Result<(), ValidationErrors> {
        match self.flags().min_len {
            Some(min) if count < min => Err(ctx
                .error(
                    ErrorCode::MinLen,
                    format!("must contain at least {min} items"),
                )
                .with_param("min", min)
                .with_param("actual", count)
                .into()),
            _ => Ok(()),
        }
    }

    /// Validates one item. Returns the value to forward, if one was
    /// produced, and the item's errors.
    fn item(&self, ctx: &Context, raw: &dyn Any) -> (Option<T>, Result<(), ValidationErrors>) {
        match raw.downcast_ref::<T>() {
            Some(value) => self.check_item(ctx, value.clone()),
            None => self.coerce_item(ctx, raw),
        }
    }

    /// An item that already has the element type.
    fn check_item(&self, ctx: &Context, value: T) -> (Option<T>, Result<(), ValidationErrors>) {
        let result = match &self.flags().items {
            Some(items) => items.evaluate(ctx, &value),
            None => Ok(()),
        };
        (Some(value), result)
    }

    /// An item that needs the item rules to become a `T`.
    fn coerce_item(&self, ctx: &Context, raw: &dyn Any) -> (Option<T>, Result<(), ValidationErrors>) {
        if let Some(items) = &self.flags().items {
            let mut slot: Option<T> = None;
            let result = items.apply(ctx, raw, &mut slot);
            return (slot, result);
        }

        match classify::<T>(raw) {
            Input::Exact(value) => (Some(value.clone()), Ok(())),
            Input::Null => (None, Err(ValidationError::null(ctx).into())),
            Input::Other(_) => (
                None,
                Err(ValidationError::type_mismatch(ctx, type_name::<T>()).into()),
            ),
        }
    }

    /// Walks `items` up to the maximum length. `Err` means the walk was cut
    /// short and carries every error seen so far.
    fn walk<'a>(
        &self,
        ctx: &Context,
        items: impl IntoIterator<Item = &'a dyn Any>,
    ) -> Result<Walked<T>, ValidationErrors> {
        let mut walked = Walked {
            values: Vec::new(),
            count: 0,
            errors: ValidationErrors::new(),
        };

        for raw in items {
            if self.is_full(walked.count) {
                tracing::debug!(received = walked.count, "slice exceeded max length");
                walked.errors.add(self.max_len_error(ctx));
                return Err(walked.errors);
            }
            let (value, result) = self.item(&ctx.with_index(walked.count), raw);
            walked.count += 1;
            walked.errors.absorb(result);
            walked.values.extend(value);
        }
        Ok(walked)
    }
}

struct Walked<T> {
    values: Vec<T>,
    count: usize,
    errors: ValidationErrors,
}

impl<T: Clone + Send + Sync + 'static> Rule<Vec<T>> for SliceRules<T> {
    fn evaluate(&self, ctx: &Context, value: &Vec<T>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (index, item) in value.iter().enumerate() {
            if self.is_full(index) {
                errors.add(self.max_len_error(ctx));
                return Err(errors);
            }
            if let Some(items) = &self.flags().items {
                errors.absorb(items.evaluate(&ctx.with_index(index), item));
            }
        }

        errors.absorb(self.check_min_len(ctx, value.len()));
        errors.absorb(self.head.evaluate(ctx, value));
        errors.into_result(())
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(self.head.render())
    }
}

impl<T: Clone + Send + Sync + 'static> RuleSet<Vec<T>> for SliceRules<T> {
    fn apply(
        &self,
        ctx: &Context,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), ValidationErrors> {
        if !output.is::<Vec<T>>() && !output.is::<Option<Vec<T>>>() {
            return Err(incompatible_output::<Vec<T>>(ctx).into());
        }

        let walked = match classify::<Vec<T>>(input) {
            Input::Null => return self.flags().presence.on_null::<Vec<T>>(ctx, output),
            Input::Exact(values) => self.walk(ctx, values.iter().map(|v| v as &dyn Any)),
            Input::Other(raw) => {
                if let Some(items) = raw.downcast_ref::<Vec<Item>>() {
                    self.walk(ctx, items.iter().map(|item| &**item as &dyn Any))
                } else if let Some(serde_json::Value::Array(items)) =
                    raw.downcast_ref::<serde_json::Value>()
                {
                    self.walk(ctx, items.iter().map(|item| item as &dyn Any))
                } else {
                    let expected = type_name::<Vec<T>>();
                    return Err(ValidationError::type_mismatch(ctx, expected).into());
                }
            }
        };
        let Walked {
            values,
            count,
            mut errors,
        } = walked?;

        errors.absorb(self.check_min_len(ctx, count));
        errors.absorb(self.head.evaluate(ctx, &values));

        if let Some(slot) = output.downcast_mut::<Vec<T>>() {
            *slot = values;
        } else if let Some(slot) = output.downcast_mut::<Option<Vec<T>>>() {
            *slot = Some(values);
        }
        errors.into_result(())
    }

    fn is_required(&self) -> bool {
        self.flags().presence.required
    }
}

impl<T: Clone + Send + Sync + 'static> fmt::Display for SliceRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head.render())
    }
}
