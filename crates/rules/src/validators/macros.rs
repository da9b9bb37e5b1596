//! Macros that remove the boilerplate shared by rule families.
//!
//! - [`leaf_rule!`]: a built-in leaf rule (struct + `Rule` impl)
//! - [`common_builders!`]: presence and custom-rule builders of a family
//!
//! # Examples
//!
//! ```rust,ignore
//! leaf_rule! {
//!     /// Passes only for even numbers.
//!     pub(crate) Even { divisor: i64 } for i64;
//!     rule(self, input) { input % self.divisor == 0 }
//!     error(self, ctx, input) { ctx.error(ErrorCode::Unknown, "must be even") }
//! }
//! ```

// ============================================================================
// LEAF RULE MACRO
// ============================================================================

/// Creates a leaf rule: struct definition and `Rule` implementation.
///
/// `#[derive(Debug, Clone)]` is always applied.
///
/// # Variants
///
/// **Concrete input**:
/// ```rust,ignore
/// leaf_rule! {
///     pub(crate) MinChars { min: usize } for String;
///     rule(self, input) { input.chars().count() >= self.min }
///     error(self, ctx, input) { ctx.error(ErrorCode::MinLen, "too short") }
/// }
/// ```
///
/// **Generic input** (one parameter, simple bounds):
/// ```rust,ignore
/// leaf_rule! {
///     pub(crate) AtLeast<T: PartialOrd> { min: T } for T;
///     rule(self, input) { *input >= self.min }
///     error(self, ctx, input) { ctx.error(ErrorCode::Min, "too small") }
/// }
/// ```
macro_rules! leaf_rule {
    // ── Variant 1: concrete input ─────────────────────────────────────────
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident { $($field:ident: $fty:ty),+ $(,)? } for $input:ty;
        rule($self_:ident, $inp:ident) $rule:block
        error($self2:ident, $ctx:ident, $einp:ident) $err:block
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $(pub(crate) $field: $fty,)+
        }

        impl $crate::foundation::Rule<$input> for $name {
            #[allow(unused_variables)]
            fn evaluate(
                &$self_,
                $ctx: &$crate::foundation::Context,
                $inp: &$input,
            ) -> Result<(), $crate::foundation::ValidationErrors> {
                if $rule {
                    Ok(())
                } else {
                    let $einp = $inp;
                    Err($err.into())
                }
            }
        }
    };

    // ── Variant 2: generic input ──────────────────────────────────────────
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident<$gen:ident: $first_bound:ident $(+ $rest_bound:ident)*>
            { $($field:ident: $fty:ty),+ $(,)? } for $input:ty;
        rule($self_:ident, $inp:ident) $rule:block
        error($self2:ident, $ctx:ident, $einp:ident) $err:block
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name<$gen> {
            $(pub(crate) $field: $fty,)+
        }

        impl<$gen> $crate::foundation::Rule<$input> for $name<$gen>
        where
            $gen: $first_bound $(+ $rest_bound)* + Send + Sync + 'static,
        {
            #[allow(unused_variables)]
            fn evaluate(
                &$self_,
                $ctx: &$crate::foundation::Context,
                $inp: &$input,
            ) -> Result<(), $crate::foundation::ValidationErrors> {
                if $rule {
                    Ok(())
                } else {
                    let $einp = $inp;
                    Err($err.into())
                }
            }
        }
    };
}

pub(crate) use leaf_rule;

// ============================================================================
// COMMON BUILDERS
// ============================================================================

/// Expands to the builders every family shares, inside the family's
/// `impl` block.
///
/// The family must provide `fn push(&self, Step<$value>, impl FnOnce(&mut
/// Flags)) -> Self`, and its flags a `presence: Presence` field. Pass
/// `strict` to also generate `with_strict`.
macro_rules! common_builders {
    ($value:ty) => {
        /// Requires a value. Null input fails with `Required`.
        pub fn with_required(&self) -> Self {
            self.push(
                $crate::foundation::chain::Step::flag(
                    $crate::foundation::conflict::ConflictType::Required,
                    "with_required()",
                ),
                |flags| flags.presence.required = true,
            )
        }

        /// Accepts null input. An `Option` output is set to `None`.
        pub fn with_nil(&self) -> Self {
            self.push(
                $crate::foundation::chain::Step::flag(
                    $crate::foundation::conflict::ConflictType::Nil,
                    "with_nil()",
                ),
                |flags| flags.presence.nil = true,
            )
        }

        /// Rejects every present value with `Forbidden`; null passes.
        pub fn with_forbidden(&self) -> Self {
            self.push(
                $crate::foundation::chain::Step::builtin(
                    $crate::foundation::conflict::ConflictType::Forbidden,
                    $crate::validators::common::Forbidden,
                    "with_forbidden()",
                ),
                |flags| flags.presence.forbidden = true,
            )
        }

        /// Appends a custom rule.
        ///
        /// The rule coexists with every other rule unless its
        /// [`Rule::replaces`](crate::foundation::Rule::replaces) claims an
        /// older one.
        pub fn with_rule(&self, rule: impl $crate::foundation::Rule<$value>) -> Self {
            let label = format!("with_rule({})", rule.describe());
            self.push(
                $crate::foundation::chain::Step::user(::std::sync::Arc::new(rule), label),
                |_| {},
            )
        }

        /// Appends a closure as a custom rule.
        pub fn with_rule_func<F>(&self, func: F) -> Self
        where
            F: Fn(
                    &$crate::foundation::Context,
                    &$value,
                ) -> Result<(), $crate::foundation::ValidationErrors>
                + Send
                + Sync
                + 'static,
        {
            self.push(
                $crate::foundation::chain::Step::user(
                    ::std::sync::Arc::new($crate::foundation::RuleFunc::new(func)),
                    "with_rule_func(..)",
                ),
                |_| {},
            )
        }
    };

    ($value:ty, strict) => {
        $crate::validators::macros::common_builders!($value);

        /// Accepts only input of the exact target type; nothing is coerced.
        pub fn with_strict(&self) -> Self {
            self.push(
                $crate::foundation::chain::Step::flag(
                    $crate::foundation::conflict::ConflictType::Strict,
                    "with_strict()",
                ),
                |flags| flags.strict = true,
            )
        }
    };
}

pub(crate) use common_builders;
