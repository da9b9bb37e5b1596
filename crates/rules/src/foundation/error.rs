//! Error types for validation failures
//!
//! Every failure carries an [`ErrorCode`] for programmatic handling, a
//! human-readable message, and the path of the value inside the input
//! (`items[2].name`) when the error was produced below the top level.
//!
//! All string fields use `Cow<'static, str>` so static codes and messages
//! never allocate.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::foundation::Context;

// ============================================================================
// ERROR CODE
// ============================================================================

/// The kind of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The input could not be converted to the target type without loss.
    Coercion,
    /// The input is outside the representable range of the target type.
    Range,
    /// Below an inclusive minimum.
    Min,
    /// Above an inclusive maximum.
    Max,
    /// Not strictly above an exclusive minimum.
    MinExclusive,
    /// Not strictly below an exclusive maximum.
    MaxExclusive,
    /// Fewer elements or characters than required.
    MinLen,
    /// More elements or characters than allowed.
    MaxLen,
    /// A required value is missing.
    Required,
    /// A null value was supplied where null is not allowed.
    Null,
    /// A value was supplied where none is allowed.
    Forbidden,
    /// The value is not in the allow list.
    NotAllowed,
    /// The value is in the deny list.
    Denied,
    /// The value does not match a pattern.
    Pattern,
    /// The caller broke the API contract (e.g. an incompatible output).
    Internal,
    /// The surrounding context was cancelled.
    Cancelled,
    /// Default code for custom rules.
    Unknown,
}

impl ErrorCode {
    /// Stable string form of the code, suitable for i18n lookups.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coercion => "coercion",
            Self::Range => "range",
            Self::Min => "min",
            Self::Max => "max",
            Self::MinExclusive => "min_exclusive",
            Self::MaxExclusive => "max_exclusive",
            Self::MinLen => "min_len",
            Self::MaxLen => "max_len",
            Self::Required => "required",
            Self::Null => "null",
            Self::Forbidden => "forbidden",
            Self::NotAllowed => "not_allowed",
            Self::Denied => "denied",
            Self::Pattern => "pattern",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// A single coded validation failure.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::foundation::{Context, ErrorCode, ValidationError};
///
/// let ctx = Context::new().with_field("age");
/// let error = ctx
///     .error(ErrorCode::Min, "value must be at least 18")
///     .with_param("min", "18");
///
/// assert_eq!(error.path.as_deref(), Some("age"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Error code for programmatic handling.
    pub code: ErrorCode,

    /// Human-readable message in English.
    pub message: Cow<'static, str>,

    /// Location of the failing value, e.g. `items[2]` or `user.email`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Message template parameters (typically 0-2).
    #[serde(skip_serializing_if = "SmallVec::is_empty")]
    pub params: SmallVec<[(Cow<'static, str>, String); 2]>,
}

impl ValidationError {
    /// Creates an error without a path.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            params: SmallVec::new(),
        }
    }

    /// Creates an error attributed to the current path of `ctx`.
    pub fn in_context(
        ctx: &Context,
        code: ErrorCode,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let error = Self::new(code, message);
        match ctx.path() {
            Some(path) => error.with_path(path),
            None => error,
        }
    }

    /// Sets the path of this error.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a message parameter.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_param(mut self, key: impl Into<Cow<'static, str>>, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Looks up a parameter value by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] {}: {}", path, self.code, self.message)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// CONVENIENCE CONSTRUCTORS
// ============================================================================

impl ValidationError {
    /// A missing required value.
    pub fn required(ctx: &Context) -> Self {
        Self::in_context(ctx, ErrorCode::Required, "value is required")
    }

    /// A null value where null is not allowed.
    pub fn null(ctx: &Context) -> Self {
        Self::in_context(ctx, ErrorCode::Null, "value must not be null")
    }

    /// Output location that cannot receive the coerced value.
    pub fn internal(ctx: &Context, message: impl Into<Cow<'static, str>>) -> Self {
        Self::in_context(ctx, ErrorCode::Internal, message)
    }

    /// The surrounding context was cancelled.
    pub fn cancelled(ctx: &Context) -> Self {
        Self::in_context(ctx, ErrorCode::Cancelled, "validation was cancelled")
    }

    /// Input of the wrong type for a strict or non-coercing rule set.
    pub fn type_mismatch(ctx: &Context, expected: &'static str) -> Self {
        Self::in_context(ctx, ErrorCode::Coercion, format!("expected {expected}"))
            .with_param("expected", expected)
    }
}

// ============================================================================
// ERROR COLLECTION
// ============================================================================

/// All errors produced by one `apply` or `evaluate` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Adds an error to the collection.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Moves every error of `other` into this collection.
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Merges the error side of a result, if any.
    pub fn absorb(&mut self, result: Result<(), Self>) {
        if let Err(errors) = result {
            self.merge(errors);
        }
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns all errors in the order they were produced.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Returns the first error, if any.
    #[must_use]
    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// Returns the code of every error in order.
    #[must_use]
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    /// Returns the errors attributed to exactly `path`.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors
            .iter()
            .filter(move |e| e.path.as_deref() == Some(path))
    }

    /// `Ok(value)` when empty, `Err(self)` otherwise.
    #[must_use = "result must be used"]
    pub fn into_result<T>(self, ok_value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(ok_value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// BUILD ERRORS
// ============================================================================

/// Misuse of a chain builder, detected while the chain is being built.
///
/// The panicking `with_*` builders report these through `panic!`; the
/// `try_with_*` variants return them.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A range builder got a minimum greater than its maximum.
    #[error("inverted range: minimum {min} is greater than maximum {max}")]
    InvertedRange {
        /// Rendered minimum.
        min: String,
        /// Rendered maximum.
        max: String,
    },

    /// A pattern literal failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An integer base outside `2..=36`.
    #[error("invalid base {0}: must be between 2 and 36")]
    InvalidBase(u32),
}

// ============================================================================
// TESTS
// ============================================================================
