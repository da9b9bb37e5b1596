//! Validation context: error path attribution and cancellation
//!
//! A [`Context`] is cheap to clone. Appending a path segment allocates one
//! small node that points at its parent, so nested validators can derive
//! child contexts per element without copying the whole path.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::foundation::{ErrorCode, ValidationError};

#[derive(Debug)]
enum Segment {
    Field(Cow<'static, str>),
    Index(usize),
}

#[derive(Debug)]
struct PathNode {
    parent: Option<Arc<PathNode>>,
    segment: Segment,
}

/// Carries the location being validated and a cooperative cancellation
/// token.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_rules::foundation::Context;
///
/// let ctx = Context::new().with_field("tags").with_index(3);
/// assert_eq!(ctx.path().as_deref(), Some("tags[3]"));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    path: Option<Arc<PathNode>>,
    cancellation: CancellationToken,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.path())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl Context {
    /// Creates a root context with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns a child context for a named field.
    #[must_use]
    pub fn with_field(&self, name: impl Into<Cow<'static, str>>) -> Self {
        self.push(Segment::Field(name.into()))
    }

    /// Returns a child context for a sequence element.
    #[must_use]
    pub fn with_index(&self, index: usize) -> Self {
        self.push(Segment::Index(index))
    }

    fn push(&self, segment: Segment) -> Self {
        Self {
            path: Some(Arc::new(PathNode {
                parent: self.path.clone(),
                segment,
            })),
            cancellation: self.cancellation.clone(),
        }
    }

    /// Renders the current path (`items[2].name`), or `None` at the root.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        let mut segments = Vec::new();
        let mut node = self.path.as_deref();
        while let Some(n) = node {
            segments.push(&n.segment);
            node = n.parent.as_deref();
        }
        if segments.is_empty() {
            return None;
        }

        let mut out = String::new();
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        Some(out)
    }

    /// The cancellation token shared by this context and its children.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns true once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Builds an error attributed to this context's path.
    pub fn error(&self, code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ValidationError {
        ValidationError::in_context(self, code, message)
    }
}
