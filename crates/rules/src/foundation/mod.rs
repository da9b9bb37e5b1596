//! Core validation types and traits
//!
//! This module contains the building blocks every rule family is made of:
//!
//! - **Traits**: [`Rule`], [`RuleSet`]
//! - **Errors**: [`ValidationError`], [`ValidationErrors`], [`ErrorCode`],
//!   [`BuildError`]
//! - **Context**: [`Context`], carrying the error path and cancellation
//!
//! # Architecture
//!
//! ## 1. Persistent chains
//!
//! Every typed rule set is a chain of immutable links. Builder calls return
//! a new chain and never touch the old one:
//!
//! ```rust,ignore
//! use nebula_rules::prelude::*;
//!
//! let base = int().with_min(0);
//! let small = base.with_max(10);
//! let large = base.with_max(1_000);
//!
//! assert_eq!(base.to_string(), "int().with_min(0)");
//! assert_eq!(small.to_string(), "int().with_min(0).with_max(10)");
//! ```
//!
//! ## 2. Conflict resolution
//!
//! Appending a constraint of a kind already present replaces the older one,
//! so the chain never holds two minimums:
//!
//! ```rust,ignore
//! let rules = int().with_min(3).with_max(10).with_min(2);
//! assert_eq!(rules.to_string(), "int().with_max(10).with_min(2)");
//! ```
//!
//! ## 3. Accumulated errors
//!
//! Every rule in a chain runs; all failures come back together, each
//! attributed to the path of the failing value.

pub(crate) mod chain;
pub(crate) mod conflict;
pub mod context;
pub mod error;
pub mod traits;

pub use context::Context;
pub use error::{BuildError, ErrorCode, ValidationError, ValidationErrors};
pub use traits::{Rule, RuleFunc, RuleSet, is_rule, rule_func};

/// A validation result that can contain multiple errors.
pub type ValidationResult<T = ()> = Result<T, ValidationErrors>;

/// Common imports for working with the foundation.
pub mod prelude {
    pub use super::{
        BuildError, Context, ErrorCode, Rule, RuleSet, ValidationError, ValidationErrors,
        ValidationResult, is_rule, rule_func,
    };
}
