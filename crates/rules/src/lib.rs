//! # nebula-rules
//!
//! Composable value validation and type coercion for the Nebula workflow
//! engine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nebula_rules::prelude::*;
//!
//! let port = int().with_min(1).with_max(65_535);
//! let mut out = 0_i64;
//! port.apply(&Context::new(), &"8080", &mut out)?;
//! assert_eq!(out, 8080);
//! ```
//!
//! ## Rule Chains
//!
//! Every builder call returns a new chain and leaves the old one intact.
//! Adding a constraint of a kind the chain already has replaces the older
//! one, and the rendered chain shows only what will run:
//!
//! ```rust,ignore
//! let rules = int().with_min(3).with_max(10).with_min(2);
//! assert_eq!(rules.to_string(), "int().with_max(10).with_min(2)");
//! ```
//!
//! ## Coercion
//!
//! `apply` converts the input to the family's type without losing
//! information, writes the result into the output (the value, an `Option`
//! of it, or its `String` rendering), then runs the rules. See
//! [`numeric`] for the conversion table.
//!
//! ## Streaming
//!
//! [`SliceRules::apply_stream`](validators::SliceRules::apply_stream)
//! validates sequences item by item over bounded channels and stops as soon
//! as the context is cancelled.

// ValidationError is passed by value through every rule; boxing it would
// cost an allocation per failure.
#![allow(clippy::result_large_err)]

pub mod foundation;
pub mod numeric;
pub mod prelude;
pub mod validators;
