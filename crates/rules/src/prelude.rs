//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use nebula_rules::prelude::*;
//!
//! let age = int().with_range(0, 150);
//! let name = string().with_min_len(1).with_max_len(64);
//! let tags = slice::<String>().with_item_rules(string().with_min_len(1));
//! ```

// ============================================================================
// FOUNDATION: traits, errors, context
// ============================================================================

pub use crate::foundation::prelude::*;

// ============================================================================
// VALIDATORS: rule families
// ============================================================================

pub use crate::validators::{
    AnyRules, BoolRules, FloatRules, IntRules, Item, SliceInput, SliceOutput, SliceRules,
    StringRules, WrapAny, any, boolean, float32, float64, floating, int, int8, int16, int32,
    int64, integer, slice, string, uint, uint8, uint16, uint32, uint64,
};

// ============================================================================
// NUMERIC: coercion policy
// ============================================================================

pub use crate::numeric::{FloatStyle, Floating, Integer, Rounding};

pub use std::any::Any;
pub use tokio_util::sync::CancellationToken;
