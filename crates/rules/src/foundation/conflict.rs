//! Conflict detection between chain links

use crate::foundation::Rule;

/// The kind of built-in constraint a chain link represents.
///
/// Two links whose tags belong to the same [`family`](ConflictType::family)
/// conflict: appending one elides the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ConflictType {
    /// No built-in kind; user rules and the chain root.
    None,
    Required,
    Nil,
    Strict,
    Forbidden,
    Base,
    Rounding,
    FixedOutput,
    Min,
    MinExclusive,
    Max,
    MaxExclusive,
    MinLen,
    MaxLen,
    Allowed,
    Rejected,
    ItemRules,
    Buffer,
}

impl ConflictType {
    /// Sibling kinds share a family; an exclusive and an inclusive lower
    /// bound are both "the lower bound".
    fn family(self) -> Self {
        match self {
            Self::MinExclusive => Self::Min,
            Self::MaxExclusive => Self::Max,
            other => other,
        }
    }

    /// Returns true if a link tagged `self` supersedes one tagged `other`.
    pub(crate) fn replaces(self, other: Self) -> bool {
        self != Self::None && other != Self::None && self.family() == other.family()
    }
}

/// Decides which existing links a newly appended link supersedes.
pub(crate) enum Checker<'a, T: ?Sized + 'static> {
    /// A built-in constraint; compared by tag only.
    Tag(ConflictType),
    /// A user rule; asked through [`Rule::replaces`].
    Rule(&'a dyn Rule<T>),
    /// Conflicts with nothing.
    Nothing,
}

impl<T: ?Sized + 'static> Checker<'_, T> {
    pub(crate) fn supersedes_tag(&self, tag: ConflictType) -> bool {
        match self {
            Self::Tag(own) => own.replaces(tag),
            Self::Rule(_) | Self::Nothing => false,
        }
    }

    pub(crate) fn supersedes_rule(&self, rule: &dyn Rule<T>) -> bool {
        match self {
            Self::Rule(own) => own.replaces(rule),
            Self::Tag(_) | Self::Nothing => false,
        }
    }
}
