//! Persistent rule chains
//!
//! A chain is a singly linked list of [`Link`]s from the newest constraint
//! (the head) back to a root. Links are never mutated: each builder call
//! allocates a new head whose parent is the old head with every conflicting
//! ancestor elided. Unchanged suffixes are shared between chains through
//! `Arc`, so deriving many chains from one base is cheap and the base stays
//! valid.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::foundation::conflict::{Checker, ConflictType};
use crate::foundation::{Context, Rule, ValidationErrors};

/// One constraint of a chain plus the family flags in effect at this point.
pub(crate) struct Link<T: ?Sized, F> {
    parent: Option<Arc<Link<T, F>>>,
    rule: Option<Arc<dyn Rule<T>>>,
    flags: F,
    conflict: ConflictType,
    label: Cow<'static, str>,
}

/// The parts of a new link supplied by a builder.
pub(crate) struct Step<T: ?Sized> {
    pub(crate) conflict: ConflictType,
    pub(crate) rule: Option<Arc<dyn Rule<T>>>,
    pub(crate) label: Cow<'static, str>,
}

impl<T: ?Sized + 'static> Step<T> {
    /// A flag-only step for a built-in constraint.
    pub(crate) fn flag(conflict: ConflictType, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            conflict,
            rule: None,
            label: label.into(),
        }
    }

    /// A built-in constraint backed by a rule.
    pub(crate) fn builtin(
        conflict: ConflictType,
        rule: impl Rule<T>,
        label: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            conflict,
            rule: Some(Arc::new(rule)),
            label: label.into(),
        }
    }

    /// A user rule, deduplicated only through [`Rule::replaces`].
    pub(crate) fn user(rule: Arc<dyn Rule<T>>, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            conflict: ConflictType::None,
            rule: Some(rule),
            label: label.into(),
        }
    }
}

impl<T: ?Sized + 'static, F: Clone> Link<T, F> {
    /// Creates a chain root. The label is the family's factory expression.
    pub(crate) fn root(flags: F, label: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            rule: None,
            flags,
            conflict: ConflictType::None,
            label: label.into(),
        })
    }

    /// Flags in effect at this link.
    pub(crate) fn flags(&self) -> &F {
        &self.flags
    }

    /// Appends `step` to the chain ending at `head`, with `edit` applied to a
    /// copy of the head's flags.
    pub(crate) fn push(head: &Arc<Self>, step: Step<T>, edit: impl FnOnce(&mut F)) -> Arc<Self> {
        let checker = if step.conflict == ConflictType::None {
            match &step.rule {
                Some(rule) => Checker::Rule(rule.as_ref()),
                None => Checker::Nothing,
            }
        } else {
            Checker::Tag(step.conflict)
        };

        let parent = Self::resolve(head, &checker);
        let mut flags = head.flags.clone();
        edit(&mut flags);

        Arc::new(Self {
            parent,
            rule: step.rule,
            flags,
            conflict: step.conflict,
            label: step.label,
        })
    }

    /// Returns the chain ending at `node` with every link superseded by
    /// `checker` removed. Links above the last removed one are reused as-is.
    pub(crate) fn resolve(node: &Arc<Self>, checker: &Checker<'_, T>) -> Option<Arc<Self>> {
        let superseded = checker.supersedes_tag(node.conflict)
            || node
                .rule
                .as_deref()
                .is_some_and(|rule| checker.supersedes_rule(rule));

        if superseded {
            tracing::trace!(label = %node.label, "eliding superseded chain link");
            return node
                .parent
                .as_ref()
                .and_then(|parent| Self::resolve(parent, checker));
        }

        let Some(parent) = &node.parent else {
            return Some(Arc::clone(node));
        };

        let resolved = Self::resolve(parent, checker);
        if resolved
            .as_ref()
            .is_some_and(|resolved| Arc::ptr_eq(resolved, parent))
        {
            return Some(Arc::clone(node));
        }

        Some(Arc::new(Self {
            parent: resolved,
            rule: node.rule.clone(),
            flags: node.flags.clone(),
            conflict: node.conflict,
            label: node.label.clone(),
        }))
    }

    /// Runs every rule from the head toward the root, accumulating errors.
    pub(crate) fn evaluate(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for link in self.iter() {
            if let Some(rule) = &link.rule {
                errors.absorb(rule.evaluate(ctx, value));
            }
        }
        errors.into_result(())
    }

    /// Returns true if any link carries a rule.
    pub(crate) fn has_rules(&self) -> bool {
        self.iter().any(|link| link.rule.is_some())
    }

    /// Renders the chain from root to head, joined with `.`.
    pub(crate) fn render(&self) -> String {
        let mut labels: Vec<&str> = self.iter().map(|link| link.label.as_ref()).collect();
        labels.reverse();
        labels.join(".")
    }

    fn iter(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |link| link.parent.as_deref())
    }
}

// ============================================================================
// SHARED ROOTS
// ============================================================================

type Registry = RwLock<HashMap<(TypeId, &'static str), Box<dyn Any + Send + Sync>>>;

/// Returns the process-wide base chain of type `R` registered under `name`,
/// creating it on first use.
///
/// Generic factories such as `slice::<T>()` cannot own a `static` per `T`,
/// so base chains are kept in one registry. The name separates factories
/// that share a type, like `int()` and `int64()`.
pub(crate) fn shared_root<R>(name: &'static str, init: impl FnOnce() -> R) -> R
where
    R: Clone + Send + Sync + 'static,
{
    static ROOTS: OnceLock<Registry> = OnceLock::new();
    let roots = ROOTS.get_or_init(Registry::default);

    let key = (TypeId::of::<R>(), name);
    if let Some(root) = roots.read().get(&key).and_then(|root| root.downcast_ref::<R>()) {
        return root.clone();
    }

    let mut roots = roots.write();
    if let Some(root) = roots.get(&key).and_then(|root| root.downcast_ref::<R>()) {
        return root.clone();
    }
    let root = init();
    roots.insert(key, Box::new(root.clone()));
    root
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::{ErrorCode, is_rule};

    #[derive(Clone, Default)]
    struct Flags {
        required: bool,
    }

    struct Fail(&'static str);

    impl Rule<i32> for Fail {
        fn evaluate(&self, ctx: &Context, _value: &i32) -> Result<(), ValidationErrors> {
            Err(ctx.error(ErrorCode::Unknown, self.0).into())
        }
    }

    struct Unique;

    impl Rule<i32> for Unique {
        fn evaluate(&self, _ctx: &Context, _value: &i32) -> Result<(), ValidationErrors> {
            Ok(())
        }

        fn replaces(&self, other: &dyn Rule<i32>) -> bool {
            is_rule::<Self, i32>(other)
        }
    }

    type TestLink = Link<i32, Flags>;

    fn root() -> Arc<TestLink> {
        TestLink::root(Flags::default(), "root()")
    }

    #[test]
    fn test_push_keeps_unrelated_ancestors_shared() {
        let base = TestLink::push(&root(), Step::flag(ConflictType::Min, "with_min(1)"), |_| {});
        let next = TestLink::push(&base, Step::flag(ConflictType::Max, "with_max(9)"), |_| {});

        let parent = next.parent.as_ref().unwrap();
        assert!(Arc::ptr_eq(parent, &base));
        assert_eq!(next.render(), "root().with_min(1).with_max(9)");
    }

    #[test]
    fn test_conflicting_link_is_elided_and_descendants_cloned() {
        let a = TestLink::push(&root(), Step::flag(ConflictType::Min, "with_min(1)"), |_| {});
        let b = TestLink::push(&a, Step::flag(ConflictType::Max, "with_max(9)"), |_| {});
        let c = TestLink::push(
            &b,
            Step::flag(ConflictType::MinExclusive, "with_min_exclusive(2)"),
            |_| {},
        );

        assert_eq!(c.render(), "root().with_max(9).with_min_exclusive(2)");
        // The older chain still renders the elided link.
        assert_eq!(b.render(), "root().with_min(1).with_max(9)");
        // `with_max(9)` was cloned onto a new parent, not reused.
        assert!(!Arc::ptr_eq(c.parent.as_ref().unwrap(), &b));
    }

    #[test]
    fn test_flags_copied_forward() {
        let step = Step::flag(ConflictType::Required, "with_required()");
        let a = TestLink::push(&root(), step, |f| f.required = true);
        let b = TestLink::push(&a, Step::flag(ConflictType::Max, "with_max(9)"), |_| {});
        assert!(b.flags().required);
        assert!(!root().flags().required);
    }

    #[test]
    fn test_resolving_away_root_yields_empty_chain() {
        let lone: Arc<TestLink> = Arc::new(Link {
            parent: None,
            rule: None,
            flags: Flags::default(),
            conflict: ConflictType::Min,
            label: "with_min(1)".into(),
        });
        assert!(TestLink::resolve(&lone, &Checker::Tag(ConflictType::Min)).is_none());
    }

    #[test]
    fn test_user_rules_coexist_and_all_run() {
        let a = TestLink::push(&root(), Step::user(Arc::new(Fail("first")), "a"), |_| {});
        let b = TestLink::push(&a, Step::user(Arc::new(Fail("second")), "b"), |_| {});

        let errors = b.evaluate(&Context::new(), &0).unwrap_err();
        let messages: Vec<_> = errors.errors().iter().map(|e| e.message.to_string()).collect();
        // Head first.
        assert_eq!(messages, vec!["second", "first"]);
    }

    #[test]
    fn test_user_rule_replaces() {
        let a = TestLink::push(&root(), Step::user(Arc::new(Unique), "unique"), |_| {});
        let b = TestLink::push(&a, Step::user(Arc::new(Fail("x")), "fail"), |_| {});
        let c = TestLink::push(&b, Step::user(Arc::new(Unique), "unique"), |_| {});
        assert_eq!(c.render(), "root().fail.unique");
        assert!(c.has_rules());
        assert!(!root().has_rules());
    }

    #[test]
    fn test_shared_root_is_singleton() {
        #[derive(Clone)]
        struct Base(Arc<TestLink>);

        let first = shared_root("root", || Base(root()));
        let second = shared_root("root", || Base(root()));
        let other = shared_root("other", || Base(root()));
        assert!(Arc::ptr_eq(&first.0, &second.0));
        assert!(!Arc::ptr_eq(&first.0, &other.0));
    }
}
