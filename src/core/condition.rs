// src/core/condition.rs

use crate::core::{collection::Collection, flags::Flag, value::Value};
use std::cell::RefCell;
use std::fmt;
use std::ops::Not;
use std::rc::Rc;

/// A zero-argument boolean callable evaluated at parse time.
pub type Predicate = Rc<dyn Fn() -> bool>;

/// A boolean expression over runtime predicates.
///
/// Leaves wrap closures (usually observing flag or collection state), inner nodes
/// combine them. Keeping the combinators explicit makes activation rules printable
/// and testable without having to call into the closures.
#[derive(Clone)]
pub enum Condition {
    Leaf { label: String, predicate: Predicate },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Wraps an arbitrary closure. The label only shows up in `Debug` output.
    pub fn when(label: impl Into<String>, predicate: impl Fn() -> bool + 'static) -> Self {
        Self::Leaf {
            label: label.into(),
            predicate: Rc::new(predicate),
        }
    }

    /// Fixed truth value, handy for tests and for "always active" hidden nodes.
    pub fn constant(value: bool) -> Self {
        Self::when(value.to_string(), move || value)
    }

    /// True when every condition is true. An empty set is true.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// True when at least one condition is true. An empty set is false.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// True while the flag is activated for the current parse.
    pub fn flag(flag: &Flag) -> Self {
        let flag = flag.clone();
        Self::when(format!("flag {}", flag.name()), move || flag.is_active())
    }

    /// True while the hidden node governed by `activation` is active.
    pub fn activation(label: impl Into<String>, activation: &Activation) -> Self {
        let activation = activation.clone();
        Self::when(label, move || activation.is_active())
    }

    /// True while `collection` holds `value`.
    pub fn contains(collection: &Collection, value: impl Into<Value>) -> Self {
        let collection = collection.clone();
        let value = value.into();
        Self::when(format!("{} in {}", value, collection.name()), move || {
            collection.contains(&value)
        })
    }

    /// True while `collection` holds any of the flag's names.
    pub fn flag_in(collection: &Collection, flag: &Flag) -> Self {
        let collection = collection.clone();
        let flag = flag.clone();
        Self::when(
            format!("{} in {}", flag.name(), collection.name()),
            move || collection.contains_flag(&flag),
        )
    }

    pub fn evaluate(&self) -> bool {
        match self {
            Self::Leaf { predicate, .. } => predicate(),
            Self::And(children) => children.iter().all(Self::evaluate),
            Self::Or(children) => children.iter().any(Self::evaluate),
            Self::Not(child) => !child.evaluate(),
        }
    }
}

impl Not for Condition {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { label, .. } => write!(f, "{}", label),
            Self::And(children) => f.debug_tuple("And").field(children).finish(),
            Self::Or(children) => f.debug_tuple("Or").field(children).finish(),
            Self::Not(child) => f.debug_tuple("Not").field(child).finish(),
        }
    }
}

#[derive(Debug, Default)]
struct ActivationRules {
    active_when: Vec<Condition>,
    inactive_when: Vec<Condition>,
}

/// The activation rules of a hidden node.
///
/// Groups registered with the `set_active_*` methods must all hold, and none of the
/// `set_inactive_*` groups may hold. A node without any group is always active.
/// The handle is shared: clones observe and extend the same rule set, which lets
/// defaults and other nodes depend on whether this node is active.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    rules: Rc<RefCell<ActivationRules>>,
}

impl Activation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_and(&self, conditions: impl IntoIterator<Item = Condition>) {
        self.push_active(Condition::all(conditions));
    }

    pub fn set_active_or(&self, conditions: impl IntoIterator<Item = Condition>) {
        self.push_active(Condition::any(conditions));
    }

    pub fn set_inactive_and(&self, conditions: impl IntoIterator<Item = Condition>) {
        self.push_inactive(Condition::all(conditions));
    }

    pub fn set_inactive_or(&self, conditions: impl IntoIterator<Item = Condition>) {
        self.push_inactive(Condition::any(conditions));
    }

    /// Active when `when` holds, unless any of `but_not` holds.
    pub fn set_active(&self, when: Condition, but_not: impl IntoIterator<Item = Condition>) {
        self.push_active(when);
        self.set_inactive_or(but_not);
    }

    /// Active when every flag in `flags` left its name in `collection`, unless
    /// any flag in `but_not` did.
    pub fn set_active_on_flags_in_collection(
        &self,
        collection: &Collection,
        flags: &[&Flag],
        but_not: &[&Flag],
    ) {
        self.set_active_and(flags.iter().map(|flag| Condition::flag_in(collection, flag)));
        self.set_inactive_or(but_not.iter().map(|flag| Condition::flag_in(collection, flag)));
    }

    /// Inactive when every flag in `flags` left its name in `collection`.
    pub fn set_inactive_on_flags_in_collection(&self, collection: &Collection, flags: &[&Flag]) {
        self.set_inactive_and(flags.iter().map(|flag| Condition::flag_in(collection, flag)));
    }

    pub fn is_active(&self) -> bool {
        // Clone the groups so predicates are free to inspect this handle.
        let (active_when, inactive_when) = {
            let rules = self.rules.borrow();
            (rules.active_when.clone(), rules.inactive_when.clone())
        };
        active_when.iter().all(Condition::evaluate)
            && !inactive_when.iter().any(Condition::evaluate)
    }

    pub fn has_rules(&self) -> bool {
        let rules = self.rules.borrow();
        !rules.active_when.is_empty() || !rules.inactive_when.is_empty()
    }

    /// The rule set as a single expression, for inspection.
    pub fn as_condition(&self) -> Condition {
        let rules = self.rules.borrow();
        Condition::all(
            rules
                .active_when
                .iter()
                .cloned()
                .chain(std::iter::once(!Condition::any(
                    rules.inactive_when.iter().cloned(),
                ))),
        )
    }

    fn push_active(&self, condition: Condition) {
        if !is_empty_group(&condition) {
            self.rules.borrow_mut().active_when.push(condition);
        }
    }

    fn push_inactive(&self, condition: Condition) {
        if !is_empty_group(&condition) {
            self.rules.borrow_mut().inactive_when.push(condition);
        }
    }
}

fn is_empty_group(condition: &Condition) -> bool {
    matches!(condition, Condition::And(c) | Condition::Or(c) if c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_combinators() {
        let t = Condition::constant(true);
        let f = Condition::constant(false);
        assert!(Condition::all([t.clone(), t.clone()]).evaluate());
        assert!(!Condition::all([t.clone(), f.clone()]).evaluate());
        assert!(Condition::any([f.clone(), t.clone()]).evaluate());
        assert!(!Condition::any([f.clone(), f.clone()]).evaluate());
        assert!((!f).evaluate());
        assert!(Condition::all(Vec::<Condition>::new()).evaluate());
        assert!(!Condition::any(Vec::<Condition>::new()).evaluate());
    }

    #[test]
    fn test_leaf_is_reevaluated_each_time() {
        let switch = Rc::new(Cell::new(false));
        let observed = switch.clone();
        let condition = Condition::when("switch", move || observed.get());
        assert!(!condition.evaluate());
        switch.set(true);
        assert!(condition.evaluate());
    }

    #[test]
    fn test_activation_without_rules_is_active() {
        let activation = Activation::new();
        assert!(!activation.has_rules());
        assert!(activation.is_active());
    }

    #[test]
    fn test_activation_active_but_not() {
        let main = Rc::new(Cell::new(true));
        let veto = Rc::new(Cell::new(false));
        let activation = Activation::new();
        let (m, v) = (main.clone(), veto.clone());
        activation.set_active(
            Condition::when("main", move || m.get()),
            [Condition::when("veto", move || v.get())],
        );
        assert!(activation.is_active());
        veto.set(true);
        assert!(!activation.is_active());
        veto.set(false);
        main.set(false);
        assert!(!activation.is_active());
    }

    #[test]
    fn test_groups_compose_by_and() {
        let activation = Activation::new();
        activation.set_active_or([Condition::constant(false), Condition::constant(true)]);
        activation.set_active_and([Condition::constant(true)]);
        assert!(activation.is_active());
        activation.set_active_and([Condition::constant(false)]);
        assert!(!activation.is_active());
    }

    #[test]
    fn test_empty_inactive_and_group_is_ignored() {
        let activation = Activation::new();
        activation.set_inactive_and(Vec::<Condition>::new());
        assert!(activation.is_active());
    }

    #[test]
    fn test_as_condition_matches_is_active() {
        let activation = Activation::new();
        activation.set_active_and([Condition::constant(true)]);
        activation.set_inactive_or([Condition::constant(true)]);
        assert_eq!(activation.as_condition().evaluate(), activation.is_active());
        assert!(format!("{:?}", activation.as_condition()).contains("Not"));
    }
}
