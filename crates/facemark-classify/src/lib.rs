//! Rule-driven semantic face classification.
//!
//! A [`RuleSet`] is data: predicates decide which family a face joins,
//! discriminants put symmetric families in a stable order, and label
//! templates turn sorted positions into names. [`classify_shells`] applies
//! a rule set to every aligned shell.

mod discriminant;
mod engine;
mod predicate;
mod rule;

pub use discriminant::{Discriminant, DiscriminantKind, KeyFn};
pub use engine::{classify_shell, classify_shells, ShellLabels, FALLBACK_FAMILY};
pub use predicate::{Condition, FacePredicate, Quantity};
pub use rule::{
    LabelConfig, LabelTemplate, Rule, RuleConfig, RuleSet, RuleSetConfig, DEFAULT_INDEX_WIDTH,
    DEFAULT_TOLERANCE, INDEX_PLACEHOLDER,
};
