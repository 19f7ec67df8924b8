//! The rule table: an append-only, source-ordered index from [`Name`] to its
//! candidate rules (spec §4.1).

use std::collections::HashMap;

use crate::term::{Name, RuleDef};

/// Ordered index from `Name` to the list of its rules, in source order.
/// Matching walks a name's list from last to first so later-defined rules
/// shadow earlier ones (spec invariant 3). Staged evaluation appends
/// specialised rules through the same `insert` used for user-defined ones
/// (invariant 4), so they always win over their generic parent.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<Name, Vec<RuleDef>>,
}

impl RuleTable {
    pub fn new() -> Self {
        RuleTable::default()
    }

    /// Insert a rule, appending it to its head's candidate list.
    pub fn insert(&mut self, rule: RuleDef) {
        self.rules.entry(rule.head.clone()).or_default().push(rule);
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = RuleDef>) {
        for rule in rules {
            self.insert(rule);
        }
    }

    /// Candidates for `name`, in reverse definition order (later rules
    /// first), matching the driver's iteration order directly.
    pub fn candidates(&self, name: &Name) -> impl Iterator<Item = &RuleDef> {
        self.rules
            .get(name)
            .into_iter()
            .flat_map(|rules| rules.iter().rev())
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Constraint, RuleKind};

    fn rule(head: &str, params: Vec<Constraint>, kind: RuleKind) -> RuleDef {
        RuleDef {
            head: Name::new(head),
            params,
            kind,
            body: Vec::new(),
        }
    }

    #[test]
    fn candidates_are_returned_latest_first() {
        let mut table = RuleTable::new();
        table.insert(rule("dup", vec![], RuleKind::Subst));
        table.insert(rule("dup", vec![Constraint::ByteAny], RuleKind::Subst));

        let heads: Vec<usize> = table.candidates(&Name::new("dup")).map(|r| r.arity()).collect();
        assert_eq!(heads, vec![1, 0], "later rule (arity 1) must come first");
    }

    #[test]
    fn unknown_name_yields_no_candidates() {
        let table = RuleTable::new();
        assert_eq!(table.candidates(&Name::new("missing")).count(), 0);
    }

    #[test]
    fn specialised_rules_append_through_the_same_interface() {
        let mut table = RuleTable::new();
        table.insert(rule("dup", vec![], RuleKind::Gen));
        table.insert(rule("dup__abc123", vec![Constraint::ByteExact(5)], RuleKind::Subst));
        assert_eq!(table.len(), 2);
    }
}
