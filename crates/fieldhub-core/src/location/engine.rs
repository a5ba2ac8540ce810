//! Location rule evaluation.
//!
//! A group's rules are a list of rule groups. Rules inside a rule group are
//! combined with AND, rule groups with OR. A group without rules never
//! matches, and neither does a rule whose type is unknown or whose attribute
//! is missing from the context.

use super::context::{ContextValue, LocationContext};
use super::rule::{LocationRule, LocationType};
use super::store::RuleStore;
use crate::error::Result;
use crate::storage::FieldGroupStore;
use std::collections::BTreeSet;
use tracing::{trace, warn};

/// Template value matching records without a page template.
const DEFAULT_TEMPLATE: &str = "default";

/// Rule value of menu, attachment and comment rules matching any value.
const ANY_VALUE: &str = "all";

/// Stores location rules and decides which groups apply to a context.
#[derive(Clone)]
pub struct LocationRuleEngine {
    store: RuleStore,
    groups: FieldGroupStore,
}

impl LocationRuleEngine {
    /// Create an engine over a rule store and the groups it applies to.
    pub fn new(store: RuleStore, groups: FieldGroupStore) -> Self {
        Self { store, groups }
    }

    /// Replace all rules of `group`.
    pub fn save_rules(&self, group: &str, rule_groups: &[Vec<LocationRule>]) -> Result<()> {
        self.store.save_rules(group, rule_groups)
    }

    /// Rule groups of `group` in stored order.
    pub fn get_rules(&self, group: &str) -> Result<Vec<Vec<LocationRule>>> {
        self.store.get_rules(group)
    }

    /// Delete all rules of `group`.
    pub fn delete_rules(&self, group: &str) -> Result<usize> {
        self.store.delete_rules(group)
    }

    /// Check whether `group` applies to `context`.
    ///
    /// Storage failures are logged and treated as no match.
    pub fn matches(&self, group: &str, context: &LocationContext) -> bool {
        match self.store.get_rules(group) {
            Ok(rule_groups) => {
                let matched = evaluate(&rule_groups, context);
                trace!(group, matched, "evaluated location rules");
                matched
            }
            Err(e) => {
                warn!(group, error = %e, "failed to load location rules");
                false
            }
        }
    }

    /// Every existing group whose rules apply to `context`.
    ///
    /// Rules left behind by a group that no longer exists are ignored.
    pub fn active_groups_for(&self, context: &LocationContext) -> BTreeSet<String> {
        let names = match self.groups.group_names() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "failed to list field groups");
                return BTreeSet::new();
            }
        };
        names
            .into_iter()
            .filter(|group| self.matches(group, context))
            .collect()
    }
}

/// OR over rule groups, AND within each. Empty rule groups never match.
pub fn evaluate(rule_groups: &[Vec<LocationRule>], context: &LocationContext) -> bool {
    rule_groups
        .iter()
        .any(|rules| !rules.is_empty() && rules.iter().all(|rule| check_rule(rule, context)))
}

/// Evaluate a single rule.
pub fn check_rule(rule: &LocationRule, context: &LocationContext) -> bool {
    let location_type = &rule.location_type;

    let (actual, expected) = match location_type {
        LocationType::Unknown(_) => return false,
        LocationType::TaxonomyTerm => match rule.taxonomy_term() {
            Some((taxonomy, term)) => (context.get(&format!("taxonomy:{taxonomy}")), term),
            None => return false,
        },
        _ => match location_type.attribute() {
            Some(attribute) => (context.get(attribute), rule.value.as_str()),
            None => return false,
        },
    };

    let hit = match actual {
        Some(value) if location_type.accepts_all() && expected == ANY_VALUE => value.is_present(),
        Some(value) => value.contains(expected),
        None if *location_type == LocationType::PageTemplate => {
            ContextValue::from(DEFAULT_TEMPLATE).contains(expected)
        }
        None => return false,
    };
    rule.operator.apply(hit)
}
