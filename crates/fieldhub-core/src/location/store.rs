//! Persistent storage for location rules.
//!
//! Key layout: `group 0x00 rule_group_index(u32 BE) rule_order_index(u32 BE)`.
//! Values are JSON-encoded [`LocationRule`]s.

use super::rule::LocationRule;
use crate::error::{Error, Result};
use crate::storage::naming::validate_name;
use crate::storage::StorageEngine;
use sled::Batch;
use tracing::debug;

const KEY_SEPARATOR: u8 = 0x00;

fn group_prefix(group: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(group.len() + 1);
    prefix.extend_from_slice(group.as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix
}

fn rule_key(group: &str, rule_group: u32, order: u32) -> Vec<u8> {
    let mut key = group_prefix(group);
    key.extend_from_slice(&rule_group.to_be_bytes());
    key.extend_from_slice(&order.to_be_bytes());
    key
}

/// Split a key into `(group, rule_group_index, rule_order_index)`.
fn decode_key(key: &[u8]) -> Option<(&str, u32, u32)> {
    let split = key.iter().position(|&b| b == KEY_SEPARATOR)?;
    let (group, rest) = key.split_at(split);
    let rest = &rest[1..];
    if rest.len() != 8 {
        return None;
    }
    let rule_group = u32::from_be_bytes(rest[..4].try_into().ok()?);
    let order = u32::from_be_bytes(rest[4..].try_into().ok()?);
    Some((std::str::from_utf8(group).ok()?, rule_group, order))
}

fn index(i: usize) -> Result<u32> {
    u32::try_from(i).map_err(|_| Error::InvalidRule(format!("too many rules: {i}")))
}

/// Store for location rules, grouped by field group.
#[derive(Clone)]
pub struct RuleStore {
    tree: sled::Tree,
}

impl RuleStore {
    /// Tree name for location rules.
    pub const TREE_NAME: &'static str = "location:rules";

    /// Open the store, creating its table if absent.
    pub fn open(engine: &StorageEngine) -> Result<Self> {
        Ok(Self {
            tree: engine.open_table(Self::TREE_NAME)?,
        })
    }

    /// Replace every rule of `group` in one atomic batch.
    ///
    /// Empty rule groups are dropped. Saving an empty list deletes the rules.
    pub fn save_rules(&self, group: &str, rule_groups: &[Vec<LocationRule>]) -> Result<()> {
        validate_name(group)?;

        let mut batch = Batch::default();
        for key in self.tree.scan_prefix(group_prefix(group)).keys() {
            batch.remove(key?);
        }

        let mut saved = 0;
        for (group_index, rules) in rule_groups.iter().filter(|g| !g.is_empty()).enumerate() {
            for (order, rule) in rules.iter().enumerate() {
                rule.validate()?;
                let value =
                    serde_json::to_vec(rule).map_err(|e| Error::Serialization(e.to_string()))?;
                batch.insert(rule_key(group, index(group_index)?, index(order)?), value);
                saved += 1;
            }
        }

        self.tree.apply_batch(batch)?;
        debug!(group, rules = saved, "saved location rules");
        Ok(())
    }

    /// Rule groups of `group` in stored order.
    pub fn get_rules(&self, group: &str) -> Result<Vec<Vec<LocationRule>>> {
        validate_name(group)?;

        let mut rule_groups: Vec<Vec<LocationRule>> = Vec::new();
        let mut current = None;

        for item in self.tree.scan_prefix(group_prefix(group)) {
            let (key, value) = item?;
            let (_, group_index, _) = decode_key(&key).ok_or_else(|| {
                Error::Deserialization(format!("malformed rule key for group {group}"))
            })?;
            let rule: LocationRule = serde_json::from_slice(&value)
                .map_err(|e| Error::Deserialization(e.to_string()))?;

            if current != Some(group_index) {
                rule_groups.push(Vec::new());
                current = Some(group_index);
            }
            if let Some(rules) = rule_groups.last_mut() {
                rules.push(rule);
            }
        }
        Ok(rule_groups)
    }

    /// Delete every rule of `group`. Returns the number of rules removed.
    pub fn delete_rules(&self, group: &str) -> Result<usize> {
        validate_name(group)?;

        let mut batch = Batch::default();
        let mut removed = 0;
        for key in self.tree.scan_prefix(group_prefix(group)).keys() {
            batch.remove(key?);
            removed += 1;
        }
        self.tree.apply_batch(batch)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationType;

    fn test_store() -> RuleStore {
        let engine = StorageEngine::open(crate::storage::StorageConfig::temporary()).unwrap();
        RuleStore::open(&engine).unwrap()
    }

    fn record_type(value: &str) -> LocationRule {
        LocationRule::equals(LocationType::RecordType, value)
    }

    #[test]
    fn test_key_layout() {
        let key = rule_key("hero", 1, 2);
        assert_eq!(&key[..5], b"hero\0");
        assert_eq!(&key[5..], &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(decode_key(&key), Some(("hero", 1, 2)));
        assert_eq!(decode_key(b"hero"), None);
    }

    #[test]
    fn test_save_and_get_preserves_order() {
        let store = test_store();
        let rules = vec![
            vec![record_type("post"), LocationRule::not_equals(LocationType::UserRole, "guest")],
            vec![record_type("page")],
        ];
        store.save_rules("hero", &rules).unwrap();
        assert_eq!(store.get_rules("hero").unwrap(), rules);
        assert!(store.get_rules("footer").unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces() {
        let store = test_store();
        store
            .save_rules("hero", &[vec![record_type("post")], vec![record_type("page")]])
            .unwrap();
        store.save_rules("hero", &[vec![record_type("product")]]).unwrap();
        assert_eq!(
            store.get_rules("hero").unwrap(),
            vec![vec![record_type("product")]]
        );

        store.save_rules("hero", &[]).unwrap();
        assert!(store.get_rules("hero").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_rule_leaves_rules_untouched() {
        let store = test_store();
        store.save_rules("hero", &[vec![record_type("post")]]).unwrap();

        let err = store
            .save_rules(
                "hero",
                &[vec![LocationRule::equals(LocationType::TaxonomyTerm, "12")]],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRule(_)));
        assert_eq!(store.get_rules("hero").unwrap(), vec![vec![record_type("post")]]);
    }

    #[test]
    fn test_group_prefix_isolation() {
        let store = test_store();
        store.save_rules("hero", &[vec![record_type("post")]]).unwrap();
        store.save_rules("hero_banner", &[vec![record_type("page")]]).unwrap();

        assert_eq!(store.get_rules("hero").unwrap(), vec![vec![record_type("post")]]);

        assert_eq!(store.delete_rules("hero").unwrap(), 1);
        assert!(store.get_rules("hero").unwrap().is_empty());
        assert_eq!(store.get_rules("hero_banner").unwrap(), vec![vec![record_type("page")]]);
    }

    #[test]
    fn test_empty_rule_groups_dropped() {
        let store = test_store();
        store
            .save_rules("hero", &[Vec::new(), vec![record_type("post")]])
            .unwrap();
        assert_eq!(store.get_rules("hero").unwrap(), vec![vec![record_type("post")]]);
    }

    #[test]
    fn test_invalid_group_name_rejected() {
        let store = test_store();
        store
            .save_rules("hero", &[vec![record_type("post")], vec![record_type("page")]])
            .unwrap();

        // "hero\0" is a byte prefix of hero's keys.
        assert!(matches!(store.get_rules("hero\0"), Err(Error::InvalidName(_))));
        assert!(matches!(store.delete_rules("hero\0"), Err(Error::InvalidName(_))));
        assert_eq!(store.get_rules("hero").unwrap().len(), 2);
    }
}
