//! Location rules: deciding which field groups apply to a context.

mod context;
mod engine;
mod rule;
mod store;

pub use context::{ContextValue, LocationContext};
pub use engine::{check_rule, evaluate, LocationRuleEngine};
pub use rule::{LocationRule, LocationType, Operator};
pub use store::RuleStore;
