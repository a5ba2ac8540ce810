//! Migration runner.
//!
//! Applies pending migrations in batches, rolls back the most recent batch,
//! and reports per-migration status.

use super::error::MigrationError;
use super::ledger::{LedgerEntry, MigrationLedger};
use super::source::MigrationSource;
use super::unit::Migration;
use crate::storage::FieldGroupStore;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Direction a migration was run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `up` step.
    Up,
    /// `down` step.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Whether a migration step succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The step completed.
    Success,
    /// The step failed.
    Error,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "success"),
            OutcomeStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of running one migration step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MigrationOutcome {
    /// Migration id.
    pub id: String,
    /// Step direction.
    pub direction: Direction,
    /// Step result.
    pub status: OutcomeStatus,
    /// Human-readable detail.
    pub message: String,
}

impl MigrationOutcome {
    fn success(id: &str, direction: Direction) -> Self {
        let message = match direction {
            Direction::Up => "migrated",
            Direction::Down => "rolled back",
        };
        Self {
            id: id.to_string(),
            direction,
            status: OutcomeStatus::Success,
            message: message.to_string(),
        }
    }

    fn error(id: &str, direction: Direction, message: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            direction,
            status: OutcomeStatus::Error,
            message: message.into(),
        }
    }

    /// Check whether the step succeeded.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Result of a `migrate`, `rollback` or `reset` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MigrationBatchResult {
    /// Batch the run applied or reverted, if any.
    pub batch: Option<u64>,
    /// One outcome per attempted step, in execution order.
    pub outcomes: Vec<MigrationOutcome>,
    /// Informational message for runs with nothing to do.
    pub message: Option<String>,
}

impl MigrationBatchResult {
    fn nothing_to_do(message: &str) -> Self {
        Self {
            batch: None,
            outcomes: Vec::new(),
            message: Some(message.to_string()),
        }
    }

    /// Check whether any step failed.
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|o| !o.is_success())
    }

    /// Ids of the steps that succeeded.
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.id.as_str())
            .collect()
    }

    /// First failed step, if any.
    pub fn first_error(&self) -> Option<&MigrationOutcome> {
        self.outcomes.iter().find(|o| !o.is_success())
    }
}

/// Status of one discovered migration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MigrationStatusEntry {
    /// Migration id.
    pub id: String,
    /// Whether the migration is recorded as executed.
    pub executed: bool,
    /// Batch it was applied in.
    pub batch: Option<u64>,
    /// When it was applied (microseconds since epoch).
    pub executed_at: Option<u64>,
    /// The unit's content changed since it was applied.
    pub modified: bool,
}

/// Runs migration units against a field group store.
pub struct MigrationRunner {
    store: FieldGroupStore,
    ledger: MigrationLedger,
    source: Box<dyn MigrationSource>,
}

impl MigrationRunner {
    /// Create a runner.
    pub fn new(
        store: FieldGroupStore,
        ledger: MigrationLedger,
        source: impl MigrationSource + 'static,
    ) -> Self {
        Self {
            store,
            ledger,
            source: Box::new(source),
        }
    }

    /// The ledger this runner records into.
    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Load units sorted by id, rejecting empty or duplicate ids.
    fn units(&self) -> Result<Vec<Arc<dyn Migration>>, MigrationError> {
        let mut units = self.source.load()?;
        units.sort_by(|a, b| a.id().cmp(b.id()));

        let mut seen = HashSet::new();
        for unit in &units {
            if unit.id().trim().is_empty() {
                return Err(MigrationError::InvalidMigration(
                    "migration id must not be empty".to_string(),
                ));
            }
            if !seen.insert(unit.id()) {
                return Err(MigrationError::InvalidMigration(format!(
                    "duplicate migration id: {}",
                    unit.id()
                )));
            }
        }
        Ok(units)
    }

    /// Ids of all known units, in execution order.
    pub fn discover(&self) -> Result<Vec<String>, MigrationError> {
        Ok(self.units()?.iter().map(|u| u.id().to_string()).collect())
    }

    /// Ids recorded as executed, in execution order.
    pub fn executed(&self) -> Result<Vec<String>, MigrationError> {
        Ok(self.ledger.entries()?.into_iter().map(|e| e.id).collect())
    }

    /// Ids of units not yet executed, in execution order.
    pub fn pending(&self) -> Result<Vec<String>, MigrationError> {
        let executed: HashSet<String> = self.executed()?.into_iter().collect();
        Ok(self
            .discover()?
            .into_iter()
            .filter(|id| !executed.contains(id))
            .collect())
    }

    /// Ledger entries whose unit is no longer known.
    pub fn orphaned(&self) -> Result<Vec<LedgerEntry>, MigrationError> {
        let known: HashSet<String> = self.discover()?.into_iter().collect();
        Ok(self
            .ledger
            .entries()?
            .into_iter()
            .filter(|entry| !known.contains(&entry.id))
            .collect())
    }

    /// Apply all pending migrations as one new batch.
    ///
    /// Stops at the first failure. Migrations before it stay applied and
    /// recorded; the failed one and everything after it stay pending.
    #[instrument(skip(self))]
    pub fn migrate(&self) -> Result<MigrationBatchResult, MigrationError> {
        let executed: HashSet<String> = self.executed()?.into_iter().collect();
        let pending: Vec<_> = self
            .units()?
            .into_iter()
            .filter(|unit| !executed.contains(unit.id()))
            .collect();

        if pending.is_empty() {
            info!("nothing to migrate");
            return Ok(MigrationBatchResult::nothing_to_do("nothing to migrate"));
        }

        let batch = self.ledger.max_batch()?.map_or(1, |max| max + 1);
        info!(batch, pending = pending.len(), "running migrations");

        let mut result = MigrationBatchResult {
            batch: Some(batch),
            ..Default::default()
        };
        for unit in pending {
            let outcome = match unit.up(&self.store) {
                Ok(()) => {
                    let recorded = self.ledger.record(unit.id(), batch, unit.checksum());
                    if recorded.is_ok() {
                        info!(id = unit.id(), batch, "migrated");
                    }
                    ledger_outcome(unit.id(), Direction::Up, recorded)
                }
                Err(e) => {
                    warn!(id = unit.id(), batch, error = %e, "migration failed");
                    MigrationOutcome::error(unit.id(), Direction::Up, e.to_string())
                }
            };
            let failed = !outcome.is_success();
            result.outcomes.push(outcome);
            if failed {
                break;
            }
        }
        Ok(result)
    }

    /// Revert the most recent batch in reverse execution order.
    ///
    /// Stops at the first failure; the failed migration and the ones not yet
    /// reverted stay recorded.
    #[instrument(skip(self))]
    pub fn rollback(&self) -> Result<MigrationBatchResult, MigrationError> {
        let Some(batch) = self.ledger.max_batch()? else {
            info!("nothing to roll back");
            return Ok(MigrationBatchResult::nothing_to_do("nothing to roll back"));
        };

        let units = self.units_by_id()?;
        let entries = self.ledger.batch(batch)?;
        info!(batch, migrations = entries.len(), "rolling back");

        let mut result = MigrationBatchResult {
            batch: Some(batch),
            ..Default::default()
        };
        for entry in entries.iter().rev() {
            let mut outcome = self.revert(&units, entry);
            if outcome.is_success() {
                outcome = ledger_outcome(&entry.id, Direction::Down, self.ledger.remove(entry));
            }
            let failed = !outcome.is_success();
            result.outcomes.push(outcome);
            if failed {
                break;
            }
        }
        Ok(result)
    }

    /// Revert every executed migration, clear the ledger and migrate again.
    ///
    /// Failed `down` steps are reported but do not stop the reset.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<MigrationBatchResult, MigrationError> {
        let units = self.units_by_id()?;
        let entries = self.ledger.entries()?;
        info!(migrations = entries.len(), "resetting");

        let mut result = MigrationBatchResult::default();
        for entry in entries.iter().rev() {
            let mut outcome = self.revert(&units, entry);
            if outcome.is_success() {
                outcome = ledger_outcome(&entry.id, Direction::Down, self.ledger.remove(entry));
            }
            result.outcomes.push(outcome);
        }
        self.ledger.clear()?;

        let migrated = self.migrate()?;
        result.batch = migrated.batch;
        result.message = migrated.message;
        result.outcomes.extend(migrated.outcomes);
        Ok(result)
    }

    /// Status of every known unit, in execution order.
    pub fn status(&self) -> Result<Vec<MigrationStatusEntry>, MigrationError> {
        let recorded: HashMap<String, LedgerEntry> = self
            .ledger
            .entries()?
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        Ok(self
            .units()?
            .iter()
            .map(|unit| {
                let entry = recorded.get(unit.id());
                let modified = match (entry.and_then(|e| e.checksum.as_deref()), unit.checksum()) {
                    (Some(recorded), Some(current)) => recorded != current,
                    _ => false,
                };
                MigrationStatusEntry {
                    id: unit.id().to_string(),
                    executed: entry.is_some(),
                    batch: entry.map(|e| e.batch),
                    executed_at: entry.map(|e| e.executed_at),
                    modified,
                }
            })
            .collect())
    }

    fn units_by_id(&self) -> Result<HashMap<String, Arc<dyn Migration>>, MigrationError> {
        Ok(self
            .units()?
            .into_iter()
            .map(|unit| (unit.id().to_string(), unit))
            .collect())
    }

    fn revert(
        &self,
        units: &HashMap<String, Arc<dyn Migration>>,
        entry: &LedgerEntry,
    ) -> MigrationOutcome {
        let Some(unit) = units.get(&entry.id) else {
            warn!(id = %entry.id, "executed migration is no longer known");
            return MigrationOutcome::error(
                &entry.id,
                Direction::Down,
                "migration unit not found",
            );
        };
        match unit.down(&self.store) {
            Ok(()) => {
                info!(id = %entry.id, batch = entry.batch, "rolled back");
                MigrationOutcome::success(&entry.id, Direction::Down)
            }
            Err(e) => {
                warn!(id = %entry.id, batch = entry.batch, error = %e, "rollback failed");
                MigrationOutcome::error(&entry.id, Direction::Down, e.to_string())
            }
        }
    }
}

/// Outcome of a step whose schema change already ran, given the ledger
/// write that follows it.
fn ledger_outcome<T>(
    id: &str,
    direction: Direction,
    written: Result<T, MigrationError>,
) -> MigrationOutcome {
    match written {
        Ok(_) => MigrationOutcome::success(id, direction),
        Err(e) => {
            error!(id, %direction, error = %e, "ledger write failed");
            let action = match direction {
                Direction::Up => "applied but not recorded",
                Direction::Down => "rolled back but still recorded",
            };
            MigrationOutcome::error(id, direction, format!("{action}: {e}"))
        }
    }
}
