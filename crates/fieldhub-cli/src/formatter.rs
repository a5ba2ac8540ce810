//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::Table;
use fieldhub_core::catalog::FieldDefinition;
use fieldhub_core::location::LocationRule;
use fieldhub_core::migration::{MigrationBatchResult, MigrationStatusEntry};
use std::collections::BTreeSet;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a migrate, rollback or reset result.
    fn format_batch(&self, result: &MigrationBatchResult) -> String;

    /// Format migration status.
    fn format_status(&self, entries: &[MigrationStatusEntry]) -> String;

    /// Format a list of group names.
    fn format_groups(&self, groups: &[String]) -> String;

    /// Format a group's fields.
    fn format_fields(&self, group: &str, fields: &[FieldDefinition]) -> String;

    /// Format a single field value.
    fn format_value(&self, value: Option<&serde_json::Value>) -> String;

    /// Format a group's rules.
    fn format_rules(&self, group: &str, rules: &[Vec<LocationRule>]) -> String;

    /// Format a rule evaluation.
    fn format_match(&self, group: &str, matched: bool) -> String;

    /// Format the groups active for a context.
    fn format_active(&self, groups: &BTreeSet<String>) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Render a microsecond timestamp as UTC.
fn format_timestamp(micros: u64) -> String {
    i64::try_from(micros)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_micros)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| micros.to_string())
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_batch(&self, result: &MigrationBatchResult) -> String {
        if result.outcomes.is_empty() {
            return result.message.clone().unwrap_or_else(|| "Nothing to do".to_string());
        }

        let mut table = Table::new();
        table.set_header(vec!["Migration", "Direction", "Status", "Message"]);
        for outcome in &result.outcomes {
            table.add_row(vec![
                outcome.id.clone(),
                outcome.direction.to_string(),
                outcome.status.to_string(),
                outcome.message.clone(),
            ]);
        }

        match result.batch {
            Some(batch) => format!("Batch {batch}\n{table}"),
            None => table.to_string(),
        }
    }

    fn format_status(&self, entries: &[MigrationStatusEntry]) -> String {
        if entries.is_empty() {
            return "No migrations".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Migration", "Status", "Batch", "Executed at"]);
        for entry in entries {
            let status = match (entry.executed, entry.modified) {
                (true, true) => "Executed (modified)",
                (true, false) => "Executed",
                (false, _) => "Pending",
            };
            table.add_row(vec![
                entry.id.clone(),
                status.to_string(),
                entry.batch.map(|b| b.to_string()).unwrap_or_default(),
                entry.executed_at.map(format_timestamp).unwrap_or_default(),
            ]);
        }
        table.to_string()
    }

    fn format_groups(&self, groups: &[String]) -> String {
        if groups.is_empty() {
            return "No groups".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Group"]);
        for group in groups {
            table.add_row(vec![group]);
        }
        table.to_string()
    }

    fn format_fields(&self, group: &str, fields: &[FieldDefinition]) -> String {
        if fields.is_empty() {
            return format!("Group {group} has no fields");
        }

        let mut table = Table::new();
        table.set_header(vec!["Field", "Type", "Order", "Id"]);
        for field in fields {
            table.add_row(vec![
                field.name.clone(),
                field.field_type.to_string(),
                field.order.to_string(),
                field.id.0.to_string(),
            ]);
        }
        table.to_string()
    }

    fn format_value(&self, value: Option<&serde_json::Value>) -> String {
        match value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "(no value)".to_string(),
        }
    }

    fn format_rules(&self, group: &str, rules: &[Vec<LocationRule>]) -> String {
        if rules.is_empty() {
            return format!("Group {group} has no location rules");
        }

        let mut table = Table::new();
        table.set_header(vec!["Rule group", "Type", "Operator", "Value"]);
        for (index, rule_group) in rules.iter().enumerate() {
            for rule in rule_group {
                table.add_row(vec![
                    index.to_string(),
                    rule.location_type.to_string(),
                    rule.operator.to_string(),
                    rule.value.clone(),
                ]);
            }
        }
        table.to_string()
    }

    fn format_match(&self, group: &str, matched: bool) -> String {
        if matched {
            format!("{group}: match")
        } else {
            format!("{group}: no match")
        }
    }

    fn format_active(&self, groups: &BTreeSet<String>) -> String {
        let groups: Vec<String> = groups.iter().cloned().collect();
        self.format_groups(&groups)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl JsonFormatter {
    fn pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_batch(&self, result: &MigrationBatchResult) -> String {
        Self::pretty(result)
    }

    fn format_status(&self, entries: &[MigrationStatusEntry]) -> String {
        Self::pretty(entries)
    }

    fn format_groups(&self, groups: &[String]) -> String {
        Self::pretty(groups)
    }

    fn format_fields(&self, group: &str, fields: &[FieldDefinition]) -> String {
        Self::pretty(&serde_json::json!({
            "group": group,
            "fields": fields,
        }))
    }

    fn format_value(&self, value: Option<&serde_json::Value>) -> String {
        Self::pretty(&value)
    }

    fn format_rules(&self, _group: &str, rules: &[Vec<LocationRule>]) -> String {
        Self::pretty(rules)
    }

    fn format_match(&self, group: &str, matched: bool) -> String {
        serde_json::json!({
            "group": group,
            "matches": matched
        })
        .to_string()
    }

    fn format_active(&self, groups: &BTreeSet<String>) -> String {
        Self::pretty(groups)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({
            "message": message
        })
        .to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }
}
