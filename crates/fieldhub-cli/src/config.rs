//! CLI configuration and argument parsing.

use crate::formatter::OutputFormat;
use clap::{Parser, Subcommand};
use fieldhub_core::{FieldHubConfig, StorageConfig};
use std::path::PathBuf;

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./fieldhub_data";

/// Default page cache size in megabytes.
pub const DEFAULT_CACHE_MB: u64 = 256;

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Installation configuration.
    pub hub: FieldHubConfig,
    /// Output format.
    pub format: OutputFormat,
}

impl CliConfig {
    /// Create a configuration with the given data path and defaults elsewhere.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            hub: FieldHubConfig::new(data_path),
            format: OutputFormat::Table,
        }
    }

    /// Check whether migrations come from a manifest directory.
    pub fn has_migrations_dir(&self) -> bool {
        self.hub.migrations_dir.is_some()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "fieldhub")]
#[command(version, about = "Manage FieldHub field groups, migrations and location rules", long_about = None)]
pub struct Args {
    /// Path to the data directory.
    #[arg(short, long, global = true, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Directory of JSON migration manifests.
    #[arg(short, long, global = true)]
    pub migrations_dir: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Page cache size in megabytes.
    #[arg(long, global = true, default_value_t = DEFAULT_CACHE_MB)]
    pub cache_mb: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Split arguments into configuration and the command to run.
    pub fn into_config(self) -> (CliConfig, Command) {
        let storage =
            StorageConfig::new(self.data_path).with_cache_capacity(self.cache_mb * 1024 * 1024);
        let mut hub = FieldHubConfig::default().with_storage(storage);
        hub.migrations_dir = self.migrations_dir;

        (
            CliConfig {
                hub,
                format: self.format,
            },
            self.command,
        )
    }
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply all pending migrations as a new batch.
    Migrate,
    /// Revert the most recent batch.
    Rollback,
    /// Revert every migration and apply them again.
    Reset,
    /// Show which migrations have run.
    Status,
    /// Manage field groups.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage fields of a group.
    #[command(subcommand)]
    Field(FieldCommand),
    /// Read and write field values.
    #[command(subcommand)]
    Value(ValueCommand),
    /// Manage and evaluate location rules.
    #[command(subcommand)]
    Rules(RulesCommand),
}

/// Group commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GroupCommand {
    /// Create a group.
    Create { name: String },
    /// Drop a group with its fields, values and rules.
    Drop { name: String },
    /// List groups.
    List,
    /// Show a group's fields.
    Describe { name: String },
}

/// Field commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FieldCommand {
    /// Add a field.
    Add {
        group: String,
        name: String,
        /// Field type tag (text, number, boolean, ...).
        #[arg(short = 't', long = "type", default_value = "text")]
        field_type: String,
        /// Display order.
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        order: i64,
    },
    /// Remove a field and its values.
    Remove { group: String, name: String },
    /// Rename a field.
    Rename {
        group: String,
        from: String,
        to: String,
    },
}

/// Value commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ValueCommand {
    /// Read a value.
    Get {
        group: String,
        record_id: u64,
        field: String,
        /// Decode through the field type.
        #[arg(long)]
        typed: bool,
    },
    /// Write a value.
    Set {
        group: String,
        record_id: u64,
        field: String,
        value: String,
        /// Parse the value as JSON and encode it through the field type.
        #[arg(long)]
        typed: bool,
    },
}

/// Rule commands. JSON arguments may be `-` to read stdin.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RulesCommand {
    /// Replace a group's rules with a JSON list of rule groups.
    Save { group: String, rules: String },
    /// Show a group's rules.
    Get { group: String },
    /// Evaluate a group's rules against a JSON context.
    Match { group: String, context: String },
    /// List groups whose rules match a JSON context.
    Active { context: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.hub.storage.path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.format, OutputFormat::Table);
        assert!(!config.has_migrations_dir());
    }

    #[test]
    fn test_into_config() {
        let args = Args::try_parse_from([
            "fieldhub",
            "--data-path",
            "/var/lib/fieldhub",
            "--migrations-dir",
            "./migrations",
            "--format",
            "json",
            "--cache-mb",
            "64",
            "migrate",
        ])
        .unwrap();
        let (config, command) = args.into_config();

        assert_eq!(command, Command::Migrate);
        assert_eq!(config.hub.storage.path, PathBuf::from("/var/lib/fieldhub"));
        assert_eq!(config.hub.storage.cache_capacity, 64 * 1024 * 1024);
        assert_eq!(config.hub.migrations_dir, Some(PathBuf::from("./migrations")));
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_field_add_args() {
        let args = Args::try_parse_from([
            "fieldhub", "field", "add", "products", "price", "--type", "number", "--order", "-1",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Field(FieldCommand::Add {
                group: "products".into(),
                name: "price".into(),
                field_type: "number".into(),
                order: -1,
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["fieldhub", "group", "list", "-f", "json"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.command, Command::Group(GroupCommand::List));
    }

    #[test]
    fn test_rejects_bad_record_id() {
        assert!(Args::try_parse_from(["fieldhub", "value", "get", "products", "x", "sku"]).is_err());
    }
}
