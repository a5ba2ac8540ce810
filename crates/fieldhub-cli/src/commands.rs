//! Command execution.

use crate::config::{CliConfig, Command, FieldCommand, GroupCommand, RulesCommand, ValueCommand};
use crate::error::CliError;
use crate::formatter::Formatter;
use fieldhub_core::catalog::FieldType;
use fieldhub_core::location::{LocationContext, LocationRule};
use fieldhub_core::migration::{MigrationRunner, MigrationSet};
use fieldhub_core::{Error, FieldHub};
use std::io::Read;
use tracing::debug;

/// Rendered output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Text to print.
    pub text: String,
    /// Whether the command reported a failure without returning an error.
    pub failed: bool,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, failed: false }
    }
}

/// Execute a command against an open installation.
pub fn execute(
    hub: &FieldHub,
    config: &CliConfig,
    command: Command,
    formatter: &dyn Formatter,
) -> Result<CommandOutput, CliError> {
    debug!(?command, "executing command");
    match command {
        Command::Migrate => run_batch(migrator(hub, config)?.migrate()?, formatter),
        Command::Rollback => run_batch(migrator(hub, config)?.rollback()?, formatter),
        Command::Reset => run_batch(migrator(hub, config)?.reset()?, formatter),
        Command::Status => {
            let status = migrator(hub, config)?.status()?;
            Ok(CommandOutput::ok(formatter.format_status(&status)))
        }
        Command::Group(cmd) => group(hub, cmd, formatter),
        Command::Field(cmd) => field(hub, cmd, formatter),
        Command::Value(cmd) => value(hub, cmd, formatter),
        Command::Rules(cmd) => rules(hub, cmd, formatter),
    }
}

fn migrator(hub: &FieldHub, config: &CliConfig) -> Result<MigrationRunner, CliError> {
    if config.has_migrations_dir() {
        Ok(hub.manifest_migrator()?)
    } else {
        Ok(hub.migrator(MigrationSet::new())?)
    }
}

fn run_batch(
    result: fieldhub_core::MigrationBatchResult,
    formatter: &dyn Formatter,
) -> Result<CommandOutput, CliError> {
    Ok(CommandOutput {
        text: formatter.format_batch(&result),
        failed: result.has_errors(),
    })
}

fn group(hub: &FieldHub, cmd: GroupCommand, formatter: &dyn Formatter) -> Result<CommandOutput, CliError> {
    let text = match cmd {
        GroupCommand::Create { name } => {
            hub.store().create_group(&name)?;
            formatter.format_message(&format!("Created group {name}"))
        }
        GroupCommand::Drop { name } => {
            hub.drop_group(&name)?;
            formatter.format_message(&format!("Dropped group {name}"))
        }
        GroupCommand::List => formatter.format_groups(&hub.catalog().list_groups()?),
        GroupCommand::Describe { name } => match hub.catalog().describe_group(&name)? {
            Some(fields) => formatter.format_fields(&name, &fields),
            None => return Err(Error::NotFound(name).into()),
        },
    };
    Ok(CommandOutput::ok(text))
}

fn field(hub: &FieldHub, cmd: FieldCommand, formatter: &dyn Formatter) -> Result<CommandOutput, CliError> {
    let text = match cmd {
        FieldCommand::Add {
            group,
            name,
            field_type,
            order,
        } => {
            let id = hub
                .store()
                .add_field(&group, &name, FieldType::from_tag(&field_type), order)?;
            formatter.format_message(&format!("Added field {group}.{name} (id {})", id.0))
        }
        FieldCommand::Remove { group, name } => {
            hub.store().remove_field(&group, &name)?;
            formatter.format_message(&format!("Removed field {group}.{name}"))
        }
        FieldCommand::Rename { group, from, to } => {
            hub.store().rename_field(&group, &from, &to)?;
            formatter.format_message(&format!("Renamed field {group}.{from} to {to}"))
        }
    };
    Ok(CommandOutput::ok(text))
}

fn value(hub: &FieldHub, cmd: ValueCommand, formatter: &dyn Formatter) -> Result<CommandOutput, CliError> {
    let text = match cmd {
        ValueCommand::Get {
            group,
            record_id,
            field,
            typed,
        } => {
            let value = if typed {
                hub.store().get_typed_value(&group, record_id, &field)?
            } else {
                hub.store()
                    .get_value(&group, record_id, &field)?
                    .map(serde_json::Value::String)
            };
            formatter.format_value(value.as_ref())
        }
        ValueCommand::Set {
            group,
            record_id,
            field,
            value,
            typed,
        } => {
            if typed {
                let parsed = serde_json::from_str(&value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
                hub.store().set_typed_value(&group, record_id, &field, &parsed)?;
            } else {
                hub.store().set_value(&group, record_id, &field, value)?;
            }
            formatter.format_message(&format!("Set {group}.{field} for record {record_id}"))
        }
    };
    Ok(CommandOutput::ok(text))
}

fn rules(hub: &FieldHub, cmd: RulesCommand, formatter: &dyn Formatter) -> Result<CommandOutput, CliError> {
    let locations = hub.locations();
    let text = match cmd {
        RulesCommand::Save { group, rules } => {
            let rule_groups: Vec<Vec<LocationRule>> = serde_json::from_str(&read_arg(rules)?)?;
            locations.save_rules(&group, &rule_groups)?;
            formatter.format_message(&format!(
                "Saved {} rule group(s) for {group}",
                rule_groups.iter().filter(|g| !g.is_empty()).count()
            ))
        }
        RulesCommand::Get { group } => formatter.format_rules(&group, &locations.get_rules(&group)?),
        RulesCommand::Match { group, context } => {
            let context: LocationContext = serde_json::from_str(&read_arg(context)?)?;
            formatter.format_match(&group, locations.matches(&group, &context))
        }
        RulesCommand::Active { context } => {
            let context: LocationContext = serde_json::from_str(&read_arg(context)?)?;
            formatter.format_active(&locations.active_groups_for(&context))
        }
    };
    Ok(CommandOutput::ok(text))
}

/// Resolve a JSON argument, reading stdin for `-`.
fn read_arg(arg: String) -> Result<String, CliError> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{JsonFormatter, TableFormatter};
    use fieldhub_core::FieldHubConfig;

    struct TestContext {
        hub: FieldHub,
        config: CliConfig,
        _dir: tempfile::TempDir,
    }

    impl TestContext {
        fn new() -> Self {
            Self::with_config(|config| config)
        }

        fn with_config(f: impl FnOnce(CliConfig) -> CliConfig) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = f(CliConfig::new(dir.path().join("data")));
            let hub = FieldHub::open(config.hub.clone()).unwrap();
            Self {
                hub,
                config,
                _dir: dir,
            }
        }

        fn run(&self, command: Command) -> Result<CommandOutput, CliError> {
            execute(&self.hub, &self.config, command, &TableFormatter)
        }

        fn run_json(&self, command: Command) -> serde_json::Value {
            let output = execute(&self.hub, &self.config, command, &JsonFormatter).unwrap();
            serde_json::from_str(&output.text).unwrap()
        }
    }

    #[test]
    fn test_group_and_field_commands() {
        let ctx = TestContext::new();
        ctx.run(Command::Group(GroupCommand::Create { name: "products".into() }))
            .unwrap();
        ctx.run(Command::Field(FieldCommand::Add {
            group: "products".into(),
            name: "price".into(),
            field_type: "number".into(),
            order: 0,
        }))
        .unwrap();
        ctx.run(Command::Field(FieldCommand::Rename {
            group: "products".into(),
            from: "price".into(),
            to: "cost".into(),
        }))
        .unwrap();

        let described = ctx.run_json(Command::Group(GroupCommand::Describe {
            name: "products".into(),
        }));
        assert_eq!(described["group"], "products");
        assert_eq!(described["fields"][0]["name"], "cost");
        assert_eq!(described["fields"][0]["field_type"], "number");

        let groups = ctx.run_json(Command::Group(GroupCommand::List));
        assert_eq!(groups, serde_json::json!(["products"]));
    }

    #[test]
    fn test_describe_missing_group() {
        let ctx = TestContext::new();
        let err = ctx
            .run(Command::Group(GroupCommand::Describe { name: "hero".into() }))
            .unwrap_err();
        assert!(matches!(err, CliError::Core(Error::NotFound(_))));
    }

    #[test]
    fn test_value_commands() {
        let ctx = TestContext::new();
        ctx.hub.store().create_group("products").unwrap();
        ctx.hub
            .store()
            .add_field("products", "in_stock", FieldType::Boolean, 0)
            .unwrap();

        ctx.run(Command::Value(ValueCommand::Set {
            group: "products".into(),
            record_id: 3,
            field: "in_stock".into(),
            value: "true".into(),
            typed: true,
        }))
        .unwrap();

        let raw = ctx
            .run(Command::Value(ValueCommand::Get {
                group: "products".into(),
                record_id: 3,
                field: "in_stock".into(),
                typed: false,
            }))
            .unwrap();
        assert_eq!(raw.text, "1");

        let typed = ctx.run_json(Command::Value(ValueCommand::Get {
            group: "products".into(),
            record_id: 3,
            field: "in_stock".into(),
            typed: true,
        }));
        assert_eq!(typed, serde_json::json!(true));
    }

    #[test]
    fn test_rules_commands() {
        let ctx = TestContext::new();
        ctx.hub.store().create_group("hero").unwrap();
        ctx.run(Command::Rules(RulesCommand::Save {
            group: "hero".into(),
            rules: r#"[[{"type": "record_type", "op": "==", "value": "post"}]]"#.into(),
        }))
        .unwrap();

        let matched = ctx.run_json(Command::Rules(RulesCommand::Match {
            group: "hero".into(),
            context: r#"{"record_type": "post"}"#.into(),
        }));
        assert_eq!(matched["matches"], true);

        let output = ctx
            .run(Command::Rules(RulesCommand::Match {
                group: "hero".into(),
                context: r#"{"record_type": "page"}"#.into(),
            }))
            .unwrap();
        assert_eq!(output.text, "hero: no match");

        let active = ctx.run_json(Command::Rules(RulesCommand::Active {
            context: r#"{"record_type": "post"}"#.into(),
        }));
        assert_eq!(active, serde_json::json!(["hero"]));
    }

    #[test]
    fn test_rules_save_rejects_bad_json() {
        let ctx = TestContext::new();
        let err = ctx
            .run(Command::Rules(RulesCommand::Save {
                group: "hero".into(),
                rules: "[[{".into(),
            }))
            .unwrap_err();
        assert!(matches!(err, CliError::Json(_)));
    }

    #[test]
    fn test_migrate_without_directory() {
        let ctx = TestContext::new();
        let output = ctx.run(Command::Migrate).unwrap();
        assert!(!output.failed);
        assert_eq!(output.text, "nothing to migrate");
    }

    #[test]
    fn test_migrate_reports_failure() {
        let ctx = TestContext::with_config(|mut config| {
            let dir = config.hub.storage.path.with_file_name("migrations");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join("001_drop_missing.json"),
                r#"{ "up": [ { "op": "drop_group", "group": "missing" } ] }"#,
            )
            .unwrap();
            config.hub.migrations_dir = Some(dir);
            config
        });

        let output = ctx.run(Command::Migrate).unwrap();
        assert!(output.failed);

        let status = ctx.run_json(Command::Status);
        assert_eq!(status[0]["id"], "001_drop_missing");
        assert_eq!(status[0]["executed"], false);
    }
}
