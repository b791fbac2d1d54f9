//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, TreeCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{HierarchyTreeNode, UnitSnapshot, UnitType};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { command }) => {
            let settings = Settings::load(cli.config.as_deref())?;
            execute_tree(command, settings)
        }
        Some(Commands::Config { command }) => execute_config(command, cli.config.as_deref()),
        Some(Commands::Completion { shell }) => {
            print_completions(*shell);
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map_err(|e| InfraError::io("print help", e).into()),
    }
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn execute_tree(command: &TreeCommands, settings: Settings) -> CliResult<()> {
    match command {
        TreeCommands::Show { file, root } => {
            tree_show(&container(settings, file.as_deref())?, *root)
        }
        TreeCommands::Flat { file, root } => {
            tree_flat(&container(settings, file.as_deref())?, *root)
        }
        TreeCommands::Find { id, file } => tree_find(&container(settings, file.as_deref())?, *id),
        TreeCommands::Path { id, file } => tree_path(&container(settings, file.as_deref())?, *id),
        TreeCommands::Filter { unit_type, file } => {
            tree_filter(&container(settings, file.as_deref())?, *unit_type)
        }
        TreeCommands::Stats { file, root, json } => {
            tree_stats(&container(settings, file.as_deref())?, *root, *json)
        }
        TreeCommands::Nested { file } => tree_nested(&settings, file),
    }
}

/// Wire services for `file`, falling back to the configured `units_file`.
fn container(settings: Settings, file: Option<&Path>) -> CliResult<ServiceContainer> {
    let units_file = file
        .map(Path::to_path_buf)
        .or_else(|| settings.units_file.clone())
        .ok_or_else(|| {
            CliError::Usage("no hierarchy file given and `units_file` is not configured".into())
        })?;
    debug!("units_file: {}", units_file.display());
    Ok(ServiceContainer::new(settings, Some(units_file)))
}

#[instrument(skip(services))]
fn tree_show(services: &ServiceContainer, root: Option<i64>) -> CliResult<()> {
    let forest = services.hierarchy.forest(root)?;
    if forest.is_empty() {
        report_empty(root);
    }
    for tree in forest.iter() {
        output::info(&tree.render());
    }
    Ok(())
}

#[instrument(skip(services))]
fn tree_flat(services: &ServiceContainer, root: Option<i64>) -> CliResult<()> {
    let forest = services.hierarchy.forest(root)?;
    if forest.is_empty() {
        report_empty(root);
    }
    for unit in forest.iter().flat_map(|tree| tree.flatten()) {
        output::info(&format_unit_line(unit));
    }
    Ok(())
}

#[instrument(skip(services))]
fn tree_find(services: &ServiceContainer, id: i64) -> CliResult<()> {
    let forest = services.hierarchy.forest(None)?;
    match forest.iter().find_map(|tree| tree.find_by_id(id)) {
        Some(unit) => print_json(&Value::Object(unit.to_fields())),
        None => {
            output::warning(&format!("unit {id} not found"));
            Ok(())
        }
    }
}

#[instrument(skip(services))]
fn tree_path(services: &ServiceContainer, id: i64) -> CliResult<()> {
    let forest = services.hierarchy.forest(None)?;
    match forest.iter().find_map(|tree| tree.path_to(id)) {
        Some(path) => {
            for (depth, unit) in path.iter().enumerate() {
                output::info(&format!("{}{}", "  ".repeat(depth), unit));
            }
        }
        None => output::warning(&format!("unit {id} not found")),
    }
    Ok(())
}

#[instrument(skip(services))]
fn tree_filter(services: &ServiceContainer, unit_type: UnitType) -> CliResult<()> {
    let forest = services.hierarchy.forest(None)?;
    let filtered: Vec<HierarchyTreeNode> = forest
        .iter()
        .filter_map(|tree| tree.filter_by_type(unit_type))
        .collect();
    if filtered.is_empty() {
        output::warning(&format!("no units of type {unit_type}"));
    }
    for tree in &filtered {
        output::info(&tree.render());
    }
    Ok(())
}

#[instrument(skip(services))]
fn tree_stats(services: &ServiceContainer, root: Option<i64>, json: bool) -> CliResult<()> {
    let stats = services.hierarchy.statistics(root)?;
    if json {
        let value = serde_json::to_value(&stats)
            .map_err(|e| InfraError::encode("statistics", e))?;
        return print_json(&value);
    }

    output::header("Hierarchy statistics");
    output::row("total units", &stats.total_units, 16);
    output::row("active units", &stats.active_units, 16);
    output::row("inactive units", &stats.inactive_units(), 16);
    output::row("max depth", &stats.max_depth, 16);
    if !stats.by_type.is_empty() {
        output::header("By type");
        for (unit_type, count) in &stats.by_type {
            output::row(unit_type.as_str(), count, 16);
        }
    }
    Ok(())
}

/// Strict nested build of a single hierarchy document.
#[instrument(skip(settings))]
fn tree_nested(settings: &Settings, file: &Path) -> CliResult<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| InfraError::io(format!("read {}", file.display()), e))?;
    let raw: Value = serde_json::from_str(&content).map_err(|e| InfraError::parse(file, e))?;
    let tree = HierarchyTreeNode::build_with(&raw, &settings.tree.build_options())
        .map_err(crate::application::ApplicationError::from)?;
    debug!("nested: {} units", tree.len());
    print_json(&tree.to_nested())
}

fn execute_config(command: &ConfigCommands, local: Option<&Path>) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(local)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path().map(|p| describe_path(&p));
            output::row(
                "global",
                &global.unwrap_or_else(|| "(no config directory)".into()),
                8,
            );
            let local = local.map(describe_path);
            output::row("local", &local.unwrap_or_else(|| "(none)".into()), 8);
        }
    }
    Ok(())
}

fn describe_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (missing)", path.display())
    }
}

fn report_empty(root: Option<i64>) {
    match root {
        Some(id) => output::warning(&format!("unit {id} not found")),
        None => output::warning("hierarchy is empty"),
    }
}

fn format_unit_line(unit: &UnitSnapshot) -> String {
    let status = if unit.is_active { "" } else { " (inactive)" };
    format!(
        "{:>6}  {:<18} {}{}",
        unit.id,
        unit.unit_type.as_str(),
        unit.hierarchy_path,
        status
    )
}

fn print_json(value: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| InfraError::encode("output", e))?;
    output::info(&rendered);
    Ok(())
}
