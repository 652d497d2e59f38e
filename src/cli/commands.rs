//! Command dispatch: maps parsed arguments onto services

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{slider_step, Allocation, ConfirmedAllocation, Draft, EntityId};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute the parsed command against the wired services.
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Init { ids }) => cmd_init(container, ids),
        Some(Commands::Set { id, value }) => cmd_set(container, *id, *value),
        Some(Commands::Show { json }) => cmd_show(container, *json),
        Some(Commands::Total) => cmd_total(container),
        Some(Commands::Step) => cmd_step(container),
        Some(Commands::Confirm) => cmd_confirm(container),
        Some(Commands::Discard) => cmd_discard(container),
        Some(Commands::History { json }) => cmd_history(container, *json),
        Some(Commands::Config { command }) => cmd_config(container, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `fundsplit --help`".to_string(),
        )),
    }
}

#[instrument(skip(container))]
fn cmd_init(container: &ServiceContainer, ids: &[EntityId]) -> CliResult<()> {
    let draft = container.session.start(ids)?;
    print_draft(&draft);
    if !draft.allocation.is_balanced() {
        output::warning(&format!(
            "{} funds cannot all stay within the bounds, confirm will be refused",
            ids.len()
        ));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_set(container: &ServiceContainer, id: EntityId, value: f64) -> CliResult<()> {
    if value.is_nan() {
        return Err(CliError::InvalidArgs("share must be a number".to_string()));
    }
    let draft = container.session.set_share(id, value)?;
    print_draft(&draft);
    Ok(())
}

fn cmd_show(container: &ServiceContainer, json: bool) -> CliResult<()> {
    let draft = require_draft(container)?;
    if json {
        output::info(&to_json(&draft.allocation.to_records())?);
    } else {
        print_draft(&draft);
    }
    Ok(())
}

fn cmd_total(container: &ServiceContainer) -> CliResult<()> {
    let draft = require_draft(container)?;
    output::info(&format!("{:.2}", draft.allocation.total()));
    draft
        .allocation
        .ensure_balanced()
        .map_err(ApplicationError::from)?;
    Ok(())
}

fn cmd_step(container: &ServiceContainer) -> CliResult<()> {
    let draft = require_draft(container)?;
    output::info(&slider_step(draft.entity_ids.len()));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_confirm(container: &ServiceContainer) -> CliResult<()> {
    let confirmed = container.session.confirm()?;
    output::success(&format!(
        "Confirmed allocation of {} funds",
        confirmed.shares.len()
    ));
    print_confirmed(&confirmed);
    Ok(())
}

fn cmd_discard(container: &ServiceContainer) -> CliResult<()> {
    if container.session.discard()? {
        output::action("Discarded", &container.session.draft_path().display());
    } else {
        output::detail(&"no allocation in progress");
    }
    Ok(())
}

fn cmd_history(container: &ServiceContainer, json: bool) -> CliResult<()> {
    let history = container.session.history()?;
    if json {
        output::info(&to_json(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        output::detail(&"no confirmed allocations");
        return Ok(());
    }
    for confirmed in &history {
        print_confirmed(confirmed);
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let text = container.settings.to_toml()?;
            output::info(&text);
        }
        ConfigCommands::Path => {
            let global = global_config_path();
            let local = std::env::current_dir()
                .map(|dir| local_config_path(&dir))
                .map_err(|e| InfraError::io("resolve working directory", e))?;
            match global {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::detail(&"global: (no config directory)"),
            }
            output::detail(&format!("local:  {}", local.display()));
            output::detail(&format!(
                "data:   {}",
                container.settings.data_dir.display()
            ));
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                std::env::current_dir()
                    .map(|dir| local_config_path(&dir))
                    .map_err(|e| InfraError::io("resolve working directory", e))?
            };
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            debug!("config init: {}", path.display());
            container
                .fs
                .ensure_parent(&path)
                .and_then(|_| container.fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
        }
    }
    Ok(())
}

fn require_draft(container: &ServiceContainer) -> CliResult<Draft> {
    container
        .session
        .current()?
        .ok_or_else(|| ApplicationError::NoActiveSession.into())
}

fn to_json<T: serde::Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Internal(format!("serialize output: {e}")))
}

fn print_draft(draft: &Draft) {
    output::header(&format!(
        "Allocation ({} funds, step {})",
        draft.entity_ids.len(),
        slider_step(draft.entity_ids.len())
    ));
    print_allocation(&draft.allocation);
}

fn print_allocation(allocation: &Allocation) {
    for record in allocation.iter() {
        output::share_row(record);
    }
    output::total(allocation.total(), allocation.is_balanced());
    if !allocation.is_balanced() {
        output::failure(&format!(
            "sum must be exactly 100%, current sum is {:.2}%",
            allocation.total()
        ));
    }
}

fn print_confirmed(confirmed: &ConfirmedAllocation) {
    output::header(&confirmed.confirmed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    for record in &confirmed.shares {
        output::share_row(record);
    }
    output::total(confirmed.total, true);
}
