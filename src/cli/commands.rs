//! Command dispatch
//!
//! Document commands read an import document, run one operation through a
//! `TreeEditor` and print the result (or rewrite the file with `--in-place`).

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::TreeEditor;
use crate::application::{ApplicationError, JsonResultExt};
use crate::cli::args::{
    Cli, Commands, ConfigCommands, DataCommands, DirectionArg, MaterialCommands, WriteArgs,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{
    DataIndicator, Direction, IndicatorPatch, IndicatorTree, NewIndicator, SupportingMaterial,
};
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    // commands that must work even with a broken config
    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Template,
        } => {
            output::info(&Settings::template());
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Path,
        } => {
            match global_config_path() {
                Some(path) => output::info(&path.display()),
                None => output::warning("cannot determine config directory"),
            }
            return Ok(());
        }
        _ => {}
    }

    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Validate { file } => cmd_validate(&container, file),
        Commands::Show { file } => cmd_show(&container, file),
        Commands::Normalize { file, output } => cmd_normalize(&container, file, output.as_deref()),
        Commands::Stats { file } => cmd_stats(&container, file),
        Commands::Add {
            file,
            parent,
            level,
            name,
            description,
            weight,
            write,
        } => cmd_add(
            &container,
            file,
            parent.as_deref(),
            *level,
            NewIndicator {
                weight: *weight,
                ..NewIndicator::leaf(name.as_str()).with_description(description.as_str())
            },
            *write,
        ),
        Commands::Edit {
            file,
            id,
            name,
            description,
            weight,
            clear_weight,
            write,
        } => {
            let patch = IndicatorPatch {
                name: name.clone(),
                description: description.clone(),
                weight: if *clear_weight { Some(None) } else { weight.map(Some) },
                ..IndicatorPatch::default()
            };
            if patch.is_empty() {
                return Err(CliError::InvalidArgs(
                    "nothing to change: give --name, --description, --weight or --clear-weight"
                        .to_string(),
                ));
            }
            edit_document(&container, file, *write, |editor| {
                editor.edit(id, patch)?;
                Ok(format!("edited {}", id))
            })
        }
        Commands::Delete { file, id, write } => edit_document(&container, file, *write, |editor| {
            if editor.tree().find(id).is_none() {
                output::warning(&format!("{} not found, nothing deleted", id));
            }
            editor.delete(id);
            Ok(format!("deleted {}", id))
        }),
        Commands::Move {
            file,
            id,
            direction,
            write,
        } => cmd_move(&container, file, id, *direction, *write),
        Commands::Promote { file, id, write } => edit_document(&container, file, *write, |editor| {
            editor.promote(id)?;
            Ok(format!("promoted {}", id))
        }),
        Commands::Demote { file, id, write } => edit_document(&container, file, *write, |editor| {
            editor.demote(id)?;
            Ok(format!("demoted {}", id))
        }),
        Commands::Data { command } => cmd_data(&container, command),
        Commands::Material { command } => cmd_material(&container, command),
        Commands::Save { system_id, file } => cmd_save(&container, system_id, file),
        Commands::Load { system_id, output } => cmd_load(&container, system_id, output.as_deref()),
        Commands::List => cmd_list(&container),
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Run `op` on the document in `file` and emit the resulting document.
fn edit_document(
    container: &ServiceContainer,
    file: &Path,
    write: WriteArgs,
    op: impl FnOnce(&mut TreeEditor) -> Result<String, ApplicationError>,
) -> CliResult<()> {
    let service = &container.system_service;
    let tree = service.import_file(file)?;
    let mut editor = service.editor(tree);
    let message = op(&mut editor)?;
    emit(container, editor.tree(), file, write)?;
    output::note(&message);
    Ok(())
}

fn emit(
    container: &ServiceContainer,
    tree: &IndicatorTree,
    file: &Path,
    write: WriteArgs,
) -> CliResult<()> {
    if write.in_place {
        container.system_service.export_file(tree, file)?;
        output::action("Updated", &file.display());
    } else {
        output::info(&tree.to_json().with_json_context("serialize export document")?);
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_validate(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    match container.system_service.import_file(file) {
        Ok(tree) => {
            output::success(&format!("{}: {} indicators, valid", file.display(), tree.len()));
            Ok(())
        }
        Err(ApplicationError::Import(e)) => {
            output::header(&format!("{}", file.display()));
            for issue in &e.issues {
                output::failure(issue);
            }
            Err(CliError::Invalid(e.issues.len()))
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_show(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let tree = container.system_service.import_file(file)?;
    output::info(&tree.to_tree_string());
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_normalize(container: &ServiceContainer, file: &Path, out: Option<&Path>) -> CliResult<()> {
    let tree = container.system_service.import_file(file)?;
    match out {
        Some(path) => {
            container.system_service.export_file(&tree, path)?;
            output::action("Wrote", &path.display());
        }
        None => output::info(&tree.to_json().with_json_context("serialize export document")?),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_stats(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let stats = container.system_service.import_file(file)?.stats();
    output::header(&format!("{}", file.display()));
    output::detail(&format!("indicators:           {}", stats.indicators));
    output::detail(&format!("containers:           {}", stats.containers));
    output::detail(&format!("leaves:               {}", stats.leaves));
    output::detail(&format!("data indicators:      {}", stats.data_indicators));
    output::detail(&format!("supporting materials: {}", stats.supporting_materials));
    output::detail(&format!("depth:                {}", stats.depth));
    Ok(())
}

#[instrument(level = "debug", skip(container, fields))]
fn cmd_add(
    container: &ServiceContainer,
    file: &Path,
    parent: Option<&str>,
    level: Option<u8>,
    fields: NewIndicator,
    write: WriteArgs,
) -> CliResult<()> {
    edit_document(container, file, write, |editor| {
        let level = match (level, parent) {
            (Some(level), _) => level,
            (None, None) => 1,
            (None, Some(pid)) => editor.tree().find(pid).map_or(0, |p| p.level + 1),
        };
        let id = editor.add(parent, level, fields)?;
        Ok(format!("added {}", id))
    })
}

#[instrument(level = "debug", skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    file: &Path,
    id: &str,
    direction: DirectionArg,
    write: WriteArgs,
) -> CliResult<()> {
    edit_document(container, file, write, |editor| {
        let direction: Direction = direction.into();
        let movable = editor.available_actions(id).map(|actions| match direction {
            Direction::Up => actions.move_up,
            Direction::Down => actions.move_down,
        });
        if movable == Some(false) {
            output::warning(&format!("{} cannot move {}, unchanged", id, direction));
        }
        editor.move_node(id, direction)?;
        Ok(format!("moved {} {}", id, direction))
    })
}

fn cmd_data(container: &ServiceContainer, command: &DataCommands) -> CliResult<()> {
    match command {
        DataCommands::Add {
            file,
            node,
            name,
            threshold,
            write,
        } => edit_document(container, file, *write, |editor| {
            let record = DataIndicator {
                name: name.clone().unwrap_or_default(),
                threshold: threshold.clone(),
                ..DataIndicator::default()
            };
            let id = editor.add_data_indicator(node, record)?;
            Ok(format!("added data indicator {} to {}", id, node))
        }),
        DataCommands::Remove {
            file,
            node,
            record,
            write,
        } => edit_document(container, file, *write, |editor| {
            editor.remove_data_indicator(node, record)?;
            Ok(format!("removed data indicator {} from {}", record, node))
        }),
    }
}

fn cmd_material(container: &ServiceContainer, command: &MaterialCommands) -> CliResult<()> {
    match command {
        MaterialCommands::Add {
            file,
            node,
            name,
            file_types,
            max_size,
            required,
            write,
        } => edit_document(container, file, *write, |editor| {
            let record = SupportingMaterial {
                name: name.clone().unwrap_or_default(),
                file_types: file_types.clone().unwrap_or_default(),
                max_size: max_size.clone().unwrap_or_default(),
                required: *required,
                ..SupportingMaterial::default()
            };
            let id = editor.add_supporting_material(node, record)?;
            Ok(format!("added supporting material {} to {}", id, node))
        }),
        MaterialCommands::Remove {
            file,
            node,
            record,
            write,
        } => edit_document(container, file, *write, |editor| {
            editor.remove_supporting_material(node, record)?;
            Ok(format!("removed supporting material {} from {}", record, node))
        }),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_save(container: &ServiceContainer, system_id: &str, file: &Path) -> CliResult<()> {
    let service = &container.system_service;
    let tree = service.import_file(file)?;
    service.save(system_id, &tree)?;
    output::success(&format!("saved {} ({} indicators)", system_id, tree.len()));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_load(container: &ServiceContainer, system_id: &str, out: Option<&Path>) -> CliResult<()> {
    let service = &container.system_service;
    let tree = service.load(system_id)?;
    match out {
        Some(path) => {
            service.export_file(&tree, path)?;
            output::action("Wrote", &path.display());
        }
        None => output::info(&tree.to_json().with_json_context("serialize export document")?),
    }
    Ok(())
}

fn cmd_list(container: &ServiceContainer) -> CliResult<()> {
    let ids = container.system_service.list()?;
    if ids.is_empty() {
        output::note(&format!(
            "no systems in {}",
            container.settings.store_dir.display()
        ));
    }
    for id in ids {
        output::info(&id);
    }
    Ok(())
}
