//! Command dispatch: load the forest, apply one command, save it back

use tracing::{debug, instrument};

use crate::application::services::Session;
use crate::cli::args::{Cli, Commands};
use crate::cli::output;
use crate::cli::CliResult;
use crate::config::Settings;
use crate::domain::{format_path, parse_path, NodeId};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::tree_traits::TreeNodeConvert;

/// Build the container from settings plus command-line overrides.
pub fn build_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let mut settings = Settings::load()?;
    if let Some(file) = &cli.file {
        settings.data_file = file.clone();
    }
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };
    let container = build_container(cli)?;
    run(&container, command)
}

/// Run `command` against the container's session, saving after mutations.
#[instrument(skip(container))]
pub fn run(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    if let Commands::Config = command {
        return _config(container);
    }

    let mut session = container.open_session()?;
    let mutated = match command {
        Commands::Add { name, parents } => _add(&mut session, name.as_deref(), parents)?,
        Commands::Instance { nodes } => _instance(&mut session, nodes)?,
        Commands::Delete { nodes } => _delete(&mut session, nodes)?,
        Commands::Rename { node, name } => _rename(&mut session, node, name.as_deref())?,
        Commands::Tree { selected } => _tree(&mut session, selected)?,
        Commands::Instances { node } => _instances(&session, node)?,
        Commands::Identities => _identities(&session)?,
        Commands::Export => _export(&session)?,
        Commands::Config => false,
    };

    if mutated {
        container.save_session(&session)?;
    }
    Ok(())
}

/// Resolve a `0/2/1` path to a node of the session.
fn resolve(session: &Session, path: &str) -> CliResult<NodeId> {
    let indices = parse_path(path)?;
    Ok(session.model().resolve_path(&indices)?)
}

fn resolve_all(session: &Session, paths: &[String]) -> CliResult<Vec<NodeId>> {
    paths.iter().map(|p| resolve(session, p)).collect()
}

fn describe(session: &Session, node: NodeId) -> CliResult<String> {
    let model = session.model();
    let person = model.person_of(node)?;
    Ok(format!(
        "{} [{}] age={} id={}",
        person.name,
        format_path(&model.path_of(node)?),
        person.age(),
        person.id()
    ))
}

#[instrument(skip(session))]
fn _add(session: &mut Session, name: Option<&str>, parents: &[String]) -> CliResult<bool> {
    let parents = resolve_all(session, parents)?;
    session.select(&parents)?;
    let added = session.add(name)?;
    if added.is_empty() {
        output::warning("add cancelled");
        return Ok(false);
    }
    for node in added {
        output::action("Added", &describe(session, node)?);
    }
    Ok(true)
}

#[instrument(skip(session))]
fn _instance(session: &mut Session, nodes: &[String]) -> CliResult<bool> {
    let sources = resolve_all(session, nodes)?;
    session.select(&sources)?;
    for node in session.instance_selected()? {
        output::action("Instanced", &describe(session, node)?);
    }
    Ok(true)
}

#[instrument(skip(session))]
fn _delete(session: &mut Session, nodes: &[String]) -> CliResult<bool> {
    let targets = resolve_all(session, nodes)?;
    session.select(&targets)?;
    let evicted = session.delete_selected()?;
    output::action("Deleted", &format!("{} node path(s)", nodes.len()));
    for id in evicted {
        output::detail(&format!("identity {} no longer referenced", id));
    }
    Ok(true)
}

#[instrument(skip(session))]
fn _rename(session: &mut Session, node: &str, name: Option<&str>) -> CliResult<bool> {
    let target = resolve(session, node)?;
    let synced = session.rename(target, name)?;
    if synced.is_empty() {
        output::warning("rename cancelled");
        return Ok(false);
    }
    output::action("Renamed", &format!("{} instance(s)", synced.len()));
    for node in synced {
        output::detail(&describe(session, node)?);
    }
    Ok(true)
}

#[instrument(skip(session))]
fn _tree(session: &mut Session, selected: &[String]) -> CliResult<bool> {
    let nodes = resolve_all(session, selected)?;
    session.select(&nodes)?;
    output::info(&session.to_tree_string());
    Ok(false)
}

#[instrument(skip(session))]
fn _instances(session: &Session, node: &str) -> CliResult<bool> {
    let target = resolve(session, node)?;
    let identity = session.model().node(target)?.identity();
    let instances = session.model().find_instances_of(identity)?;
    output::header(&format!("{} instance(s)", instances.len()));
    for node in instances {
        output::detail(&describe(session, node)?);
    }
    Ok(false)
}

fn _identities(session: &Session) -> CliResult<bool> {
    for record in session.model().snapshot_identities() {
        let count = session.model().reference_count(record.id);
        output::info(&format!(
            "{}\t{}\tage={}\tinstances={}",
            record.id, record.name, record.age, count
        ));
    }
    Ok(false)
}

fn _export(session: &Session) -> CliResult<bool> {
    let json = session.to_document()?.to_json().map_err(InfraError::from)?;
    output::info(&json);
    Ok(false)
}

fn _config(container: &ServiceContainer) -> CliResult<()> {
    let rendered = container.settings.to_toml()?;
    output::info(&rendered);
    Ok(())
}
