// `flux-relay ns`: list, select, create and initialize nameservers in the
// selected server, or open a shell narrowed to one of them.

use anyhow::{bail, Result};
use std::io;

use super::{api_failure, find_by_id_or_name, Session};
use crate::api::{Nameserver, SchemaType};
use crate::cli::{join_words, NsArgs, NsCommand};
use crate::render::{self, Table};
use crate::settings::Settings;
use crate::shell::{self, NameserverRef, ServerScope, Shell, ShellContext};
use crate::ui;

/// Project and server IDs every nameserver call needs.
struct Scope {
    project_id: String,
    server_id: String,
}

pub fn run(settings: &Settings, args: NsArgs) -> Result<()> {
    let mut session = Session::open(settings)?;
    let scope = Scope {
        project_id: session.project_id()?.to_string(),
        server_id: session.server_id()?.to_string(),
    };

    match (args.command, join_words(&args.target)) {
        (Some(NsCommand::List), _) => list(&session, &scope),
        (Some(NsCommand::Shell { target }), _) => match join_words(&target) {
            Some(target) => open_shell(&mut session, &scope, &target),
            None => bail!("nameserver name or ID required"),
        },
        (Some(NsCommand::Create { name }), _) => match join_words(&name) {
            Some(name) => create(&session, &scope, &name),
            None => bail!("nameserver name required"),
        },
        (
            Some(NsCommand::Initialize {
                target,
                schema,
                drop_existing,
            }),
            _,
        ) => initialize(&session, &scope, join_words(&target), schema, drop_existing),
        (None, None) => show_current(&session, &scope),
        (None, Some(target)) => select(&mut session, &scope, &target),
    }
}

fn fetch(session: &Session, scope: &Scope) -> Result<Vec<Nameserver>> {
    let pb = ui::spinner("Fetching nameservers...");
    let res = session
        .client
        .list_nameservers(session.token(), &scope.project_id, &scope.server_id);
    pb.finish_and_clear();
    res.map_err(|e| api_failure("Failed to list nameservers", e))
}

fn find<'a>(nameservers: &'a [Nameserver], target: &str) -> Result<&'a Nameserver> {
    match find_by_id_or_name(nameservers, target, |n| n.id.as_str(), |n| n.name.as_str()) {
        Some(ns) => Ok(ns),
        None => bail!(
            "nameserver '{}' not found. Use 'flux-relay ns list' to see available nameservers",
            target
        ),
    }
}

fn list(session: &Session, scope: &Scope) -> Result<()> {
    let nameservers = fetch(session, scope)?;
    if nameservers.is_empty() {
        println!("No nameservers found in this server.");
        println!();
        println!("Create one with: flux-relay ns create <name>");
        return Ok(());
    }

    println!("Found {} nameserver(s) in server:", nameservers.len());
    println!();
    nameserver_table(&nameservers).write_to(&mut io::stdout())?;
    println!();
    Ok(())
}

pub(crate) fn nameserver_table(nameservers: &[Nameserver]) -> Table {
    let mut table = Table::new(["ID", "NAME", "CREATED", "STATUS"]);
    for ns in nameservers {
        table.push_row(vec![
            ns.id.clone(),
            ns.name.clone(),
            render::short_date(&ns.created_at),
            render::status_label(ns.is_active).to_string(),
        ]);
    }
    table
}

fn show_current(session: &Session, scope: &Scope) -> Result<()> {
    let Some(selected) = session.nameserver_id().map(str::to_string) else {
        println!("No nameserver selected.");
        println!();
        println!("Select a nameserver using:");
        println!("  flux-relay ns <nameserver-name-or-id>");
        println!();
        println!("Or list available nameservers:");
        println!("  flux-relay ns list");
        return Ok(());
    };

    let nameservers = fetch(session, scope)?;
    match nameservers.iter().find(|ns| ns.id == selected) {
        Some(ns) => {
            println!("Current nameserver: {} ({})", ns.name, ns.id);
            ui::next_steps(&["flux-relay sql <query>          # Execute SQL query"]);
        }
        None => {
            ui::warning(&format!("Selected nameserver (ID: {}) not found.", selected));
            println!("Please select a different nameserver.");
        }
    }
    Ok(())
}

fn select(session: &mut Session, scope: &Scope, target: &str) -> Result<()> {
    let nameservers = fetch(session, scope)?;
    let ns = find(&nameservers, target)?;
    session.update(|c| c.select_nameserver(&ns.id))?;
    ui::success(&format!("Selected nameserver: {} ({})", ns.name, ns.id));
    ui::next_steps(&["flux-relay sql <query>          # Execute SQL query"]);
    Ok(())
}

fn open_shell(session: &mut Session, scope: &Scope, target: &str) -> Result<()> {
    let nameservers = fetch(session, scope)?;
    let ns = find(&nameservers, target)?;
    session.update(|c| c.select_nameserver(&ns.id))?;

    let servers = session
        .client
        .list_servers(session.token(), &scope.project_id)
        .map_err(|e| api_failure("Failed to get server info", e))?;
    let server_name = servers
        .into_iter()
        .find(|s| s.id == scope.server_id)
        .map(|s| s.name)
        .unwrap_or_else(|| scope.server_id.clone());

    let backend = ServerScope::new(
        session.client.clone(),
        session.token(),
        &scope.project_id,
        &scope.server_id,
    );
    let context = ShellContext {
        server_id: scope.server_id.clone(),
        server_name,
        nameserver: Some(NameserverRef::from(ns)),
    };
    Shell::new(backend, context).run()
}

fn create(session: &Session, scope: &Scope, name: &str) -> Result<()> {
    let pb = ui::spinner(&format!("Creating nameserver '{}'...", name));
    let res = session.client.create_nameserver(
        session.token(),
        &scope.project_id,
        &scope.server_id,
        name,
    );
    pb.finish_and_clear();
    let created = res.map_err(|e| api_failure("Failed to create nameserver", e))?;

    let ns = &created.nameserver;
    ui::success(&format!("Nameserver '{}' created successfully!", ns.name));
    println!("   ID: {}", ns.id);
    if !created.message.is_empty() {
        println!("   {}", created.message);
    }
    println!();
    println!("Next steps:");
    println!("  1. Initialize schema: flux-relay ns initialize {}", ns.name);
    println!("  2. Select it: flux-relay ns {}", ns.name);
    Ok(())
}

fn initialize(
    session: &Session,
    scope: &Scope,
    target: Option<String>,
    schema: SchemaType,
    drop_existing: bool,
) -> Result<()> {
    let nameservers = fetch(session, scope)?;
    let ns = match (target, session.nameserver_id()) {
        (Some(target), _) => find(&nameservers, &target)?,
        (None, Some(selected)) => find(&nameservers, selected)?,
        (None, None) => bail!(
            "no nameserver selected. Use 'flux-relay ns <nameserver-name-or-id>' or pass a name"
        ),
    };

    if drop_existing
        && !ui::confirm(&format!(
            "This drops all existing tables in '{}'. Continue?",
            ns.name
        ))
    {
        println!("Cancelled.");
        return Ok(());
    }

    let pb = ui::spinner(&format!("Initializing schema for '{}'...", ns.name));
    let res = session.client.initialize_nameserver(
        session.token(),
        &scope.project_id,
        &scope.server_id,
        &ns.id,
        schema,
        drop_existing,
    );
    pb.finish_and_clear();
    let report = res.map_err(|e| api_failure("Failed to initialize nameserver", e))?;

    ui::success(&format!("Schema initialized for '{}'!", ns.name));
    if !report.message.is_empty() {
        println!("   {}", report.message);
    }
    shell::write_initialize_report(&mut io::stdout(), &report)?;
    Ok(())
}
