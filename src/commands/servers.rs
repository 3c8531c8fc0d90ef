// `flux-relay server` / `srv`: list servers with their nameserver counts,
// show or select the current server, or open a shell on one.
//
// The listing fans out one scoped thread per server to count nameservers.
// Each thread owns exactly one result slot, so no locking is needed and the
// rows come back in the server order regardless of completion order.

use anyhow::{bail, Result};
use std::io;
use std::thread;
use tracing::{debug, warn};

use super::{api_failure, find_by_id_or_name, Session};
use crate::api::{ApiClient, Nameserver, Server};
use crate::cli::{join_words, ServerArgs, ServerCommand};
use crate::error::ApiResult;
use crate::render::{self, Table};
use crate::settings::Settings;
use crate::shell::{ServerScope, Shell, ShellContext};
use crate::ui;

/// Where per-server nameserver lists come from. Shared across threads.
pub trait NameserverSource: Sync {
    fn nameservers(&self, server_id: &str) -> ApiResult<Vec<Nameserver>>;
}

/// Nameserver lookups for one project.
pub struct ProjectScope<'a> {
    client: &'a ApiClient,
    token: &'a str,
    project_id: &'a str,
}

impl NameserverSource for ProjectScope<'_> {
    fn nameservers(&self, server_id: &str) -> ApiResult<Vec<Nameserver>> {
        self.client
            .list_nameservers(self.token, self.project_id, server_id)
    }
}

#[derive(Debug)]
pub struct ServerRow {
    pub server: Server,
    pub active_nameservers: usize,
    /// Set when the count could not be fetched; the count is then 0.
    pub error: Option<String>,
}

/// Count active nameservers for every server concurrently.
pub fn gather_nameserver_counts<S: NameserverSource>(
    source: &S,
    servers: Vec<Server>,
) -> Vec<ServerRow> {
    let mut slots: Vec<Option<Result<usize, String>>> = vec![None; servers.len()];

    thread::scope(|scope| {
        for (server, slot) in servers.iter().zip(slots.iter_mut()) {
            scope.spawn(move || {
                let count = source
                    .nameservers(&server.id)
                    .map(|list| list.iter().filter(|ns| ns.is_active).count())
                    .map_err(|e| e.user_message());
                *slot = Some(count);
            });
        }
    });

    servers
        .into_iter()
        .zip(slots)
        .map(|(server, slot)| {
            let (active_nameservers, error) = match slot {
                Some(Ok(count)) => (count, None),
                Some(Err(e)) => (0, Some(e)),
                None => (0, Some("no result".to_string())),
            };
            ServerRow {
                server,
                active_nameservers,
                error,
            }
        })
        .collect()
}

pub fn run(settings: &Settings, args: ServerArgs) -> Result<()> {
    let mut session = Session::open(settings)?;
    let project_id = session.project_id()?.to_string();

    match (args.command, join_words(&args.target)) {
        (Some(ServerCommand::List), _) => list(&session, &project_id),
        (Some(ServerCommand::Shell { target }), _) => match join_words(&target) {
            Some(target) => open_shell(&mut session, &project_id, &target),
            None => bail!("server name or ID required"),
        },
        (None, None) => show_current(&session, &project_id),
        (None, Some(target)) => select(&mut session, &project_id, &target),
    }
}

fn fetch(session: &Session, project_id: &str) -> Result<Vec<Server>> {
    let pb = ui::spinner("Fetching servers...");
    let res = session.client.list_servers(session.token(), project_id);
    pb.finish_and_clear();
    res.map_err(|e| {
        if e.is_code(&["Project not found"]) {
            anyhow::anyhow!(
                "project not found. Use 'flux-relay pr <project-name-or-id>' to select a valid project"
            )
        } else {
            api_failure("Failed to list servers", e)
        }
    })
}

fn find<'a>(servers: &'a [Server], target: &str) -> Result<&'a Server> {
    match find_by_id_or_name(servers, target, |s| s.id.as_str(), |s| s.name.as_str()) {
        Some(server) => Ok(server),
        None => bail!(
            "server '{}' not found. Use 'flux-relay server list' to see available servers",
            target
        ),
    }
}

fn list(session: &Session, project_id: &str) -> Result<()> {
    let servers = fetch(session, project_id)?;
    if servers.is_empty() {
        println!("No servers found in this project.");
        println!();
        println!("Create a server using the web dashboard or API.");
        return Ok(());
    }

    let scope = ProjectScope {
        client: &session.client,
        token: session.token(),
        project_id,
    };
    let pb = ui::spinner("Counting nameservers...");
    let rows = gather_nameserver_counts(&scope, servers);
    pb.finish_and_clear();

    println!("Found {} server(s) in project:", rows.len());
    println!();
    server_table(&rows).write_to(&mut io::stdout())?;
    println!();

    let failures: Vec<&ServerRow> = rows.iter().filter(|r| r.error.is_some()).collect();
    if !failures.is_empty() {
        ui::warning("Warnings:");
        for row in failures {
            let reason = row.error.as_deref().unwrap_or_default();
            warn!(server = %row.server.id, error = reason, "nameserver count failed");
            println!(
                "  Could not get nameserver count for server {}: {}",
                row.server.id, reason
            );
        }
        println!();
    }
    Ok(())
}

pub(crate) fn server_table(rows: &[ServerRow]) -> Table {
    let mut table = Table::new(["ID", "NAME", "DESCRIPTION", "NAMESERVERS", "CREATED", "STATUS"]);
    for row in rows {
        let s = &row.server;
        table.push_row(vec![
            s.id.clone(),
            s.name.clone(),
            render::truncate(&s.description, 30),
            row.active_nameservers.to_string(),
            render::short_date(&s.created_at),
            render::status_label(s.is_active).to_string(),
        ]);
    }
    table
}

fn show_current(session: &Session, project_id: &str) -> Result<()> {
    let Some(selected) = session.config.selected_server_id.clone() else {
        println!("No server selected.");
        println!();
        println!("Select a server using:");
        println!("  flux-relay server <server-name-or-id>");
        println!("  flux-relay srv <server-name-or-id>");
        println!();
        println!("Or list available servers:");
        println!("  flux-relay server list");
        return Ok(());
    };

    let servers = fetch(session, project_id)?;
    let Some(server) = servers.iter().find(|s| s.id == selected) else {
        ui::warning(&format!("Selected server (ID: {}) not found.", selected));
        println!("Please select a different server.");
        return Ok(());
    };

    println!("Current server: {} ({})", server.name, server.id);
    if !server.description.is_empty() {
        println!("Description: {}", server.description);
    }
    if let Some(ns_id) = session.nameserver_id() {
        // Best effort; the server line above is the answer.
        match session
            .client
            .list_nameservers(session.token(), project_id, &server.id)
        {
            Ok(list) => {
                if let Some(ns) = list.iter().find(|ns| ns.id == ns_id) {
                    println!("Nameserver: {} ({})", ns.name, ns.id);
                }
            }
            Err(e) => debug!(error = %e, "could not resolve selected nameserver"),
        }
    }
    Ok(())
}

fn select(session: &mut Session, project_id: &str, target: &str) -> Result<()> {
    let servers = fetch(session, project_id)?;
    let server = find(&servers, target)?;

    session.update(|c| c.select_server(&server.id))?;
    ui::success(&format!("Selected server: {} ({})", server.name, server.id));
    if !server.description.is_empty() {
        println!("   Description: {}", server.description);
    }
    ui::next_steps(&[
        "flux-relay ns list              # List nameservers",
        "flux-relay ns <nameserver-name> # Select nameserver",
        "flux-relay sql <query>          # Execute SQL query",
    ]);
    Ok(())
}

fn open_shell(session: &mut Session, project_id: &str, target: &str) -> Result<()> {
    let servers = fetch(session, project_id)?;
    let server = find(&servers, target)?;
    session.update(|c| c.select_server(&server.id))?;

    let backend = ServerScope::new(
        session.client.clone(),
        session.token(),
        project_id,
        &server.id,
    );
    let context = ShellContext {
        server_id: server.id.clone(),
        server_name: server.name.clone(),
        nameserver: None,
    };
    Shell::new(backend, context).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Later servers answer first so completion order is reversed.
    struct SlowSource {
        calls: AtomicUsize,
        seen: Mutex<HashSet<String>>,
        total: u64,
    }

    impl NameserverSource for SlowSource {
        fn nameservers(&self, server_id: &str) -> ApiResult<Vec<Nameserver>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().insert(server_id.to_string());
            let index: u64 = server_id.trim_start_matches("srv").parse().unwrap();
            thread::sleep(Duration::from_millis((self.total - index) * 10));

            if server_id == "srv2" {
                return Err(ApiError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok((0..index)
                .map(|i| Nameserver {
                    id: format!("ns{}", i),
                    name: format!("ns{}", i),
                    is_active: i % 2 == 0,
                    ..Nameserver::default()
                })
                .collect())
        }
    }

    fn server(id: &str) -> Server {
        Server {
            id: id.into(),
            name: format!("name-{}", id),
            ..Server::default()
        }
    }

    #[test]
    fn test_one_fetch_and_one_row_per_server() {
        let servers: Vec<Server> = (0..5).map(|i| server(&format!("srv{}", i))).collect();
        let source = SlowSource {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(HashSet::new()),
            total: 5,
        };

        let rows = gather_nameserver_counts(&source, servers);

        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
        assert_eq!(source.seen.lock().unwrap().len(), 5);
        assert_eq!(rows.len(), 5);
        let ids: Vec<&str> = rows.iter().map(|r| r.server.id.as_str()).collect();
        assert_eq!(ids, vec!["srv0", "srv1", "srv2", "srv3", "srv4"]);

        // srvN has N nameservers, every other one active.
        assert_eq!(rows[0].active_nameservers, 0);
        assert_eq!(rows[1].active_nameservers, 1);
        assert_eq!(rows[3].active_nameservers, 2);
        assert_eq!(rows[4].active_nameservers, 2);

        assert_eq!(rows[2].active_nameservers, 0);
        assert!(rows[2].error.as_deref().unwrap().contains("500"));
        assert!(rows.iter().filter(|r| r.error.is_some()).count() == 1);

        let table = server_table(&rows);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_no_servers_no_fetches() {
        let source = SlowSource {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(HashSet::new()),
            total: 0,
        };
        let rows = gather_nameserver_counts(&source, Vec::new());
        assert!(rows.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
