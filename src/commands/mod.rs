// Command handlers. Each takes the resolved `Settings` and returns
// `anyhow::Result`; user-facing output goes to stdout.
//
// Preconditions (logged in, project selected, server selected) are checked
// against the local context file before any request is made.

pub mod config;
pub mod install;
pub mod login;
pub mod logout;
pub mod nameservers;
pub mod projects;
pub mod servers;
pub mod sql;

use anyhow::{anyhow, bail, Result};

use crate::api::ApiClient;
use crate::cli::Command;
use crate::error::ApiError;
use crate::settings::Settings;
use crate::store::{ContextStore, StoredConfig};

pub fn dispatch(settings: &Settings, command: Command) -> Result<()> {
    match command {
        Command::Login { headless } => login::run(settings, headless),
        Command::Logout => logout::run(settings),
        Command::Config { command } => config::run(settings, command),
        Command::Pr(args) => projects::run(settings, args),
        Command::Server(args) => servers::run(settings, args),
        Command::Ns(args) => nameservers::run(settings, args),
        Command::Sql { query } => sql::run(settings, &query),
        Command::Install { force } => install::run(force),
    }
}

/// A logged-in context: the stored config, its store and an API client.
pub struct Session {
    pub client: ApiClient,
    pub store: ContextStore,
    pub config: StoredConfig,
    token: String,
}

impl Session {
    pub fn open(settings: &Settings) -> Result<Self> {
        let store = settings.store();
        let config = store.load()?;
        let token = match config.access_token() {
            Some(token) => token.to_string(),
            None => bail!("not logged in. Run 'flux-relay login' first"),
        };
        Ok(Session {
            client: settings.client()?,
            store,
            config,
            token,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn project_id(&self) -> Result<&str> {
        match self.config.selected_project_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => bail!(
                "no project selected. Use 'flux-relay pr <project-name-or-id>' to select a project"
            ),
        }
    }

    pub fn server_id(&self) -> Result<&str> {
        match self.config.selected_server_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => bail!(
                "no server selected. Use 'flux-relay server <server-name-or-id>' to select a server"
            ),
        }
    }

    pub fn nameserver_id(&self) -> Option<&str> {
        self.config
            .selected_nameserver_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    /// Apply `f` to the stored config and persist it.
    pub fn update(&mut self, f: impl FnOnce(&mut StoredConfig)) -> Result<()> {
        self.config = self.store.update(f)?;
        Ok(())
    }
}

/// Turn an API failure into a command error. Rejected tokens get the
/// re-login message; everything else keeps the remote text.
pub fn api_failure(action: &str, err: ApiError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow!(err.user_message())
    } else {
        anyhow!("{}: {}", action, err)
    }
}

/// Pick an item by exact ID or case-insensitive name.
pub fn find_by_id_or_name<'a, T>(
    items: &'a [T],
    target: &str,
    id: impl Fn(&T) -> &str,
    name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    items
        .iter()
        .find(|&item| id(item) == target || name(item).eq_ignore_ascii_case(target))
}
