// Command-line surface. Parsing only; the handlers live in `commands`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::api::SchemaType;

/// Flux Relay CLI - manage your messaging platform from the command line
#[derive(Parser, Debug)]
#[command(name = "flux-relay", version)]
#[command(about = "Flux Relay CLI - manage your messaging platform from the command line")]
#[command(
    long_about = "Flux Relay CLI is a command-line tool for managing your Flux Relay\n\
                  messaging platform. Execute SQL queries, manage nameservers, and more."
)]
pub struct Cli {
    /// API base URL (default: https://flux.postacksolutions.com)
    #[arg(long, global = true, env = "FLUX_RELAY_API_URL")]
    pub api_url: Option<String>,

    /// Config file (default: ~/.flux-relay/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authenticate with Flux Relay using device code authentication
    ///
    /// Opens your browser to complete the login. If no browser can be opened
    /// (WSL, SSH, containers) use --headless to get a URL to open manually.
    Login {
        /// Show the URL instead of opening a browser
        #[arg(long)]
        headless: bool,
    },

    /// Log out by removing the stored access token
    Logout,

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List and select projects
    #[command(alias = "projects")]
    Pr(ProjectsArgs),

    /// List and select servers in the selected project
    #[command(alias = "srv")]
    Server(ServerArgs),

    /// List, select and manage nameservers in the selected server
    Ns(NsArgs),

    /// Execute a SQL query on the selected server
    ///
    /// Example: flux-relay sql "SELECT * FROM conversations_db WHERE server_id = ? LIMIT 10"
    Sql {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Install or update the Flux Relay CLI
    Install {
        /// Reinstall even if already installed
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        #[command(subcommand)]
        key: SetKey,
    },
}

#[derive(Subcommand, Debug)]
pub enum SetKey {
    /// Set the access token (e.g. copied from the login success page)
    Token { token: String },
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub command: Option<ProjectsCommand>,

    /// Project name or ID to select; omit to show the current project
    pub target: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List all projects
    List,
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: Option<ServerCommand>,

    /// Server name or ID to select; omit to show the current server
    pub target: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// List all servers in the selected project with nameserver counts
    List,
    /// Open an interactive SQL shell for a server
    Shell {
        #[arg(required = true)]
        target: Vec<String>,
    },
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct NsArgs {
    #[command(subcommand)]
    pub command: Option<NsCommand>,

    /// Nameserver name or ID to select; omit to show the current nameserver
    pub target: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum NsCommand {
    /// List all nameservers in the selected server
    List,
    /// Open an interactive SQL shell for a nameserver
    Shell {
        #[arg(required = true)]
        target: Vec<String>,
    },
    /// Create a nameserver in the selected server
    Create {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Initialize the default schema of a nameserver
    #[command(alias = "init")]
    Initialize {
        /// Nameserver name or ID (default: the selected nameserver)
        target: Vec<String>,

        /// Which table set to create
        #[arg(long, value_enum, default_value_t = SchemaType::Messaging)]
        schema: SchemaType,

        /// Drop existing tables first
        #[arg(long)]
        drop_existing: bool,
    },
}

/// Multi-word names arrive as separate arguments.
pub fn join_words(words: &[String]) -> Option<String> {
    let joined = words.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
