// Library root
// -----------
// The binary (`main.rs`) parses arguments and hands off to `commands`.
// Everything else lives here so it can be tested without a terminal.
//
// Module responsibilities:
// - `api`: HTTP calls to the Flux Relay backend and their wire types.
// - `auth`: device-code token polling.
// - `store`: the local context file (token and selections).
// - `query`: decoding query responses into rows of cells.
// - `render`: tables, query results and error hints.
// - `shell`: the interactive SQL shell and its meta-commands.
// - `commands`: one handler per subcommand.
pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod error;
pub mod query;
pub mod render;
pub mod settings;
pub mod shell;
pub mod store;
pub mod ui;
