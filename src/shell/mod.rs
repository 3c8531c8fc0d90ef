// Interactive SQL shell bound to one server, optionally narrowed to a
// nameserver.
//
// `Shell::handle_line` does all the work and writes to any `io::Write`, so
// the state machine can be driven from tests without a terminal. `run`
// wires it to a rustyline editor: Ctrl+C comes back from `readline` as
// `ReadlineError::Interrupted`, so cancelling only ever touches the buffer
// from the loop's own thread.

pub mod accumulator;
pub mod meta;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, Write};
use tracing::debug;

use crate::api::{ApiClient, CreatedNameserver, InitializeReport, Nameserver, SchemaType};
use crate::error::ApiResult;
use crate::query::QueryResult;
use crate::render;
use crate::ui;
use accumulator::{LineAccumulator, Step};
use meta::MetaCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameserverRef {
    pub id: String,
    pub name: String,
}

impl From<&Nameserver> for NameserverRef {
    fn from(ns: &Nameserver) -> Self {
        NameserverRef {
            id: ns.id.clone(),
            name: ns.name.clone(),
        }
    }
}

/// What the session is pointed at. Lives only as long as the shell.
#[derive(Debug, Clone)]
pub struct ShellContext {
    pub server_id: String,
    pub server_name: String,
    pub nameserver: Option<NameserverRef>,
}

impl ShellContext {
    fn nameserver_name(&self) -> Option<&str> {
        self.nameserver.as_ref().map(|ns| ns.name.as_str())
    }
}

/// Remote operations the shell needs, scoped to one server.
pub trait ShellBackend {
    fn execute(&self, sql: &str) -> ApiResult<QueryResult>;
    fn nameservers(&self) -> ApiResult<Vec<Nameserver>>;
    fn create_nameserver(&self, name: &str) -> ApiResult<CreatedNameserver>;
    fn initialize_nameserver(&self, nameserver_id: &str) -> ApiResult<InitializeReport>;
}

/// The live backend: an API client plus the credentials and IDs every call
/// needs.
pub struct ServerScope {
    client: ApiClient,
    token: String,
    project_id: String,
    server_id: String,
}

impl ServerScope {
    pub fn new(client: ApiClient, token: &str, project_id: &str, server_id: &str) -> Self {
        ServerScope {
            client,
            token: token.to_string(),
            project_id: project_id.to_string(),
            server_id: server_id.to_string(),
        }
    }
}

impl ShellBackend for ServerScope {
    fn execute(&self, sql: &str) -> ApiResult<QueryResult> {
        let pb = ui::spinner("Executing query...");
        let res = self
            .client
            .execute_query(&self.token, &self.project_id, &self.server_id, sql);
        pb.finish_and_clear();
        res
    }

    fn nameservers(&self) -> ApiResult<Vec<Nameserver>> {
        self.client
            .list_nameservers(&self.token, &self.project_id, &self.server_id)
    }

    fn create_nameserver(&self, name: &str) -> ApiResult<CreatedNameserver> {
        self.client
            .create_nameserver(&self.token, &self.project_id, &self.server_id, name)
    }

    fn initialize_nameserver(&self, nameserver_id: &str) -> ApiResult<InitializeReport> {
        self.client.initialize_nameserver(
            &self.token,
            &self.project_id,
            &self.server_id,
            nameserver_id,
            SchemaType::default(),
            false,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const SQL_PREFIX_NOTE: &str =
    "Note: You don't need 'sql' prefix in the shell. Just type the query directly.";

pub struct Shell<B: ShellBackend> {
    backend: B,
    context: ShellContext,
    buffer: LineAccumulator,
    confirm: Box<dyn FnMut(&str) -> bool>,
}

impl<B: ShellBackend> Shell<B> {
    pub fn new(backend: B, context: ShellContext) -> Self {
        Shell {
            backend,
            context,
            buffer: LineAccumulator::new(),
            confirm: Box::new(ui::confirm),
        }
    }

    /// Replace the yes/no prompt used before destructive commands.
    pub fn with_confirm(mut self, confirm: impl FnMut(&str) -> bool + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    pub fn context(&self) -> &ShellContext {
        &self.context
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn has_pending_input(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().context("Failed to start the line editor")?;
        let mut out = io::stdout();
        self.write_banner(&mut out)?;

        loop {
            let prompt = if self.buffer.is_empty() { "→ " } else { "  " };
            match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    if self.handle_line(&line, &mut out)? == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => self.interrupt(&mut out)?,
                Err(ReadlineError::Eof) => {
                    writeln!(out, "Goodbye!")?;
                    break;
                }
                Err(err) => return Err(err).context("Failed to read input"),
            }
            out.flush()?;
        }
        Ok(())
    }

    pub fn write_banner(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "Connected to {}", self.context.server_name)?;
        if let Some(ns) = self.context.nameserver_name() {
            write!(out, " (nameserver: {})", ns)?;
        }
        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "Welcome to Flux Relay SQL shell!")?;
        writeln!(out)?;
        writeln!(
            out,
            "Type \".quit\" to exit the shell and \".help\" to list all available commands."
        )?;
        writeln!(out, "Enter SQL queries directly (no 'sql' prefix needed).")?;
        writeln!(
            out,
            "End queries with semicolon (;) or press Enter twice to execute."
        )?;
        writeln!(out)?;
        match self.context.nameserver_name() {
            Some(ns) => {
                writeln!(out, "Current nameserver: {}", ns)?;
                writeln!(
                    out,
                    "Note: Tables use nameserver suffix. Example: conversations_{}",
                    ns
                )?;
                writeln!(out, "Use .tables to see all available tables.")?;
            }
            None => {
                writeln!(out, "Server context: All nameservers")?;
                writeln!(out, "Use .nameservers to see available nameservers")?;
                writeln!(
                    out,
                    "Use .use <nameserver> to switch to a specific nameserver"
                )?;
            }
        }
        writeln!(out)
    }

    /// Ctrl+C: drop the pending statement, never leave the loop.
    pub fn interrupt(&mut self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "^C")?;
        if self.buffer.cancel() {
            writeln!(out, "Query cancelled.")
        } else {
            writeln!(out, "Use '.quit' to exit the shell.")
        }
    }

    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        match self.buffer.push(line) {
            Step::Idle => {}
            Step::Buffered { dangling_limit } => {
                if dangling_limit {
                    writeln!(
                        out,
                        "Incomplete query: LIMIT requires a number (e.g., LIMIT 10)"
                    )?;
                    writeln!(out, "   Complete your query or type .clear to start over")?;
                }
            }
            Step::Meta(command) => return self.dispatch(command, out),
            Step::Execute(statement) => {
                if statement.had_sql_prefix {
                    writeln!(out, "{}", SQL_PREFIX_NOTE)?;
                }
                self.run_query(&statement.sql, out)?;
            }
            Step::IncompleteLimit(sql) => {
                writeln!(
                    out,
                    "Error: incomplete LIMIT clause. LIMIT requires a number (e.g., LIMIT 10)"
                )?;
                writeln!(out, "   Your query: {}", sql)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn run_query(&self, sql: &str, out: &mut dyn Write) -> io::Result<()> {
        debug!(sql, "executing");
        match self.backend.execute(sql) {
            Ok(result) => render::write_outcome(out, &result),
            Err(err) => render::write_error(out, &err.user_message()),
        }
    }

    fn dispatch(&mut self, command: MetaCommand, out: &mut dyn Write) -> io::Result<Flow> {
        match command {
            MetaCommand::Quit => {
                writeln!(out, "Goodbye!")?;
                return Ok(Flow::Quit);
            }
            MetaCommand::Help => writeln!(out, "{}", meta::HELP)?,
            MetaCommand::Examples => writeln!(out, "{}", meta::EXAMPLES)?,
            MetaCommand::Clear => writeln!(out, "Query cleared.")?,
            MetaCommand::Context => self.show_context(out)?,
            MetaCommand::Tables => self.show_tables(out)?,
            MetaCommand::Nameservers => self.show_nameservers(out)?,
            MetaCommand::Use(target) => self.use_nameserver(target.as_deref(), out)?,
            MetaCommand::CreateNameserver(name) => {
                self.create_nameserver(name.as_deref(), out)?
            }
            MetaCommand::InitNameserver(target) => {
                self.init_nameserver(target.as_deref(), out)?
            }
            MetaCommand::Schema(Some(table)) => self.run_query(&meta::schema_query(&table), out)?,
            MetaCommand::Schema(None) => writeln!(out, "Usage: .schema <table_name>")?,
            MetaCommand::CreateTable(table) => writeln!(
                out,
                "{}",
                meta::create_table_guide(table.as_deref(), self.context.nameserver_name())
            )?,
            MetaCommand::DropTable(table) => self.drop_table(table.as_deref(), out)?,
            MetaCommand::AlterTable => writeln!(
                out,
                "{}",
                meta::alter_table_guide(self.context.nameserver_name())
            )?,
            MetaCommand::Unknown(line) => {
                writeln!(out, "Unknown command: {}", line)?;
                writeln!(out, "Type \".help\" for available commands.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn show_context(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Current context:")?;
        writeln!(
            out,
            "  Server: {} ({})",
            self.context.server_name, self.context.server_id
        )?;
        match &self.context.nameserver {
            Some(ns) => {
                writeln!(out, "  Nameserver: {} ({})", ns.name, ns.id)?;
                writeln!(out, "  Table suffix: conversations_{}", ns.name)
            }
            None => writeln!(out, "  Nameserver: (none - all nameservers)"),
        }
    }

    fn marker(&self, ns: &Nameserver) -> &'static str {
        match &self.context.nameserver {
            Some(current) if current.id == ns.id => "→ ",
            _ => "  ",
        }
    }

    fn show_tables(&self, out: &mut dyn Write) -> io::Result<()> {
        let listing = self.backend.nameservers();
        if let Ok(nameservers) = &listing {
            let active: Vec<&Nameserver> = nameservers.iter().filter(|ns| ns.is_active).collect();
            if !active.is_empty() {
                writeln!(
                    out,
                    "Showing tables for {} nameserver(s) in this server:",
                    active.len()
                )?;
                for ns in active {
                    writeln!(out, "{}{}", self.marker(ns), ns.name)?;
                }
                writeln!(out)?;
            }
        }

        self.run_query(meta::TABLES_QUERY, out)?;

        match listing {
            Err(err) => writeln!(
                out,
                "\nNote: Could not list nameservers: {}",
                err.user_message()
            ),
            Ok(nameservers) if nameservers.is_empty() => writeln!(
                out,
                "\nNote: No nameservers found. Create one with: .create_ns <name>"
            ),
            Ok(_) => Ok(()),
        }
    }

    fn show_nameservers(&self, out: &mut dyn Write) -> io::Result<()> {
        let nameservers = match self.backend.nameservers() {
            Ok(list) => list,
            Err(err) => {
                return writeln!(out, "Error listing nameservers: {}", err.user_message())
            }
        };
        let (active, inactive): (Vec<&Nameserver>, Vec<&Nameserver>) =
            nameservers.iter().partition(|ns| ns.is_active);

        if !active.is_empty() {
            writeln!(out, "Active nameservers:")?;
            for ns in &active {
                writeln!(out, "{}{} (ID: {})", self.marker(ns), ns.name, ns.id)?;
            }
            writeln!(out)?;
        }
        if !inactive.is_empty() {
            writeln!(out, "Inactive (soft-deleted) nameservers:")?;
            for ns in &inactive {
                writeln!(out, "  {} (ID: {}) [inactive]", ns.name, ns.id)?;
            }
            writeln!(out)?;
            writeln!(
                out,
                "Note: Inactive nameservers can prevent creating new ones with the same name."
            )?;
            writeln!(out)?;
        }
        if nameservers.is_empty() {
            writeln!(out, "No nameservers found.")?;
            writeln!(out)?;
        }

        writeln!(out, "Note: Tables are named like: conversations_{{nameserver_name}}")?;
        writeln!(out, "Commands:")?;
        writeln!(out, "  .use <nameserver>  - Switch to a nameserver context")?;
        writeln!(out, "  .create_ns <name>  - Create a new nameserver")
    }

    /// Exact, case-sensitive match on name or ID against the live list.
    fn find_nameserver(&self, target: &str, out: &mut dyn Write) -> io::Result<Option<Nameserver>> {
        match self.backend.nameservers() {
            Ok(list) => Ok(list
                .into_iter()
                .find(|ns| ns.name == target || ns.id == target)),
            Err(err) => {
                render::write_error(out, &err.user_message())?;
                Ok(None)
            }
        }
    }

    fn use_nameserver(&mut self, target: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        let Some(target) = target else {
            return match self.context.nameserver_name() {
                Some(ns) => writeln!(out, "Current nameserver: {}", ns),
                None => writeln!(
                    out,
                    "No nameserver selected. Use .use <nameserver> to select one."
                ),
            };
        };

        let listing = self.backend.nameservers();
        let nameservers = match listing {
            Ok(list) => list,
            Err(err) => return render::write_error(out, &err.user_message()),
        };
        match nameservers
            .iter()
            .find(|ns| ns.name == target || ns.id == target)
        {
            Some(ns) => {
                self.context.nameserver = Some(NameserverRef::from(ns));
                writeln!(out, "Switched to nameserver: {}", ns.name)?;
                writeln!(out, "   Tables will use suffix: conversations_{}", ns.name)
            }
            None => writeln!(
                out,
                "Nameserver '{}' not found. Use .nameservers to see available nameservers.",
                target
            ),
        }
    }

    fn create_nameserver(&mut self, name: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        let Some(name) = name else {
            writeln!(out, "Usage: .create_ns <nameserver_name>")?;
            writeln!(out, "Example: .create_ns db2")?;
            writeln!(out)?;
            return writeln!(out, "Use .nameservers to see existing nameservers first.");
        };

        // An exact active duplicate or a case-only clash would be rejected
        // by the backend anyway.
        let existing = self.backend.nameservers().unwrap_or_default();
        if let Some(clash) = existing
            .iter()
            .find(|ns| ns.name.eq_ignore_ascii_case(name))
        {
            if clash.name != name {
                writeln!(
                    out,
                    "Conflict: A nameserver with a similar name already exists:"
                )?;
                writeln!(out, "   Requested: '{}'", name)?;
                writeln!(out, "   Existing:  '{}' (ID: {})", clash.name, clash.id)?;
                writeln!(out)?;
                return writeln!(
                    out,
                    "Note: Nameserver names are case-insensitive. Use the existing one or choose a different name."
                );
            }
            if clash.is_active {
                writeln!(
                    out,
                    "Nameserver '{}' already exists and is active.",
                    clash.name
                )?;
                writeln!(out, "   ID: {}", clash.id)?;
                return writeln!(out, "Use .use {} to switch to it.", clash.name);
            }
            writeln!(
                out,
                "Found inactive nameserver '{}' - it will be reactivated.",
                clash.name
            )?;
        }

        writeln!(out, "Creating nameserver '{}'...", name)?;
        match self.backend.create_nameserver(name) {
            Ok(created) => {
                let ns = &created.nameserver;
                writeln!(out, "Nameserver '{}' created successfully!", ns.name)?;
                writeln!(out, "   ID: {}", ns.id)?;
                writeln!(out)?;
                writeln!(out, "Next steps:")?;
                writeln!(out, "  1. Initialize schema: .init_ns {}", ns.name)?;
                writeln!(out, "  2. Switch to it: .use {}", ns.name)?;
                writeln!(
                    out,
                    "  3. Create tables: CREATE TABLE conversations_{} (...);",
                    ns.name
                )
            }
            Err(err) => {
                let message = err.user_message();
                render::write_error(out, &message)?;
                if message.contains("already exists") {
                    writeln!(out)?;
                    writeln!(
                        out,
                        "An active nameserver with this name exists, or an inactive one could not be reactivated."
                    )?;
                    writeln!(out, "Try a different name, or check .nameservers.")?;
                }
                Ok(())
            }
        }
    }

    fn init_nameserver(&mut self, target: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        let chosen = match target {
            Some(target) => match self.find_nameserver(target, out)? {
                Some(ns) => NameserverRef::from(&ns),
                None => return writeln!(out, "Nameserver '{}' not found.", target),
            },
            None => match &self.context.nameserver {
                Some(ns) => ns.clone(),
                None => {
                    writeln!(out, "Usage: .init_ns <nameserver_name>")?;
                    writeln!(out, "Example: .init_ns name1")?;
                    writeln!(out)?;
                    return writeln!(out, "Or switch to a nameserver first: .use name1");
                }
            },
        };

        writeln!(out, "Initializing schema for nameserver '{}'...", chosen.name)?;
        let report = match self.backend.initialize_nameserver(&chosen.id) {
            Ok(report) => report,
            Err(err) => return render::write_error(out, &err.user_message()),
        };

        writeln!(out, "Schema initialized for '{}'!", chosen.name)?;
        write_initialize_report(out, &report)?;
        writeln!(out)?;
        writeln!(out, "You can now:")?;
        writeln!(out, "  .use {}  - Switch to this nameserver", chosen.name)?;
        writeln!(out, "  .tables  - See all tables")
    }

    fn drop_table(&mut self, table: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        let Some(table) = table else {
            writeln!(out, "Usage: .drop_table <table_name>")?;
            let example = self.context.nameserver_name().unwrap_or("name1");
            return writeln!(out, "Example: .drop_table conversations_{}", example);
        };

        writeln!(out, "To drop table '{}', use:", table)?;
        writeln!(out, "  DROP TABLE {};", table)?;
        writeln!(out)?;
        if (self.confirm)(&format!("Drop table '{}' now?", table)) {
            self.run_query(&format!("DROP TABLE {}", table), out)
        } else {
            writeln!(out, "Table not dropped.")
        }
    }
}

/// Shared with `ns initialize`.
pub fn write_initialize_report(out: &mut dyn Write, report: &InitializeReport) -> io::Result<()> {
    if report.tables_created > 0 {
        writeln!(out, "   Created {} tables", report.tables_created)?;
    }
    if !report.verified_tables.is_empty() {
        writeln!(out, "   Tables:")?;
        for table in &report.verified_tables {
            writeln!(out, "     - {}", table)?;
        }
    } else if report.tables_created > 0 {
        writeln!(out, "   (Tables created but list not available)")?;
    }
    if let Some(note) = report.note.as_deref().filter(|n| !n.is_empty()) {
        writeln!(out)?;
        writeln!(out, "   {}", note)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::query::decode_query_response;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        executed: RefCell<Vec<String>>,
        created: RefCell<Vec<String>>,
        initialized: RefCell<Vec<String>>,
        nameservers: Vec<Nameserver>,
        fail_queries: bool,
    }

    fn ns(id: &str, name: &str, active: bool) -> Nameserver {
        Nameserver {
            id: id.into(),
            name: name.into(),
            is_active: active,
            ..Nameserver::default()
        }
    }

    impl ShellBackend for FakeBackend {
        fn execute(&self, sql: &str) -> ApiResult<QueryResult> {
            self.executed.borrow_mut().push(sql.to_string());
            if self.fail_queries {
                return Err(ApiError::Remote {
                    code: "SQL_ERROR".into(),
                    description: Some("no such table: t".into()),
                });
            }
            Ok(decode_query_response(r#"{"columns":["id"],"rows":[["1"],["2"]]}"#).unwrap())
        }

        fn nameservers(&self) -> ApiResult<Vec<Nameserver>> {
            Ok(self.nameservers.clone())
        }

        fn create_nameserver(&self, name: &str) -> ApiResult<CreatedNameserver> {
            self.created.borrow_mut().push(name.to_string());
            Ok(CreatedNameserver {
                nameserver: ns("new-id", name, true),
                message: String::new(),
            })
        }

        fn initialize_nameserver(&self, nameserver_id: &str) -> ApiResult<InitializeReport> {
            self.initialized.borrow_mut().push(nameserver_id.to_string());
            Ok(InitializeReport {
                tables_created: 2,
                verified_tables: vec!["conversations_db1".into(), "messages_db1".into()],
                ..InitializeReport::default()
            })
        }
    }

    fn shell(backend: FakeBackend) -> Shell<FakeBackend> {
        Shell::new(
            backend,
            ShellContext {
                server_id: "srv1".into(),
                server_name: "Main".into(),
                nameserver: None,
            },
        )
        .with_confirm(|_| false)
    }

    fn feed(shell: &mut Shell<FakeBackend>, lines: &[&str]) -> (String, Vec<Flow>) {
        let mut out = Vec::new();
        let flows = lines
            .iter()
            .map(|line| shell.handle_line(line, &mut out).unwrap())
            .collect();
        (String::from_utf8(out).unwrap(), flows)
    }

    fn executed(shell: &Shell<FakeBackend>) -> Vec<String> {
        shell.backend().executed.borrow().clone()
    }

    #[test]
    fn test_blank_line_executes_joined_statement() {
        let mut sh = shell(FakeBackend::default());
        let (text, _) = feed(&mut sh, &["SELECT id", "FROM t", "WHERE server_id = ?", ""]);
        assert_eq!(executed(&sh), vec!["SELECT id FROM t WHERE server_id = ?"]);
        assert!(text.contains("Rows returned: 2"));
        assert!(!sh.has_pending_input());
    }

    #[test]
    fn test_clear_then_terminator_sends_nothing() {
        let mut sh = shell(FakeBackend::default());
        let (text, _) = feed(&mut sh, &["SELECT *", ".clear", ";", ""]);
        assert!(executed(&sh).is_empty());
        assert!(text.contains("Query cleared."));
    }

    #[test]
    fn test_only_quit_commands_end_the_loop() {
        let mut sh = shell(FakeBackend::default());
        let (_, flows) = feed(
            &mut sh,
            &["SELECT 1;", ".help", ".bogus", "", ".tables", ".ctx", "quit", "exit"],
        );
        assert!(flows.iter().all(|f| *f == Flow::Continue));

        let mut out = Vec::new();
        sh.interrupt(&mut out).unwrap();

        for quit in [".quit", ".exit", ".q", ".Q"] {
            let (text, flows) = feed(&mut sh, &[quit]);
            assert_eq!(flows, vec![Flow::Quit]);
            assert!(text.contains("Goodbye!"));
        }
    }

    #[test]
    fn test_dangling_limit_is_rejected_locally() {
        let mut sh = shell(FakeBackend::default());
        let (text, _) = feed(&mut sh, &["SELECT * FROM t LIMIT", ""]);
        assert!(executed(&sh).is_empty());
        assert!(text.contains("LIMIT requires a number"));
        assert!(text.contains("incomplete LIMIT"));
    }

    #[test]
    fn test_interrupt_clears_pending_buffer() {
        let mut sh = shell(FakeBackend::default());
        feed(&mut sh, &["SELECT *"]);
        let mut out = Vec::new();
        sh.interrupt(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Query cancelled."));
        assert!(!sh.has_pending_input());

        let mut out = Vec::new();
        sh.interrupt(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Use '.quit'"));

        feed(&mut sh, &["FROM t", ""]);
        assert_eq!(executed(&sh), vec!["FROM t"]);
    }

    #[test]
    fn test_quoted_and_prefixed_statement() {
        let mut sh = shell(FakeBackend::default());
        let (text, _) = feed(&mut sh, &["sql \"SELECT 1\";"]);
        assert_eq!(executed(&sh), vec!["SELECT 1"]);
        assert!(text.contains("don't need 'sql' prefix"));
    }

    #[test]
    fn test_unknown_command_keeps_context() {
        let mut sh = shell(FakeBackend::default());
        let (text, flows) = feed(&mut sh, &[".frob x"]);
        assert_eq!(flows, vec![Flow::Continue]);
        assert!(text.contains("Unknown command: .frob x"));
        assert!(sh.context().nameserver.is_none());
    }

    #[test]
    fn test_use_switches_on_exact_match_only() {
        let backend = FakeBackend {
            nameservers: vec![ns("id-1", "Db1", true), ns("id-2", "db2", false)],
            ..FakeBackend::default()
        };
        let mut sh = shell(backend);

        let (text, _) = feed(&mut sh, &[".use db1"]);
        assert!(text.contains("not found"));
        assert!(sh.context().nameserver.is_none());

        feed(&mut sh, &[".use Db1"]);
        assert_eq!(sh.context().nameserver.as_ref().unwrap().id, "id-1");

        feed(&mut sh, &[".use id-2"]);
        assert_eq!(sh.context().nameserver.as_ref().unwrap().name, "db2");

        let (text, _) = feed(&mut sh, &[".use", ".context"]);
        assert!(text.contains("Current nameserver: db2"));
        assert!(text.contains("Table suffix: conversations_db2"));
    }

    #[test]
    fn test_tables_marks_current_and_runs_catalog_query() {
        let backend = FakeBackend {
            nameservers: vec![ns("id-1", "db1", true), ns("id-2", "db2", true)],
            ..FakeBackend::default()
        };
        let mut sh = shell(backend);
        let (text, _) = feed(&mut sh, &[".use db2", ".tables"]);
        assert!(text.contains("→ db2"));
        assert!(text.contains("  db1"));
        assert_eq!(executed(&sh), vec![meta::TABLES_QUERY.to_string()]);
    }

    #[test]
    fn test_nameservers_split_active_and_inactive() {
        let backend = FakeBackend {
            nameservers: vec![ns("id-1", "db1", true), ns("id-2", "old", false)],
            ..FakeBackend::default()
        };
        let mut sh = shell(backend);
        let (text, _) = feed(&mut sh, &[".ns"]);
        let active = text.find("Active nameservers:").unwrap();
        let inactive = text.find("Inactive (soft-deleted)").unwrap();
        assert!(active < inactive);
        assert!(text.contains("old (ID: id-2) [inactive]"));
    }

    #[test]
    fn test_schema_escapes_table_name() {
        let mut sh = shell(FakeBackend::default());
        feed(&mut sh, &[".schema it's"]);
        assert_eq!(executed(&sh), vec![meta::schema_query("it's")]);
        assert!(executed(&sh)[0].ends_with("name = 'it''s'"));
    }

    #[test]
    fn test_drop_table_asks_first() {
        let mut sh = shell(FakeBackend::default());
        let (text, _) = feed(&mut sh, &[".drop_table notes_db1"]);
        assert!(text.contains("Table not dropped."));
        assert!(executed(&sh).is_empty());

        let mut sh = shell(FakeBackend::default()).with_confirm(|_| true);
        feed(&mut sh, &[".drop notes_db1"]);
        assert_eq!(executed(&sh), vec!["DROP TABLE notes_db1"]);
    }

    #[test]
    fn test_create_nameserver_preflight() {
        let backend = FakeBackend {
            nameservers: vec![ns("id-1", "Db1", true), ns("id-2", "gone", false)],
            ..FakeBackend::default()
        };
        let mut sh = shell(backend);

        let (text, _) = feed(&mut sh, &[".create_ns db1"]);
        assert!(text.contains("Conflict"));
        let (text, _) = feed(&mut sh, &[".create_ns Db1"]);
        assert!(text.contains("already exists and is active"));
        assert!(sh.backend().created.borrow().is_empty());

        let (text, _) = feed(&mut sh, &[".create_ns gone", ".create_nameserver fresh"]);
        assert!(text.contains("reactivated"));
        assert!(text.contains("Nameserver 'fresh' created successfully!"));
        assert_eq!(*sh.backend().created.borrow(), vec!["gone", "fresh"]);
    }

    #[test]
    fn test_init_uses_current_nameserver_by_default() {
        let backend = FakeBackend {
            nameservers: vec![ns("id-1", "db1", true)],
            ..FakeBackend::default()
        };
        let mut sh = shell(backend);

        let (text, _) = feed(&mut sh, &[".init_ns"]);
        assert!(text.contains("Usage: .init_ns"));

        let (text, _) = feed(&mut sh, &[".use db1", ".initialize"]);
        assert!(text.contains("Created 2 tables"));
        assert!(text.contains("- messages_db1"));
        assert_eq!(*sh.backend().initialized.borrow(), vec!["id-1"]);

        let (text, _) = feed(&mut sh, &[".init_ns missing"]);
        assert!(text.contains("Nameserver 'missing' not found."));
    }

    #[test]
    fn test_query_errors_print_hint_and_continue() {
        let mut sh = shell(FakeBackend {
            fail_queries: true,
            ..FakeBackend::default()
        });
        let (text, flows) = feed(&mut sh, &["SELECT * FROM t;"]);
        assert_eq!(flows, vec![Flow::Continue]);
        assert!(text.contains("Error: SQL_ERROR: no such table: t"));
        assert!(text.contains("nameserver suffix"));
    }

    #[test]
    fn test_live_backend_reports_local_rejection() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let scope = ServerScope::new(client, "tok", "bad project", "srv1");
        let err = scope.execute("SELECT 1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let mut sh = Shell::new(
            scope,
            ShellContext {
                server_id: "srv1".into(),
                server_name: "Main".into(),
                nameserver: None,
            },
        );
        let mut out = Vec::new();
        sh.handle_line("SELECT 1;", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Error: invalid project ID"));
    }

    #[test]
    fn test_banner_mentions_nameserver() {
        let mut ctx_shell = shell(FakeBackend::default());
        ctx_shell.context.nameserver = Some(NameserverRef {
            id: "id-1".into(),
            name: "db1".into(),
        });
        let mut out = Vec::new();
        ctx_shell.write_banner(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Connected to Main (nameserver: db1)"));
        assert!(text.contains("conversations_db1"));
    }
}
