// Dot-commands understood by the shell. The command word is matched
// case-insensitively; arguments keep their case. Commands that take an
// argument are also recognised by prefix (`.use`, `.schema`, `.create*`,
// `.init*`, `.drop*`, `.alter*`), checked after the exact names.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Examples,
    Quit,
    Clear,
    Context,
    Tables,
    Nameservers,
    Use(Option<String>),
    CreateNameserver(Option<String>),
    InitNameserver(Option<String>),
    Schema(Option<String>),
    CreateTable(Option<String>),
    DropTable(Option<String>),
    AlterTable,
    Unknown(String),
}

impl MetaCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());
        let first_word = || rest.split_whitespace().next().map(str::to_string);

        match word.to_ascii_lowercase().as_str() {
            ".help" | ".h" => MetaCommand::Help,
            ".examples" | ".ex" => MetaCommand::Examples,
            ".quit" | ".exit" | ".q" => MetaCommand::Quit,
            ".clear" | ".c" => MetaCommand::Clear,
            ".context" | ".ctx" => MetaCommand::Context,
            ".tables" => MetaCommand::Tables,
            ".nameservers" | ".ns" => MetaCommand::Nameservers,
            lower => Self::by_prefix(lower, arg, first_word())
                .unwrap_or_else(|| MetaCommand::Unknown(line.to_string())),
        }
    }

    /// Order matters: `.create_ns` must be tried before `.create`.
    fn by_prefix(word: &str, arg: Option<String>, first_word: Option<String>) -> Option<Self> {
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| word.starts_with(p));
        let command = if starts(&[".use"]) {
            MetaCommand::Use(arg)
        } else if starts(&[".create_ns", ".create_nameserver"]) {
            MetaCommand::CreateNameserver(arg)
        } else if starts(&[".init_ns", ".init_nameserver", ".initialize"]) {
            MetaCommand::InitNameserver(arg)
        } else if starts(&[".schema"]) {
            MetaCommand::Schema(first_word)
        } else if starts(&[".create_table", ".create"]) {
            MetaCommand::CreateTable(arg)
        } else if starts(&[".drop_table", ".drop"]) {
            MetaCommand::DropTable(first_word)
        } else if starts(&[".alter_table", ".alter"]) {
            MetaCommand::AlterTable
        } else {
            return None;
        };
        Some(command)
    }
}

pub const TABLES_QUERY: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// Catalog lookup for one table's DDL.
pub fn schema_query(table: &str) -> String {
    format!(
        "SELECT sql FROM sqlite_master WHERE type='table' AND name = '{}'",
        table.replace('\'', "''")
    )
}

pub const HELP: &str = "\
Available commands:
  .help, .h              Show this help message
  .examples, .ex         Show example queries and operations
  .quit, .exit, .q       Exit the shell
  .clear, .c             Clear the current query
  .context, .ctx         Show current context (server/nameserver)
  .tables                List all tables
  .schema <table>        Show schema for a table
  .nameservers, .ns      List available nameservers
  .use <nameserver>      Switch to a nameserver context
  .create_ns <name>      Create a new nameserver
  .init_ns <name>        Initialize schema for a nameserver
  .create_table [name]   Show how to create a table
  .drop_table <name>     Drop a table
  .alter_table           Show how to alter a table

SQL queries:
  Enter SQL queries directly. End with semicolon (;) or empty line to execute.
  Multi-line queries are supported.

Table naming:
  Tables are named with nameserver suffix: conversations_{nameserver_name}
  Example: If nameserver is 'name1', use 'conversations_name1'
  Use .tables to see all available tables

Security:
  You can only create/modify tables for your server's nameservers
  System/platform tables are not accessible

Type '.examples' for example queries and operations";

pub const EXAMPLES: &str = "\
Example queries (replace 'name1' with your nameserver):

Listing data:
  .tables
  .schema conversations_name1
  SELECT * FROM conversations_name1 WHERE server_id = ? LIMIT 10;
  SELECT COUNT(*) as total FROM conversations_name1 WHERE server_id = ?;
  SELECT id, created_at, title FROM conversations_name1
    WHERE server_id = ? ORDER BY created_at DESC LIMIT 5;

Joins:
  SELECT c.id, c.title, COUNT(m.id) as message_count
  FROM conversations_name1 c
  LEFT JOIN messages_name1 m ON c.id = m.conversation_id
  WHERE c.server_id = ?
  GROUP BY c.id LIMIT 10;

Inserting data:
  INSERT INTO conversations_name1 (id, server_id, title, created_at)
  VALUES ('conv_123', ?, 'My Conversation', datetime('now'));

Updating data:
  UPDATE conversations_name1 SET title = 'Updated Title'
  WHERE id = 'conv_123' AND server_id = ?;

Deleting data:
  DELETE FROM conversations_name1 WHERE id = 'conv_123' AND server_id = ?;

Table management:
  CREATE TABLE custom_products_name1 (
    id TEXT PRIMARY KEY,
    server_id TEXT NOT NULL,
    name TEXT,
    price REAL
  );
  ALTER TABLE conversations_name1 ADD COLUMN status TEXT DEFAULT 'active';
  CREATE INDEX idx_conversations_name1_status ON conversations_name1(status);
  DROP TABLE custom_products_name1;

Notes:
  All queries must include 'WHERE server_id = ?' for data isolation
  Table names follow the pattern {baseName}_{nameserverName}
  Temporary tables ending with _new, _old, _temp or _backup are allowed for migrations";

/// Guidance for `.create_table`, depending on the argument and context.
pub fn create_table_guide(table: Option<&str>, nameserver: Option<&str>) -> String {
    match (table, nameserver) {
        (Some(table), Some(ns)) => format!(
            "To create table '{table}' for nameserver '{ns}', use:\n  \
             CREATE TABLE {table}_{ns} (id TEXT PRIMARY KEY, server_id TEXT, ...);\n\n\
             Note: Table names must follow the pattern: {{baseName}}_{{nameserverName}}"
        ),
        (Some(table), None) => format!(
            "To create table '{table}', first switch to a nameserver:\n  \
             .use <nameserver>\n\n\
             Then create the table:\n  \
             CREATE TABLE {table}_<nameserver> (id TEXT PRIMARY KEY, server_id TEXT, ...);"
        ),
        (None, Some(ns)) => format!(
            "To create a table, use SQL directly:\n  \
             CREATE TABLE my_table_{ns} (id TEXT PRIMARY KEY, server_id TEXT, data TEXT);\n\n\
             Current nameserver: {ns}\n\n\
             Note: Table names must follow the pattern: {{baseName}}_{{nameserverName}}"
        ),
        (None, None) => "To create a table, use SQL directly:\n  \
             CREATE TABLE my_table_<nameserver> (id TEXT PRIMARY KEY, server_id TEXT, ...);\n\n\
             First switch to a nameserver: .use <nameserver>\n\n\
             Note: Table names must follow the pattern: {baseName}_{nameserverName}"
            .to_string(),
    }
}

pub fn alter_table_guide(nameserver: Option<&str>) -> String {
    let body = match nameserver {
        Some(ns) => format!(
            "Current nameserver: {ns}\n\n\
             Common schema customizations:\n  \
             ALTER TABLE conversations_{ns} ADD COLUMN priority INTEGER DEFAULT 0;\n  \
             ALTER TABLE messages_{ns} ADD COLUMN edited_at TEXT;\n  \
             ALTER TABLE end_users_{ns} ADD COLUMN avatar_url TEXT;\n  \
             ALTER TABLE conversations_{ns} RENAME COLUMN name TO title;\n  \
             CREATE INDEX idx_conversations_{ns}_priority ON conversations_{ns}(priority);\n\n\
             SQLite cannot change a column type in place. Create conversations_{ns}_new,\n\
             copy the rows over, drop the old table and rename the new one."
        ),
        None => "To alter a table, use SQL directly:\n  \
             ALTER TABLE conversations_name1 ADD COLUMN new_field TEXT;\n  \
             ALTER TABLE conversations_name1 RENAME COLUMN old_field TO new_field;\n\n\
             First switch to a nameserver: .use <nameserver>"
            .to_string(),
    };
    format!(
        "{body}\n\n\
         Note: You can only alter tables that belong to your server's nameservers.\n      \
         Use .schema <table> to see current table structure."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        for quit in [".quit", ".exit", ".q", ".QUIT", "  .Exit  "] {
            assert_eq!(MetaCommand::parse(quit), MetaCommand::Quit, "{}", quit);
        }
        assert_eq!(MetaCommand::parse(".ctx"), MetaCommand::Context);
        assert_eq!(MetaCommand::parse(".ns"), MetaCommand::Nameservers);
        assert_eq!(MetaCommand::parse(".initialize"), MetaCommand::InitNameserver(None));
        assert_eq!(
            MetaCommand::parse(".create_nameserver db2"),
            MetaCommand::CreateNameserver(Some("db2".into()))
        );
    }

    #[test]
    fn test_arguments_keep_case() {
        assert_eq!(
            MetaCommand::parse(".USE MyNs"),
            MetaCommand::Use(Some("MyNs".into()))
        );
        assert_eq!(
            MetaCommand::parse(".schema Conversations_Name1 extra"),
            MetaCommand::Schema(Some("Conversations_Name1".into()))
        );
        assert_eq!(MetaCommand::parse(".use"), MetaCommand::Use(None));
    }

    #[test]
    fn test_unknown_keeps_line() {
        assert_eq!(
            MetaCommand::parse(".frobnicate now"),
            MetaCommand::Unknown(".frobnicate now".into())
        );
        assert_eq!(
            MetaCommand::parse(".tablesx"),
            MetaCommand::Unknown(".tablesx".into())
        );
    }

    #[test]
    fn test_argument_commands_match_by_prefix() {
        assert_eq!(
            MetaCommand::parse(".users Db1"),
            MetaCommand::Use(Some("Db1".into()))
        );
        assert_eq!(
            MetaCommand::parse(".create_ns2 fresh"),
            MetaCommand::CreateNameserver(Some("fresh".into()))
        );
        assert_eq!(
            MetaCommand::parse(".createtable notes"),
            MetaCommand::CreateTable(Some("notes".into()))
        );
        assert_eq!(
            MetaCommand::parse(".init_nsx db1"),
            MetaCommand::InitNameserver(Some("db1".into()))
        );
        assert_eq!(
            MetaCommand::parse(".Schemas t1 t2"),
            MetaCommand::Schema(Some("t1".into()))
        );
        assert_eq!(
            MetaCommand::parse(".DROPPED notes_db1"),
            MetaCommand::DropTable(Some("notes_db1".into()))
        );
        assert_eq!(MetaCommand::parse(".alternate"), MetaCommand::AlterTable);
        // Exact names still win over prefixes.
        assert_eq!(MetaCommand::parse(".ns"), MetaCommand::Nameservers);
        assert_eq!(MetaCommand::parse(".c"), MetaCommand::Clear);
    }

    #[test]
    fn test_schema_query_escapes_quotes() {
        assert_eq!(
            schema_query("o'brien"),
            "SELECT sql FROM sqlite_master WHERE type='table' AND name = 'o''brien'"
        );
    }

    #[test]
    fn test_guides_mention_nameserver() {
        assert!(create_table_guide(Some("notes"), Some("name1")).contains("notes_name1"));
        assert!(create_table_guide(None, None).contains(".use <nameserver>"));
        assert!(alter_table_guide(Some("db2")).contains("conversations_db2"));
    }
}
