// `flux-relay sql <query...>`: one-shot query against the selected server.
// Unlike the shell, a failed query makes the command fail.

use anyhow::{bail, Result};
use std::io::{self, Write};

use super::{api_failure, Session};
use crate::error::ApiError;
use crate::query::QueryResult;
use crate::render;
use crate::settings::Settings;
use crate::ui;

pub fn run(settings: &Settings, words: &[String]) -> Result<()> {
    let session = Session::open(settings)?;
    let project_id = session.project_id()?;
    let server_id = session.server_id()?;

    let query = words.join(" ");
    let query = query.trim();
    if query.is_empty() {
        bail!("query required");
    }

    let pb = ui::spinner("Executing query...");
    let res = session
        .client
        .execute_query(session.token(), project_id, server_id, query);
    pb.finish_and_clear();
    let result = res.map_err(|e| request_failure(&mut io::stderr(), e))?;

    let mut out = io::stdout();
    write_report(&mut out, &mut io::stderr(), &result, session.nameserver_id().is_some())?;
    out.flush()?;
    Ok(())
}

fn write_hint(err_out: &mut dyn Write, message: &str) {
    if let Some(hint) = render::error_hint(message) {
        for line in hint {
            let _ = writeln!(err_out, "{}", line);
        }
    }
}

/// A rejected request gets the same hints as a failed result body.
fn request_failure(err_out: &mut dyn Write, err: ApiError) -> anyhow::Error {
    write_hint(err_out, &err.to_string());
    api_failure("query failed", err)
}

/// Render a result, turning `success: false` into an error.
fn write_report(
    out: &mut dyn Write,
    err_out: &mut dyn Write,
    result: &QueryResult,
    nameserver_selected: bool,
) -> Result<()> {
    if !result.success {
        match result.error_message.as_deref() {
            Some(message) => {
                write_hint(err_out, message);
                bail!("query error: {}", message)
            }
            None => bail!("query failed"),
        }
    }

    render::write_result(out, result)?;
    if nameserver_selected {
        writeln!(out)?;
        writeln!(out, "Note: Using selected nameserver context")?;
    }
    Ok(())
}
