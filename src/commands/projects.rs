// `flux-relay pr`: list projects, show the current one or select one.

use anyhow::{bail, Result};
use std::io;

use super::{api_failure, find_by_id_or_name, Session};
use crate::api::Project;
use crate::cli::{join_words, ProjectsArgs, ProjectsCommand};
use crate::render::{self, Table};
use crate::settings::Settings;
use crate::ui;

pub fn run(settings: &Settings, args: ProjectsArgs) -> Result<()> {
    let mut session = Session::open(settings)?;
    match (args.command, join_words(&args.target)) {
        (Some(ProjectsCommand::List), _) => list(&session),
        (None, None) => show_current(&session),
        (None, Some(target)) => select(&mut session, &target),
    }
}

fn fetch(session: &Session) -> Result<Vec<Project>> {
    let pb = ui::spinner("Fetching projects...");
    let res = session.client.list_projects(session.token());
    pb.finish_and_clear();
    res.map_err(|e| api_failure("Failed to list projects", e))
}

fn list(session: &Session) -> Result<()> {
    let projects = fetch(session)?;
    if projects.is_empty() {
        println!("No projects found.");
        println!();
        println!("Create a project using the web dashboard or API.");
        return Ok(());
    }

    println!("Found {} project(s):", projects.len());
    println!();
    project_table(&projects).write_to(&mut io::stdout())?;
    println!();
    Ok(())
}

pub(crate) fn project_table(projects: &[Project]) -> Table {
    let mut table = Table::new(["ID", "NAME", "DESCRIPTION", "CREATED", "STATUS"]);
    for p in projects {
        table.push_row(vec![
            p.id.clone(),
            p.name.clone(),
            render::truncate(&p.description, 40),
            render::short_date(&p.created_at),
            render::status_label(p.is_active).to_string(),
        ]);
    }
    table
}

fn show_current(session: &Session) -> Result<()> {
    let Some(selected) = session.config.selected_project_id.clone() else {
        println!("No project selected.");
        println!();
        println!("Select a project using:");
        println!("  flux-relay pr <project-name-or-id>");
        println!();
        println!("Or list available projects:");
        println!("  flux-relay pr list");
        return Ok(());
    };

    let projects = fetch(session)?;
    match projects.iter().find(|p| p.id == selected) {
        Some(project) => {
            println!("Current project: {} ({})", project.name, project.id);
            if !project.description.is_empty() {
                println!("Description: {}", project.description);
            }
        }
        None => {
            ui::warning(&format!("Selected project (ID: {}) not found.", selected));
            println!("Please select a different project.");
        }
    }
    Ok(())
}

fn select(session: &mut Session, target: &str) -> Result<()> {
    let projects = fetch(session)?;
    let found = find_by_id_or_name(&projects, target, |p| p.id.as_str(), |p| p.name.as_str());
    let Some(project) = found else {
        bail!(
            "project '{}' not found. Use 'flux-relay pr list' to see available projects",
            target
        );
    };

    session.update(|c| c.select_project(&project.id))?;
    ui::success(&format!("Selected project: {} ({})", project.name, project.id));
    if !project.description.is_empty() {
        println!("   Description: {}", project.description);
    }
    ui::next_steps(&["flux-relay server list"]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_table_rows() {
        let projects: Vec<Project> = serde_json::from_str(
            r#"[
                {"id":"56OSXXQH","name":"Chat","description":"","createdAt":"2024-03-01T10:00:00Z","isActive":true},
                {"id":"P2","name":"Old","description":"a very long description that keeps going and going","isActive":false}
            ]"#,
        )
        .unwrap();
        let table = project_table(&projects);
        assert_eq!(table.len(), 2);

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("2024-03-01"));
        assert!(lines[2].contains("Active"));
        assert!(lines[3].contains("Inactive"));
        assert!(lines[3].contains("..."));
    }
}
