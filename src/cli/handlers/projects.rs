use std::path::{Path, PathBuf};

use crate::app::Workspace;
use crate::cli::commands::*;
use crate::cli::output::project_to_json;
use crate::io::config_io;
use crate::io::document_io::{display_name, load_document};
use crate::io::registry;
use crate::model::config::SortKey;
use crate::model::id::path_identity;
use crate::ops::project_ops::{ProjectSummary, sort_projects};
use crate::util::text::{display_width, pad_to_width};

use super::{CmdResult, print_json};

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub(super) fn cmd_projects(ws: &Workspace, args: ProjectsCmd, json: bool) -> CmdResult {
    match args.action {
        None => cmd_projects_list(ws, ProjectsListArgs::default(), json),
        Some(ProjectsAction::List(a)) => cmd_projects_list(ws, a, json),
        Some(ProjectsAction::Add(a)) => cmd_projects_add(ws, a),
        Some(ProjectsAction::Remove(a)) => cmd_projects_remove(ws, a),
    }
}

fn cmd_projects_list(ws: &Workspace, args: ProjectsListArgs, json: bool) -> CmdResult {
    let reg = registry::read_registry_from(ws.registry_path());
    let key = match args.sort {
        Some(ref s) => s.parse::<SortKey>()?,
        None => ws.config.projects.sort,
    };
    let ascending = if args.asc {
        true
    } else if args.desc {
        false
    } else {
        ws.config.projects.ascending
    };

    let mut summaries: Vec<ProjectSummary> = reg
        .projects
        .iter()
        .map(|entry| {
            let path = PathBuf::from(&entry.path);
            let progress = load_document(&path, ws.store(), &ws.config.matching)
                .ok()
                .map(|doc| doc.completion_percentage());
            ProjectSummary {
                name: entry.name.clone(),
                path,
                progress,
                last_accessed: entry.last_accessed,
            }
        })
        .collect();
    sort_projects(&mut summaries, key, ascending);

    if json {
        let items: Vec<_> = summaries.iter().map(project_to_json).collect();
        return print_json(&items);
    }

    if summaries.is_empty() {
        println!("No checklists tracked.");
        println!();
        println!("Run `tally projects add <file>` or open one with `tally show <file>`.");
        return Ok(());
    }

    let name_w = summaries
        .iter()
        .map(|s| display_width(&s.name))
        .max()
        .unwrap_or(0)
        .max(4);

    for summary in &summaries {
        let path_display = if summary.path.exists() {
            registry::abbreviate_path(&summary.path.to_string_lossy())
        } else {
            "(not found)".to_string()
        };
        let progress = summary
            .progress
            .map(|p| format!("{:>5.1}%", p))
            .unwrap_or_else(|| "     -".to_string());
        let time_str = summary
            .last_accessed
            .map(|dt| registry::relative_time(&dt))
            .unwrap_or_default();
        println!(
            "  {}  {}  {:<30}  {}",
            pad_to_width(&summary.name, name_w),
            progress,
            path_display,
            time_str
        );
    }
    Ok(())
}

fn cmd_projects_add(ws: &Workspace, args: ProjectsAddArgs) -> CmdResult {
    let abs_path = std::fs::canonicalize(&args.path)
        .map_err(|e| format!("cannot resolve path '{}': {}", args.path, e))?;
    if !abs_path.is_file() {
        return Err(format!("not a file: {}", abs_path.display()).into());
    }
    // Refuse files that cannot be read as a checklist
    load_document(&abs_path, ws.store(), &ws.config.matching)?;

    let name = display_name(&abs_path);
    if registry::register_project_in(ws.registry_path(), &name, &abs_path) {
        println!("Added: {} ({})", name, abs_path.display());
    } else {
        println!("Already tracked: {} ({})", name, abs_path.display());
    }
    Ok(())
}

fn cmd_projects_remove(ws: &Workspace, args: ProjectsRemoveArgs) -> CmdResult {
    match registry::remove_project_from(ws.registry_path(), &args.name_or_path) {
        Ok(Some(entry)) => {
            ws.store().remove(&path_identity(Path::new(&entry.path)))?;
            println!("Removed: {}", entry.name);
            Ok(())
        }
        Ok(None) => Err(format!("not found: {}", args.name_or_path).into()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

pub(super) fn cmd_config(args: ConfigCmd, json: bool) -> CmdResult {
    let path = config_io::config_path();
    match args.action {
        None | Some(ConfigAction::Show) => {
            let config = config_io::read_config_from(&path)?;
            if json {
                return print_json(&config);
            }
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some(ConfigAction::Set(a)) => {
            config_io::set_config_value(&path, &a.key, &a.value)?;
            println!("Set {} = {}", a.key, a.value);
            Ok(())
        }
    }
}
