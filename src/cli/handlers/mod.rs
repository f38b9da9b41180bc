mod projects;

use std::path::Path;
use std::time::Duration;

use crate::app::{PersistStatus, ReloadOutcome, Session, Workspace};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::progress_store::ProgressStore;
use crate::io::registry;
use crate::io::watcher::FileWatcher;
use crate::model::document::Document;
use crate::parse::reconstruct;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;

    // Config commands must work even when the config file is broken
    if let Commands::Config(args) = cli.command {
        return projects::cmd_config(args, json);
    }

    let config = config_io::read_config()?;
    let store = ProgressStore::from_config(&config, cli.store_dir.as_deref().map(Path::new));
    let mut ws = Workspace::new(config, store, registry::registry_path());

    match cli.command {
        Commands::Show(args) => cmd_show(&mut ws, args, json),
        Commands::Check(args) => cmd_set_checked(&mut ws, args, true, json),
        Commands::Uncheck(args) => cmd_set_checked(&mut ws, args, false, json),
        Commands::Toggle(args) => cmd_toggle(&mut ws, args, json),
        Commands::Stats(args) => cmd_stats(&mut ws, args, json),
        Commands::Next(args) => cmd_next(&mut ws, args, json),
        Commands::Reconstruct(args) => cmd_reconstruct(&mut ws, args, json),
        Commands::Watch(args) => cmd_watch(&mut ws, args, json),
        Commands::Projects(args) => projects::cmd_projects(&ws, args, json),
        Commands::Config(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve an item given as an exact ID or a 0-based position.
fn resolve_item(doc: &Document, spec: &str) -> Result<String, String> {
    if let Some(item) = doc.item(spec) {
        return Ok(item.id.clone());
    }
    spec.parse::<usize>()
        .ok()
        .and_then(|pos| doc.items().get(pos))
        .map(|item| item.id.clone())
        .ok_or_else(|| format!("no item '{}' in {}", spec, doc.filename))
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write pending progress and turn the outcome into a message or error.
fn finish_save(session: &Session) -> Result<String, Box<dyn std::error::Error>> {
    match session.flush() {
        None | Some(PersistStatus::Saved) => Ok("saved".to_string()),
        Some(PersistStatus::SnapshotOnly) => Ok("progress only".to_string()),
        Some(PersistStatus::Conflict) => {
            eprintln!(
                "warning: {} changed on disk; progress saved, file left untouched",
                session.path().display()
            );
            Ok("conflict".to_string())
        }
        Some(PersistStatus::Failed(e)) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(ws: &mut Workspace, args: ShowArgs, json: bool) -> CmdResult {
    let session = ws.open(Path::new(&args.file))?;
    let doc = session.document();
    let items = if args.all {
        doc.items().iter().collect()
    } else {
        doc.visible_items()
    };

    if json {
        return print_json(&document_to_json(doc, &items));
    }

    println!("{}", format_summary(doc));
    if !items.is_empty() {
        println!();
    }
    for item in items {
        println!("{}", format_item_line(doc, item));
    }
    Ok(())
}

fn cmd_stats(ws: &mut Workspace, args: FileArg, json: bool) -> CmdResult {
    let session = ws.open(Path::new(&args.file))?;
    let doc = session.document();
    if json {
        return print_json(&stats_to_json(doc));
    }
    println!("{}", format_summary(doc));
    for line in format_header_stats(doc) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_next(ws: &mut Workspace, args: NextArgs, json: bool) -> CmdResult {
    let session = ws.open(Path::new(&args.file))?;
    let doc = session.document();
    let next = doc.next_items(args.count);
    if json {
        return print_json(&next_to_json(doc, &next));
    }

    match next.last_completed {
        Some(item) => println!("Last completed: {}", item.text),
        None => println!("Nothing completed yet."),
    }
    if next.upcoming.is_empty() {
        println!("All done.");
        return Ok(());
    }
    println!();
    for item in &next.upcoming {
        println!("{}", format_item_line(doc, item));
    }
    Ok(())
}

fn cmd_reconstruct(ws: &mut Workspace, args: FileArg, json: bool) -> CmdResult {
    let session = ws.open(Path::new(&args.file))?;
    let markdown = reconstruct(session.document().items());
    if json {
        #[derive(serde::Serialize)]
        struct MarkdownJson<'a> {
            file: &'a str,
            markdown: &'a str,
        }
        return print_json(&MarkdownJson {
            file: &session.document().filename,
            markdown: &markdown,
        });
    }
    println!("{}", markdown);
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_set_checked(ws: &mut Workspace, args: CheckArgs, value: bool, json: bool) -> CmdResult {
    let path = Path::new(&args.file);
    let session = ws.open(path)?;

    // Resolve everything before touching anything
    let mut ids = Vec::new();
    for spec in &args.items {
        let id = resolve_item(session.document(), spec)?;
        let is_checkbox = session.document().item(&id).is_some_and(|item| item.is_checkbox());
        if !is_checkbox {
            return Err(format!("item '{}' is not a checkbox", spec).into());
        }
        ids.push(id);
    }

    for id in &ids {
        session.set_checked(id, value);
    }
    let saved = finish_save(session)?;
    let doc = session.document();

    if json {
        print_json(&ChangeJson {
            file: doc.filename.clone(),
            changed: ids,
            percentage: doc.completion_percentage(),
            saved,
        })?;
    } else {
        let verb = if value { "Checked" } else { "Unchecked" };
        for id in &ids {
            if let Some(item) = doc.item(id) {
                println!("{}: {}", verb, item.text);
            }
        }
        println!("{}", format_summary(doc));
    }

    ws.close(path);
    Ok(())
}

fn cmd_toggle(ws: &mut Workspace, args: ToggleArgs, json: bool) -> CmdResult {
    let path = Path::new(&args.file);
    let session = ws.open(path)?;
    let id = resolve_item(session.document(), &args.header)?;
    if !session.toggle_header(&id) {
        return Err(format!("item '{}' is not a header", args.header).into());
    }
    finish_save(session)?;

    let doc = session.document();
    let expanded = doc.is_expanded(&id);
    if json {
        if let Some(item) = doc.item(&id) {
            print_json(&item_to_json(doc, item))?;
        }
    } else if let Some(item) = doc.item(&id) {
        let verb = if expanded { "Expanded" } else { "Collapsed" };
        println!("{}: {}", verb, item.text);
    }

    ws.close(path);
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

fn cmd_watch(ws: &mut Workspace, args: FileArg, json: bool) -> CmdResult {
    let session = ws.open(Path::new(&args.file))?;
    let watcher = FileWatcher::start(session.path())?;
    report_progress(session.document(), json)?;

    loop {
        if !watcher.wait(Duration::from_secs(1)) || !session.file_changed_on_disk() {
            continue;
        }
        session.mark_external_change();
        session.request_reload();
        match session.wait_reload(Duration::from_secs(10)) {
            Some(ReloadOutcome::Applied { .. }) => report_progress(session.document(), json)?,
            Some(ReloadOutcome::Failed(e)) => eprintln!("warning: {}", e),
            None => eprintln!("warning: reload of {} timed out", watcher.path().display()),
        }
    }
}

fn report_progress(doc: &Document, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string(&stats_to_json(doc))?);
    } else {
        println!("{}", format_summary(doc));
    }
    Ok(())
}
