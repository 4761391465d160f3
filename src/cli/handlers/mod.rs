mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::project_io::{self, Project, ProjectError};
use crate::model::item::{DAY_KEY_FORMAT, Item, Membership};
use crate::ops::move_ops::{self, DropTarget};
use crate::ops::check;
use crate::state::{DeletionEvent, Session, SessionEvent, Ticket};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let start = start_dir(cli.project_dir.as_deref())?;

    match cli.command {
        Commands::Init(args) => cmd_init(args, &start),

        // Read commands
        Commands::List(args) => cmd_list(args, &start, json),
        Commands::Check => cmd_check(&start, json),
        Commands::Config(cmd) => cmd_config(cmd, &start),

        // Gestures
        Commands::Mv(args) => cmd_mv(args, &start, json).await,
        Commands::Schedule(args) => cmd_schedule(args, &start, json).await,
        Commands::Shift(args) => cmd_grid(args, false, &start, json).await,
        Commands::Resize(args) => cmd_grid(args, true, &start, json).await,
        Commands::Unschedule(args) => cmd_unschedule(args, &start, json).await,
        Commands::Rm(args) => cmd_rm(args, &start, json).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The directory project discovery starts from: `-C` if given, else cwd
fn start_dir(project_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match project_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

fn load_project_at(start: &Path) -> Result<Project, ProjectError> {
    let root = project_io::discover_project(start)?;
    project_io::load_project(&root)
}

fn open_session(project: &Project) -> Result<Session, ProjectError> {
    let items = project.load_items()?;
    Ok(Session::new(items, Arc::new(project.store()), &project.config))
}

fn require_item<'a>(session: &'a Session, id: &str) -> Result<&'a Item, String> {
    session
        .item(id)
        .ok_or_else(|| format!("item not found: {}", id))
}

/// Wait for a gesture's writes to settle. Returns false if the gesture
/// produced nothing to write.
async fn settle(session: &mut Session, ticket: Option<Ticket>) -> Result<bool, Box<dyn std::error::Error>> {
    if ticket.is_none() {
        return Ok(false);
    }
    while let Some(event) = session.next_event().await {
        if let SessionEvent::Settled(Err(rolled_back)) = event {
            return Err(format!("could not save changes: {}", rolled_back.error).into());
        }
    }
    Ok(true)
}

fn print_item(item: &Item) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_at(start)?;
    let items = project.load_items()?;

    let keys = match args.key {
        Some(key) => vec![key],
        None => {
            let mut keys = move_ops::container_keys(&items, args.by);
            if args.by == Membership::Day {
                keys.sort();
            }
            keys
        }
    };
    let containers: Vec<(String, Vec<Item>)> = keys
        .into_iter()
        .map(|key| {
            let members = move_ops::container(&items, args.by, &key);
            (key, members)
        })
        .collect();

    if json {
        let results: Vec<ContainerJson> = containers
            .iter()
            .map(|(key, members)| ContainerJson {
                membership: args.by,
                container: key,
                items: members,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if containers.is_empty() {
        println!("no items grouped by {}", args.by);
    } else {
        let mut first = true;
        for (key, members) in &containers {
            if !first {
                println!();
            }
            first = false;
            for line in format_container(args.by, key, members) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn cmd_check(start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_at(start)?;
    let items = project.load_items()?;
    let result = check::check_items(&items, &project.config.grid);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in format_check(&result) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_config(cmd: ConfigCmd, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match cmd.action {
        ConfigAction::Get(args) => {
            let project = load_project_at(start)?;
            match args.key {
                Some(key) => println!("{}", config_io::get_value(&project.config, &key)?),
                None => {
                    for key in config_io::KNOWN_KEYS {
                        println!("{} = {}", key, config_io::get_value(&project.config, key)?);
                    }
                }
            }
        }
        ConfigAction::Set(args) => {
            // a board with a broken grid can still be repaired here
            let dir = project_io::discover_project(start)?.join(project_io::PROJECT_DIR);
            let (_, mut doc) = config_io::read_config(&dir)?;
            config_io::set_value(&mut doc, &args.key, &args.value)?;
            config_io::write_config(&dir, &doc)?;
            println!("{} = {}", args.key, args.value);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Gesture handlers
// ---------------------------------------------------------------------------

async fn cmd_mv(args: MvArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_at(start)?;
    let mut session = open_session(&project)?;

    let item = require_item(&session, &args.id)?;
    let container = match args.to {
        Some(to) => to,
        None => args
            .by
            .key_of(item)
            .ok_or_else(|| format!("{} has no {}; pass --to", args.id, args.by))?,
    };
    if args.by == Membership::Day && NaiveDate::parse_from_str(&container, DAY_KEY_FORMAT).is_err() {
        return Err(format!("invalid day '{}' (expected YYYY-MM-DD)", container).into());
    }

    let target = match (args.before, args.after) {
        (Some(before), _) => DropTarget::before(&container, before),
        (None, Some(after)) => DropTarget::after(&container, after),
        (None, None) => DropTarget::end_of(&container),
    };
    if let Some((over, _)) = &target.over {
        if *over == args.id {
            return Err("cannot place an item relative to itself".into());
        }
        let present = session
            .container(args.by, &container)
            .iter()
            .any(|member| member.id == *over);
        if !present {
            return Err(format!("{} is not in {}", over, container).into());
        }
    }

    let ticket = session.move_item(args.by, &args.id, &target);
    let changed = settle(&mut session, ticket).await?;

    let members = session.container(args.by, &container);
    if json {
        let result = ContainerJson {
            membership: args.by,
            container: &container,
            items: &members,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !changed {
            println!("{} is already in place", args.id);
        }
        for line in format_container(args.by, &container, &members) {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn cmd_schedule(args: ScheduleArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(&args.day, DAY_KEY_FORMAT)
        .map_err(|_| format!("invalid day '{}' (expected YYYY-MM-DD)", args.day))?;
    let time = NaiveTime::parse_from_str(&args.at, "%H:%M")
        .map_err(|_| format!("invalid time '{}' (expected HH:MM)", args.at))?;
    let minute = (time.hour() * 60 + time.minute()) as i32;

    let project = load_project_at(start)?;
    let mut session = open_session(&project)?;
    require_item(&session, &args.id)?;

    let ticket = session.place_at(&args.id, &args.day, minute);
    settle(&mut session, ticket).await?;
    report_placement(&session, &args.id, json)
}

async fn cmd_grid(args: GridArgs, resize: bool, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_at(start)?;
    let mut session = open_session(&project)?;
    require_item(&session, &args.id)?;

    let drag = if resize {
        session.begin_grid_resize(&args.id, 0.0)
    } else {
        session.begin_grid_move(&args.id, 0.0)
    };
    let mut drag = drag.ok_or_else(|| format!("{} is not scheduled", args.id))?;
    drag.update_by_minutes(session.grid(), f64::from(args.minutes));

    let ticket = session.commit_grid(drag);
    if !settle(&mut session, ticket).await? && !json {
        println!("{} unchanged", args.id);
    }
    report_placement(&session, &args.id, json)
}

async fn cmd_unschedule(args: IdArg, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_at(start)?;
    let mut session = open_session(&project)?;
    require_item(&session, &args.id)?;

    let ticket = session.unschedule(&args.id);
    settle(&mut session, ticket).await?;
    report_placement(&session, &args.id, json)
}

fn report_placement(session: &Session, id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let item = require_item(session, id)?;
    if json {
        print_item(item)
    } else {
        println!("{}", format_placement(item));
        Ok(())
    }
}

async fn cmd_rm(args: RmArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_at(start)?;
    let items = project.load_items()?;
    let grace = Duration::from_secs(args.grace.unwrap_or(project.config.deletion.grace_seconds));
    let mut session = Session::with_settings(
        items,
        Arc::new(project.store()),
        project.config.grid.clone(),
        grace,
    );

    if !session.delete(&args.id) {
        return Err(format!("item not found: {}", args.id).into());
    }
    if !json {
        eprintln!("Deleting {} in {}s (Ctrl-C to undo)", args.id, grace.as_secs());
    }

    let event = tokio::select! {
        event = session.next_event() => Some(event),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    let deleted = match event {
        None => match session.undo_delete() {
            Some(_) => false,
            None => {
                // the grace period ran out just before the interrupt
                for event in session.shutdown().await {
                    if let SessionEvent::Deletion(DeletionEvent::Failed { id, error }) = event {
                        return Err(format!("could not delete {}: {}", id, error).into());
                    }
                }
                true
            }
        },
        Some(Some(SessionEvent::Deletion(DeletionEvent::Failed { id, error }))) => {
            return Err(format!("could not delete {}: {}", id, error).into());
        }
        Some(_) => true,
    };

    if json {
        let result = DeletionJson {
            id: &args.id,
            deleted,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if deleted {
        println!("Deleted {}", args.id);
    } else {
        println!("Kept {}", args.id);
    }
    Ok(())
}
