use clap::{Args, Parser, Subcommand};

use crate::model::item::Membership;

#[derive(Parser)]
#[command(name = "lu", about = concat!("lineup v", env!("CARGO_PKG_VERSION"), " - ordered boards and day grids"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,

    /// Log debug output to stderr (LINEUP_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new board in the current directory
    Init(InitArgs),
    /// List items grouped into containers
    List(ListArgs),
    /// Move an item within or between containers
    Mv(MvArgs),
    /// Place an item on the day grid
    Schedule(ScheduleArgs),
    /// Move a scheduled block by a number of minutes
    Shift(GridArgs),
    /// Grow or shrink a scheduled block by a number of minutes
    Resize(GridArgs),
    /// Return an item to the unscheduled pool
    Unschedule(IdArg),
    /// Delete an item after a grace period (Ctrl-C to undo)
    Rm(RmArgs),
    /// Validate order keys and scheduled blocks
    Check,
    /// Read or edit board.toml
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Board name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Grouping: status, section or day
    #[arg(long, default_value = "status")]
    pub by: Membership,
    /// Only this container
    pub key: Option<String>,
}

// ---------------------------------------------------------------------------
// Gesture args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Item ID
    pub id: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Item ID
    pub id: String,
    /// Grouping: status, section or day
    #[arg(long, default_value = "status")]
    pub by: Membership,
    /// Destination container (default: the item's current one)
    #[arg(long)]
    pub to: Option<String>,
    /// Insert before this item
    #[arg(long, conflicts_with = "after")]
    pub before: Option<String>,
    /// Insert after this item
    #[arg(long)]
    pub after: Option<String>,
}

#[derive(Args)]
pub struct ScheduleArgs {
    /// Item ID
    pub id: String,
    /// Day (YYYY-MM-DD)
    #[arg(long)]
    pub day: String,
    /// Start time (HH:MM), snapped to the grid
    #[arg(long)]
    pub at: String,
}

#[derive(Args)]
pub struct GridArgs {
    /// Item ID
    pub id: String,
    /// Minutes (negative moves earlier or shrinks)
    #[arg(allow_negative_numbers = true)]
    pub minutes: i32,
}

#[derive(Args)]
pub struct RmArgs {
    /// Item ID
    pub id: String,
    /// Seconds before the delete is committed (default: deletion.grace_seconds)
    #[arg(long)]
    pub grace: Option<u64>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one key, or every key
    Get(ConfigGetArgs),
    /// Set a key (e.g. grid.snap_minutes 30)
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigGetArgs {
    /// Dotted key, e.g. grid.snap_minutes
    pub key: Option<String>,
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// Dotted key, e.g. grid.snap_minutes
    pub key: String,
    /// New value
    pub value: String,
}
