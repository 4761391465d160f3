use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::project_io;

const BOARD_TOML_TEMPLATE: &str = r##"[board]
name = "{name}"

# --- Day grid ---
# Uncomment and edit to override defaults. Times are whole hours; every
# committed start and end lands on a multiple of snap_minutes.
#
# [grid]
# start_hour = 6
# end_hour = 22
# pixels_per_hour = 60.0
# snap_minutes = 15
# min_duration = 15
# default_duration = 60

# --- Deletion ---
# Seconds a deleted item can still be restored.
#
# [deletion]
# grace_seconds = 5
"##;

/// Infer a board name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + &chars.collect::<String>()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_board_toml(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    BOARD_TOML_TEMPLATE.replace("{name}", &escaped)
}

pub fn cmd_init(args: InitArgs, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let name = match args.name {
        Some(name) => name,
        None => root
            .file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Board".to_string()),
    };

    let project = project_io::init_project(root, &render_board_toml(&name))?;
    println!(
        "Initialized board \"{}\" in {}",
        project.config.board.name,
        project.dir.display()
    );
    Ok(())
}
