use std::fs;
use std::path::{Path, PathBuf};

use crate::io::json_store::{self, JsonFileStore};
use crate::io::persist::PersistError;
use crate::model::config::BoardConfig;
use crate::model::item::Item;

pub const PROJECT_DIR: &str = "lineup";
pub const CONFIG_FILE: &str = "board.toml";
pub const ITEMS_FILE: &str = "items.json";

/// Error type for project I/O operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("not a lineup project: no lineup/board.toml found")]
    NotAProject,
    #[error("already a lineup project: {0}")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse board.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("invalid board.toml: {0}")]
    InvalidConfig(String),
    #[error("could not edit board.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("items file: {0}")]
    ItemsError(#[from] PersistError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A board on disk
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    /// The `lineup/` directory
    pub dir: PathBuf,
    pub config: BoardConfig,
}

impl Project {
    pub fn items_path(&self) -> PathBuf {
        self.dir.join(ITEMS_FILE)
    }

    pub fn load_items(&self) -> Result<Vec<Item>, ProjectError> {
        Ok(json_store::read_items(&self.items_path())?)
    }

    /// File-backed persistence for this board's items
    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.items_path())
    }
}

/// Discover the project by walking up from the given directory, looking
/// for `lineup/board.toml`.
pub fn discover_project(start: &Path) -> Result<PathBuf, ProjectError> {
    let mut current = start.to_path_buf();
    loop {
        let dir = current.join(PROJECT_DIR);
        if dir.is_dir() && dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ProjectError::NotAProject);
        }
    }
}

/// Parse board.toml and check the grid geometry
fn parse_config(text: &str) -> Result<BoardConfig, ProjectError> {
    let config: BoardConfig = toml::from_str(text)?;
    config.grid.validate().map_err(ProjectError::InvalidConfig)?;
    Ok(config)
}

/// Load the board config for the project rooted at `root`
pub fn load_project(root: &Path) -> Result<Project, ProjectError> {
    let dir = root.join(PROJECT_DIR);
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Err(ProjectError::NotAProject);
    }
    let config_text = fs::read_to_string(&config_path).map_err(|e| ProjectError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config = parse_config(&config_text)?;
    Ok(Project {
        root: root.to_path_buf(),
        dir,
        config,
    })
}

/// Create `lineup/board.toml` from `config_text` and an empty
/// `lineup/items.json` under `root`. The text must parse as a board config.
pub fn init_project(root: &Path, config_text: &str) -> Result<Project, ProjectError> {
    let dir = root.join(PROJECT_DIR);
    if dir.join(CONFIG_FILE).exists() {
        return Err(ProjectError::AlreadyInitialized(dir));
    }
    let config = parse_config(config_text)?;
    fs::create_dir_all(&dir)?;
    json_store::atomic_write(&dir.join(CONFIG_FILE), config_text.as_bytes())?;

    let items_path = dir.join(ITEMS_FILE);
    if !items_path.exists() {
        json_store::write_items(&items_path, &[])?;
    }

    Ok(Project {
        root: root.to_path_buf(),
        dir,
        config,
    })
}
