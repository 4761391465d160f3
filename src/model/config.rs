use serde::{Deserialize, Serialize};

/// Configuration from board.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardInfo,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub deletion: DeletionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub name: String,
}

impl BoardConfig {
    /// A config with every section at its defaults
    pub fn new(name: impl Into<String>) -> Self {
        BoardConfig {
            board: BoardInfo { name: name.into() },
            grid: GridConfig::default(),
            deletion: DeletionConfig::default(),
        }
    }
}

/// Time-grid geometry and snapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// First visible hour
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// Hour at which the grid ends (exclusive upper bound for blocks)
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default = "default_pixels_per_hour")]
    pub pixels_per_hour: f64,
    /// Every committed minute value is a multiple of this
    #[serde(default = "default_snap_minutes")]
    pub snap_minutes: u32,
    #[serde(default = "default_min_duration")]
    pub min_duration: u32,
    /// Duration for new blocks and for items without a size hint
    #[serde(default = "default_duration")]
    pub default_duration: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            pixels_per_hour: default_pixels_per_hour(),
            snap_minutes: default_snap_minutes(),
            min_duration: default_min_duration(),
            default_duration: default_duration(),
        }
    }
}

impl GridConfig {
    /// Reject geometry the scheduler cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if self.end_hour > 24 {
            return Err(format!("end_hour must be at most 24, got {}", self.end_hour));
        }
        if self.start_hour >= self.end_hour {
            return Err(format!(
                "start_hour ({}) must be before end_hour ({})",
                self.start_hour, self.end_hour
            ));
        }
        if self.snap_minutes == 0 {
            return Err("snap_minutes must be positive".to_string());
        }
        if !(self.pixels_per_hour > 0.0) {
            return Err("pixels_per_hour must be positive".to_string());
        }
        if self.min_duration == 0 {
            return Err("min_duration must be positive".to_string());
        }
        if self.min_duration > (self.end_hour - self.start_hour) * 60 {
            return Err("min_duration does not fit in the grid".to_string());
        }
        if self.default_duration < self.min_duration {
            return Err(format!(
                "default_duration ({}) must be at least min_duration ({})",
                self.default_duration, self.min_duration
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionConfig {
    /// Undo window before a delete is persisted
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        DeletionConfig {
            grace_seconds: default_grace_seconds(),
        }
    }
}

fn default_start_hour() -> u32 {
    6
}

fn default_end_hour() -> u32 {
    22
}

fn default_pixels_per_hour() -> f64 {
    60.0
}

fn default_snap_minutes() -> u32 {
    15
}

fn default_min_duration() -> u32 {
    15
}

fn default_duration() -> u32 {
    60
}

fn default_grace_seconds() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: BoardConfig = toml::from_str("[board]\nname = \"x\"\n").unwrap();
        assert_eq!(config.board.name, "x");
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.deletion.grace_seconds, 5);
    }

    #[test]
    fn partial_grid_section() {
        let config: BoardConfig =
            toml::from_str("[board]\nname = \"x\"\n\n[grid]\nsnap_minutes = 30\n").unwrap();
        assert_eq!(config.grid.snap_minutes, 30);
        assert_eq!(config.grid.start_hour, 6);
        assert_eq!(config.grid.default_duration, 60);
    }

    #[test]
    fn validate_rejects_inverted_hours() {
        let mut grid = GridConfig::default();
        assert!(grid.validate().is_ok());
        grid.start_hour = 22;
        grid.end_hour = 6;
        assert!(grid.validate().is_err());
        grid = GridConfig {
            snap_minutes: 0,
            ..GridConfig::default()
        };
        assert!(grid.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_default_duration() {
        let grid = GridConfig {
            default_duration: 5,
            ..GridConfig::default()
        };
        assert!(grid.validate().is_err());
        let grid = GridConfig {
            default_duration: 15,
            ..GridConfig::default()
        };
        assert!(grid.validate().is_ok());
    }
}
