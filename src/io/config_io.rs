use std::fs;
use std::path::Path;

use crate::io::json_store::atomic_write;
use crate::io::project_io::{CONFIG_FILE, ProjectError};
use crate::model::config::BoardConfig;

/// Keys `config get` and `config set` accept
pub const KNOWN_KEYS: &[&str] = &[
    "board.name",
    "grid.start_hour",
    "grid.end_hour",
    "grid.pixels_per_hour",
    "grid.snap_minutes",
    "grid.min_duration",
    "grid.default_duration",
    "deletion.grace_seconds",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Read the board config, returning both the parsed config and the raw
/// toml_edit Document for round-trip-safe editing.
pub fn read_config(dir: &Path) -> Result<(BoardConfig, toml_edit::DocumentMut), ProjectError> {
    let config_path = dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| ProjectError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: BoardConfig = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ProjectError> {
    let config_path = dir.join(CONFIG_FILE);
    atomic_write(&config_path, doc.to_string().as_bytes()).map_err(|e| ProjectError::ReadError {
        path: config_path,
        source: e,
    })?;
    Ok(())
}

fn split_key(key: &str) -> Result<(&str, &str), ConfigError> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    key.split_once('.')
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
}

/// Effective value of `key`, defaults included
pub fn get_value(config: &BoardConfig, key: &str) -> Result<String, ConfigError> {
    let (section, field) = split_key(key)?;
    let value = toml::Value::try_from(config).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    match value.get(section).and_then(|t| t.get(field)) {
        Some(toml::Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(ConfigError::UnknownKey(key.to_string())),
    }
}

/// Set `key` to `raw` in the document. The edited document must still
/// parse as a valid board config, otherwise the document is left as it was.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<BoardConfig, ConfigError> {
    let (section, field) = split_key(key)?;
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_string(),
        reason,
    };

    let value = match key {
        "board.name" => toml_edit::value(raw),
        "grid.pixels_per_hour" => {
            toml_edit::value(raw.parse::<f64>().map_err(|e| invalid(e.to_string()))?)
        }
        _ => {
            let n = raw.parse::<u32>().map_err(|e| invalid(e.to_string()))?;
            toml_edit::value(i64::from(n))
        }
    };

    let mut edited = doc.clone();
    if !edited.contains_key(section) {
        edited[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    edited[section][field] = value;

    let config: BoardConfig =
        toml::from_str(&edited.to_string()).map_err(|e| invalid(e.message().to_string()))?;
    config.grid.validate().map_err(invalid)?;

    *doc = edited;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"# my board
[board]
name = "home"

[grid]
# tighter snapping
snap_minutes = 10
"#
    }

    #[test]
    fn round_trip_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), sample_config()).unwrap();

        let (config, doc) = read_config(tmp.path()).unwrap();
        assert_eq!(config.grid.snap_minutes, 10);
        write_config(tmp.path(), &doc).unwrap();

        let written = fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(written, sample_config());
    }

    #[test]
    fn get_reports_defaults() {
        let config: BoardConfig = toml::from_str(sample_config()).unwrap();
        assert_eq!(get_value(&config, "board.name").unwrap(), "home");
        assert_eq!(get_value(&config, "grid.snap_minutes").unwrap(), "10");
        assert_eq!(get_value(&config, "grid.end_hour").unwrap(), "22");
        assert_eq!(get_value(&config, "deletion.grace_seconds").unwrap(), "5");
        assert!(matches!(
            get_value(&config, "grid.colour"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_keeps_comments_and_adds_sections() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        let config = set_value(&mut doc, "deletion.grace_seconds", "8").unwrap();
        assert_eq!(config.deletion.grace_seconds, 8);
        set_value(&mut doc, "grid.snap_minutes", "30").unwrap();

        let text = doc.to_string();
        assert!(text.contains("# tighter snapping"));
        assert!(text.contains("snap_minutes = 30"));
        assert!(text.contains("[deletion]"));
    }

    #[test]
    fn invalid_values_leave_document_untouched() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        let before = doc.to_string();

        assert!(set_value(&mut doc, "grid.snap_minutes", "soon").is_err());
        assert!(set_value(&mut doc, "grid.start_hour", "23").is_err());
        assert!(set_value(&mut doc, "grid.snap_minutes", "0").is_err());
        assert!(set_value(&mut doc, "grid.default_duration", "5").is_err());
        assert!(matches!(
            set_value(&mut doc, "board.colour", "red"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(doc.to_string(), before);
    }
}
