use std::fs;
use std::path::{Path, PathBuf};

use crate::io::atomic::atomic_write;
use crate::model::config::{AppConfig, SortKey};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not edit {path}: {source}")]
    EditError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

/// `$XDG_CONFIG_HOME/tally`, falling back to `~/.config/tally`
pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"))
        .join("tally")
}

/// `$XDG_DATA_HOME/tally`, falling back to `~/.local/share/tally`
pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".local").join("share"))
        .join("tally")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read config from `path`. A missing file yields the defaults.
pub fn read_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn read_config() -> Result<AppConfig, ConfigError> {
    read_config_from(&config_path())
}

/// Kinds of value a settable key accepts
#[derive(Clone, Copy)]
enum ValueKind {
    Fraction,
    Millis,
    Bool,
    Path,
    Sort,
}

const KEYS: &[(&str, &str, ValueKind)] = &[
    ("matching", "threshold", ValueKind::Fraction),
    ("matching", "position_penalty", ValueKind::Fraction),
    ("matching", "max_position_penalty", ValueKind::Fraction),
    ("autosave", "debounce_ms", ValueKind::Millis),
    ("autosave", "write_markdown", ValueKind::Bool),
    ("store", "dir", ValueKind::Path),
    ("projects", "sort", ValueKind::Sort),
    ("projects", "ascending", ValueKind::Bool),
];

/// Set `section.field = value` in the config file, keeping the rest of the
/// file (comments, ordering) as it was. Returns the resulting config.
pub fn set_config_value(path: &Path, key: &str, value: &str) -> Result<AppConfig, ConfigError> {
    let (section, field, kind) = KEYS
        .iter()
        .find(|(section, field, _)| key.split_once('.') == Some((*section, *field)))
        .copied()
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let new_value = typed_value(key, value, kind)?;

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let mut doc: toml_edit::DocumentMut =
        text.parse().map_err(|e| ConfigError::EditError {
            path: path.to_path_buf(),
            source: e,
        })?;

    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][field] = toml_edit::Item::Value(new_value);

    let updated = doc.to_string();
    let config: AppConfig = toml::from_str(&updated).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    atomic_write(path, updated.as_bytes()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(config)
}

fn typed_value(key: &str, value: &str, kind: ValueKind) -> Result<toml_edit::Value, ConfigError> {
    let invalid = |expected: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    };
    match kind {
        ValueKind::Fraction => match value.parse::<f64>() {
            Ok(n) if (0.0..=1.0).contains(&n) => Ok(n.into()),
            _ => Err(invalid("a number between 0 and 1")),
        },
        ValueKind::Millis => match value.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(n.into()),
            _ => Err(invalid("a non-negative integer")),
        },
        ValueKind::Bool => value
            .parse::<bool>()
            .map(Into::into)
            .map_err(|_| invalid("true or false")),
        ValueKind::Path => Ok(value.into()),
        ValueKind::Sort => value
            .parse::<SortKey>()
            .map(|sort| sort.as_str().into())
            .map_err(|_| invalid("name, progress or last-accessed")),
    }
}
