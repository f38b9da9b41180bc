use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
}

/// Fuzzy-matching policy for reconciliation.
///
/// The defaults are the values existing snapshots were matched with; they are
/// tuning constants, not derived ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum score for a candidate to keep its old identity
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Score lost per position of drift
    #[serde(default = "default_position_penalty")]
    pub position_penalty: f64,
    /// Cap on the drift penalty
    #[serde(default = "default_max_position_penalty")]
    pub max_position_penalty: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            threshold: default_threshold(),
            position_penalty: default_position_penalty(),
            max_position_penalty: default_max_position_penalty(),
        }
    }
}

fn default_threshold() -> f64 {
    0.70
}

fn default_position_penalty() -> f64 {
    0.05
}

fn default_max_position_penalty() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet period before a burst of changes is written
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Rewrite checkbox markers in the markdown file itself
    #[serde(default = "default_true")]
    pub write_markdown: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        AutosaveConfig {
            debounce_ms: default_debounce_ms(),
            write_markdown: true,
        }
    }
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Where progress snapshots live (default: data dir)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub ascending: bool,
}

/// How the project list is ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Name,
    Progress,
    #[default]
    LastAccessed,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Progress => "progress",
            SortKey::LastAccessed => "last-accessed",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "progress" => Ok(SortKey::Progress),
            "last-accessed" | "recent" => Ok(SortKey::LastAccessed),
            other => Err(format!(
                "unknown sort key '{}' (expected name, progress or last-accessed)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.matching.threshold, 0.70);
        assert_eq!(config.autosave.debounce_ms, 1000);
        assert!(config.autosave.write_markdown);
        assert_eq!(config.projects.sort, SortKey::LastAccessed);
    }

    #[test]
    fn partial_tables_fill_missing_fields() {
        let config: AppConfig = toml::from_str(
            r#"
[matching]
threshold = 0.8

[projects]
sort = "progress"
"#,
        )
        .unwrap();
        assert_eq!(config.matching.threshold, 0.8);
        assert_eq!(config.matching.position_penalty, 0.05);
        assert_eq!(config.matching.max_position_penalty, 0.5);
        assert_eq!(config.projects.sort, SortKey::Progress);
        assert!(!config.projects.ascending);
    }

    #[test]
    fn sort_key_parses_aliases() {
        assert_eq!("recent".parse::<SortKey>(), Ok(SortKey::LastAccessed));
        assert_eq!("name".parse::<SortKey>(), Ok(SortKey::Name));
        assert!("size".parse::<SortKey>().is_err());
    }
}
