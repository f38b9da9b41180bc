use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::io::atomic::atomic_write;
use crate::io::config_io::config_dir;

/// One tracked checklist file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

/// The list of tracked files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRegistry {
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// Which timestamp a touch updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Accessed,
    Checked,
}

/// Get the registry file path, respecting XDG_CONFIG_HOME
pub fn registry_path() -> PathBuf {
    config_dir().join("projects.toml")
}

/// Read the project registry from a specific path.
/// If the file doesn't exist, returns an empty registry.
/// If the file is corrupted, backs it up as .bak and returns empty.
pub fn read_registry_from(path: &Path) -> ProjectRegistry {
    if !path.exists() {
        return ProjectRegistry::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<ProjectRegistry>(&content) {
            Ok(reg) => reg,
            Err(e) => {
                let bak = path.with_extension("toml.bak");
                let _ = fs::copy(path, &bak);
                warn!(
                    "could not parse {} (backed up as {}): {}",
                    path.display(),
                    bak.display(),
                    e
                );
                ProjectRegistry::default()
            }
        },
        Err(e) => {
            warn!("could not read {}: {}", path.display(), e);
            ProjectRegistry::default()
        }
    }
}

/// Write the project registry to a specific path.
pub fn write_registry_to(path: &Path, reg: &ProjectRegistry) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content =
        toml::to_string_pretty(reg).map_err(|e| std::io::Error::other(e.to_string()))?;
    atomic_write(path, content.as_bytes())
}

fn save(reg_path: &Path, reg: &ProjectRegistry) {
    if let Err(e) = write_registry_to(reg_path, reg) {
        warn!("could not write {}: {}", reg_path.display(), e);
    }
}

/// Register a file. If already registered (by path), updates the name.
/// Returns true if this was a new registration.
pub fn register_project_in(reg_path: &Path, name: &str, abs_path: &Path) -> bool {
    let path_str = abs_path.to_string_lossy().to_string();
    let mut reg = read_registry_from(reg_path);

    if let Some(entry) = reg.projects.iter_mut().find(|e| e.path == path_str) {
        entry.name = name.to_string();
        save(reg_path, &reg);
        return false;
    }

    reg.projects.push(ProjectEntry {
        name: name.to_string(),
        path: path_str,
        last_accessed: Some(Utc::now()),
        last_checked: None,
    });
    save(reg_path, &reg);
    true
}

/// Stamp a registered file with the current time.
pub fn touch_in(reg_path: &Path, abs_path: &Path, touch: Touch) {
    let path_str = abs_path.to_string_lossy().to_string();
    let mut reg = read_registry_from(reg_path);
    if let Some(entry) = reg.projects.iter_mut().find(|e| e.path == path_str) {
        let now = Some(Utc::now());
        match touch {
            Touch::Accessed => entry.last_accessed = now,
            Touch::Checked => {
                entry.last_accessed = now;
                entry.last_checked = now;
            }
        }
        save(reg_path, &reg);
    }
}

/// Remove a file from a specific registry by name or path.
/// Returns the removed entry, or None if not found.
/// If the name is ambiguous (multiple matches), returns Err.
pub fn remove_project_from(
    reg_path: &Path,
    name_or_path: &str,
) -> Result<Option<ProjectEntry>, String> {
    let mut reg = read_registry_from(reg_path);

    // Exact path match first, canonical then as given
    let candidates = [
        fs::canonicalize(name_or_path)
            .ok()
            .map(|abs| abs.to_string_lossy().to_string()),
        Some(name_or_path.to_string()),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(idx) = reg.projects.iter().position(|e| e.path == candidate) {
            let removed = reg.projects.remove(idx);
            save(reg_path, &reg);
            return Ok(Some(removed));
        }
    }

    let matches: Vec<usize> = reg
        .projects
        .iter()
        .enumerate()
        .filter(|(_, e)| e.name == name_or_path)
        .map(|(i, _)| i)
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => {
            let removed = reg.projects.remove(matches[0]);
            save(reg_path, &reg);
            Ok(Some(removed))
        }
        n => Err(format!(
            "ambiguous: {} files named \"{}\". Specify by path instead.",
            n, name_or_path
        )),
    }
}

/// Abbreviate a path by replacing $HOME with ~
pub fn abbreviate_path(path: &str) -> String {
    if let Ok(home) = std::env::var("HOME")
        && !home.is_empty()
        && let Some(rest) = path.strip_prefix(&home)
    {
        return format!("~{}", rest);
    }
    path.to_string()
}

/// Format a relative time string like "2 min ago", "yesterday", "3 days ago"
pub fn relative_time(dt: &DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(*dt);

    if duration.num_seconds() < 60 {
        return "just now".to_string();
    }
    let mins = duration.num_minutes();
    if mins < 60 {
        return format!("{} min ago", mins);
    }
    let hours = duration.num_hours();
    if hours < 24 {
        return format!("{} hr ago", hours);
    }
    let days = duration.num_days();
    if days == 1 {
        return "yesterday".to_string();
    }
    if days < 7 {
        return format!("{} days ago", days);
    }
    let weeks = days / 7;
    if weeks < 5 {
        return format!("{} weeks ago", weeks);
    }
    format!("{} months ago", days / 30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_registry() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tally").join("projects.toml");
        (tmp, path)
    }

    #[test]
    fn empty_registry() {
        let (_tmp, path) = temp_registry();
        assert!(read_registry_from(&path).projects.is_empty());
    }

    #[test]
    fn register_dedupes_by_path() {
        let (_tmp, path) = temp_registry();
        assert!(register_project_in(&path, "todo.md", Path::new("/notes/todo.md")));
        assert!(!register_project_in(&path, "renamed", Path::new("/notes/todo.md")));
        let reg = read_registry_from(&path);
        assert_eq!(reg.projects.len(), 1);
        assert_eq!(reg.projects[0].name, "renamed");
        assert!(reg.projects[0].last_accessed.is_some());
        assert!(reg.projects[0].last_checked.is_none());
    }

    #[test]
    fn touch_checked_sets_both_stamps() {
        let (_tmp, path) = temp_registry();
        register_project_in(&path, "a.md", Path::new("/notes/a.md"));
        touch_in(&path, Path::new("/notes/a.md"), Touch::Checked);
        let entry = &read_registry_from(&path).projects[0];
        assert!(entry.last_checked.is_some());
        assert_eq!(entry.last_checked, entry.last_accessed);
    }

    #[test]
    fn remove_by_name_and_path() {
        let (_tmp, path) = temp_registry();
        register_project_in(&path, "a.md", Path::new("/notes/a.md"));
        register_project_in(&path, "b.md", Path::new("/notes/b.md"));

        let removed = remove_project_from(&path, "a.md").unwrap().unwrap();
        assert_eq!(removed.path, "/notes/a.md");
        let removed = remove_project_from(&path, "/notes/b.md").unwrap().unwrap();
        assert_eq!(removed.name, "b.md");
        assert!(read_registry_from(&path).projects.is_empty());
        assert!(remove_project_from(&path, "a.md").unwrap().is_none());
    }

    #[test]
    fn ambiguous_name_is_an_error() {
        let (_tmp, path) = temp_registry();
        register_project_in(&path, "todo.md", Path::new("/work/todo.md"));
        register_project_in(&path, "todo.md", Path::new("/home/todo.md"));
        let err = remove_project_from(&path, "todo.md").unwrap_err();
        assert!(err.contains("ambiguous"));
        assert_eq!(read_registry_from(&path).projects.len(), 2);
    }

    #[test]
    fn corrupted_registry_is_backed_up() {
        let (_tmp, path) = temp_registry();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not valid toml [[[").unwrap();
        assert!(read_registry_from(&path).projects.is_empty());
        assert!(path.with_extension("toml.bak").exists());
    }

    #[test]
    fn relative_times() {
        let now = Utc::now();
        assert_eq!(relative_time(&now), "just now");
        assert_eq!(relative_time(&(now - chrono::Duration::minutes(5))), "5 min ago");
        assert_eq!(relative_time(&(now - chrono::Duration::days(1))), "yesterday");
        assert_eq!(relative_time(&(now - chrono::Duration::days(3))), "3 days ago");
    }
}
