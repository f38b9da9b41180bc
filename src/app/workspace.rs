use std::path::{Path, PathBuf};

use crate::app::session::Session;
use crate::io::document_io::{DocumentError, absolute_path, display_name};
use crate::io::progress_store::ProgressStore;
use crate::io::registry::{Touch, register_project_in, touch_in};
use crate::model::config::AppConfig;

/// Application state: configuration, the progress store and the open files.
///
/// Created once by the binary and passed down by reference.
pub struct Workspace {
    pub config: AppConfig,
    store: ProgressStore,
    registry_path: PathBuf,
    sessions: Vec<Session>,
    active: Option<usize>,
}

impl Workspace {
    pub fn new(config: AppConfig, store: ProgressStore, registry_path: PathBuf) -> Self {
        Workspace {
            config,
            store,
            registry_path,
            sessions: Vec::new(),
            active: None,
        }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    fn index_of(&self, abs: &Path) -> Option<usize> {
        self.sessions.iter().position(|s| s.path() == abs)
    }

    pub fn is_open(&self, path: &Path) -> bool {
        absolute_path(path)
            .ok()
            .is_some_and(|abs| self.index_of(&abs).is_some())
    }

    /// The session for `path`, loading and registering it if it is not open
    /// yet. The first file opened becomes the active one.
    pub fn open(&mut self, path: &Path) -> Result<&mut Session, DocumentError> {
        let abs = absolute_path(path)?;
        let idx = match self.index_of(&abs) {
            Some(idx) => idx,
            None => {
                let session = Session::open(&abs, self.store.clone(), &self.config)?;
                register_project_in(&self.registry_path, &display_name(&abs), &abs);
                touch_in(&self.registry_path, &abs, Touch::Accessed);
                self.sessions.push(session);
                self.sessions.len() - 1
            }
        };
        if self.active.is_none() {
            self.active = Some(idx);
        }
        Ok(&mut self.sessions[idx])
    }

    /// Close a file, writing any pending progress. Returns false when it was
    /// not open.
    pub fn close(&mut self, path: &Path) -> bool {
        let Some(idx) = absolute_path(path).ok().and_then(|abs| self.index_of(&abs)) else {
            return false;
        };
        let session = self.sessions.remove(idx);
        session.flush();
        if session.document().last_checked_at.is_some() {
            touch_in(&self.registry_path, session.path(), Touch::Checked);
        }

        self.active = match self.active {
            _ if self.sessions.is_empty() => None,
            Some(active) if active > idx => Some(active - 1),
            Some(active) if active == idx => Some(idx.min(self.sessions.len() - 1)),
            other => other,
        };
        true
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.and_then(|idx| self.sessions.get(idx))
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        self.active.and_then(|idx| self.sessions.get_mut(idx))
    }

    pub fn set_active(&mut self, path: &Path) -> bool {
        match absolute_path(path).ok().and_then(|abs| self.index_of(&abs)) {
            Some(idx) => {
                self.active = Some(idx);
                true
            }
            None => false,
        }
    }
}
