use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::app::debounce::Debouncer;
use crate::io::document_io::{
    DocumentError, LoadedSource, WriteOutcome, document_from, load_source, write_back,
};
use crate::io::progress_store::ProgressStore;
use crate::model::config::{AppConfig, MatchingConfig};
use crate::model::document::{Document, SourceFormat};
use crate::model::id::path_identity;
use crate::model::item::Item;
use crate::model::snapshot::SavedSnapshot;
use crate::parse::apply_checkbox_states;

/// What happened to one debounced save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    /// Progress and markdown both written (or the markdown already matched)
    Saved,
    /// Progress written; markdown write-back is off or the source is RTF
    SnapshotOnly,
    /// Progress written; the file changed on disk so the markdown was left alone
    Conflict,
    Failed(String),
}

/// Result of a reload that was applied (or failed) on the owning side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied { reused: usize },
    Failed(String),
}

/// State captured for one save
struct PersistJob {
    snapshot: SavedSnapshot,
    items: Vec<Item>,
    format: SourceFormat,
}

/// Everything the save worker needs besides the job itself
struct PersistTarget {
    store: ProgressStore,
    key: String,
    path: PathBuf,
    write_markdown: bool,
    /// Text last read from or written to the file
    on_disk: Arc<Mutex<String>>,
}

type LoadResult = (u64, Result<LoadedSource, DocumentError>);

/// Sole owner of one open checklist.
///
/// Every mutation goes through the session, which schedules a debounced save
/// afterwards. Reloads run on a background thread and are applied by
/// [`poll_reload`](Session::poll_reload); only the most recently requested
/// reload is ever applied.
pub struct Session {
    doc: Document,
    path: PathBuf,
    key: String,
    store: ProgressStore,
    matching: MatchingConfig,
    persister: Debouncer<PersistJob>,
    persist_rx: mpsc::Receiver<PersistStatus>,
    on_disk: Arc<Mutex<String>>,
    load_token: u64,
    reload_tx: mpsc::Sender<LoadResult>,
    reload_rx: mpsc::Receiver<LoadResult>,
    reload_error: Option<String>,
}

impl Session {
    /// Load `path` synchronously and start its save worker.
    pub fn open(path: &Path, store: ProgressStore, config: &AppConfig) -> Result<Self, DocumentError> {
        let loaded = load_source(path, &store, &config.matching)?;
        let path = loaded.path.clone();
        let key = path_identity(&path);
        let on_disk = Arc::new(Mutex::new(loaded.source.clone()));
        let doc = document_from(loaded);

        let (status_tx, persist_rx) = mpsc::channel();
        let target = PersistTarget {
            store: store.clone(),
            key: key.clone(),
            path: path.clone(),
            write_markdown: config.autosave.write_markdown,
            on_disk: Arc::clone(&on_disk),
        };
        let persister = Debouncer::new(
            Duration::from_millis(config.autosave.debounce_ms),
            move |job: PersistJob| {
                let status = persist(&target, job);
                let _ = status_tx.send(status);
            },
        );
        let (reload_tx, reload_rx) = mpsc::channel();

        Ok(Session {
            doc,
            path,
            key,
            store,
            matching: config.matching.clone(),
            persister,
            persist_rx,
            on_disk,
            load_token: 0,
            reload_tx,
            reload_rx,
            reload_error: None,
        })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Absolute path of the checklist file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Progress-store key (hash of the absolute path)
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Message of the most recent failed reload, cleared by the next success
    pub fn reload_error(&self) -> Option<&str> {
        self.reload_error.as_deref()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn set_checked(&mut self, id: &str, value: bool) -> bool {
        let changed = self.doc.set_checked(id, value);
        if changed {
            self.schedule_persist();
        }
        changed
    }

    /// Undo history lives in memory only; it does not survive the session.
    pub fn undo(&mut self) -> bool {
        let changed = self.doc.undo();
        if changed {
            self.schedule_persist();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.doc.redo();
        if changed {
            self.schedule_persist();
        }
        changed
    }

    pub fn toggle_header(&mut self, id: &str) -> bool {
        let changed = self.doc.toggle_header(id);
        if changed {
            self.schedule_persist();
        }
        changed
    }

    pub fn mark_external_change(&mut self) {
        self.doc.has_external_changes = true;
    }

    fn schedule_persist(&self) {
        self.persister.schedule(PersistJob {
            snapshot: SavedSnapshot::capture(&self.doc),
            items: self.doc.items().to_vec(),
            format: self.doc.format,
        });
    }

    // -----------------------------------------------------------------------
    // Saving
    // -----------------------------------------------------------------------

    /// Write any pending change now. Returns the status of the last save
    /// that completed, if any did since the last poll.
    pub fn flush(&self) -> Option<PersistStatus> {
        self.persister.flush();
        self.poll_persist().pop()
    }

    /// Statuses of saves completed since the last poll, oldest first.
    pub fn poll_persist(&self) -> Vec<PersistStatus> {
        self.persist_rx.try_iter().collect()
    }

    // -----------------------------------------------------------------------
    // Reloading
    // -----------------------------------------------------------------------

    /// Whether the file's content differs from what the session last read or
    /// wrote. An unreadable file counts as changed.
    pub fn file_changed_on_disk(&self) -> bool {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let on_disk = self.on_disk.lock().unwrap_or_else(PoisonError::into_inner);
                bytes != on_disk.as_bytes()
            }
            Err(_) => true,
        }
    }

    /// Start a background reload and return its token. Pending saves are
    /// written first so the reload reconciles against current progress.
    pub fn request_reload(&mut self) -> u64 {
        self.persister.flush();
        self.load_token += 1;
        let token = self.load_token;
        let tx = self.reload_tx.clone();
        let path = self.path.clone();
        let store = self.store.clone();
        let matching = self.matching.clone();
        debug!(token, path = %path.display(), "reload requested");
        thread::spawn(move || {
            let result = load_source(&path, &store, &matching);
            let _ = tx.send((token, result));
        });
        token
    }

    /// Apply the latest finished reload, discarding stale ones.
    pub fn poll_reload(&mut self) -> Option<ReloadOutcome> {
        let mut outcome = None;
        while let Ok((token, result)) = self.reload_rx.try_recv() {
            if let Some(applied) = self.apply_reload(token, result) {
                outcome = Some(applied);
            }
        }
        outcome
    }

    /// Block until the latest requested reload finishes (or `timeout` passes).
    pub fn wait_reload(&mut self, timeout: Duration) -> Option<ReloadOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (token, result) = self.reload_rx.recv_timeout(remaining).ok()?;
            if let Some(outcome) = self.apply_reload(token, result) {
                return Some(outcome);
            }
        }
    }

    fn apply_reload(
        &mut self,
        token: u64,
        result: Result<LoadedSource, DocumentError>,
    ) -> Option<ReloadOutcome> {
        if token != self.load_token {
            debug!(token, latest = self.load_token, "discarding stale reload");
            return None;
        }
        match result {
            Ok(loaded) => {
                // Saves queued against the old text must land before it is replaced
                self.persister.flush();
                let reused = loaded.reconciled.reused;
                *self.on_disk.lock().unwrap_or_else(PoisonError::into_inner) =
                    loaded.source.clone();
                self.doc
                    .replace_content(loaded.reconciled, loaded.source, loaded.format);
                self.reload_error = None;
                info!(path = %self.path.display(), reused, "reloaded checklist");
                Some(ReloadOutcome::Applied { reused })
            }
            Err(e) => {
                warn!("reload failed: {}", e);
                let message = e.to_string();
                self.reload_error = Some(message.clone());
                Some(ReloadOutcome::Failed(message))
            }
        }
    }
}

fn persist(target: &PersistTarget, job: PersistJob) -> PersistStatus {
    if let Err(e) = target.store.save(&target.key, &job.snapshot) {
        warn!("could not save progress for {}: {}", target.path.display(), e);
        return PersistStatus::Failed(e.to_string());
    }
    if !target.write_markdown || job.format == SourceFormat::Rtf {
        return PersistStatus::SnapshotOnly;
    }

    let mut on_disk = target.on_disk.lock().unwrap_or_else(PoisonError::into_inner);
    let content = apply_checkbox_states(&on_disk, &job.items);
    match write_back(&target.path, &on_disk, &content) {
        Ok(WriteOutcome::Written) => {
            info!(path = %target.path.display(), "updated checkboxes");
            *on_disk = content;
            PersistStatus::Saved
        }
        Ok(WriteOutcome::Unchanged) => PersistStatus::Saved,
        Ok(WriteOutcome::Conflict) => {
            warn!(
                "{} changed on disk; leaving it untouched",
                target.path.display()
            );
            PersistStatus::Conflict
        }
        Err(e) => {
            warn!("could not write {}: {}", target.path.display(), e);
            PersistStatus::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        path: PathBuf,
        store: ProgressStore,
    }

    fn fixture(text: &str) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plan.md");
        fs::write(&path, text).unwrap();
        let store = ProgressStore::new(tmp.path().join("store"));
        Fixture {
            _tmp: tmp,
            path,
            store,
        }
    }

    fn config(write_markdown: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.autosave.debounce_ms = 10_000;
        config.autosave.write_markdown = write_markdown;
        config
    }

    fn id_of(session: &Session, text: &str) -> String {
        session
            .document()
            .items()
            .iter()
            .find(|item| item.text == text)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn check_writes_marker_and_snapshot_on_flush() {
        let f = fixture("# Plan\n\n- [ ] a\n- [ ] b\n");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let a = id_of(&session, "a");
        assert!(session.set_checked(&a, true));

        // Debounced: nothing on disk yet
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "# Plan\n\n- [ ] a\n- [ ] b\n");
        assert_eq!(session.flush(), Some(PersistStatus::Saved));
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "# Plan\n\n- [x] a\n- [ ] b\n");

        let snapshot = f.store.load(session.key()).unwrap();
        assert_eq!(snapshot.checkbox_states.get(&a), Some(&true));
        assert!(!session.file_changed_on_disk());
    }

    #[test]
    fn burst_of_changes_is_one_save() {
        let f = fixture("- [ ] a\n- [ ] b");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let a = id_of(&session, "a");
        let b = id_of(&session, "b");
        session.set_checked(&a, true);
        session.set_checked(&b, true);
        session.undo();
        session.flush();
        assert_eq!(session.poll_persist(), vec![]);
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "- [x] a\n- [ ] b");
    }

    #[test]
    fn undo_history_does_not_survive_reopen() {
        let f = fixture("- [ ] a\n- [ ] b");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let a = id_of(&session, "a");
        session.set_checked(&a, true);
        assert!(session.document().can_undo());
        session.flush();
        drop(session);

        let mut reopened = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        assert!(!reopened.document().can_undo());
        assert!(!reopened.undo());
        assert!(reopened.document().item(&a).unwrap().checked);
    }

    #[test]
    fn no_effect_schedules_nothing() {
        let f = fixture("# H\nplain");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let text_id = id_of(&session, "plain");
        assert!(!session.set_checked(&text_id, true));
        assert!(!session.undo());
        assert_eq!(session.flush(), None);
        assert!(f.store.load(session.key()).is_none());
    }

    #[test]
    fn snapshot_only_when_markdown_writes_are_off() {
        let f = fixture("- [ ] a");
        let mut session = Session::open(&f.path, f.store.clone(), &config(false)).unwrap();
        let a = id_of(&session, "a");
        session.set_checked(&a, true);
        assert_eq!(session.flush(), Some(PersistStatus::SnapshotOnly));
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "- [ ] a");
        assert!(f.store.load(session.key()).is_some());
    }

    #[test]
    fn external_edit_is_a_conflict_not_overwritten() {
        let f = fixture("- [ ] a\n- [ ] b");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let a = id_of(&session, "a");
        session.set_checked(&a, true);

        fs::write(&f.path, "- [ ] a\n- [ ] b\n- [ ] c").unwrap();
        assert!(session.file_changed_on_disk());
        assert_eq!(session.flush(), Some(PersistStatus::Conflict));
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "- [ ] a\n- [ ] b\n- [ ] c");
        assert_eq!(
            f.store.load(session.key()).unwrap().checkbox_states.get(&a),
            Some(&true)
        );
    }

    #[test]
    fn reload_keeps_progress_across_edits() {
        let f = fixture("# Plan\n- [ ] a\n- [ ] b");
        let mut session = Session::open(&f.path, f.store.clone(), &config(false)).unwrap();
        let b = id_of(&session, "b");
        session.set_checked(&b, true);

        fs::write(&f.path, "# Plan\n- [ ] first\n- [ ] a\n- [ ] b").unwrap();
        session.request_reload();
        let outcome = session.wait_reload(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, ReloadOutcome::Applied { reused: 3 });

        let doc = session.document();
        assert_eq!(doc.items().len(), 4);
        let item = doc.item(&b).unwrap();
        assert_eq!(item.text, "b");
        assert!(item.checked);
        assert!(!session.file_changed_on_disk());
    }

    #[test]
    fn stale_reload_is_discarded() {
        let f = fixture("- [ ] a");
        let mut session = Session::open(&f.path, f.store.clone(), &config(false)).unwrap();

        let first = session.request_reload();
        let second = session.request_reload();
        assert!(second > first);

        // Whichever finishes first, only the latest is applied, once
        let outcome = session.wait_reload(Duration::from_secs(5));
        assert!(matches!(outcome, Some(ReloadOutcome::Applied { .. })));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(session.poll_reload(), None);
    }

    #[test]
    fn failed_reload_keeps_document() {
        let f = fixture("- [x] a");
        let mut session = Session::open(&f.path, f.store.clone(), &config(false)).unwrap();
        fs::remove_file(&f.path).unwrap();

        session.request_reload();
        let outcome = session.wait_reload(Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome, ReloadOutcome::Failed(_)));
        assert!(session.reload_error().is_some());
        assert_eq!(session.document().items().len(), 1);
        assert!(session.document().items()[0].checked);
    }

    #[test]
    fn header_toggle_is_persisted() {
        let f = fixture("# A\n- [ ] a\n# B\n- [ ] b");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let header = id_of(&session, "A");
        assert!(session.toggle_header(&header));
        session.flush();
        let snapshot = f.store.load(session.key()).unwrap();
        assert!(!snapshot.expanded_headers.contains(&header));
        assert_eq!(snapshot.expanded_headers.len(), 1);

        let reopened = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        assert!(!reopened.document().is_expanded(&header));
    }

    #[test]
    fn drop_flushes_pending_save() {
        let f = fixture("- [ ] a");
        let mut session = Session::open(&f.path, f.store.clone(), &config(true)).unwrap();
        let a = id_of(&session, "a");
        session.set_checked(&a, true);
        drop(session);
        assert_eq!(fs::read_to_string(&f.path).unwrap(), "- [x] a");
    }
}
