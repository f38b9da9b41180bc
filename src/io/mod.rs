pub mod atomic;
pub mod config_io;
pub mod document_io;
pub mod lock;
pub mod progress_store;
pub mod registry;
pub mod watcher;
