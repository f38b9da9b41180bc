pub mod debounce;
pub mod session;
pub mod workspace;

pub use session::{PersistStatus, ReloadOutcome, Session};
pub use workspace::Workspace;
