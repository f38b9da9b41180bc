pub mod config;
pub mod document;
pub mod id;
pub mod item;
pub mod snapshot;

pub use config::*;
pub use document::*;
pub use id::*;
pub use item::*;
pub use snapshot::*;
