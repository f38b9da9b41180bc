pub mod cascade;
pub mod history;
pub mod outline;
pub mod project_ops;
pub mod reconcile;
pub mod similarity;
pub mod stats;
