//! Stage progression: status tracking, agent execution and final export

pub mod export;
pub mod factory;
pub mod tracker;

pub use export::ExportPackage;
pub use factory::{Factory, ProcessingGuard, ProcessingLock};
pub use tracker::{StageTracker, Successor};
