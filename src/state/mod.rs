//! State persistence
//!
//! Handles the durable root records:
//! - versioned, checksummed JSON slots on disk
//! - the workflow session that owns the proposal record and stage progress
//! - the lock that serializes writers across processes

mod lock;
mod session;
mod store;

pub use lock::{StateLock, LOCK_FILE, STALE_AFTER_MINUTES};
pub use session::{is_pdf, UploadedFile, WorkflowProgress, WorkflowSession, LOG_CAPACITY, RESET_MESSAGE};
pub use store::{calculate_checksum, LoadIssue, Store, BID_KEY, CURRENT_VERSION, PROPOSAL_KEY, WORKFLOW_KEY};
