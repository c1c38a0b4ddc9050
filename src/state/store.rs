//! Store - versioned JSON key-value slots on disk
//!
//! Each key maps to one `<key>.json` file holding the whole root record
//! wrapped in an envelope:
//!
//! ```json
//! { "version": 1, "checksum": "sha256:...", "payload": { ... } }
//! ```
//!
//! Slots written before the envelope existed (a bare record) are read as
//! version 0 and migrated on the next save.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Slot holding the proposal record
pub const PROPOSAL_KEY: &str = "grant-factory-proposal-state";

/// Slot holding stage statuses, current stage, upload and activity log
pub const WORKFLOW_KEY: &str = "grant-factory-workflow";

/// Slot holding the bid-tracking record
pub const BID_KEY: &str = "jusgrantwriter_v7_final";

/// Envelope version written by this build
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    payload: JsonValue,
}

/// Why a slot could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadIssue {
    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("corrupt JSON: {0}")]
    Corrupt(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),

    #[error("incompatible record: {0}")]
    Incompatible(String),
}

/// Calculate the checksum of a serialized payload
///
/// Floats must survive a text round trip bit for bit, which needs
/// serde_json's `float_roundtrip` feature.
pub fn calculate_checksum(payload: &JsonValue) -> String {
    let canonical = payload.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// Directory-backed key-value store
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.slot_path(key).exists()
    }

    /// Load a record, or `Ok(None)` when the slot is empty
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> std::result::Result<Option<T>, LoadIssue> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| LoadIssue::Unreadable(e.to_string()))?;
        let raw: JsonValue =
            serde_json::from_str(&content).map_err(|e| LoadIssue::Corrupt(e.to_string()))?;

        let payload = migrate(raw)?;
        serde_json::from_value(payload)
            .map(Some)
            .map_err(|e| LoadIssue::Incompatible(e.to_string()))
    }

    /// Load a record, falling back to its default on an empty or unusable slot.
    ///
    /// Never fails: a bad slot is logged and left on disk until the next save.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key, "no stored state, using defaults");
                T::default()
            }
            Err(issue) => {
                warn!(key, %issue, "failed to load stored state, using defaults");
                T::default()
            }
        }
    }

    /// Overwrite a slot with the given record
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state directory {}", self.dir.display()))?;

        let payload = serde_json::to_value(value).context("Failed to serialize state")?;
        let envelope = Envelope {
            version: CURRENT_VERSION,
            checksum: calculate_checksum(&payload),
            payload,
        };
        let content =
            serde_json::to_string_pretty(&envelope).context("Failed to serialize envelope")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary state file")?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write state")?;
        tmp.persist(self.slot_path(key))
            .with_context(|| format!("Failed to persist slot {}", key))?;

        debug!(key, "state saved");
        Ok(())
    }

    /// Remove a slot if present
    pub fn clear(&self, key: &str) -> Result<()> {
        let path = self.slot_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// Unwrap an envelope, upgrading older layouts to the current payload shape
fn migrate(raw: JsonValue) -> std::result::Result<JsonValue, LoadIssue> {
    let is_envelope = raw
        .as_object()
        .map_or(false, |o| o.contains_key("version") && o.contains_key("payload"));

    if !is_envelope {
        // Version 0: bare record with no envelope
        return Ok(raw);
    }

    let envelope: Envelope =
        serde_json::from_value(raw).map_err(|e| LoadIssue::Corrupt(e.to_string()))?;

    if envelope.version > CURRENT_VERSION {
        return Err(LoadIssue::UnsupportedVersion(envelope.version));
    }
    if calculate_checksum(&envelope.payload) != envelope.checksum {
        return Err(LoadIssue::ChecksumMismatch);
    }

    Ok(envelope.payload)
}
