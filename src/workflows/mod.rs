//! The two publishing state machines: song uploads and comment sweeps.
//!
//! Engines own no I/O of their own; everything goes through the three
//! injected gateways (store, platform, generator). Summaries are the
//! engines' only output besides gateway side effects.

mod comments;
mod summary;
mod upload;

pub use comments::{CommentEngine, CommentSettings};
pub use summary::{CommentSummary, UploadSummary};
pub use upload::{UploadEngine, UploadSettings};

use crate::store::StoreError;
use thiserror::Error;
use std::time::Duration;

/// Transient gateway failures get this many attempts before the item is
/// treated as failed.
pub(crate) const MAX_ATTEMPTS: u32 = 3;

/// Default pause between retry attempts.
pub(crate) const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Only fatal conditions surface here; per-item failures are folded into
/// the summaries.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}
