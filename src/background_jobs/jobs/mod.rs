//! Specific background job implementations.
//!
//! This module contains implementations of the `BackgroundJob` trait
//! for the publishing workflows and maintenance tasks.

pub mod activity_log_cleanup;
pub mod comment_sweep;
pub mod upload_batch;

pub use activity_log_cleanup::ActivityLogCleanupJob;
pub use comment_sweep::CommentSweepJob;
pub use upload_batch::UploadBatchJob;
