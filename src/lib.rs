//! Songflow Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background_jobs;
pub mod config;
pub mod enrichment;
pub mod server;
pub mod store;
pub mod workflows;
pub mod youtube;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use server::{run_server, ServerState};
pub use store::{SongStore, SqliteSongStore};
pub use workflows::{CommentEngine, UploadEngine};
