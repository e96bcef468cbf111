//! Common test infrastructure
//!
//! Provides scripted gateway fakes, a workflow harness wired to a real
//! SQLite store in a temp directory, and an admin server spawner.
//! Tests should only import from this module, not from internal submodules.

mod fakes;
mod harness;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use fakes::{comment, CannedGenerator, ScriptedPlatform};
#[allow(unused_imports)]
pub use harness::TestHarness;
#[allow(unused_imports)]
pub use server::TestServer;
