//! Workflow harness: real SQLite store in a temp dir plus scripted
//! gateways, wired into the two engines with zero retry backoff.

use super::fakes::{CannedGenerator, ScriptedPlatform};
use songflow_server::store::{NewSong, Song, SongStore, SqliteSongStore};
use songflow_server::workflows::{CommentEngine, CommentSettings, UploadEngine, UploadSettings};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestHarness {
    pub store: Arc<SqliteSongStore>,
    pub platform: Arc<ScriptedPlatform>,
    pub upload_engine: Arc<UploadEngine>,
    pub comment_engine: Arc<CommentEngine>,
    _db_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteSongStore::new(db_dir.path().join("songs.db")).expect("Failed to open store"),
        );
        let platform = Arc::new(ScriptedPlatform::new());
        let generator = Arc::new(CannedGenerator);

        let upload_engine = Arc::new(UploadEngine::new(
            store.clone() as Arc<dyn SongStore>,
            platform.clone(),
            generator.clone(),
            UploadSettings {
                auto_metadata: true,
                retry_backoff: Duration::ZERO,
            },
        ));
        let comment_engine = Arc::new(CommentEngine::new(
            store.clone() as Arc<dyn SongStore>,
            platform.clone(),
            generator,
            CommentSettings {
                page_size: 100,
                video_scan_limit: 50,
                retry_backoff: Duration::ZERO,
            },
        ));

        Self {
            store,
            platform,
            upload_engine,
            comment_engine,
            _db_dir: db_dir,
        }
    }

    pub fn add_pending_song(&self, title: &str, source_url: Option<&str>) -> Song {
        self.store
            .insert_song(NewSong {
                title: title.to_string(),
                style: Some("synthwave".to_string()),
                source_url: source_url.map(|u| u.to_string()),
                ..Default::default()
            })
            .expect("Failed to insert song")
    }
}
