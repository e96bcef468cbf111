use super::models::{ActivityLevel, NewSong, Song, SongStatus, Video};
use super::{SongStore, StoreError};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE songs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    style TEXT,
    lyrics TEXT,
    description TEXT,
    source_url TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'uploaded', 'failed', 'url_expired')),
    video_id TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX idx_songs_status_created ON songs (status, created_at, id);

CREATE TABLE videos (
    video_id TEXT PRIMARY KEY,
    song_id TEXT NOT NULL REFERENCES songs (id),
    title TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);
CREATE INDEX idx_videos_uploaded_at ON videos (uploaded_at DESC);

CREATE TABLE feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT NOT NULL,
    comment_id TEXT NOT NULL,
    comment_text TEXT NOT NULL,
    sentiment TEXT NOT NULL,
    processed_at TEXT NOT NULL,
    UNIQUE (video_id, comment_id)
);

CREATE TABLE activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    level TEXT NOT NULL,
    message TEXT NOT NULL
);
CREATE INDEX idx_activity_timestamp ON activity_log (timestamp);
";

pub struct SqliteSongStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSongStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open songflow database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new songflow database at {:?}", path);
            conn.execute_batch(SCHEMA)?;
            conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        } else {
            let db_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            if db_version != SCHEMA_VERSION {
                anyhow::bail!(
                    "Songflow database version {} does not match expected version {}",
                    db_version,
                    SCHEMA_VERSION
                );
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Songs enter the pipeline from outside the workflows; this is the
    /// ingestion point used by operators and tests.
    pub fn insert_song(&self, song: NewSong) -> Result<Song, StoreError> {
        let conn = self.lock_conn()?;
        let id = format!("song-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO songs (id, title, style, lyrics, description, source_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
            params![
                id,
                song.title,
                song.style,
                song.lyrics,
                song.description,
                song.source_url,
                created_at
            ],
        )
        .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;

        Ok(Song {
            id,
            title: song.title,
            style: song.style,
            lyrics: song.lyrics,
            description: song.description,
            source_url: song.source_url,
            status: SongStatus::Pending,
            video_id: None,
            created_at,
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable(anyhow!("database mutex poisoned")))
    }

    fn row_to_song(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        let status_str: String = row.get("status")?;
        Ok(Song {
            id: row.get("id")?,
            title: row.get("title")?,
            style: row.get("style")?,
            lyrics: row.get("lyrics")?,
            description: row.get("description")?,
            source_url: row.get("source_url")?,
            status: SongStatus::parse(&status_str).unwrap_or(SongStatus::Failed),
            video_id: row.get("video_id")?,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_video(row: &rusqlite::Row) -> rusqlite::Result<Video> {
        Ok(Video {
            video_id: row.get("video_id")?,
            song_id: row.get("song_id")?,
            title: row.get("title")?,
            uploaded_at: row.get("uploaded_at")?,
        })
    }
}

impl SongStore for SqliteSongStore {
    fn list_pending_songs(&self, limit: usize) -> Result<Vec<Song>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM songs WHERE status = 'pending'
                 ORDER BY created_at ASC, id ASC LIMIT ?1",
            )
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        let songs = stmt
            .query_map(params![limit as i64], Self::row_to_song)
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(songs)
    }

    fn get_song(&self, song_id: &str) -> Result<Song, StoreError> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT * FROM songs WHERE id = ?1",
            params![song_id],
            Self::row_to_song,
        )
        .optional()
        .map_err(|e| StoreError::Unavailable(anyhow!(e)))?
        .ok_or_else(|| StoreError::NotFound(format!("song {}", song_id)))
    }

    fn set_song_status(
        &self,
        song_id: &str,
        status: SongStatus,
        video_id: Option<&str>,
    ) -> Result<(), StoreError> {
        if (status == SongStatus::Uploaded) != video_id.is_some() {
            return Err(StoreError::InvalidTransition(format!(
                "status {} requires video_id {}",
                status,
                if status == SongStatus::Uploaded { "set" } else { "absent" }
            )));
        }
        if status == SongStatus::Pending {
            return Err(StoreError::InvalidTransition(
                "cannot transition a song back to pending".to_string(),
            ));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;

        let updated = tx
            .execute(
                "UPDATE songs SET status = ?1, video_id = ?2 WHERE id = ?3 AND status = 'pending'",
                params![status.as_str(), video_id, song_id],
            )
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;

        if updated == 0 {
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM songs WHERE id = ?1",
                    params![song_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
            return match current {
                None => Err(StoreError::NotFound(format!("song {}", song_id))),
                Some(s) => Err(StoreError::InvalidTransition(format!(
                    "song {} is already {}",
                    song_id, s
                ))),
            };
        }

        if let (SongStatus::Uploaded, Some(video_id)) = (status, video_id) {
            tx.execute(
                "INSERT INTO videos (video_id, song_id, title, uploaded_at)
                 SELECT ?1, id, title, ?2 FROM songs WHERE id = ?3",
                params![video_id, Utc::now().to_rfc3339(), song_id],
            )
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        }

        tx.commit().map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(())
    }

    fn list_uploaded_videos(&self, limit: usize) -> Result<Vec<Video>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM videos ORDER BY uploaded_at DESC, video_id ASC LIMIT ?1")
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        let videos = stmt
            .query_map(params![limit as i64], Self::row_to_video)
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(videos)
    }

    fn has_feedback(&self, video_id: &str, comment_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM feedback WHERE video_id = ?1 AND comment_id = ?2",
                params![video_id, comment_id],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(count > 0)
    }

    fn save_feedback(
        &self,
        video_id: &str,
        comment_id: &str,
        comment_text: &str,
        sentiment: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        let result = conn.execute(
            "INSERT INTO feedback (video_id, comment_id, comment_text, sentiment, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                video_id,
                comment_id,
                comment_text,
                sentiment,
                Utc::now().to_rfc3339()
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "feedback for comment {} on video {} already recorded",
                    comment_id, video_id
                )))
            }
            Err(e) => Err(StoreError::Unavailable(anyhow!(e))),
        }
    }

    fn log_activity(&self, level: ActivityLevel, message: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO activity_log (timestamp, level, message) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), level.as_str(), message],
        )
        .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(())
    }

    fn count_songs_by_status(&self) -> Result<Vec<(SongStatus, u64)>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM songs GROUP BY status ORDER BY status")
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        let counts = stmt
            .query_map([], |row| {
                let status_str: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status_str, count))
            })
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(counts
            .into_iter()
            .filter_map(|(s, c)| SongStatus::parse(&s).map(|s| (s, c as u64)))
            .collect())
    }

    fn prune_activity_log(&self, before: &str) -> Result<usize, StoreError> {
        let conn = self.lock_conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM activity_log WHERE timestamp < ?1",
                params![before],
            )
            .map_err(|e| StoreError::Unavailable(anyhow!(e)))?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteSongStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteSongStore::new(dir.path().join("songflow.db")).unwrap();
        (dir, store)
    }

    fn pending_song(store: &SqliteSongStore, title: &str) -> Song {
        store
            .insert_song(NewSong {
                title: title.to_string(),
                style: Some("synthwave".to_string()),
                lyrics: Some("neon nights".to_string()),
                description: None,
                source_url: Some("https://cdn.example.com/take.mp3".to_string()),
            })
            .unwrap()
    }

    #[test]
    fn lists_pending_songs_oldest_first() {
        let (_dir, store) = test_store();
        let first = pending_song(&store, "first");
        let second = pending_song(&store, "second");

        let pending = store.list_pending_songs(10).unwrap();
        assert_eq!(
            pending.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec![first.id.as_str(), second.id.as_str()]
        );

        let limited = store.list_pending_songs(1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, first.id);
    }

    #[test]
    fn uploaded_transition_creates_video_row_atomically() {
        let (_dir, store) = test_store();
        let song = pending_song(&store, "atomic");

        store
            .set_song_status(&song.id, SongStatus::Uploaded, Some("vid-1"))
            .unwrap();

        let stored = store.get_song(&song.id).unwrap();
        assert_eq!(stored.status, SongStatus::Uploaded);
        assert_eq!(stored.video_id.as_deref(), Some("vid-1"));

        let videos = store.list_uploaded_videos(10).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, "vid-1");
        assert_eq!(videos[0].song_id, song.id);
        assert_eq!(videos[0].title, "atomic");
    }

    #[test]
    fn uploaded_requires_video_id_and_vice_versa() {
        let (_dir, store) = test_store();
        let song = pending_song(&store, "guarded");

        let missing = store.set_song_status(&song.id, SongStatus::Uploaded, None);
        assert!(matches!(missing, Err(StoreError::InvalidTransition(_))));

        let extra = store.set_song_status(&song.id, SongStatus::Failed, Some("vid-x"));
        assert!(matches!(extra, Err(StoreError::InvalidTransition(_))));

        // Neither rejected call touched the row.
        assert_eq!(store.get_song(&song.id).unwrap().status, SongStatus::Pending);
    }

    #[test]
    fn terminal_states_are_final() {
        let (_dir, store) = test_store();
        let song = pending_song(&store, "done");
        store
            .set_song_status(&song.id, SongStatus::Failed, None)
            .unwrap();

        let again = store.set_song_status(&song.id, SongStatus::UrlExpired, None);
        assert!(matches!(again, Err(StoreError::InvalidTransition(_))));
        assert_eq!(store.get_song(&song.id).unwrap().status, SongStatus::Failed);
    }

    #[test]
    fn missing_song_is_not_found() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.get_song("song-nope"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.set_song_status("song-nope", SongStatus::Failed, None),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_feedback_is_a_conflict() {
        let (_dir, store) = test_store();
        store
            .save_feedback("vid-1", "c-1", "love it", "positive")
            .unwrap();
        assert!(store.has_feedback("vid-1", "c-1").unwrap());

        let dup = store.save_feedback("vid-1", "c-1", "love it again", "negative");
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        // Same comment id on another video is a different comment.
        store
            .save_feedback("vid-2", "c-1", "also here", "neutral")
            .unwrap();
        assert!(!store.has_feedback("vid-3", "c-1").unwrap());
    }

    #[test]
    fn counts_songs_by_status() {
        let (_dir, store) = test_store();
        let a = pending_song(&store, "a");
        let _b = pending_song(&store, "b");
        store
            .set_song_status(&a.id, SongStatus::Uploaded, Some("vid-a"))
            .unwrap();

        let counts = store.count_songs_by_status().unwrap();
        assert!(counts.contains(&(SongStatus::Pending, 1)));
        assert!(counts.contains(&(SongStatus::Uploaded, 1)));
    }

    #[test]
    fn prunes_old_activity_entries() {
        let (_dir, store) = test_store();
        store.log_activity(ActivityLevel::Info, "old entry").unwrap();
        store.log_activity(ActivityLevel::Warn, "older entry").unwrap();

        let future = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        assert_eq!(store.prune_activity_log(&future).unwrap(), 2);
        assert_eq!(store.prune_activity_log(&future).unwrap(), 0);
    }

    #[test]
    fn rejects_database_with_unexpected_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("songflow.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("PRAGMA user_version = 7", []).unwrap();
        }
        assert!(SqliteSongStore::new(&path).is_err());
    }
}
