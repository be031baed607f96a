//! Common test utilities: a real SQLite file in a temporary directory.

use std::sync::Arc;

use snippetbox_crypto::PasswordParams;
use snippetbox_db::{Database, SqliteSnippetModel, SqliteUserModel, StoreError};
use tempfile::TempDir;

/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestDb {
    pub db: Arc<Database>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestDb {
    pub fn new() -> Self {
        Self::with_readers(2)
    }

    pub fn with_readers(readers: usize) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let path = temp_dir.path().join("snippetbox.db");
        let db = Database::open(path.to_str().expect("utf-8 temp path"), readers)
            .expect("Failed to open database");
        Self {
            db: Arc::new(db),
            _temp_dir: temp_dir,
        }
    }

    pub fn snippets(&self) -> SqliteSnippetModel {
        SqliteSnippetModel::new(self.db.clone())
    }

    pub fn users(&self) -> SqliteUserModel {
        self.users_with(PasswordParams::fast_insecure())
    }

    pub fn users_with(&self, params: PasswordParams) -> SqliteUserModel {
        SqliteUserModel::new(self.db.clone(), params).expect("Failed to build user model")
    }

    /// Push a snippet's expiry `secs` seconds into the past, bypassing the model.
    pub fn expire_snippet(&self, id: i64, secs: i64) {
        self.db
            .with_conn_mut(|conn| {
                conn.execute(
                    "UPDATE snippets
                     SET expires = strftime('%Y-%m-%d %H:%M:%f', 'now', ?2)
                     WHERE id = ?1",
                    rusqlite::params![id, format!("-{} seconds", secs)],
                )
                .map_err(StoreError::from)
            })
            .expect("Failed to expire snippet");
    }
}
