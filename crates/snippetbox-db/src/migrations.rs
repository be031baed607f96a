use rusqlite::Connection;
use tracing::info;

/// Bring the schema up to date. Idempotent.
pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (snippets, users, sessions)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE snippets (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 100),
                content     TEXT NOT NULL CHECK (length(content) > 0),
                created     TEXT NOT NULL,
                expires     TEXT NOT NULL
            );

            CREATE INDEX idx_snippets_expires_created
                ON snippets(expires, created);

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                hashed_password BLOB NOT NULL,
                created         TEXT NOT NULL
            );

            CREATE TABLE sessions (
                token   TEXT PRIMARY KEY,
                data    BLOB NOT NULL,
                expiry  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_expiry
                ON sessions(expiry);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
