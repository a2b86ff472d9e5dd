use rusqlite::Connection;

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    // Concurrent import workers share one file; wait on locks instead of failing fast.
    conn.pragma_update(None, "busy_timeout", 5000)?;

    // The unique index on (scope, source_pr_number) is the final authority on
    // duplicates. SQLite treats NULLs as distinct, so episodes without a PR
    // number never collide.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_episodes (
            id               TEXT PRIMARY KEY,
            scope            TEXT NOT NULL,
            source_pr_number INTEGER,
            title            TEXT NOT NULL,
            triggers         TEXT NOT NULL DEFAULT '[]',
            summary          TEXT,
            pattern_key      TEXT NOT NULL,
            event_id         TEXT,
            mode             TEXT NOT NULL DEFAULT 'unknown',
            created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_ep_scope_pr
            ON import_episodes(scope, source_pr_number);
        CREATE INDEX IF NOT EXISTS idx_ep_scope_pattern
            ON import_episodes(scope, pattern_key);
        ",
    )?;

    if let Some(found) = get_schema_version(conn)?
        && found > SCHEMA_VERSION
    {
        return Err(StoreError::InvalidData(format!(
            "database schema version {found} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
