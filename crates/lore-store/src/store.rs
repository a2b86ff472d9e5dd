use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use lore_core::{Episode, PatternKey, StreamMode};

use crate::error::{Result, StoreError};
use crate::guard::{ImportRow, ImportStore};
use crate::schema;

pub struct Store {
    conn: Connection,
}

/// An episode as persisted, with its scope and session context.
#[derive(Clone, Debug)]
pub struct StoredEpisode {
    pub scope: String,
    pub episode: Episode,
    pub mode: StreamMode,
    pub created_at: String,
}

/// A pattern that recurs often enough in one scope to be promoted to a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromotionCandidate {
    pub scope: String,
    pub pattern_key: PatternKey,
    pub count: usize,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Episodes ---

    /// Plain insert. A duplicate `(scope, source_pr_number)` fails with a
    /// unique-constraint error for the guard to classify.
    pub fn insert_episode(&self, scope: &str, episode: &Episode, mode: StreamMode) -> Result<()> {
        let triggers = serde_json::to_string(&episode.triggers)?;
        self.conn.execute(
            "INSERT INTO import_episodes
                (id, scope, source_pr_number, title, triggers, summary, pattern_key, event_id, mode)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                episode.id.to_string(),
                scope,
                episode.source_pr_number,
                episode.title,
                triggers,
                episode.summary,
                episode.pattern_key().as_str(),
                episode.event_id,
                mode.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn pr_rows(&self, scope: &str) -> Result<Vec<ImportRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_pr_number FROM import_episodes WHERE scope = ?1")?;
        let rows = stmt
            .query_map([scope], |row| {
                Ok(ImportRow {
                    source_pr_number: row.get(0)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    }

    pub fn episodes_for_scope(&self, scope: &str) -> Result<Vec<StoredEpisode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_pr_number, title, triggers, summary, pattern_key, event_id, mode, created_at
             FROM import_episodes WHERE scope = ?1 ORDER BY rowid",
        )?;

        let rows: Vec<EpisodeRow> = stmt
            .query_map([scope], |row| {
                Ok(EpisodeRow {
                    id: row.get(0)?,
                    source_pr_number: row.get(1)?,
                    title: row.get(2)?,
                    triggers: row.get(3)?,
                    summary: row.get(4)?,
                    pattern_key: row.get(5)?,
                    event_id: row.get(6)?,
                    mode: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter().map(|r| r.into_stored(scope)).collect()
    }

    pub fn count_for_scope(&self, scope: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM import_episodes WHERE scope = ?1",
            [scope],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn scopes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT scope FROM import_episodes ORDER BY scope")?;
        let scopes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(scopes)
    }

    /// Episode count per pattern key for one scope, most frequent first.
    pub fn pattern_counts(&self, scope: &str) -> Result<Vec<(PatternKey, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT pattern_key, COUNT(*) AS n FROM import_episodes
             WHERE scope = ?1 GROUP BY pattern_key ORDER BY n DESC, pattern_key",
        )?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([scope], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(key, n)| Ok((parse_pattern_key(&key)?, n as usize)))
            .collect()
    }

    /// Categorized patterns seen at least `min_count` times within a scope.
    /// The fallback bucket is never a candidate.
    pub fn promotion_candidates(&self, min_count: usize) -> Result<Vec<PromotionCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT scope, pattern_key, COUNT(*) AS n FROM import_episodes
             WHERE pattern_key != ?1
             GROUP BY scope, pattern_key
             HAVING n >= ?2
             ORDER BY n DESC, scope, pattern_key",
        )?;
        let rows: Vec<(String, String, i64)> = stmt
            .query_map(
                params![PatternKey::Uncategorized.as_str(), min_count as i64],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(scope, key, n)| {
                Ok(PromotionCandidate {
                    scope,
                    pattern_key: parse_pattern_key(&key)?,
                    count: n as usize,
                })
            })
            .collect()
    }
}

impl ImportStore for Store {
    fn existing_rows(&self, scope: &str) -> Result<Vec<ImportRow>> {
        self.pr_rows(scope)
    }

    fn insert_episode(&self, scope: &str, episode: &Episode, mode: StreamMode) -> Result<()> {
        Store::insert_episode(self, scope, episode, mode)
    }
}

struct EpisodeRow {
    id: String,
    source_pr_number: Option<i64>,
    title: String,
    triggers: String,
    summary: Option<String>,
    pattern_key: String,
    event_id: Option<String>,
    mode: String,
    created_at: String,
}

impl EpisodeRow {
    fn into_stored(self, scope: &str) -> Result<StoredEpisode> {
        let triggers: Vec<String> = serde_json::from_str(&self.triggers)?;
        let mode = self
            .mode
            .parse::<StreamMode>()
            .map_err(StoreError::InvalidData)?;
        Ok(StoredEpisode {
            scope: scope.to_string(),
            episode: Episode {
                id: parse_uuid(&self.id)?,
                title: self.title,
                triggers,
                summary: self.summary,
                source_pr_number: self.source_pr_number,
                event_id: self.event_id,
                pattern_key: Some(parse_pattern_key(&self.pattern_key)?),
            },
            mode,
            created_at: self.created_at,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}

/// Stored keys outside the taxonomy mean the table and the code disagree.
fn parse_pattern_key(s: &str) -> Result<PatternKey> {
    s.parse::<PatternKey>()
        .map_err(|e| StoreError::InvalidData(e.to_string()))
}
