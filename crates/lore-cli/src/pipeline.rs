//! Drives one import session against the store.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result};
use lore_core::{ImportEvent, ImportSession, SessionBatch, StreamMode};
use lore_store::{PersistOutcome, Store, load_existing_pr_numbers, try_persist};

/// Metadata key holding the mode of the most recent import into a scope.
pub fn last_mode_key(scope: &str) -> String {
    format!("last_import_mode:{scope}")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub mode: StreamMode,
    pub events: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// `episode_skipped` events reported by the producer.
    pub skipped: usize,
    pub errors: usize,
    /// `episode_created` events without a usable title.
    pub unusable: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={} events={} inserted={} duplicates={} skipped={} errors={}",
            self.mode, self.events, self.inserted, self.duplicates, self.skipped, self.errors
        )?;
        if self.unusable > 0 {
            write!(f, " unusable={}", self.unusable)?;
        }
        Ok(())
    }
}

pub struct ImportRunner<'a> {
    store: &'a Store,
    scope: String,
    session: ImportSession,
    existing: BTreeSet<i64>,
    summary: ImportSummary,
}

impl<'a> ImportRunner<'a> {
    /// Start a session; snapshots the PR numbers already stored for `scope`.
    pub fn new(store: &'a Store, scope: &str) -> Result<Self> {
        let existing = load_existing_pr_numbers(store, scope)
            .with_context(|| format!("failed to load existing episodes for {scope}"))?;
        tracing::debug!(scope, known = existing.len(), "import session started");
        Ok(Self {
            store,
            scope: scope.to_string(),
            session: ImportSession::new(),
            existing,
            summary: ImportSummary::default(),
        })
    }

    pub fn feed(&mut self, chunk: &str) -> Result<()> {
        let batch = self.session.ingest_chunk(chunk);
        self.apply(batch)
    }

    pub fn finish(mut self) -> Result<ImportSummary> {
        let batch = self.session.finish();
        self.apply(batch)?;
        self.summary.mode = self.session.mode();
        self.store
            .set_metadata(&last_mode_key(&self.scope), self.summary.mode.as_str())
            .context("failed to record import mode")?;
        Ok(self.summary)
    }

    fn apply(&mut self, batch: SessionBatch) -> Result<()> {
        self.summary.mode = batch.mode;
        for item in batch.items {
            self.summary.events += 1;
            tracing::trace!(kind = item.event.kind(), delay = item.delay_secs, "feed item");

            match &item.event {
                ImportEvent::EpisodeSkipped(_) => self.summary.skipped += 1,
                ImportEvent::EncodingError(data) => {
                    self.summary.errors += 1;
                    tracing::warn!(scope = %self.scope, "producer reported encoding error: {data}");
                }
                ImportEvent::Unrecognized { kind, .. } => {
                    tracing::debug!(kind = kind.as_str(), "ignoring unrecognized event");
                }
                _ => {}
            }

            if !matches!(item.event, ImportEvent::EpisodeCreated(_)) {
                continue;
            }
            let Some(episode) = item.episode else {
                self.summary.unusable += 1;
                tracing::warn!(scope = %self.scope, "episode_created without a title");
                continue;
            };

            let outcome = try_persist(
                self.store,
                &self.scope,
                &episode,
                batch.mode,
                &mut self.existing,
            )
            .with_context(|| format!("failed to persist episode {:?}", episode.title))?;

            match outcome {
                PersistOutcome::Inserted => {
                    self.summary.inserted += 1;
                    tracing::info!(
                        scope = %self.scope,
                        pr = episode.source_pr_number,
                        pattern = episode.pattern_key().as_str(),
                        "stored episode"
                    );
                }
                PersistOutcome::Duplicate(_) => self.summary.duplicates += 1,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_core::PatternKey;

    fn frame(kind: &str, data: &str) -> String {
        format!("data: {{\"type\":\"{kind}\",\"data\":{data}}}\n\n")
    }

    fn transcript() -> String {
        [
            frame("connecting", "{}"),
            frame("encoding_start", "{\"total\":3}"),
            frame(
                "episode_created",
                "{\"id\":\"e1\",\"title\":\"Rotate refresh token on login\",\"pr_number\":12}",
            ),
            frame(
                "episode_created",
                "{\"id\":\"e2\",\"title\":\"Quarantine flaky payment test\",\"triggers\":[\"flaky test\"],\"pr_number\":13}",
            ),
            frame("episode_skipped", "{\"pr_number\":14}"),
            frame("complete", "{}"),
        ]
        .concat()
    }

    #[test]
    fn test_live_import_persists_episodes() {
        let store = Store::open_in_memory().unwrap();
        let mut runner = ImportRunner::new(&store, "acme_api").unwrap();
        runner.feed(&transcript()).unwrap();
        let summary = runner.finish().unwrap();

        assert_eq!(summary.mode, StreamMode::Live);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.duplicates, 0);
        assert_eq!(store.count_for_scope("acme_api").unwrap(), 2);

        let counts = store.pattern_counts("acme_api").unwrap();
        assert!(counts.contains(&(PatternKey::AuthTokenHandling, 1)));
        assert!(counts.contains(&(PatternKey::FlakyTests, 1)));
    }

    #[test]
    fn test_reimport_counts_duplicates() {
        let store = Store::open_in_memory().unwrap();
        for _ in 0..2 {
            let mut runner = ImportRunner::new(&store, "acme_api").unwrap();
            runner.feed(&transcript()).unwrap();
            runner.finish().unwrap();
        }
        let mut runner = ImportRunner::new(&store, "acme_api").unwrap();
        runner.feed(&transcript()).unwrap();
        let summary = runner.finish().unwrap();

        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(store.count_for_scope("acme_api").unwrap(), 2);
    }

    #[test]
    fn test_split_chunks_and_unterminated_tail() {
        let store = Store::open_in_memory().unwrap();
        let text = transcript();
        let trimmed = text.trim_end_matches('\n');
        let (a, b) = trimmed.split_at(trimmed.len() / 2);

        let mut runner = ImportRunner::new(&store, "acme_api").unwrap();
        runner.feed(a).unwrap();
        runner.feed(b).unwrap();
        let summary = runner.finish().unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.events, 6);
    }

    #[test]
    fn test_replay_recorded_in_metadata() {
        let store = Store::open_in_memory().unwrap();
        let mut runner = ImportRunner::new(&store, "acme_api").unwrap();
        runner
            .feed(&frame("replay_manifest", "{\"mode\":\"import_replay\"}"))
            .unwrap();
        runner
            .feed(&frame("episode_created", "{\"title\":\"Add null check\",\"pr_number\":1}"))
            .unwrap();
        let summary = runner.finish().unwrap();

        assert_eq!(summary.mode, StreamMode::Replay);
        assert_eq!(summary.events, 1);
        assert_eq!(
            store.get_metadata(&last_mode_key("acme_api")).unwrap().as_deref(),
            Some("replay")
        );
    }

    #[test]
    fn test_untitled_episode_counted_unusable() {
        let store = Store::open_in_memory().unwrap();
        let mut runner = ImportRunner::new(&store, "s").unwrap();
        runner
            .feed(&frame("episode_created", "{\"pr_number\":9}"))
            .unwrap();
        let summary = runner.finish().unwrap();

        assert_eq!(summary.unusable, 1);
        assert_eq!(summary.inserted, 0);
        assert!(summary.to_string().contains("unusable=1"));
    }
}
