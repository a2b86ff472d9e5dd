//! Exactly-once episode persistence without a distributed lock.
//!
//! Two layers: a cheap membership pre-check against the PR numbers already
//! stored for the scope, then the store's own unique constraint for writers
//! that raced past the pre-check. A conflict from the second layer means
//! another worker won; it is reported as a duplicate, not an error.

use std::collections::BTreeSet;

use lore_core::{Episode, StreamMode};

use crate::error::{Result, StoreError, UNIQUE_VIOLATION_CODE};

/// The one column of a stored row the guard cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportRow {
    pub source_pr_number: Option<i64>,
}

/// Backing store seam. Implementations must enforce uniqueness of
/// `(scope, source_pr_number)` and report violations with
/// [`UNIQUE_VIOLATION_CODE`] through [`StoreError::code`].
pub trait ImportStore {
    fn existing_rows(&self, scope: &str) -> Result<Vec<ImportRow>>;
    fn insert_episode(&self, scope: &str, episode: &Episode, mode: StreamMode) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateReason {
    /// PR number was already in the caller's snapshot.
    PreCheck,
    /// Insert lost a race against another writer.
    Conflict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted,
    Duplicate(DuplicateReason),
}

impl PersistOutcome {
    pub fn is_inserted(self) -> bool {
        matches!(self, PersistOutcome::Inserted)
    }
}

/// Distinct, present PR numbers among `rows`. NULLs are ignored.
pub fn collect_existing_pr_numbers<'a, I>(rows: I) -> BTreeSet<i64>
where
    I: IntoIterator<Item = &'a ImportRow>,
{
    rows.into_iter()
        .filter_map(|row| row.source_pr_number)
        .collect()
}

/// Snapshot the scope's stored PR numbers. Recompute per session; never cache
/// across sessions.
pub fn load_existing_pr_numbers<S>(store: &S, scope: &str) -> Result<BTreeSet<i64>>
where
    S: ImportStore + ?Sized,
{
    let rows = store.existing_rows(scope)?;
    Ok(collect_existing_pr_numbers(&rows))
}

pub fn is_unique_violation_error(err: &StoreError) -> bool {
    err.code() == Some(UNIQUE_VIOLATION_CODE)
}

/// Write `episode` unless its PR number is already stored for `scope`.
///
/// `existing` is the caller's snapshot from [`load_existing_pr_numbers`]; a
/// successful insert adds its PR number so later episodes in the same session
/// see it. Episodes without a PR number are always written. Errors other than
/// a unique violation are returned unchanged.
pub fn try_persist<S>(
    store: &S,
    scope: &str,
    episode: &Episode,
    mode: StreamMode,
    existing: &mut BTreeSet<i64>,
) -> Result<PersistOutcome>
where
    S: ImportStore + ?Sized,
{
    if let Some(pr) = episode.source_pr_number
        && existing.contains(&pr)
    {
        tracing::debug!(scope, pr, "episode already stored, skipping");
        return Ok(PersistOutcome::Duplicate(DuplicateReason::PreCheck));
    }

    match store.insert_episode(scope, episode, mode) {
        Ok(()) => {
            if let Some(pr) = episode.source_pr_number {
                existing.insert(pr);
            }
            Ok(PersistOutcome::Inserted)
        }
        Err(e) if is_unique_violation_error(&e) => {
            tracing::debug!(
                scope,
                pr = episode.source_pr_number,
                "concurrent writer stored this episode first"
            );
            if let Some(pr) = episode.source_pr_number {
                existing.insert(pr);
            }
            Ok(PersistOutcome::Duplicate(DuplicateReason::Conflict))
        }
        Err(e) => Err(e),
    }
}
