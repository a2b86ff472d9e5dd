use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::event::ImportEvent;
use crate::taxonomy::{PatternKey, map_to_pattern_key};

/// A memory record reconstructed from one `episode_created` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub summary: Option<String>,
    /// Upstream pull request this episode was mined from; the de-dup key.
    pub source_pr_number: Option<i64>,
    pub event_id: Option<String>,
    pub pattern_key: Option<PatternKey>,
}

impl Episode {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            triggers: Vec::new(),
            summary: None,
            source_pr_number: None,
            event_id: None,
            pattern_key: None,
        }
    }

    pub fn with_triggers<S: AsRef<str>>(mut self, triggers: &[S]) -> Self {
        self.triggers = triggers.iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    pub fn with_pr_number(mut self, pr: i64) -> Self {
        self.source_pr_number = Some(pr);
        self
    }

    /// Build an unclassified episode from an `episode_created` payload.
    ///
    /// Returns `None` for any other event type or when `data.title` is not a
    /// non-empty string. The PR number is read from `pr_number`, falling back
    /// to `source_pr_number`.
    pub fn from_event(event: &ImportEvent) -> Option<Self> {
        let ImportEvent::EpisodeCreated(data) = event else {
            return None;
        };

        let title = data.get("title")?.as_str()?.trim();
        if title.is_empty() {
            return None;
        }

        let triggers = match data.get("triggers") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let source_pr_number = data
            .get("pr_number")
            .and_then(Value::as_i64)
            .or_else(|| data.get("source_pr_number").and_then(Value::as_i64));

        Some(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            triggers,
            summary: data.get("summary").and_then(Value::as_str).map(str::to_string),
            source_pr_number,
            event_id: event.event_id(),
            pattern_key: None,
        })
    }

    /// Assign (or re-assign) the pattern key from title and triggers.
    pub fn classify(&mut self) -> PatternKey {
        let key = map_to_pattern_key(&self.title, &self.triggers);
        self.pattern_key = Some(key);
        key
    }

    /// Pattern key, classifying on the fly when not yet assigned.
    pub fn pattern_key(&self) -> PatternKey {
        self.pattern_key
            .unwrap_or_else(|| map_to_pattern_key(&self.title, &self.triggers))
    }
}
