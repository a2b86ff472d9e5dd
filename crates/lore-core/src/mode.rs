//! Sticky live/replay resolution for one import session.
//!
//! `Unknown` is the only state that can move. Once a batch proves the session
//! is a replay (manifest marker) or live (any liveness signal), the mode is
//! fixed for the rest of the session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::REPLAY_MODE_MARKER;
use crate::event::ImportEvent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    #[default]
    Unknown,
    Live,
    Replay,
}

impl StreamMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamMode::Unknown => "unknown",
            StreamMode::Live => "live",
            StreamMode::Replay => "replay",
        }
    }

    /// `Live` and `Replay` are absorbing.
    pub fn is_resolved(self) -> bool {
        !matches!(self, StreamMode::Unknown)
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(StreamMode::Unknown),
            "live" => Ok(StreamMode::Live),
            "replay" => Ok(StreamMode::Replay),
            other => Err(format!("unknown stream mode: {other}")),
        }
    }
}

/// Next session mode given the current one and a freshly decoded batch.
///
/// A replay marker beats liveness signals in the same batch.
pub fn resolve(current: StreamMode, events: &[ImportEvent]) -> StreamMode {
    if current.is_resolved() {
        return current;
    }
    if detect_replay_marker(events) {
        StreamMode::Replay
    } else if detect_live_signal(events) {
        StreamMode::Live
    } else {
        StreamMode::Unknown
    }
}

/// True if any event is a `replay_manifest` with `data.mode == "import_replay"`.
pub fn detect_replay_marker(events: &[ImportEvent]) -> bool {
    events.iter().any(|event| match event {
        ImportEvent::ReplayManifest(data) => {
            matches!(data.get("mode"), Some(Value::String(mode)) if mode == REPLAY_MODE_MARKER)
        }
        _ => false,
    })
}

pub fn detect_live_signal(events: &[ImportEvent]) -> bool {
    events.iter().any(ImportEvent::is_liveness_signal)
}

/// Drop `replay_manifest` events before rendering or persistence.
pub fn strip_control_events(events: Vec<ImportEvent>) -> Vec<ImportEvent> {
    events.into_iter().filter(|e| !e.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(kind: &str, data: Value) -> ImportEvent {
        ImportEvent::from_parts(kind, data)
    }

    fn manifest() -> ImportEvent {
        ev("replay_manifest", json!({"mode": "import_replay"}))
    }

    #[test]
    fn test_empty_batch_stays_unknown() {
        assert_eq!(resolve(StreamMode::Unknown, &[]), StreamMode::Unknown);
    }

    #[test]
    fn test_liveness_resolves_live() {
        for kind in [
            "connecting",
            "encoding_start",
            "episode_created",
            "episode_skipped",
            "encoding_error",
            "complete",
        ] {
            assert_eq!(
                resolve(StreamMode::Unknown, &[ev(kind, json!({}))]),
                StreamMode::Live,
                "{kind} should be a liveness signal"
            );
        }
    }

    #[test]
    fn test_marker_resolves_replay() {
        assert_eq!(resolve(StreamMode::Unknown, &[manifest()]), StreamMode::Replay);
    }

    #[test]
    fn test_marker_beats_liveness_in_same_batch() {
        let batch = [ev("connecting", json!({})), manifest(), ev("complete", json!({}))];
        assert_eq!(resolve(StreamMode::Unknown, &batch), StreamMode::Replay);
    }

    #[test]
    fn test_manifest_with_other_mode_is_not_replay() {
        let batch = [ev("replay_manifest", json!({"mode": "fresh"}))];
        assert!(!detect_replay_marker(&batch));
        assert_eq!(resolve(StreamMode::Unknown, &batch), StreamMode::Unknown);

        let batch = [ev("replay_manifest", json!({"mode": 1}))];
        assert!(!detect_replay_marker(&batch));

        let batch = [ev("replay_manifest", json!(null))];
        assert!(!detect_replay_marker(&batch));
    }

    #[test]
    fn test_unrecognized_types_do_not_resolve() {
        let batch = [ev("progress", json!({})), ev("heartbeat", json!({}))];
        assert_eq!(resolve(StreamMode::Unknown, &batch), StreamMode::Unknown);
    }

    #[test]
    fn test_live_is_sticky() {
        assert_eq!(resolve(StreamMode::Live, &[manifest()]), StreamMode::Live);
        assert_eq!(resolve(StreamMode::Live, &[]), StreamMode::Live);
    }

    #[test]
    fn test_replay_is_sticky() {
        let batch = [ev("connecting", json!({}))];
        assert_eq!(resolve(StreamMode::Replay, &batch), StreamMode::Replay);
        assert_eq!(resolve(StreamMode::Replay, &[]), StreamMode::Replay);
    }

    #[test]
    fn test_strip_control_events() {
        let batch = vec![manifest(), ev("episode_created", json!({})), ev("progress", json!({}))];
        let kinds: Vec<String> = strip_control_events(batch)
            .iter()
            .map(|e| e.kind().to_string())
            .collect();
        assert_eq!(kinds, vec!["episode_created", "progress"]);
    }

    #[test]
    fn test_display_fromstr() {
        for mode in [StreamMode::Unknown, StreamMode::Live, StreamMode::Replay] {
            assert_eq!(mode.to_string().parse::<StreamMode>().unwrap(), mode);
        }
        assert!("paused".parse::<StreamMode>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&StreamMode::Replay).unwrap(), "\"replay\"");
    }
}
