use serde_json::Value;

/// One decoded import event.
///
/// Recognized `type` tags get their own variant; anything else is carried
/// through as [`ImportEvent::Unrecognized`] with its raw tag and payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportEvent {
    Connecting(Value),
    ReplayManifest(Value),
    EncodingStart(Value),
    EpisodeCreated(Value),
    EpisodeSkipped(Value),
    EncodingError(Value),
    Complete(Value),
    Unrecognized { kind: String, data: Value },
}

impl ImportEvent {
    /// Build an event from its wire `type` tag and `data` payload.
    pub fn from_parts(kind: &str, data: Value) -> Self {
        match kind {
            "connecting" => Self::Connecting(data),
            "replay_manifest" => Self::ReplayManifest(data),
            "encoding_start" => Self::EncodingStart(data),
            "episode_created" => Self::EpisodeCreated(data),
            "episode_skipped" => Self::EpisodeSkipped(data),
            "encoding_error" => Self::EncodingError(data),
            "complete" => Self::Complete(data),
            other => Self::Unrecognized {
                kind: other.to_string(),
                data,
            },
        }
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Self::Connecting(_) => "connecting",
            Self::ReplayManifest(_) => "replay_manifest",
            Self::EncodingStart(_) => "encoding_start",
            Self::EpisodeCreated(_) => "episode_created",
            Self::EpisodeSkipped(_) => "episode_skipped",
            Self::EncodingError(_) => "encoding_error",
            Self::Complete(_) => "complete",
            Self::Unrecognized { kind, .. } => kind,
        }
    }

    pub fn data(&self) -> &Value {
        match self {
            Self::Connecting(data)
            | Self::ReplayManifest(data)
            | Self::EncodingStart(data)
            | Self::EpisodeCreated(data)
            | Self::EpisodeSkipped(data)
            | Self::EncodingError(data)
            | Self::Complete(data)
            | Self::Unrecognized { data, .. } => data,
        }
    }

    /// Event types whose presence means the import is running for the first time.
    pub fn is_liveness_signal(&self) -> bool {
        matches!(
            self,
            Self::Connecting(_)
                | Self::EncodingStart(_)
                | Self::EpisodeCreated(_)
                | Self::EpisodeSkipped(_)
                | Self::EncodingError(_)
                | Self::Complete(_)
        )
    }

    /// Control-plane events: never rendered, never persisted.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::ReplayManifest(_))
    }

    /// Upstream identifier from `data.id`, if the producer sent one.
    pub fn event_id(&self) -> Option<String> {
        match self.data().get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Wire representation: `{"type": ..., "data": ...}`.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "type": self.kind(),
            "data": self.data(),
        })
    }
}
