//! Event-stream frame decoding.
//!
//! A buffer holds zero or more complete frames followed by at most one
//! incomplete trailing frame. Frames are separated by a blank line; inside a
//! frame only `data: ` lines carry payload, and multi-line payloads are
//! rejoined with `\n`.
//!
//! Decoding is best-effort per frame: a frame that is not a JSON object with
//! a string `type` and a `data` field is dropped without affecting its
//! neighbours.

use serde_json::Value;

use crate::constants::{DATA_PREFIX, FRAME_DELIMITER};
use crate::event::ImportEvent;

/// Output of one decode cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedFrames {
    /// Complete, well-formed events in arrival order.
    pub events: Vec<ImportEvent>,
    /// Unparsed tail. Prepend it to the next chunk.
    pub remainder: String,
}

/// Decode every complete frame in `buffer`.
///
/// The final segment after the last frame boundary is never parsed, even if
/// it happens to look complete; it is returned verbatim as the remainder.
pub fn decode_frames(buffer: &str) -> DecodedFrames {
    let mut segments: Vec<&str> = buffer.split(FRAME_DELIMITER).collect();
    let remainder = segments.pop().unwrap_or_default().to_string();

    let events = segments.into_iter().filter_map(decode_frame).collect();

    DecodedFrames { events, remainder }
}

/// Decode a single complete frame, or `None` if it carries no usable event.
fn decode_frame(frame: &str) -> Option<ImportEvent> {
    let data_lines: Vec<&str> = frame
        .split('\n')
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .collect();
    if data_lines.is_empty() {
        return None;
    }

    let payload = data_lines.join("\n");
    let value: Value = serde_json::from_str(&payload).ok()?;
    let Value::Object(mut obj) = value else {
        return None;
    };

    let kind = match obj.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return None,
    };
    let data = obj.remove("data")?;

    Some(ImportEvent::from_parts(&kind, data))
}

/// Render one event as a complete frame, trailing blank line included.
pub fn encode_frame(event: &ImportEvent) -> String {
    format!("{DATA_PREFIX}{}{FRAME_DELIMITER}", event.to_json())
}
