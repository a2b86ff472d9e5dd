//! Per-import session context.
//!
//! Owns the two pieces of state the pure pipeline threads between decode
//! cycles: the undecoded remainder and the sticky stream mode. One session per
//! import stream; chunks must be fed in arrival order.

use crate::constants::FRAME_DELIMITER;
use crate::episode::Episode;
use crate::event::ImportEvent;
use crate::frame::decode_frames;
use crate::mode::{StreamMode, resolve, strip_control_events};
use crate::stagger::entry_delay;

/// One content event ready for rendering and persistence.
#[derive(Clone, Debug)]
pub struct FeedItem {
    pub event: ImportEvent,
    /// Classified episode, for `episode_created` events with a usable payload.
    pub episode: Option<Episode>,
    pub delay_secs: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SessionBatch {
    /// Session mode after this batch was observed.
    pub mode: StreamMode,
    pub items: Vec<FeedItem>,
}

impl SessionBatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.items.iter().filter_map(|item| item.episode.as_ref())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImportSession {
    mode: StreamMode,
    remainder: String,
    /// Content items emitted so far; drives pacing across chunk boundaries.
    feed_index: usize,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume with a mode resolved by an earlier run of the same session.
    pub fn with_mode(mode: StreamMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Number of content items emitted so far.
    pub fn feed_index(&self) -> usize {
        self.feed_index
    }

    /// Feed the next chunk of stream text.
    ///
    /// Item positions count from the start of the session, so the same stream
    /// paces identically however it was split into chunks.
    pub fn ingest_chunk(&mut self, chunk: &str) -> SessionBatch {
        let mut buffer = std::mem::take(&mut self.remainder);
        buffer.push_str(chunk);

        let decoded = decode_frames(&buffer);
        self.remainder = decoded.remainder;
        self.mode = resolve(self.mode, &decoded.events);

        let start = self.feed_index;
        let items: Vec<FeedItem> = strip_control_events(decoded.events)
            .into_iter()
            .zip(start..)
            .map(|(event, index)| {
                let episode = Episode::from_event(&event).map(|mut ep| {
                    ep.classify();
                    ep
                });
                let stagger_id = event
                    .event_id()
                    .unwrap_or_else(|| format!("{}-{index}", event.kind()));
                FeedItem {
                    delay_secs: entry_delay(&stagger_id, index as f64),
                    event,
                    episode,
                }
            })
            .collect();
        self.feed_index += items.len();

        SessionBatch {
            mode: self.mode,
            items,
        }
    }

    /// End of stream: decode a final frame whose closing blank line never
    /// arrived. Whitespace-only leftovers are discarded.
    pub fn finish(&mut self) -> SessionBatch {
        if self.remainder.trim().is_empty() {
            self.remainder.clear();
            return SessionBatch {
                mode: self.mode,
                items: Vec::new(),
            };
        }
        let batch = self.ingest_chunk(FRAME_DELIMITER);
        self.remainder.clear();
        batch
    }
}
