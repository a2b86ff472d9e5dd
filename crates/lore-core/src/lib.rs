//! Repository-import stream engine.
//!
//! Decodes the import event stream into typed events, resolves whether the
//! session is a live import or a replay, turns `episode_created` events into
//! classified episodes, and assigns deterministic feed pacing.
//!
//! Zero I/O: no transport, no persistence, no logging. Callers own the byte
//! stream and hand text in chunk by chunk.

pub mod constants;
pub mod episode;
pub mod event;
pub mod frame;
pub mod mode;
pub mod session;
pub mod stagger;
pub mod taxonomy;
pub mod tokenizer;

pub use constants::{DATA_PREFIX, FRAME_DELIMITER, REPLAY_MODE_MARKER};
pub use episode::Episode;
pub use event::ImportEvent;
pub use frame::{DecodedFrames, decode_frames, encode_frame};
pub use mode::{StreamMode, detect_live_signal, detect_replay_marker, resolve, strip_control_events};
pub use session::{FeedItem, ImportSession, SessionBatch};
pub use stagger::{entry_delay, fnv1a64};
pub use taxonomy::{PatternKey, TAXONOMY_RULES, TaxonomyError, map_to_pattern_key, pattern_label_for_key};
pub use tokenizer::{normalize, tokenize};
