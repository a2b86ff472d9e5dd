/// Frame boundary on the wire: one blank line.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Literal prefix of payload-carrying lines inside a frame.
pub const DATA_PREFIX: &str = "data: ";

/// `data.mode` value a `replay_manifest` carries when the session is a replay.
pub const REPLAY_MODE_MARKER: &str = "import_replay";

/// Seconds between consecutive feed items before jitter.
pub const STAGGER_STEP_SECS: f64 = 0.12;

/// Jitter is `hash % JITTER_MODULUS_MS` milliseconds, so at most 150ms.
pub const JITTER_MODULUS_MS: u64 = 151;

/// FNV-1a 64-bit offset basis
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
