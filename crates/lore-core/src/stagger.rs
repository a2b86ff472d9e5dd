//! Deterministic entry delays for feed items.
//!
//! A replayed session must render with the same pacing as its live run, so
//! the delay depends only on the event id and its position in the batch.

use crate::constants::{FNV_OFFSET_BASIS, FNV_PRIME, JITTER_MODULUS_MS, STAGGER_STEP_SECS};

/// FNV-1a 64-bit over the UTF-8 bytes of `s`.
pub fn fnv1a64(s: &str) -> u64 {
    s.bytes().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Per-id jitter in seconds, in `[0, 0.150]`.
pub fn jitter_secs(event_id: &str) -> f64 {
    (fnv1a64(event_id) % JITTER_MODULUS_MS) as f64 / 1000.0
}

/// Seconds to wait before showing the item at `index`.
///
/// Negative or non-finite indices count as 0.
pub fn entry_delay(event_id: &str, index: f64) -> f64 {
    let index = if index.is_finite() && index >= 0.0 {
        index
    } else {
        0.0
    };
    index * STAGGER_STEP_SECS + jitter_secs(event_id)
}
