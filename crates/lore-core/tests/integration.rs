//! Integration tests exercising the full import pipeline:
//! chunked bytes → frames → mode → episodes → pacing, across module boundaries.

use lore_core::{
    Episode, ImportEvent, ImportSession, PatternKey, SessionBatch, StreamMode, decode_frames,
    encode_frame, entry_delay, pattern_label_for_key,
};
use serde_json::json;

fn live_transcript() -> String {
    [
        ImportEvent::from_parts("connecting", json!({"repo": "acme/api"})),
        ImportEvent::from_parts("encoding_start", json!({"total": 3})),
        ImportEvent::from_parts(
            "episode_created",
            json!({
                "id": "ep-1",
                "title": "stop forwarding upstream bearer tokens",
                "triggers": ["bearer-token-forwarding", "credential-propagation"],
                "pr_number": 101,
            }),
        ),
        ImportEvent::from_parts("progress", json!({"done": 1})),
        ImportEvent::from_parts(
            "episode_created",
            json!({"id": "ep-2", "title": "misc cleanup", "pr_number": 102}),
        ),
        ImportEvent::from_parts("episode_skipped", json!({"pr_number": 103, "reason": "noise"})),
        ImportEvent::from_parts("complete", json!({"episodes": 2})),
    ]
    .iter()
    .map(encode_frame)
    .collect()
}

fn replay_transcript() -> String {
    let manifest = ImportEvent::from_parts("replay_manifest", json!({"mode": "import_replay"}));
    format!("{}{}", encode_frame(&manifest), live_transcript())
}

struct Run {
    mode: StreamMode,
    kinds: Vec<String>,
    episodes: Vec<Episode>,
    delays: Vec<f64>,
}

/// Feed `text` in fixed-size chunks, the way a network read loop would.
fn run_chunked(text: &str, chunk_size: usize) -> Run {
    let mut session = ImportSession::new();
    let mut run = Run {
        mode: StreamMode::Unknown,
        kinds: Vec::new(),
        episodes: Vec::new(),
        delays: Vec::new(),
    };

    let bytes = text.as_bytes();
    let batches: Vec<SessionBatch> = bytes
        .chunks(chunk_size)
        .map(|chunk| session.ingest_chunk(std::str::from_utf8(chunk).expect("ascii transcript")))
        .collect();
    for batch in batches.iter().chain(std::iter::once(&session.finish())) {
        run.kinds.extend(batch.items.iter().map(|i| i.event.kind().to_string()));
        run.delays.extend(batch.items.iter().map(|i| i.delay_secs));
        run.episodes.extend(batch.episodes().cloned());
    }
    run.mode = session.mode();
    run
}

fn titles(run: &Run) -> Vec<&str> {
    run.episodes.iter().map(|e| e.title.as_str()).collect()
}

#[test]
fn chunk_size_does_not_change_result() {
    let text = live_transcript();
    let whole = run_chunked(&text, text.len());

    for size in [1, 2, 7, 13, 64] {
        let run = run_chunked(&text, size);
        assert_eq!(run.mode, whole.mode, "chunk size {size}");
        assert_eq!(run.kinds, whole.kinds, "chunk size {size}");
        assert_eq!(titles(&run), titles(&whole), "chunk size {size}");
        assert_eq!(run.delays, whole.delays, "chunk size {size}");
    }
}

#[test]
fn line_by_line_feed_paces_like_whole_stream() {
    let text = live_transcript();
    let mut whole = ImportSession::new();
    let expected: Vec<f64> = whole
        .ingest_chunk(&text)
        .items
        .iter()
        .map(|i| i.delay_secs)
        .collect();

    let mut session = ImportSession::new();
    let mut delays = Vec::new();
    for line in text.split_inclusive('\n') {
        delays.extend(session.ingest_chunk(line).items.iter().map(|i| i.delay_secs));
    }
    assert_eq!(delays, expected);
}

#[test]
fn live_session_end_to_end() {
    let Run {
        mode,
        kinds,
        episodes,
        ..
    } = run_chunked(&live_transcript(), 32);

    assert_eq!(mode, StreamMode::Live);
    assert_eq!(
        kinds,
        vec![
            "connecting",
            "encoding_start",
            "episode_created",
            "progress",
            "episode_created",
            "episode_skipped",
            "complete",
        ]
    );

    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].pattern_key, Some(PatternKey::AuthTokenHandling));
    assert_eq!(episodes[0].source_pr_number, Some(101));
    assert_eq!(episodes[1].pattern_key, Some(PatternKey::Uncategorized));

    let label = pattern_label_for_key(episodes[0].pattern_key().as_str()).unwrap();
    assert_eq!(label, "Auth token handling");
}

#[test]
fn replay_session_resolves_replay_and_hides_manifest() {
    let replay = run_chunked(&replay_transcript(), 5);
    assert_eq!(replay.mode, StreamMode::Replay);
    assert!(!replay.kinds.iter().any(|k| k == "replay_manifest"));
    assert_eq!(replay.episodes.len(), 2);
    assert_eq!(replay.delays, run_chunked(&live_transcript(), 11).delays);
}

#[test]
fn replay_pacing_matches_live_pacing() {
    let mut live = ImportSession::new();
    let mut replay = ImportSession::new();

    let live_batch = live.ingest_chunk(&live_transcript());
    let replay_batch = replay.ingest_chunk(&replay_transcript());

    let live_delays: Vec<f64> = live_batch.items.iter().map(|i| i.delay_secs).collect();
    let replay_delays: Vec<f64> = replay_batch.items.iter().map(|i| i.delay_secs).collect();
    assert_eq!(live_delays, replay_delays);
    assert_eq!(live_delays[2], entry_delay("ep-1", 2.0));
}

#[test]
fn corrupt_frame_mid_stream_is_isolated() {
    let text = format!(
        "{}data: {{\"type\":\"episode_created\",\"data\":\n\n{}",
        encode_frame(&ImportEvent::from_parts("connecting", json!({}))),
        encode_frame(&ImportEvent::from_parts("complete", json!({}))),
    );
    let out = decode_frames(&text);
    let kinds: Vec<&str> = out.events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["connecting", "complete"]);
}

#[test]
fn empty_and_repeated_input() {
    let mut session = ImportSession::new();
    for _ in 0..3 {
        assert!(session.ingest_chunk("").is_empty());
    }
    assert!(session.finish().is_empty());
    assert_eq!(session.mode(), StreamMode::Unknown);
}
