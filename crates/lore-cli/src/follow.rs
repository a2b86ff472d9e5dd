//! Follow a live import stream over HTTP.

use anyhow::{Context, Result, bail};
use futures_util::{Stream, StreamExt, pin_mut};

use crate::config::Config;
use crate::pipeline::{ImportRunner, ImportSummary};

/// Holds back a trailing partial UTF-8 sequence until the next chunk completes it.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
        text
    }

    /// Flush whatever is left, replacing an incomplete sequence.
    pub fn finish(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned()
    }
}

/// Decode a response body into text chunks in arrival order.
pub fn text_chunks(response: reqwest::Response) -> impl Stream<Item = Result<String>> {
    async_stream::try_stream! {
        let mut carry = Utf8Carry::default();
        let body = response.bytes_stream();
        pin_mut!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("failed to read import stream")?;
            let text = carry.push(&chunk);
            if !text.is_empty() {
                yield text;
            }
        }
        let tail = carry.finish();
        if !tail.is_empty() {
            yield tail;
        }
    }
}

/// Stream `url` into `runner` until the server closes, the stream goes idle
/// past the configured timeout, or the user interrupts.
pub async fn follow(
    config: &Config,
    url: &str,
    mut runner: ImportRunner<'_>,
) -> Result<ImportSummary> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} returned {status}");
    }
    tracing::info!("following {url}");

    let chunks = text_chunks(response);
    pin_mut!(chunks);
    let idle = config.idle_timeout();
    let interrupted = tokio::signal::ctrl_c();
    pin_mut!(interrupted);

    loop {
        tokio::select! {
            next = tokio::time::timeout(idle, chunks.next()) => {
                match next {
                    Ok(Some(text)) => runner.feed(&text?)?,
                    Ok(None) => break,
                    Err(_) => bail!("no data from {url} for {}s", idle.as_secs()),
                }
            }
            _ = &mut interrupted => {
                tracing::warn!("interrupted, finishing session");
                break;
            }
        }
    }

    runner.finish()
}
