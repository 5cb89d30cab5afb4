//! Minimal server-sent events reader for integration tests.
//!
//! Handles the subset the click service emits: `event:` and `data:` lines
//! separated by a blank line, plus `:` comment lines used for keep-alive.

use std::time::Duration;

/// One parsed event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: serde_json::Value,
}

/// Reads events from a streaming `reqwest::Response`.
pub struct SseReader {
    response: reqwest::Response,
    buffer: String,
}

impl SseReader {
    /// Open an event stream at `url`.
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let response = reqwest::Client::new()
            .get(url)
            .header("accept", "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        Ok(Self::new(response))
    }

    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    /// Next event, or `None` when the server closed the stream.
    pub async fn next_event(&mut self) -> Result<Option<SseEvent>, anyhow::Error> {
        loop {
            if let Some(event) = self.take_buffered()? {
                return Ok(Some(event));
            }
            match self.response.chunk().await? {
                Some(chunk) => self.buffer.push_str(std::str::from_utf8(&chunk)?),
                None => return Ok(None),
            }
        }
    }

    /// Next event, failing if none arrives within `limit`.
    pub async fn expect_event(&mut self, limit: Duration) -> Result<SseEvent, anyhow::Error> {
        tokio::time::timeout(limit, self.next_event())
            .await
            .map_err(|_| anyhow::anyhow!("No event within {:?}", limit))??
            .ok_or_else(|| anyhow::anyhow!("Stream closed before an event arrived"))
    }

    /// Whether another event arrives within `limit`.
    pub async fn has_event_within(&mut self, limit: Duration) -> Result<bool, anyhow::Error> {
        match tokio::time::timeout(limit, self.next_event()).await {
            Err(_) => Ok(false),
            Ok(result) => Ok(result?.is_some()),
        }
    }

    fn take_buffered(&mut self) -> Result<Option<SseEvent>, anyhow::Error> {
        let normalized = self.buffer.replace("\r\n", "\n");
        self.buffer = normalized;

        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end + 2).collect();

            let mut event = String::from("message");
            let mut data = String::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = value.trim().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push_str(value.trim());
                }
            }

            // Keep-alive comments carry no data
            if data.is_empty() {
                continue;
            }
            return Ok(Some(SseEvent {
                event,
                data: serde_json::from_str(&data)?,
            }));
        }
        Ok(None)
    }
}
