//! JSON-lines replay of recorded collector output.
//!
//! One [`FeedRecord`] per line. Blank lines and `#` comments are ignored;
//! lines that fail to parse, invalid UTF-8 included, are logged and skipped
//! so one bad record never aborts a replay.

use super::types::FeedRecord;
use super::MarketFeed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const DEFAULT_BATCH_SIZE: usize = 256;

pub struct ReplayFeed {
    name: String,
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    buf: Vec<u8>,
    batch_size: usize,
    line_no: usize,
    skipped: usize,
    done: bool,
}

/// Parse one replay line. `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<FeedRecord>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let record = serde_json::from_str(trimmed).context("invalid feed record")?;
    Ok(Some(record))
}

impl ReplayFeed {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open replay file {}", path.display()))?;
        Ok(Self::from_reader(path.display().to_string(), BufReader::new(file)))
    }

    pub fn from_reader<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            name: name.into(),
            reader: Box::new(reader),
            buf: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            line_no: 0,
            skipped: 0,
            done: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Lines rejected so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[async_trait]
impl MarketFeed for ReplayFeed {
    async fn next_batch(&mut self) -> Result<Option<Vec<FeedRecord>>> {
        if self.done {
            return Ok(None);
        }
        let mut batch = Vec::new();
        while batch.len() < self.batch_size {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .with_context(|| format!("failed to read {} after line {}", self.name, self.line_no))?;
            if read == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(source = %self.name, line = self.line_no, error = %e, "skipping non-UTF-8 replay line");
                    continue;
                }
            };
            match parse_line(line) {
                Ok(Some(record)) => batch.push(record),
                Ok(None) => {}
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(source = %self.name, line = self.line_no, error = %e, "skipping malformed replay line");
                }
            }
        }
        if batch.is_empty() && self.done {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
