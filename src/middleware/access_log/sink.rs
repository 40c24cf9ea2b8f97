//! Where entries go.

use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::policy::DEFAULT_CHANNEL;

/// Append-only destination for access log entries.
///
/// Both methods are fire-and-forget: implementations must not block on
/// durability and must contain their own failures.
pub trait LogSink: Send + Sync + 'static {
    /// A successful request's entry, on its channel.
    fn write(&self, channel: &str, text: &str);

    /// A failed request's entry. Failures are not routed by channel.
    fn error(&self, text: &str, include_stack: bool);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write(&self, channel: &str, text: &str) {
        (**self).write(channel, text)
    }

    fn error(&self, text: &str, include_stack: bool) {
        (**self).error(text, include_stack)
    }
}

// ── TracingSink ───────────────────────────────────────────────────────────────

/// Emits entries as `tracing` events under the `access` target: successes
/// at `INFO` with a `channel` field, failures at `ERROR`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, channel: &str, text: &str) {
        info!(target: "access", channel, "{text}");
    }

    fn error(&self, text: &str, include_stack: bool) {
        if include_stack {
            let stack = Backtrace::force_capture();
            error!(target: "access", "{text}{stack}");
        } else {
            error!(target: "access", "{text}");
        }
    }
}

// ── FileSink ──────────────────────────────────────────────────────────────────

/// Entries waiting for the writer task. Beyond this, entries are dropped.
const QUEUE_CAPACITY: usize = 10_000;

/// File that failure entries are appended to.
const ERROR_FILE: &str = "error.log";

struct Entry {
    file: String,
    text: String,
}

/// Appends entries to `<dir>/<channel>.log`, and failures to `<dir>/error.log`.
///
/// Writes are queued to a background task; the request path only pays for
/// a `try_send`. When the queue is full the entry is dropped. Dropping every
/// clone of the sink stops the task once the queue drains.
#[derive(Clone)]
pub struct FileSink {
    sender: mpsc::Sender<Entry>,
}

impl FileSink {
    /// Spawns the writer task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(dir: impl Into<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(write_loop(dir.into(), receiver));
        Self { sender }
    }

    fn enqueue(&self, file: String, text: String) {
        if let Err(e) = self.sender.try_send(Entry { file, text }) {
            debug!("access log entry dropped: {e}");
        }
    }
}

impl LogSink for FileSink {
    fn write(&self, channel: &str, text: &str) {
        self.enqueue(file_name(channel), text.to_owned());
    }

    fn error(&self, text: &str, include_stack: bool) {
        let text = if include_stack {
            format!("{text}{}\n", Backtrace::force_capture())
        } else {
            text.to_owned()
        };
        self.enqueue(ERROR_FILE.to_owned(), text);
    }
}

/// `users/admin` → `users_admin.log`. Never escapes the log directory, and
/// never lands in [`ERROR_FILE`]: an `error` channel is written to `error_.log`.
fn file_name(channel: &str) -> String {
    let channel = if channel.is_empty() { DEFAULT_CHANNEL } else { channel };
    let stem: String = channel.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let name = format!("{stem}.log");
    if name.eq_ignore_ascii_case(ERROR_FILE) {
        format!("{stem}_.log")
    } else {
        name
    }
}

async fn write_loop(dir: PathBuf, mut receiver: mpsc::Receiver<Entry>) {
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        warn!(dir = %dir.display(), "cannot create access log directory: {e}");
    }
    while let Some(entry) = receiver.recv().await {
        if let Err(e) = append(&dir.join(&entry.file), &entry.text).await {
            warn!(file = %entry.file, "access log write failed: {e}");
        }
    }
}

async fn append(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await
}
