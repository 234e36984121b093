//! Timeline logger for fork events
//!
//! Records every attempt, grant, and release as one JSON line, in the
//! order the seats produced them. File I/O runs on a background writer
//! thread fed over a channel, so logging never blocks a philosopher;
//! `flush` forces pending entries to disk before the file is handed to
//! the showcase.
//!
//! The log is a flat event stream - who held what when is reconstructed
//! by whoever reads it.

use crate::core::types::{ForkEvent, ForkId, SeatId};
use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A single fork event, as written to the log
#[derive(Debug, Serialize, Clone)]
pub struct LogEntry {
    /// Seat that produced the event
    pub seat: SeatId,
    /// Fork involved
    pub fork: ForkId,
    /// What happened
    pub event: ForkEvent,
    /// Seconds since the Unix epoch, microsecond resolution
    pub timestamp: f64,
}

/// Commands for the background writer thread
#[derive(Debug)]
enum LoggerCommand {
    /// Write one entry
    LogEntry(LogEntry),
    /// Flush pending entries to disk and signal completion
    Flush(Sender<()>),
}

/// Asynchronous JSON-lines logger for one dinner
///
/// Instance-based: each dinner owns its logger and its file; two tables
/// never interleave their timelines.
pub struct EventLogger {
    /// Channel into the writer thread
    sender: Sender<LoggerCommand>,
    /// Set while a flush is in progress
    flushing: Arc<AtomicBool>,
    /// Resolved log file path (placeholders already substituted)
    path: PathBuf,
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        // Flush remaining entries so the timeline survives the drop
        if let Err(e) = self.flush() {
            eprintln!("Warning: Failed to flush logs during EventLogger drop: {e:?}");
        }
    }
}

impl EventLogger {
    /// Create a logger writing to the given file
    ///
    /// # Arguments
    /// * `path` - Path to the log file. If it contains `"{timestamp}"`,
    ///   that is replaced with the current UTC timestamp; parent
    ///   directories are created as needed.
    ///
    /// # Errors
    /// Returns an error if the parent directory could not be created or
    /// the file could not be opened for writing.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();

        // Create directory if needed
        if let Some(parent) = path_buf.parent()
            && parent.to_string_lossy() != ""
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Replace timestamp placeholder if present
        #[allow(clippy::literal_string_with_formatting_args)]
        let file_path = if path_buf.to_string_lossy().contains("{timestamp}") {
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(
                path_buf
                    .to_string_lossy()
                    .replace("{timestamp}", &timestamp.to_string()),
            )
        } else {
            path_buf
        };

        let (tx, rx) = unbounded::<LoggerCommand>();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&file_path)?;

        let flushing = Arc::new(AtomicBool::new(false));
        let flushing_clone = Arc::clone(&flushing);

        // Spawn async writer thread
        std::thread::spawn(move || async_logger_thread(file, rx, flushing_clone));

        Ok(EventLogger {
            sender: tx,
            flushing,
            path: file_path,
        })
    }

    /// The resolved file this logger writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one fork event
    ///
    /// Non-blocking: the entry is timestamped here and handed to the
    /// writer thread. A closed channel is reported, not propagated - a
    /// philosopher never fails because its diary did.
    pub fn log_event(&self, seat: SeatId, fork: ForkId, event: ForkEvent) {
        let now = Utc::now();
        let timestamp = now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1_000_000.0;

        let entry = LogEntry {
            seat,
            fork,
            event,
            timestamp,
        };

        if let Err(e) = self.sender.send(LoggerCommand::LogEntry(entry)) {
            eprintln!("Failed to send log entry: {e:?}");
        }
    }

    /// Force all pending entries to disk
    ///
    /// Blocks until the writer thread confirms. Concurrent calls
    /// collapse into one: while a flush is already running, others
    /// return immediately.
    ///
    /// # Errors
    /// Returns an error if the writer thread is gone or does not confirm
    /// within the timeout.
    pub fn flush(&self) -> Result<()> {
        // CAS so only one flush is in flight at a time
        let already_flushing = self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err();

        if already_flushing {
            return Ok(());
        }

        let result = (|| {
            let (flush_tx, flush_rx) = unbounded();
            self.sender.send(LoggerCommand::Flush(flush_tx))?;

            match flush_rx.recv_timeout(Duration::from_secs(10)) {
                Ok(_) => Ok(()),
                Err(_) => Err(anyhow::anyhow!("Flush operation timed out")),
            }
        })();

        self.flushing.store(false, Ordering::SeqCst);
        result
    }
}

/// Writer thread: drains the channel into the file
///
/// Runs until the channel closes, then flushes one last time.
fn async_logger_thread(file: File, rx: Receiver<LoggerCommand>, flushing: Arc<AtomicBool>) {
    let mut writer = BufWriter::new(file);

    while let Ok(cmd) = rx.recv() {
        match cmd {
            LoggerCommand::LogEntry(entry) => {
                if let Ok(json) = serde_json::to_string(&entry)
                    && let Err(e) = writeln!(writer, "{json}").and_then(|_| writer.flush())
                {
                    eprintln!("Logger write error: {e:?}");
                }
            }
            LoggerCommand::Flush(responder) => {
                flushing.store(true, Ordering::Release);
                if let Err(e) = writer.flush() {
                    eprintln!("Logger flush error: {e:?}");
                }
                flushing.store(false, Ordering::Release);
                let _ = responder.send(());
            }
        }
    }

    // Channel closed - final flush before the thread exits
    if let Err(e) = writer.flush() {
        eprintln!("Logger final flush error: {e:?}");
    }
}
