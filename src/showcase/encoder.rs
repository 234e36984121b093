use anyhow::{Context, Result};
use base64::alphabet::URL_SAFE;
use base64::engine::{Engine as _, general_purpose};
use flate2::Compression;
use flate2::write::GzEncoder;
use rmp_serde;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Converts a timeline log file to a compact, compressed, encoded format
/// suitable for URL parameters
///
/// # Arguments
/// * `log_path` - Path to the original log file
///
/// # Returns
/// A Result that contains the encoded string or an error
pub fn process_log_for_url<P: AsRef<Path>>(log_path: P) -> Result<String> {
    // Parse the input file
    let file = File::open(log_path).context("Failed to open log file")?;
    let reader = BufReader::new(file);

    // Create compact data structure
    let mut compact_events = Vec::new();

    // Process each line
    for line in reader.lines() {
        let line = line.context("Failed to read line from log file")?;
        if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
            let event = parse_log_entry(entry).context("Failed to parse log entry")?;
            compact_events.push(event);
        }
    }

    // Create the compact timeline data
    let compact_data = TimelineData {
        events: compact_events,
    };

    // 1. Convert to MessagePack
    let msgpack =
        rmp_serde::to_vec(&compact_data).context("Failed to convert data to MessagePack")?;

    // 2. Apply Gzip compression
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(&msgpack)
        .context("Failed to compress data")?;
    let compressed = encoder.finish().context("Failed to finish compression")?;

    // 3. Apply Base64URL encoding
    let base64_engine = general_purpose::GeneralPurpose::new(&URL_SAFE, general_purpose::PAD);
    let encoded = base64_engine.encode(compressed);

    Ok(encoded)
}

/// Original log entry structure from the file
#[derive(Debug, Deserialize)]
struct LogEntry {
    seat: u64,
    fork: u64,
    event: String,
    timestamp: f64,
}

// Event format: (seat, fork, event_code, timestamp)
type Event = (u64, u64, u8, f64);

type Events = Vec<Event>;

/// Compact output structure
#[derive(Serialize, Deserialize)]
pub struct TimelineData {
    pub events: Events,
}

/// Parse a log entry into the compact format
fn parse_log_entry(entry: LogEntry) -> Result<Event> {
    let event_code = match entry.event.as_str() {
        "Attempt" => 0u8,
        "Acquired" => 1u8,
        "Released" => 2u8,
        other => anyhow::bail!("Invalid event type: '{}'", other),
    };

    Ok((entry.seat, entry.fork, event_code, entry.timestamp))
}
