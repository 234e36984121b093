pub mod encoder;
use encoder::process_log_for_url;

use anyhow::{Context, Result};
use std::path::Path;

/// Showcase a dinner timeline in the browser
///
/// This function processes a timeline log file and opens a browser window
/// to replay the dinner it records: who reached for which fork, who held
/// it, and where the table seized up. The visualization is hosted on a
/// web server.
///
/// # Arguments
/// * `log_path` - Path to the timeline log file.
///
/// # Returns
/// A Result that is Ok if the showcase succeeded, or an error if it failed.
///
/// # Errors
/// Returns an error if:
/// - Failed to read the log file
/// - Failed to process the log file
/// - Failed to open the browser
///
/// # Example
///
/// ```no_run
/// use forklore::showcase;
/// use std::path::Path;
///
/// // After the dinner has run for a while (or deadlocked)
/// let log_path = Path::new("dinner_timeline.json");
/// showcase(log_path).expect("Failed to showcase dinner timeline");
/// ```
pub fn showcase<P: AsRef<Path>>(log_path: P) -> Result<()> {
    // Process the log file to get an encoded string suitable for URLs
    let encoded_log =
        process_log_for_url(&log_path).context("Failed to process log file for URL")?;

    // Construct the URL with the encoded timeline as a parameter
    let showcase_url = format!("https://forklore-rs.github.io/viewer/?timeline={encoded_log}");

    // Open the URL in the default web browser.
    webbrowser::open(&showcase_url).context("Failed to open browser")?;

    Ok(())
}
