//! Reporting for driver runs.
//!
//! Responses are logged as pretty JSON when they parse as JSON, and each call
//! of a stress run is appended to a CSV file as a [`CallRecord`].

use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::response::{CallOutcome, Response};

/// One row of a stress-run CSV.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub timestamp: DateTime<Utc>,
    pub iteration: usize,
    pub method: String,
    pub url: String,
    /// `success` or the failure kind.
    pub outcome: String,
    pub status: Option<u16>,
    pub bytes: usize,
    pub elapsed_ms: u64,
    pub error_message: Option<String>,
}

impl CallRecord {
    pub fn from_outcome(
        iteration: usize,
        method: &str,
        url: &str,
        outcome: &CallOutcome,
        elapsed: Duration,
    ) -> Self {
        let (result, status, bytes, error_message) = match outcome {
            Ok(response) => (
                "success".to_string(),
                Some(response.status().as_u16()),
                response.bytes().len(),
                None,
            ),
            Err(e) => (e.kind().to_string(), None, 0, Some(e.to_string())),
        };

        Self {
            timestamp: Utc::now(),
            iteration,
            method: method.to_string(),
            url: url.to_string(),
            outcome: result,
            status,
            bytes,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            error_message,
        }
    }
}

/// Logs the response body, pretty-printed when it is JSON.
pub fn print_response(response: &Response) {
    match response.json_pretty() {
        Ok(pretty) => info!(status = response.status().as_u16(), "\n{}", pretty),
        Err(_) => info!(status = response.status().as_u16(), "\n{}", response.text()),
    }
}

/// Appends a [`CallRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &CallRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}
