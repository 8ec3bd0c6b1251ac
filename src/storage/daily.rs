//! Daily summary gate.
//!
//! Tracks the last calendar date a daily summary went out, as a single ISO
//! date in a marker file. There is no explicit reset; the date comparison
//! rolls the gate open again at each new calendar day.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::Result;
use crate::storage::{read_bytes_optional, write_bytes_atomic};

/// Gate deciding whether today's summary is still owed.
#[derive(Debug, Clone)]
pub struct DailyGate {
    path: PathBuf,
}

impl DailyGate {
    /// Create a gate backed by the given marker file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// True if no summary has been sent on the given date yet.
    ///
    /// A missing or unparsable marker counts as "not sent"; the date is
    /// caller-supplied so tests can drive the calendar.
    pub async fn should_send_today(&self, today: NaiveDate) -> bool {
        match self.last_sent().await {
            Some(last) => last != today,
            None => true,
        }
    }

    /// Record that the summary for the given date has been sent.
    pub async fn mark_sent(&self, today: NaiveDate) -> Result<()> {
        write_bytes_atomic(&self.path, today.to_string().as_bytes()).await
    }

    /// Read the stored marker date, if any.
    async fn last_sent(&self) -> Option<NaiveDate> {
        let bytes = match read_bytes_optional(&self.path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Could not read daily marker {:?}: {}", self.path, e);
                return None;
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        match text.trim().parse::<NaiveDate>() {
            Ok(date) => Some(date),
            Err(e) => {
                log::warn!(
                    "Daily marker {:?} holds no valid date ({}); treating as unsent",
                    self.path,
                    e
                );
                None
            }
        }
    }
}
