//! Error types for metric sampling.
//!
//! Sampling errors never leave their collection task: they are logged and the
//! registry keeps whatever value it held before.

use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single sampler call or of one record inside a multi-record source.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The OS query or external command failed outright.
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },

    /// One entry of a multi-entry source could not be parsed.
    #[error("malformed {source_name} record {record:?}: {reason}")]
    MalformedRecord {
        source_name: &'static str,
        record: String,
        reason: String,
    },

    /// An external command did not finish in time and was killed.
    #[error("{source_name} timed out after {after:?}")]
    Timeout {
        source_name: &'static str,
        after: Duration,
    },
}

impl SampleError {
    pub fn unavailable(source_name: &'static str, reason: impl Display) -> Self {
        Self::SourceUnavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_name: &'static str, record: &str, reason: impl Display) -> Self {
        Self::MalformedRecord {
            source_name,
            record: record.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that only affect one record of a larger listing.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}
