use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};

use crate::models::MessageRecord;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("column `{0}` not found in header")]
    MissingColumn(String),
    #[error("row {row}: cannot parse timestamp `{value}`")]
    BadTimestamp { row: usize, value: String },
    #[error("row {row}: sender is empty")]
    EmptySender { row: usize },
    #[error("input contains no messages")]
    Empty,
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Header names of the two columns the export must carry.
#[derive(Debug, Clone)]
pub struct Columns {
    pub time: String,
    pub sender: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            time: "StrTime".to_string(),
            sender: "NickName".to_string(),
        }
    }
}

pub fn load_messages(path: &Path, columns: &Columns) -> anyhow::Result<Vec<MessageRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records = read_messages(file, columns)
        .with_context(|| format!("failed to load messages from {}", path.display()))?;
    tracing::info!(count = records.len(), path = %path.display(), "loaded messages");
    Ok(records)
}

pub fn read_messages<R: Read>(input: R, columns: &Columns) -> Result<Vec<MessageRecord>, LoadError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let time_idx = position(&columns.time)?;
    let sender_idx = position(&columns.sender)?;

    let mut messages = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result?;
        let raw_time = record.get(time_idx).unwrap_or_default().trim();
        let sent_at = parse_timestamp(raw_time).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_time.to_string(),
        })?;
        let sender = record.get(sender_idx).unwrap_or_default().trim();
        if sender.is_empty() {
            return Err(LoadError::EmptySender { row });
        }
        messages.push(MessageRecord {
            sender: sender.to_string(),
            sent_at,
        });
    }

    if messages.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(messages)
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
