use std::path::{Path, PathBuf};

use catalog_core::Record;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

use crate::persist::{write_atomic, PersistError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("records could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("serialized records are not valid UTF-8")]
    Encoding,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub records: usize,
    pub bytes: usize,
}

/// JSON array of the records, 4-space indented, non-ASCII kept literal.
pub fn render_records(records: &[Record]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|_| ExportError::Encoding)
}

/// Write the records to `path`, replacing any previous output atomically.
pub fn write_records(records: &[Record], path: &Path) -> Result<ExportSummary, ExportError> {
    let json = render_records(records)?;
    write_atomic(path, &json)?;
    Ok(ExportSummary {
        path: path.to_path_buf(),
        records: records.len(),
        bytes: json.len(),
    })
}
