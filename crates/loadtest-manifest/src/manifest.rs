//! CSV manifest writer and reader.

use crate::error::ManifestError;
use csv::{ReaderBuilder, WriterBuilder};
use loadtest_generator::GeneratedRecord;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default buffer size for CSV writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Column holding the generated XML file name.
pub const FILENAME_COLUMN: &str = "filename";

/// One manifest line, in JMeter column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub filename: String,
    pub filepath: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub lrn: String,
    pub timestamp: String,
    #[serde(rename = "hasAttachments")]
    pub has_attachments: bool,
    #[serde(rename = "attachmentCount")]
    pub attachment_count: usize,
    #[serde(rename = "attachmentsTotalMB")]
    pub attachments_total_mb: f64,
    #[serde(rename = "baseXml")]
    pub base_xml: String,
}

impl ManifestRow {
    /// Describe `record`, stored at `filepath`.
    pub fn from_record(record: &GeneratedRecord, filepath: impl Into<String>) -> Self {
        Self {
            filename: record.xml_filename.clone(),
            filepath: filepath.into(),
            message_id: record.message_id.clone(),
            lrn: record.lrn.clone(),
            timestamp: record.timestamp.clone(),
            has_attachments: record.has_attachments,
            attachment_count: record.attachment_count,
            attachments_total_mb: record.attachments_total_mb,
            base_xml: record.base_xml.display().to_string(),
        }
    }
}

/// Metrics from an append operation.
#[derive(Debug, Clone, Default)]
pub struct AppendMetrics {
    /// Number of rows written.
    pub rows_written: u64,
    /// Whether this append created the header.
    pub wrote_header: bool,
    /// Total time taken.
    pub total_duration: Duration,
    /// Manifest size in bytes after the append.
    pub file_size_bytes: u64,
}

/// Appends rows to a manifest, writing the header only into a new file.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    path: PathBuf,
}

impl ManifestWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, creating the file (and its parent directory) if needed.
    pub fn append(&self, rows: &[ManifestRow]) -> Result<AppendMetrics, ManifestError> {
        let start_time = Instant::now();
        let mut metrics = AppendMetrics::default();

        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut writer = WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(buf_writer);

        for row in rows {
            writer.serialize(row)?;
            metrics.rows_written += 1;
        }

        // An empty append into a new file still gets its header.
        if rows.is_empty() && is_new {
            writer.write_record(header())?;
        }

        writer.flush()?;
        drop(writer);

        metrics.wrote_header = is_new;
        metrics.file_size_bytes = std::fs::metadata(&self.path)?.len();
        metrics.total_duration = start_time.elapsed();

        info!(
            "Manifest {}: appended {} rows in {:?}",
            self.path.display(),
            metrics.rows_written,
            metrics.total_duration
        );

        Ok(metrics)
    }
}

/// Read every row of a manifest.
pub fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<ManifestRow>, ManifestError> {
    let mut reader = ReaderBuilder::new().from_path(path.as_ref())?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<ManifestRow>, _>>()?;
    debug!("Read {} rows from {}", rows.len(), path.as_ref().display());
    Ok(rows)
}

/// Read only the `filename` column, tolerating any other columns.
pub fn read_filenames(path: impl AsRef<Path>) -> Result<Vec<String>, ManifestError> {
    let mut reader = ReaderBuilder::new().from_path(path.as_ref())?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h == FILENAME_COLUMN)
        .ok_or_else(|| ManifestError::MissingColumn(FILENAME_COLUMN.to_string()))?;

    let mut filenames = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(column).filter(|n| !n.is_empty()) {
            filenames.push(name.to_string());
        }
    }
    Ok(filenames)
}

fn header() -> [&'static str; 9] {
    [
        "filename",
        "filepath",
        "messageId",
        "lrn",
        "timestamp",
        "hasAttachments",
        "attachmentCount",
        "attachmentsTotalMB",
        "baseXml",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(i: usize) -> ManifestRow {
        ManifestRow {
            filename: format!("IE3F32_updated_2.0MB_total_20240101000000_{i}.xml"),
            filepath: format!("test_xmls/IE3F32_updated_2.0MB_total_20240101000000_{i}.xml"),
            message_id: format!("TEST-MSG-ID{i}"),
            lrn: "20240101000000_001LRN".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            has_attachments: i % 2 == 0,
            attachment_count: i,
            attachments_total_mb: 2.0,
            base_xml: "IE3F32.xml".to_string(),
        }
    }

    #[test]
    fn test_header_and_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jmeter_data.csv");

        let metrics = ManifestWriter::new(&path).append(&[row(0), row(1)]).unwrap();

        assert_eq!(metrics.rows_written, 2);
        assert!(metrics.wrote_header);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], header().join(","));
        assert!(lines[1].contains(",true,0,2.0,IE3F32.xml"));
        assert!(lines[2].contains(",false,1,2.0,IE3F32.xml"));
    }

    #[test]
    fn test_append_writes_header_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("jmeter_data.csv");
        let writer = ManifestWriter::new(&path);

        writer.append(&[row(0)]).unwrap();
        let metrics = writer.append(&[row(1), row(2)]).unwrap();

        assert!(!metrics.wrote_header);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert_eq!(content.matches("messageId").count(), 1);
    }

    #[test]
    fn test_empty_append_creates_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jmeter_data.csv");

        ManifestWriter::new(&path).append(&[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), header().join(","));
        assert!(read_manifest(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_back_rows_and_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jmeter_data.csv");
        let rows = vec![row(0), row(1), row(2)];
        ManifestWriter::new(&path).append(&rows).unwrap();

        assert_eq!(read_manifest(&path).unwrap(), rows);
        assert_eq!(
            read_filenames(&path).unwrap(),
            rows.iter().map(|r| r.filename.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_read_filenames_missing_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("other.csv");
        std::fs::write(&path, "name,size\na,1\n").unwrap();

        let result = read_filenames(&path);
        assert!(matches!(result, Err(ManifestError::MissingColumn(_))));
    }
}
