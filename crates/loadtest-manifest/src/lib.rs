//! JMeter CSV manifest for generated declarations.
//!
//! Every generated XML gets one row describing where it lives and what it
//! carries. The same file drives object-store cleanup later on.
//!
//! # Example
//!
//! ```ignore
//! use loadtest_manifest::{ManifestRow, ManifestWriter};
//!
//! let writer = ManifestWriter::new("/test_xmls/jmeter_data.csv");
//! let rows: Vec<ManifestRow> = records
//!     .iter()
//!     .map(|r| ManifestRow::from_record(r, format!("test_xmls/{}", r.xml_filename)))
//!     .collect();
//! let metrics = writer.append(&rows)?;
//! ```

mod error;
mod manifest;

pub use error::ManifestError;
pub use manifest::{read_filenames, read_manifest, AppendMetrics, ManifestRow, ManifestWriter};
