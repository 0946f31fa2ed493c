//! xml-loadgen library
//!
//! Load-test data generation for an XML ingestion pipeline: customs
//! declarations with base64-embedded PDF attachments, a JMeter CSV manifest,
//! and optional S3 publishing and teardown.
//!
//! # Crates
//!
//! - `loadtest_generator` - attachment planning, bounded-size PDFs, XML mutation
//! - `loadtest_manifest` - JMeter CSV manifest
//! - `xml_loadgen_file` - object store (S3, in-memory)
//!
//! # CLI Usage
//!
//! ```bash
//! # 100 declarations, 5 MB of attachments each in chunks of at most 2 MB
//! xml-loadgen generate --num 100 --attachments-total-mb 5 --attachment-max-mb 2
//!
//! # Upload instead of writing XML locally
//! xml-loadgen generate --num 100 --upload-s3 --s3-bucket my-bucket
//!
//! # Tear down what was uploaded
//! xml-loadgen cleanup-s3 --s3-bucket my-bucket --csv-name /test_xmls/jmeter_data_20240101000000.csv
//! ```

pub mod loadtest;

pub use loadtest::generate::{generate_with_store, GenerateSummary};
pub use loadtest::cleanup::{cleanup_s3_with_store, CleanupS3Summary};
