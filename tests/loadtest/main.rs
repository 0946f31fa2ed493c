//! End-to-end tests for the xml-loadgen commands.
//!
//! Each test generates a small batch from the fixture templates into a
//! temporary directory, then checks the written files, the manifest, and
//! (for the upload flow) an in-memory object store.

mod generate_local;
mod generate_upload;

use std::path::PathBuf;
use tempfile::TempDir;
use xml_loadgen::loadtest::GenerateArgs;

pub const SEED: u64 = 42;

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Small, fast generate arguments rooted in `temp_dir`.
pub fn small_args(temp_dir: &TempDir, num: u64) -> GenerateArgs {
    GenerateArgs {
        num,
        output_dir: temp_dir.path().join("test_xmls"),
        csv_name: Some(temp_dir.path().join("test_xmls").join("jmeter_data.csv")),
        base_xml: fixture("IE3F32.xml"),
        alt_base_xml: None,
        alt_base_percent: 0,
        no_attachments_percent: 0,
        goods_percent: 0,
        goods: Vec::new(),
        attachments_total_mb: 0.05,
        attachment_max_mb: 0.02,
        pdf_prefix: "IE3FXX".to_string(),
        save_pdf: false,
        workers: Some(2),
        seed: Some(SEED),
        upload_s3: false,
        s3_bucket: None,
        s3_prefix: "test_xmls".to_string(),
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("xml_loadgen=debug,loadtest_generator=info")
        .try_init()
        .ok();
}
