//! `generate --upload-s3` followed by `cleanup-s3`, against an in-memory store.

use crate::{init_tracing, small_args};
use loadtest_manifest::read_manifest;
use tempfile::TempDir;
use xml_loadgen::loadtest::args::csv_object_key;
use xml_loadgen::loadtest::CleanupS3Args;
use xml_loadgen::{cleanup_s3_with_store, generate_with_store};
use xml_loadgen_file::{MemoryStore, ObjectStore};

const BUCKET: &str = "loadtest-bucket";

#[tokio::test]
async fn test_upload_then_cleanup_s3() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let store = MemoryStore::new();

    let mut args = small_args(&temp_dir, 5);
    args.no_attachments_percent = 40;
    args.upload_s3 = true;
    args.s3_bucket = Some(BUCKET.to_string());

    let summary = generate_with_store(&args, Some(&store)).await?;
    assert_eq!(summary.records_written, 5);
    assert_eq!(summary.objects_uploaded, 6);

    let rows = read_manifest(&summary.manifest)?;
    let csv_key = csv_object_key(&summary.manifest);
    assert!(!csv_key.starts_with('/'));

    let mut expected_keys: Vec<String> = rows
        .iter()
        .map(|row| format!("test_xmls/{}", row.filename))
        .collect();
    for row in &rows {
        assert_eq!(
            row.filepath,
            format!("s3://{BUCKET}/test_xmls/{}", row.filename)
        );
        // XML is uploaded, not written locally
        assert!(!args.output_dir.join(&row.filename).exists());
    }
    expected_keys.push(csv_key.clone());
    expected_keys.sort();
    assert_eq!(store.keys(BUCKET), expected_keys);

    let uploaded_manifest = store.get_object(BUCKET, &csv_key).await?;
    assert_eq!(uploaded_manifest, std::fs::read(&summary.manifest)?);

    let cleanup_args = CleanupS3Args {
        s3_bucket: Some(BUCKET.to_string()),
        csv_name: summary.manifest.clone(),
        s3_prefix: "test_xmls".to_string(),
        download_dir: temp_dir.path().to_path_buf(),
    };
    let cleanup = cleanup_s3_with_store(&cleanup_args, &store).await?;

    assert!(cleanup.manifest_downloaded);
    assert_eq!(cleanup.objects_deleted, 5);
    assert!(cleanup.manifest_deleted);
    assert!(store.is_empty());
    assert!(!cleanup_args.download_path().exists());

    Ok(())
}

#[tokio::test]
async fn test_upload_requires_bucket() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let mut args = small_args(&temp_dir, 1);
    args.upload_s3 = true;

    assert!(generate_with_store(&args, Some(&store)).await.is_err());
    assert!(store.is_empty());
}
