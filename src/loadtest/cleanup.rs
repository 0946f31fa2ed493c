//! `cleanup` and `cleanup-s3` command handlers.

use crate::loadtest::args::{CleanupArgs, CleanupS3Args};
use anyhow::Context;
use loadtest_manifest::read_filenames;
use std::path::Path;
use tracing::{error, info, warn};
use xml_loadgen_file::{join_key, ObjectStore, S3Store};

/// What `cleanup-s3` managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupS3Summary {
    pub manifest_downloaded: bool,
    pub objects_deleted: usize,
    pub manifest_deleted: bool,
}

/// Remove the local output directory and manifest.
pub fn run_cleanup(args: &CleanupArgs) -> anyhow::Result<()> {
    info!("Cleaning up local files...");

    if args.output_dir.exists() {
        std::fs::remove_dir_all(&args.output_dir).with_context(|| {
            format!("Failed to remove directory: {}", args.output_dir.display())
        })?;
        info!("Deleted output directory: {}", args.output_dir.display());
    } else {
        warn!("Output directory not found: {}", args.output_dir.display());
    }

    if let Some(csv_name) = &args.csv_name {
        if csv_name.exists() {
            std::fs::remove_file(csv_name)
                .with_context(|| format!("Failed to remove CSV: {}", csv_name.display()))?;
            info!("Deleted local CSV: {}", csv_name.display());
        } else {
            warn!("CSV file not found locally: {}", csv_name.display());
        }
    }

    Ok(())
}

pub async fn run_cleanup_s3(args: CleanupS3Args) -> anyhow::Result<()> {
    let store = S3Store::new().await;
    let summary = cleanup_s3_with_store(&args, &store).await?;
    info!(
        "S3 cleanup finished: {} objects deleted, manifest deleted: {}",
        summary.objects_deleted, summary.manifest_deleted
    );
    Ok(())
}

/// Delete every object listed in the uploaded manifest, then the manifest.
///
/// Store failures are logged and do not stop the remaining steps.
pub async fn cleanup_s3_with_store(
    args: &CleanupS3Args,
    store: &dyn ObjectStore,
) -> anyhow::Result<CleanupS3Summary> {
    let manifest = args.manifest_location()?;
    let bucket = manifest.bucket.as_str();
    let csv_key = manifest.key.as_str();
    let csv_url = manifest.to_string();
    let local = args.download_path();
    let mut summary = CleanupS3Summary::default();

    match store.download_file(bucket, csv_key, &local).await {
        Ok(()) => {
            info!("Downloaded CSV from {csv_url} to {}", local.display());
            summary.manifest_downloaded = true;
        }
        Err(e) if e.is_no_such_key() => error!("The CSV file {csv_url} does not exist"),
        Err(e) => error!("Failed to download CSV from {csv_url}: {e:#}"),
    }

    summary.objects_deleted = delete_listed_objects(store, bucket, &args.s3_prefix, &local).await?;

    match store.delete_object(bucket, csv_key).await {
        Ok(()) => {
            info!("Deleted CSV from {csv_url}");
            summary.manifest_deleted = true;
        }
        Err(e) if e.is_no_such_key() => error!("The CSV file {csv_url} does not exist"),
        Err(e) => error!("Failed to delete CSV file {csv_url}: {e:#}"),
    }

    if local.exists() {
        std::fs::remove_file(&local)
            .with_context(|| format!("Failed to remove {}", local.display()))?;
        info!("Also deleted the downloaded CSV: {}", local.display());
    }

    Ok(summary)
}

/// Delete `<prefix>/<filename>` for each manifest row.
async fn delete_listed_objects(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    manifest: &Path,
) -> anyhow::Result<usize> {
    if !manifest.exists() {
        warn!("CSV file not found locally: {}", manifest.display());
        return Ok(0);
    }

    let keys: Vec<String> = read_filenames(manifest)
        .with_context(|| format!("Failed to read manifest: {}", manifest.display()))?
        .iter()
        .map(|name| join_key(prefix, name))
        .collect();

    if keys.is_empty() {
        info!("No objects found to delete.");
        return Ok(0);
    }

    match store.delete_objects(bucket, &keys).await {
        Ok(deleted) => {
            info!("Deleted {deleted} objects from s3://{bucket}");
            Ok(deleted)
        }
        Err(e) => {
            error!("Failed to delete {} objects from s3://{bucket}: {e:#}", keys.len());
            Ok(0)
        }
    }
}
