//! `generate` command handler.

use crate::loadtest::args::{csv_object_key, local_filepath, GenerateArgs};
use anyhow::Context;
use chrono::Utc;
use futures::{stream, FutureExt, StreamExt};
use loadtest_generator::{
    mb_to_bytes, DeclarationGenerator, GeneratedRecord, GeneratorConfig, TemplateSource,
};
use loadtest_manifest::{ManifestRow, ManifestWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use xml_loadgen_file::{join_key, object_url, ObjectStore, S3Store};

/// Outcome of one `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateSummary {
    pub records_written: usize,
    pub failed_tasks: usize,
    pub manifest: PathBuf,
    /// Objects uploaded, including the manifest.
    pub objects_uploaded: usize,
    pub duration: Duration,
}

/// Run `generate`, connecting to S3 only when uploading.
pub async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    args.validate()?;

    let summary = if args.upload_s3 {
        let store = S3Store::new().await;
        generate_with_store(&args, Some(&store)).await?
    } else {
        generate_with_store(&args, None).await?
    };

    info!(
        "Generated {} XML files ({} failed) in {:?}",
        summary.records_written, summary.failed_tasks, summary.duration
    );
    Ok(())
}

/// Generate records, write or upload them, and append the manifest.
///
/// `store` must be set when `args.upload_s3` is.
pub async fn generate_with_store(
    args: &GenerateArgs,
    store: Option<&dyn ObjectStore>,
) -> anyhow::Result<GenerateSummary> {
    args.validate()?;
    let start_time = Instant::now();

    let upload = match (args.upload_s3, &args.s3_bucket, store) {
        (true, Some(bucket), Some(store)) => Some((bucket.as_str(), store)),
        (true, _, None) => anyhow::bail!("--upload-s3 requires an object store"),
        _ => None,
    };

    let config = build_config(args)?;
    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;

    let compact = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let manifest_path = args.manifest_path(&compact);

    let workers = args.worker_count();
    info!(
        "Generating {} XML files from {} with {} workers",
        args.num,
        config.base_template.path().display(),
        workers
    );

    let (records, failed_tasks) =
        generate_records(DeclarationGenerator::new(config), args.num, workers).await;

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let filepath = match upload {
            Some((bucket, _)) => {
                object_url(bucket, &join_key(&args.s3_prefix, &record.xml_filename))
            }
            None => {
                let path = args.output_dir.join(&record.xml_filename);
                std::fs::write(&path, &record.xml)
                    .with_context(|| format!("Failed to write XML: {}", path.display()))?;
                info!("Saved XML to {}", path.display());
                local_filepath(&args.output_dir, &record.xml_filename)
            }
        };
        rows.push(ManifestRow::from_record(record, filepath));
    }

    ManifestWriter::new(&manifest_path)
        .append(&rows)
        .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;
    info!("JMeter CSV saved: {}", manifest_path.display());

    let records_written = records.len();
    let mut objects_uploaded = 0;
    if let Some((bucket, store)) = upload {
        for record in records {
            let key = join_key(&args.s3_prefix, &record.xml_filename);
            store
                .put_object(bucket, &key, record.xml)
                .await
                .with_context(|| format!("Failed to upload {}", record.xml_filename))?;
            info!("Uploaded to {}", object_url(bucket, &key));
            objects_uploaded += 1;
        }

        let csv_key = csv_object_key(&manifest_path);
        store
            .upload_file(&manifest_path, bucket, &csv_key)
            .await
            .with_context(|| format!("Failed to upload {}", manifest_path.display()))?;
        info!(
            "Uploaded {} to {}",
            manifest_path.display(),
            object_url(bucket, &csv_key)
        );
        objects_uploaded += 1;
    }

    Ok(GenerateSummary {
        records_written,
        failed_tasks,
        manifest: manifest_path,
        objects_uploaded,
        duration: start_time.elapsed(),
    })
}

/// Turn CLI arguments into a generator configuration, loading templates.
pub fn build_config(args: &GenerateArgs) -> anyhow::Result<GeneratorConfig> {
    let base_template = TemplateSource::load(&args.base_xml)?;
    let alt_template = args
        .alt_base_xml
        .as_ref()
        .map(TemplateSource::load)
        .transpose()?;

    let mut config = GeneratorConfig::new(base_template);
    config.alt_template = alt_template;
    config.alt_base_percent = args.alt_base_percent;
    config.no_attachments_percent = args.no_attachments_percent;
    config.goods_percent = args.goods_percent;
    if !args.goods.is_empty() {
        config.goods_descriptions = args.goods.clone();
    }
    config.attachments_total_bytes = mb_to_bytes(args.attachments_total_mb);
    config.attachment_max_bytes = mb_to_bytes(args.attachment_max_mb);
    config.pdf_prefix = args.pdf_prefix.clone();
    config.save_pdf_dir = args.save_pdf.then(|| args.output_dir.clone());
    config.seed = args.seed;
    Ok(config)
}

/// Fan indices `0..num` out to `workers` blocking tasks.
///
/// Returns the successful records sorted by index, and the number of
/// failed tasks (each already logged).
pub async fn generate_records(
    generator: DeclarationGenerator,
    num: u64,
    workers: usize,
) -> (Vec<GeneratedRecord>, usize) {
    let generator = Arc::new(generator);

    let outcomes: Vec<_> = stream::iter(0..num)
        .map(|index| {
            let generator = Arc::clone(&generator);
            tokio::task::spawn_blocking(move || generator.generate(index))
                .map(move |joined| (index, joined))
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut records = Vec::with_capacity(outcomes.len());
    let mut failed = 0;
    for (index, joined) in outcomes {
        match joined {
            Ok(Ok(record)) => records.push(record),
            Ok(Err(e)) => {
                error!("Task {index} failed: {e}");
                failed += 1;
            }
            Err(e) => {
                error!("Task {index} did not complete: {e}");
                failed += 1;
            }
        }
    }

    records.sort_by_key(|r| r.index);
    (records, failed)
}
