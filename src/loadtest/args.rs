//! CLI argument definitions for the xml-loadgen subcommands.

use clap::builder::RangedU64ValueParser;
use clap::Args;
use std::path::{Path, PathBuf};
use xml_loadgen_file::ObjectLocation;

/// Default directory for generated XML (and saved PDF) files.
pub const DEFAULT_OUTPUT_DIR: &str = "/test_xmls";

/// Default key prefix for uploaded XML files.
pub const DEFAULT_S3_PREFIX: &str = "test_xmls";

/// Arguments for `generate`.
#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Number of XML files to generate
    #[arg(long, env = "NUM_FILES", default_value_t = 5)]
    pub num: u64,

    /// Directory for generated XML files
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Manifest path (default: <output-dir>/jmeter_data_<timestamp>.csv)
    #[arg(long)]
    pub csv_name: Option<PathBuf>,

    /// Template XML
    #[arg(long, default_value = "IE3F32.xml")]
    pub base_xml: PathBuf,

    /// Alternate template XML, used for --alt-base-percent of the files
    #[arg(long)]
    pub alt_base_xml: Option<PathBuf>,

    /// Percentage (0-100) of files built from --alt-base-xml
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub alt_base_percent: u8,

    /// Percentage (0-100) of files with no attachments
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub no_attachments_percent: u8,

    /// Percentage (0-100) of files with a custom goods description
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub goods_percent: u8,

    /// Custom goods descriptions to pick from (repeatable)
    #[arg(long = "goods", value_name = "DESCRIPTION")]
    pub goods: Vec<String>,

    /// Total attachment size per XML in MB (capped at 10)
    #[arg(long, default_value_t = 2.0)]
    pub attachments_total_mb: f64,

    /// Maximum size of a single attachment in MB (capped at 2)
    #[arg(long, default_value_t = 2.0)]
    pub attachment_max_mb: f64,

    /// File name prefix for generated PDFs
    #[arg(long, default_value = loadtest_generator::generator::DEFAULT_PDF_PREFIX)]
    pub pdf_prefix: String,

    /// Also save generated PDFs next to the XML files
    #[arg(long)]
    pub save_pdf: bool,

    /// Number of concurrent workers (default: available parallelism)
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub workers: Option<usize>,

    /// Seed for reproducible random choices
    #[arg(long)]
    pub seed: Option<u64>,

    /// Upload XML files and the manifest to S3 instead of writing XML locally
    #[arg(long)]
    pub upload_s3: bool,

    /// S3 bucket to upload to
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Key prefix for uploaded XML files
    #[arg(long, default_value = DEFAULT_S3_PREFIX)]
    pub s3_prefix: String,
}

impl GenerateArgs {
    /// Reject flag combinations clap cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.alt_base_percent > 0 && self.alt_base_xml.is_none() {
            anyhow::bail!("--alt-base-percent was set but --alt-base-xml is missing");
        }
        if self.upload_s3 && self.s3_bucket.is_none() {
            anyhow::bail!("--s3-bucket is required when using --upload-s3");
        }
        if !self.attachments_total_mb.is_finite() || !self.attachment_max_mb.is_finite() {
            anyhow::bail!("attachment sizes must be finite numbers");
        }
        Ok(())
    }

    /// Manifest path, defaulting to a timestamped file in the output directory.
    pub fn manifest_path(&self, compact_timestamp: &str) -> PathBuf {
        self.csv_name.clone().unwrap_or_else(|| {
            self.output_dir
                .join(format!("jmeter_data_{compact_timestamp}.csv"))
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Arguments for `cleanup`.
#[derive(Args, Clone, Debug)]
pub struct CleanupArgs {
    /// Directory of generated XML files to remove
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Local manifest to remove
    #[arg(long)]
    pub csv_name: Option<PathBuf>,
}

/// Arguments for `cleanup-s3`.
#[derive(Args, Clone, Debug)]
pub struct CleanupS3Args {
    /// Bucket holding the uploaded files (optional when --csv-name is an s3:// URI)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Manifest path used at upload time, or its s3://bucket/key URI
    #[arg(long)]
    pub csv_name: PathBuf,

    /// Key prefix of the uploaded XML files
    #[arg(long, default_value = DEFAULT_S3_PREFIX)]
    pub s3_prefix: String,

    /// Directory for the temporary manifest download
    #[arg(long, default_value = ".")]
    pub download_dir: PathBuf,
}

impl CleanupS3Args {
    /// Bucket and key of the uploaded manifest.
    pub fn manifest_location(&self) -> anyhow::Result<ObjectLocation> {
        let csv_name = self.csv_name.to_string_lossy();
        if !ObjectLocation::is_uri(&csv_name) {
            let bucket = self.s3_bucket.clone().ok_or_else(|| {
                anyhow::anyhow!("--s3-bucket is required unless --csv-name is an s3:// URI")
            })?;
            return Ok(ObjectLocation::new(bucket, csv_object_key(&self.csv_name)));
        }

        let location: ObjectLocation = csv_name.parse()?;
        if let Some(bucket) = self.s3_bucket.as_ref().filter(|b| **b != location.bucket) {
            anyhow::bail!(
                "--s3-bucket {bucket} does not match the bucket of --csv-name {location}"
            );
        }
        Ok(location)
    }

    /// Where the manifest is downloaded before it is read.
    pub fn download_path(&self) -> PathBuf {
        let name = self
            .csv_name
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manifest.csv".to_string());
        self.download_dir.join(format!("downloaded_{name}"))
    }
}

/// Arguments for `sample-pdfs`.
#[derive(Args, Clone, Debug)]
pub struct SamplePdfsArgs {
    /// Number of PDFs to write
    #[arg(long, default_value_t = 50)]
    pub count: u32,

    /// Smallest size in KiB
    #[arg(long, default_value_t = 512)]
    pub min_kb: u64,

    /// Largest size in KiB
    #[arg(long, default_value_t = 10240)]
    pub max_kb: u64,

    #[arg(long, default_value = "generated_pdfs")]
    pub output_dir: PathBuf,

    /// Seed for reproducible sizes and content
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Object key for a manifest: its path without a leading `/`.
pub fn csv_object_key(csv_path: &Path) -> String {
    csv_path
        .to_string_lossy()
        .trim_start_matches('/')
        .to_string()
}

/// Manifest `filepath` of a locally written XML.
pub fn local_filepath(output_dir: &Path, filename: &str) -> String {
    let dir = output_dir.to_string_lossy();
    Path::new(dir.trim_start_matches('/'))
        .join(filename)
        .display()
        .to_string()
}
