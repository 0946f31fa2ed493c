//! Command-line interface for xml-loadgen
//!
//! # Usage Examples
//!
//! ## Generate
//! ```bash
//! # Five declarations with one 2 MB attachment each, written to /test_xmls
//! xml-loadgen generate
//!
//! # Mix two templates, leave 20% without attachments, upload to S3
//! xml-loadgen generate --num 500 \
//!   --base-xml IE3F32.xml --alt-base-xml IE3F43.xml --alt-base-percent 30 \
//!   --no-attachments-percent 20 \
//!   --attachments-total-mb 6 --attachment-max-mb 2 \
//!   --upload-s3 --s3-bucket loadtest-bucket \
//!   --csv-name /test_xmls/run1.csv
//! ```
//!
//! ## Cleanup
//! ```bash
//! # Local files
//! xml-loadgen cleanup --csv-name /test_xmls/run1.csv
//!
//! # Uploaded files, driven by the uploaded manifest
//! xml-loadgen cleanup-s3 --s3-bucket loadtest-bucket --csv-name /test_xmls/run1.csv
//! xml-loadgen cleanup-s3 --csv-name s3://loadtest-bucket/test_xmls/run1.csv
//! ```
//!
//! ## Sample PDFs
//! ```bash
//! xml-loadgen sample-pdfs --count 50 --min-kb 512 --max-kb 10240
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use xml_loadgen::loadtest::{
    cleanup, generate, sample_pdfs, CleanupArgs, CleanupS3Args, GenerateArgs, SamplePdfsArgs,
};

#[derive(Parser)]
#[command(name = "xml-loadgen")]
#[command(about = "Generate XML load-test data with PDF attachments and a JMeter manifest")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate XML files with attachments and append them to the manifest
    Generate(GenerateArgs),

    /// Remove the local output directory and manifest
    Cleanup(CleanupArgs),

    /// Delete uploaded XML files listed in the uploaded manifest, then the manifest
    #[command(name = "cleanup-s3")]
    CleanupS3(CleanupS3Args),

    /// Write dummy PDFs of random sizes
    #[command(name = "sample-pdfs")]
    SamplePdfs(SamplePdfsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate::run_generate(args).await,
        Commands::Cleanup(args) => cleanup::run_cleanup(&args),
        Commands::CleanupS3(args) => cleanup::run_cleanup_s3(args).await,
        Commands::SamplePdfs(args) => {
            let written = sample_pdfs::run_sample_pdfs(&args)?;
            tracing::info!(
                "Wrote {} PDFs to {}",
                written.len(),
                args.output_dir.display()
            );
            Ok(())
        }
    }
}
