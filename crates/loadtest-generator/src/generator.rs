//! Per-task generation of declaration documents.

use crate::pdf::{generate_pdf_of_size, PdfError, PdfOptions};
use crate::plan::{bytes_to_mb, mb_to_bytes, AttachmentLimits};
use crate::xml::{Attachment, TemplateDocument, XmlError};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Goods description used when a record is not picked for a custom one.
pub const DEFAULT_GOODS_DESCRIPTION: &str = "AERONAUTICAL INFO";

/// Pool the custom goods description is drawn from.
pub const CUSTOM_GOODS_DESCRIPTIONS: [&str; 6] =
    ["FLOWERS", "chocolate", "cheese", "Make-up", "pasta", "Lemonade"];

/// Prefix of generated PDF file names.
pub const DEFAULT_PDF_PREFIX: &str = "IE3FXX";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Template file could not be read.
    #[error("Failed to read template '{path}': {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// IO error while saving a PDF.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template parsing, mutation or serialization failed.
    #[error("Template error: {0}")]
    Xml(#[from] XmlError),

    /// PDF generation failed.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),
}

/// Raw bytes of a template file, read once and parsed per task.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl TemplateSource {
    /// Read a template from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeneratorError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| GeneratorError::TemplateRead {
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_bytes(path, bytes))
    }

    /// Wrap template bytes that are already in memory.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension, used as a hint in output names.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("template")
    }

    fn parse(&self) -> Result<TemplateDocument, XmlError> {
        TemplateDocument::parse(&self.bytes)
    }
}

/// Everything a generation task needs; shared read-only across workers.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_template: TemplateSource,
    pub alt_template: Option<TemplateSource>,
    /// Chance (0-100) that a record uses `alt_template`.
    pub alt_base_percent: u8,
    /// Chance (0-100) that a record carries no attachments.
    pub no_attachments_percent: u8,
    /// Chance (0-100) that a record gets a custom goods description.
    pub goods_percent: u8,
    pub goods_descriptions: Vec<String>,
    pub attachments_total_bytes: u64,
    pub attachment_max_bytes: u64,
    pub limits: AttachmentLimits,
    pub pdf: PdfOptions,
    pub pdf_prefix: String,
    /// Also write each PDF into this directory.
    pub save_pdf_dir: Option<PathBuf>,
    /// Fixed seed; each task index derives its own RNG from it.
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    /// Defaults matching the command line: one 2 MiB attachment per record.
    pub fn new(base_template: TemplateSource) -> Self {
        Self {
            base_template,
            alt_template: None,
            alt_base_percent: 0,
            no_attachments_percent: 0,
            goods_percent: 0,
            goods_descriptions: CUSTOM_GOODS_DESCRIPTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            attachments_total_bytes: mb_to_bytes(2.0),
            attachment_max_bytes: mb_to_bytes(2.0),
            limits: AttachmentLimits::default(),
            pdf: PdfOptions::default(),
            pdf_prefix: DEFAULT_PDF_PREFIX.to_string(),
            save_pdf_dir: None,
            seed: None,
        }
    }
}

/// One synthesized test case.
#[derive(Debug, Clone)]
pub struct GeneratedRecord {
    pub index: u64,
    pub xml_filename: String,
    pub xml: Vec<u8>,
    pub message_id: String,
    pub lrn: String,
    pub timestamp: String,
    pub has_attachments: bool,
    pub attachment_count: usize,
    /// Sum of planned attachment sizes in MiB (three decimals).
    pub attachments_total_mb: f64,
    /// Template the record was built from.
    pub base_xml: PathBuf,
}

/// Produces declaration documents with embedded PDF attachments.
///
/// Tasks are independent: [`DeclarationGenerator::generate`] takes `&self`
/// and derives all randomness from the task index.
#[derive(Debug, Clone)]
pub struct DeclarationGenerator {
    config: GeneratorConfig,
}

impl DeclarationGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate record `index` stamped with the current time.
    pub fn generate(&self, index: u64) -> Result<GeneratedRecord, GeneratorError> {
        self.generate_at(index, Utc::now())
    }

    /// Generate record `index` stamped with `now`.
    pub fn generate_at(
        &self,
        index: u64,
        now: DateTime<Utc>,
    ) -> Result<GeneratedRecord, GeneratorError> {
        let config = &self.config;
        let mut rng = self.rng_for_index(index);

        let template = self.choose_template(&mut rng);
        let no_attachments = rng.gen_bool(probability(config.no_attachments_percent));

        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let compact = now.format(COMPACT_FORMAT).to_string();

        let mut attachments = Vec::new();
        let mut attachments_total_mb = 0.0;

        if !no_attachments {
            let plan = config
                .limits
                .plan(config.attachments_total_bytes, config.attachment_max_bytes);
            attachments_total_mb = plan.total_mb();

            for (n, size) in plan.iter().enumerate() {
                let pdf_filename = format!(
                    "{}_{:.1}MB_{}_{}_{}.pdf",
                    config.pdf_prefix,
                    bytes_to_mb(size),
                    compact,
                    index,
                    n + 1
                );
                let pdf = generate_pdf_of_size(&mut rng, size, &config.pdf)?;

                if let Some(dir) = &config.save_pdf_dir {
                    std::fs::create_dir_all(dir)?;
                    let path = dir.join(&pdf_filename);
                    std::fs::write(&path, &pdf.bytes)?;
                    info!("Saved PDF to {}", path.display());
                }

                let encoded = BASE64_STANDARD.encode(&pdf.bytes);
                attachments.push(Attachment::new(pdf_filename, encoded));
            }
        }

        let mut document = template.parse()?;
        let goods = self.choose_goods(&mut rng);
        let message_id = format!("TEST-MSG-ID{}", random_uuid(&mut rng));
        let lrn = format!("{compact}_001LRN");

        document.set_text(&["descriptionOfGoods"], &goods);
        document.set_text(&["MessageId"], &message_id);
        document.set_text(&["LRN"], &lrn);
        document.set_text(&["Timestamp"], &timestamp);
        document.set_text(&["documentIssueDate", "DateTime"], &timestamp);

        document.inject_attachments(&attachments)?;

        let suffix = if no_attachments {
            "no_attachments".to_string()
        } else {
            format!("{attachments_total_mb:.1}MB_total")
        };
        let xml_filename = format!(
            "{}_updated_{}_{}_{}.xml",
            template.stem(),
            suffix,
            compact,
            index
        );
        let xml = document.to_bytes()?;

        debug!(
            "Generated {} ({} attachments, {} bytes)",
            xml_filename,
            attachments.len(),
            xml.len()
        );

        Ok(GeneratedRecord {
            index,
            xml_filename,
            xml,
            message_id,
            lrn,
            timestamp,
            has_attachments: !no_attachments,
            attachment_count: attachments.len(),
            attachments_total_mb,
            base_xml: template.path().to_path_buf(),
        })
    }

    /// RNG for one task: derived from the seed when set, otherwise fresh.
    fn rng_for_index(&self, index: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => {
                StdRng::seed_from_u64(seed.wrapping_add(index.wrapping_mul(0x9E3779B97F4A7C15)))
            }
            None => StdRng::from_entropy(),
        }
    }

    fn choose_template<R: Rng>(&self, rng: &mut R) -> &TemplateSource {
        match &self.config.alt_template {
            Some(alt) if self.config.alt_base_percent > 0 => {
                if rng.gen_bool(probability(self.config.alt_base_percent)) {
                    alt
                } else {
                    &self.config.base_template
                }
            }
            _ => &self.config.base_template,
        }
    }

    fn choose_goods<R: Rng>(&self, rng: &mut R) -> String {
        if rng.gen_bool(probability(self.config.goods_percent)) {
            if let Some(goods) = self.config.goods_descriptions.choose(rng) {
                return goods.clone();
            }
        }
        DEFAULT_GOODS_DESCRIPTION.to_string()
    }
}

fn probability(percent: u8) -> f64 {
    f64::from(percent.min(100)) / 100.0
}

fn random_uuid<R: Rng>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
