//! Declaration generator for the xml-loadgen load testing tool.
//!
//! This crate turns a customs-declaration XML template into load-test
//! documents carrying base64-embedded PDF attachments of planned sizes.
//!
//! # Architecture
//!
//! ```text
//!  attachments_total / attachment_max
//!            │
//!            ▼
//!   ┌─────────────────┐      ┌──────────────────────┐
//!   │ AttachmentPlan  │ ───▶ │ generate_pdf_of_size │  (one PDF per size)
//!   └─────────────────┘      └──────────┬───────────┘
//!                                       │ base64
//!   TemplateSource ──parse──▶ TemplateDocument ◀──┘
//!                                       │  set_text / inject_attachments
//!                                       ▼
//!                               GeneratedRecord
//! ```
//!
//! # Example
//!
//! ```no_run
//! use loadtest_generator::{DeclarationGenerator, GeneratorConfig, TemplateSource};
//!
//! let template = TemplateSource::load("IE3F32.xml").unwrap();
//! let mut config = GeneratorConfig::new(template);
//! config.seed = Some(42);
//!
//! let generator = DeclarationGenerator::new(config);
//! let record = generator.generate(0).unwrap();
//! println!("{} ({} attachments)", record.xml_filename, record.attachment_count);
//! ```

pub mod generator;
pub mod pdf;
pub mod plan;
pub mod xml;

// Re-exports for convenience
pub use generator::{
    DeclarationGenerator, GeneratedRecord, GeneratorConfig, GeneratorError, TemplateSource,
};
pub use pdf::{dummy_pdf, generate_pdf_of_size, GeneratedPdf, PdfError, PdfOptions};
pub use plan::{mb_to_bytes, split_budget, AttachmentLimits, AttachmentPlan};
pub use xml::{Attachment, TemplateDocument, XmlError};
