//! Bounded-size PDF generation.
//!
//! [`generate_pdf_of_size`] grows a document one random-noise image page at a
//! time, re-serializing after every page, and stops before the document would
//! pass the target. The serialized bytes are then padded with a PDF comment
//! up to the target, which sits [`PdfOptions::safety_margin`] bytes below the
//! requested size.

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use rand::Rng;
use tracing::debug;

/// Bytes kept free below the requested size.
pub const PDF_SAFETY_BYTES: u64 = 4096;

/// Comment line that introduces the padding bytes.
pub const PADDING_MARKER: &[u8] = b"\n%PADDING\n";

/// Text drawn on the fallback page.
pub const PLACEHOLDER_TEXT: &str = "Auto-generated placeholder page";

// US letter, in points.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;

// Where each noise image lands on its page.
const IMAGE_ORIGIN: i64 = 50;
const IMAGE_EXTENT: i64 = 500;

/// Minimal hand-written document used by [`dummy_pdf`].
const DUMMY_PDF_HEADER: &[u8] = b"%PDF-1.4
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj
2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj
3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>
endobj
4 0 obj
<< /Length 44 >>
stream
BT /F1 24 Tf 100 700 Td (Dummy PDF) Tj ET
endstream
endobj
xref
0 5
0000000000 65535 f
0000000010 00000 n
0000000061 00000 n
0000000117 00000 n
0000000215 00000 n
trailer
<< /Root 1 0 R /Size 5 >>
startxref
308
%%EOF
";

/// Errors raised while building a PDF.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// The noise image could not be encoded.
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// lopdf refused to encode or write the document.
    #[error("PDF serialization error: {0}")]
    Serialize(String),
}

/// Knobs for the filler pages and the safety margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfOptions {
    pub image_width: u32,
    pub image_height: u32,
    pub jpeg_quality: u8,
    pub safety_margin: u64,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            image_width: 800,
            image_height: 800,
            jpeg_quality: 60,
            safety_margin: PDF_SAFETY_BYTES,
        }
    }
}

impl PdfOptions {
    /// Size the generator aims for when `requested` bytes are asked for.
    pub fn target_bytes(&self, requested: u64) -> u64 {
        requested.saturating_sub(self.safety_margin).max(1)
    }
}

/// A generated PDF together with how it was produced.
#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    /// Number of image pages; zero when the placeholder was used.
    pub image_pages: usize,
    /// Size the generator aimed for.
    pub target: u64,
    pub placeholder: bool,
}

impl GeneratedPdf {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Generate a PDF as close as possible to `requested_bytes` without going
/// over it.
///
/// The result is exactly [`PdfOptions::target_bytes`] long unless the
/// placeholder page alone is already larger than the target, in which case
/// the placeholder is returned unpadded.
pub fn generate_pdf_of_size<R: Rng>(
    rng: &mut R,
    requested_bytes: u64,
    options: &PdfOptions,
) -> Result<GeneratedPdf, PdfError> {
    let target = options.target_bytes(requested_bytes);
    let target_len = usize::try_from(target).unwrap_or(usize::MAX);

    let mut images: Vec<Vec<u8>> = Vec::new();
    let mut accepted: Option<Vec<u8>> = None;

    loop {
        images.push(noise_jpeg(rng, options)?);
        let candidate = render_image_pages(&images, options)?;

        if candidate.len() > target_len {
            images.pop();
            break;
        }

        let exact = candidate.len() == target_len;
        accepted = Some(candidate);
        if exact {
            break;
        }
    }

    let (mut bytes, placeholder) = match accepted {
        Some(bytes) => (bytes, false),
        None => (render_placeholder()?, true),
    };
    pad_to_target(&mut bytes, target_len);

    debug!(
        "PDF generated: {:.2} KB over {} image pages (target <= {:.2} KB)",
        bytes.len() as f64 / 1024.0,
        images.len(),
        target as f64 / 1024.0
    );

    Ok(GeneratedPdf {
        bytes,
        image_pages: images.len(),
        target,
        placeholder,
    })
}

/// Pad `bytes` up to `target` with a `%PADDING` comment and filler zeros.
///
/// When the gap is smaller than the marker it is filled with newlines so the
/// target is still never exceeded.
pub fn pad_to_target(bytes: &mut Vec<u8>, target: usize) {
    if bytes.len() >= target {
        return;
    }
    let gap = target - bytes.len();
    if gap < PADDING_MARKER.len() {
        bytes.resize(target, b'\n');
        return;
    }
    bytes.extend_from_slice(PADDING_MARKER);
    bytes.resize(target, b'0');
}

/// A fixed one-page PDF followed by random bytes, exactly `size_bytes` long
/// (or the bare header if that is already longer).
pub fn dummy_pdf<R: Rng>(rng: &mut R, size_bytes: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size_bytes.max(DUMMY_PDF_HEADER.len()));
    bytes.extend_from_slice(DUMMY_PDF_HEADER);
    if size_bytes > bytes.len() {
        let start = bytes.len();
        bytes.resize(size_bytes, 0);
        rng.fill(&mut bytes[start..]);
    }
    bytes
}

/// Encode an RGB noise image as JPEG.
fn noise_jpeg<R: Rng>(rng: &mut R, options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
    let (width, height) = (options.image_width, options.image_height);
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    rng.fill(pixels.as_mut_slice());

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.jpeg_quality).encode(
        &pixels,
        width,
        height,
        ColorType::Rgb8,
    )?;
    Ok(jpeg)
}

/// Serialize one page per JPEG.
pub(crate) fn render_image_pages(
    images: &[Vec<u8>],
    options: &PdfOptions,
) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(images.len());

    for jpeg in images {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(options.image_width),
                "Height" => i64::from(options.image_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg.clone(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    integers(&[IMAGE_EXTENT, 0, 0, IMAGE_EXTENT, IMAGE_ORIGIN, IMAGE_ORIGIN]),
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encode(content)?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(Object::from(page_id));
    }

    finish(doc, pages_id, kids)
}

/// Serialize the single text page used when no image page fits.
fn render_placeholder() -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Td", integers(&[72, 720])),
            Operation::new("Tj", vec![Object::string_literal(PLACEHOLDER_TEXT)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encode(content)?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    });

    finish(doc, pages_id, vec![Object::from(page_id)])
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>) -> Result<Vec<u8>, PdfError> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => integers(&[0, 0, PAGE_WIDTH, PAGE_HEIGHT]),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::Serialize(e.to_string()))?;
    Ok(buffer)
}

fn encode(content: Content) -> Result<Vec<u8>, PdfError> {
    content
        .encode()
        .map_err(|e| PdfError::Serialize(e.to_string()))
}

fn integers(values: &[i64]) -> Vec<Object> {
    values.iter().copied().map(Object::Integer).collect()
}
