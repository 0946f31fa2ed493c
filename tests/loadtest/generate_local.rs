//! `generate` writing XML files locally.

use crate::{fixture, init_tracing, small_args};
use loadtest_generator::TemplateDocument;
use loadtest_manifest::read_manifest;
use tempfile::TempDir;
use xml_loadgen::generate_with_store;
use xml_loadgen::loadtest::args::local_filepath;
use xml_loadgen::loadtest::cleanup::run_cleanup;
use xml_loadgen::loadtest::CleanupArgs;

/// 0.05 MB in chunks of at most 0.02 MB.
const EXPECTED_ATTACHMENTS: usize = 3;

#[tokio::test]
async fn test_generate_writes_xml_and_manifest() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let args = small_args(&temp_dir, 4);

    let summary = generate_with_store(&args, None).await?;

    assert_eq!(summary.records_written, 4);
    assert_eq!(summary.failed_tasks, 0);
    assert_eq!(summary.objects_uploaded, 0);

    let rows = read_manifest(&summary.manifest)?;
    assert_eq!(rows.len(), 4);

    for (index, row) in rows.iter().enumerate() {
        assert!(row.filename.starts_with("IE3F32_updated_"));
        assert!(row.filename.ends_with(&format!("_{index}.xml")));
        assert!(row.filename.contains("MB_total"));
        assert_eq!(row.filepath, local_filepath(&args.output_dir, &row.filename));
        assert!(row.message_id.starts_with("TEST-MSG-ID"));
        assert!(row.lrn.ends_with("_001LRN"));
        assert!(row.has_attachments);
        assert_eq!(row.attachment_count, EXPECTED_ATTACHMENTS);
        assert_eq!(row.attachments_total_mb, 0.05);
        assert_eq!(row.base_xml, fixture("IE3F32.xml").display().to_string());

        let xml = std::fs::read(args.output_dir.join(&row.filename))?;
        let document = TemplateDocument::parse(&xml)?;
        assert_eq!(document.text(&["MessageId"]), Some(row.message_id.clone()));
        assert_eq!(document.text(&["LRN"]), Some(row.lrn.clone()));
        assert_eq!(
            document.text(&["documentIssueDate", "DateTime"]),
            Some(row.timestamp.clone())
        );

        let attachments = document.attachments();
        assert_eq!(attachments.len(), EXPECTED_ATTACHMENTS);
        for (n, attachment) in attachments.iter().enumerate() {
            assert!(attachment.filename.starts_with("IE3FXX_"));
            assert!(attachment.filename.ends_with(&format!("_{index}_{}.pdf", n + 1)));
            // base64 of at most 0.02 MB
            assert!(attachment.content.len() <= 4 * (20_971_usize).div_ceil(3));
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_generate_appends_to_existing_manifest() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let mut args = small_args(&temp_dir, 2);
    args.no_attachments_percent = 100;

    generate_with_store(&args, None).await?;
    let summary = generate_with_store(&args, None).await?;

    let content = std::fs::read_to_string(&summary.manifest)?;
    assert_eq!(content.matches("messageId").count(), 1);

    let rows = read_manifest(&summary.manifest)?;
    assert_eq!(rows.len(), 4);
    for row in &rows {
        assert!(!row.has_attachments);
        assert_eq!(row.attachment_count, 0);
        assert_eq!(row.attachments_total_mb, 0.0);
        assert!(row.filename.contains("_updated_no_attachments_"));
    }

    Ok(())
}

#[tokio::test]
async fn test_generate_with_alternate_template_and_saved_pdfs(
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let mut args = small_args(&temp_dir, 3);
    args.alt_base_xml = Some(fixture("IE3F43.xml"));
    args.alt_base_percent = 100;
    args.save_pdf = true;

    let summary = generate_with_store(&args, None).await?;
    let rows = read_manifest(&summary.manifest)?;

    for row in &rows {
        assert!(row.filename.starts_with("IE3F43_updated_"));
        assert_eq!(row.base_xml, fixture("IE3F43.xml").display().to_string());

        let xml = std::fs::read(args.output_dir.join(&row.filename))?;
        let document = TemplateDocument::parse(&xml)?;
        assert_eq!(document.attachments().len(), EXPECTED_ATTACHMENTS);
    }

    let pdfs = std::fs::read_dir(&args.output_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "pdf"))
        .count();
    assert_eq!(pdfs, 3 * EXPECTED_ATTACHMENTS);

    Ok(())
}

#[tokio::test]
async fn test_generate_rejects_invalid_flags_before_work() {
    let temp_dir = TempDir::new().unwrap();
    let mut args = small_args(&temp_dir, 1);
    args.alt_base_percent = 50;

    assert!(generate_with_store(&args, None).await.is_err());
    assert!(!args.output_dir.exists());
}

#[tokio::test]
async fn test_generate_missing_template() {
    let temp_dir = TempDir::new().unwrap();
    let mut args = small_args(&temp_dir, 1);
    args.base_xml = temp_dir.path().join("missing.xml");

    assert!(generate_with_store(&args, None).await.is_err());
}

#[tokio::test]
async fn test_cleanup_removes_generated_files() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let mut args = small_args(&temp_dir, 2);
    args.no_attachments_percent = 100;
    let manifest = temp_dir.path().join("jmeter_data.csv");
    args.csv_name = Some(manifest.clone());

    generate_with_store(&args, None).await?;
    assert!(manifest.exists());

    run_cleanup(&CleanupArgs {
        output_dir: args.output_dir.clone(),
        csv_name: Some(manifest.clone()),
    })?;

    assert!(!args.output_dir.exists());
    assert!(!manifest.exists());
    Ok(())
}

#[tokio::test]
async fn test_generate_fills_attachments_with_image_pages() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let mut args = small_args(&temp_dir, 1);
    args.attachments_total_mb = 1.0;
    args.attachment_max_mb = 1.0;
    args.save_pdf = true;

    let summary = generate_with_store(&args, None).await?;
    let rows = read_manifest(&summary.manifest)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].attachment_count, 1);

    // 1 MiB less the safety margin, then base64
    let target = 1_048_576_usize - 4096;
    let xml = std::fs::read(args.output_dir.join(&rows[0].filename))?;
    let attachments = TemplateDocument::parse(&xml)?.attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].content.len(), 4 * target.div_ceil(3));

    let pdf_path = args.output_dir.join(&attachments[0].filename);
    let pdf = std::fs::read(&pdf_path)?;
    assert_eq!(pdf.len(), target);
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(pdf.windows(b"/DCTDecode".len()).any(|w| w == b"/DCTDecode"));

    Ok(())
}
