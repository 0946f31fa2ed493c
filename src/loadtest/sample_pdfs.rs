//! `sample-pdfs` command handler: bulk dummy PDFs of random sizes.

use crate::loadtest::args::SamplePdfsArgs;
use anyhow::Context;
use loadtest_generator::dummy_pdf;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

/// Write `args.count` dummy PDFs, returning their paths.
pub fn run_sample_pdfs(args: &SamplePdfsArgs) -> anyhow::Result<Vec<PathBuf>> {
    if args.min_kb == 0 || args.min_kb > args.max_kb {
        anyhow::bail!(
            "invalid size range: --min-kb {} --max-kb {}",
            args.min_kb,
            args.max_kb
        );
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut written = Vec::with_capacity(args.count as usize);
    for i in 1..=args.count {
        let size_kb = rng.gen_range(args.min_kb..=args.max_kb);
        let path = args
            .output_dir
            .join(format!("sample_{i:03}_{size_kb}KB.pdf"));
        let bytes = dummy_pdf(&mut rng, (size_kb * 1024) as usize);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Created {} ({} KB)", path.display(), size_kb);
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(temp_dir: &TempDir) -> SamplePdfsArgs {
        SamplePdfsArgs {
            count: 3,
            min_kb: 1,
            max_kb: 4,
            output_dir: temp_dir.path().join("generated_pdfs"),
            seed: Some(7),
        }
    }

    #[test]
    fn test_writes_exact_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = run_sample_pdfs(&args(&temp_dir)).unwrap();

        assert_eq!(paths.len(), 3);
        for path in paths {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("sample_00"));
            let kb: u64 = name
                .rsplit('_')
                .next()
                .and_then(|s| s.strip_suffix("KB.pdf"))
                .unwrap()
                .parse()
                .unwrap();
            assert!((1..=4).contains(&kb));

            let bytes = std::fs::read(&path).unwrap();
            assert!(bytes.starts_with(b"%PDF-1.4"));
            assert_eq!(bytes.len() as u64, kb * 1024);
        }
    }

    #[test]
    fn test_rejects_inverted_range() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args(&temp_dir);
        args.min_kb = 10;
        args.max_kb = 5;
        assert!(run_sample_pdfs(&args).is_err());
    }
}
