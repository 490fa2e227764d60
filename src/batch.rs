use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Image extensions recognized for source dispatch; everything else with
/// an extension is treated as video.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "jp2", "png", "bmp", "dib", "tiff", "tif", "pbm", "pgm", "ppm", "pxm",
    "pnm", "hdr", "pic",
];

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Output path for one job: `<output_dir>/<input stem>_result.<jpg|mp4>`.
pub fn result_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("matting");
    let ext = if is_image_path(input) { "jpg" } else { "mp4" };
    output_dir.join(format!("{stem}_result.{ext}"))
}

/// Outcome of a directory batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Process every file in a directory as an independent matting job.
///
/// Entries without an extension are skipped, which also skips
/// sub-directories; nothing is recursed. A failing job is logged and
/// counted, and the batch moves on to the next file.
pub fn run_batch<F>(input_dir: &Path, mut job: F) -> Result<BatchSummary>
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut summary = BatchSummary::default();
    let mut entries: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some())
        .collect();
    entries.sort();

    if entries.is_empty() {
        tracing::info!("Directory {} holds no processable files", input_dir.display());
        return Ok(summary);
    }

    for (index, path) in entries.iter().enumerate() {
        tracing::info!(
            "Batch item {}/{}: {}",
            index + 1,
            entries.len(),
            path.display()
        );
        match job(path) {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::error!("Failed to process {}: {}", path.display(), e);
            }
        }
    }

    tracing::info!(
        "Batch done: {} succeeded, {} failed",
        summary.succeeded,
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MattingError;
    use std::fs::File;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image_path(Path::new("a.PNG")));
        assert!(is_image_path(Path::new("b.jpeg")));
        assert!(!is_image_path(Path::new("c.mp4")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn result_paths_follow_the_naming_convention() {
        assert_eq!(
            result_path(Path::new("in/portrait.png"), Path::new("out")),
            PathBuf::from("out/portrait_result.jpg")
        );
        assert_eq!(
            result_path(Path::new("clip.mov"), Path::new("/tmp")),
            PathBuf::from("/tmp/clip_result.mp4")
        );
    }

    #[test]
    fn one_corrupt_file_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.jpg", "c.mp4", "corrupt.mp4"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("no_extension")).unwrap();

        let mut processed = Vec::new();
        let summary = run_batch(dir.path(), |path| {
            processed.push(path.file_name().unwrap().to_owned());
            if path.file_name().unwrap() == "corrupt.mp4" {
                Err(MattingError::SourceOpen {
                    path: path.to_path_buf(),
                    reason: "corrupt".to_string(),
                })
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(summary, BatchSummary { succeeded: 3, failed: 1 });
        // Sub-directory and extensionless file skipped.
        assert_eq!(processed.len(), 4);
    }

    #[test]
    fn empty_directory_yields_an_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run_batch(dir.path(), |_| Ok(())).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(run_batch(Path::new("/no/such/dir"), |_| Ok(())).is_err());
    }
}
