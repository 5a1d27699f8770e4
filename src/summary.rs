use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SAMPLE_FILE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub relative_path: PathBuf,
    pub size_in_bytes: u64,
}

/// What a finished fetch left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub resolved_local_path: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
    pub sample_files: Vec<SampleFile>,
}

impl FetchSummary {
    /// Walks `root` recursively. Entries are visited in file-name order so the sample is stable.
    pub fn from_dir(resolved_local_path: &Path, root: &Path) -> std::io::Result<Self> {
        let mut summary = Self {
            resolved_local_path: resolved_local_path.to_path_buf(),
            file_count: 0,
            total_bytes: 0,
            sample_files: Vec::with_capacity(SAMPLE_FILE_LIMIT),
        };

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size_in_bytes = entry.metadata()?.len();
            summary.file_count += 1;
            summary.total_bytes += size_in_bytes;
            if summary.sample_files.len() < SAMPLE_FILE_LIMIT {
                let relative_path = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                summary.sample_files.push(SampleFile {
                    relative_path,
                    size_in_bytes,
                });
            }
        }
        Ok(summary)
    }

    pub fn remaining_files(&self) -> usize {
        self.file_count.saturating_sub(SAMPLE_FILE_LIMIT)
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Downloaded {} files ({:.2} MB)",
                self.file_count,
                bytes_to_mb(self.total_bytes)
            ),
            "Downloaded files:".to_string(),
        ];
        for file in &self.sample_files {
            lines.push(format!(
                "  {}: {:.2} MB",
                file.relative_path.display(),
                bytes_to_mb(file.size_in_bytes)
            ));
        }
        if self.remaining_files() > 0 {
            lines.push(format!("  ... and {} more files", self.remaining_files()));
        }
        lines
    }

    pub fn log(&self) {
        for line in self.describe() {
            tracing::info!("{}", line);
        }
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024f64 * 1024f64)
}
