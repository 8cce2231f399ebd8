//! Local filesystem lister and reader.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::ports::{FileLister, Reader};
use crate::types::{DocumentBytes, PathIdentifier};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalFileListerConfig {
    pub source_dir: PathBuf,
    /// Extensions to match, with or without a leading dot. Empty matches all.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Lists files under a local directory, recursively, filtered by extension.
pub struct LocalFileLister {
    source_dir: PathBuf,
    extensions: Vec<String>,
}

impl LocalFileLister {
    pub fn new(config: LocalFileListerConfig) -> Self {
        let extensions = config
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            source_dir: config.source_dir,
            extensions,
        }
    }

    fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == &ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

impl FileLister for LocalFileLister {
    fn list_files(&self, _ctx: &RunContext) -> Result<Vec<PathIdentifier>> {
        if !self.source_dir.is_dir() {
            anyhow::bail!(
                "source directory {} does not exist",
                self.source_dir.display()
            );
        }

        let mut files = Vec::new();
        collect_files(&self.source_dir, &mut files)
            .with_context(|| format!("failed to walk {}", self.source_dir.display()))?;

        let mut paths: Vec<PathIdentifier> = files
            .into_iter()
            .filter(|path| self.matches(path))
            .map(|path| PathIdentifier::new(path.to_string_lossy()))
            .collect();
        // Listing order is filesystem-dependent; sort for determinism.
        paths.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(paths)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalFileReaderConfig {
    /// Forces a mime type; otherwise it is derived from the file extension.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Reads document bytes from local disk.
pub struct LocalFileReader {
    mime_type: Option<String>,
}

impl LocalFileReader {
    pub fn new(config: LocalFileReaderConfig) -> Self {
        Self {
            mime_type: config.mime_type,
        }
    }
}

impl Reader for LocalFileReader {
    fn read(&self, path_identifier: &PathIdentifier, _ctx: &RunContext) -> Result<DocumentBytes> {
        let file_path = Path::new(&path_identifier.path);
        let bytes = fs::read(file_path)
            .with_context(|| format!("failed to read {}", file_path.display()))?;
        let mime_type = self
            .mime_type
            .clone()
            .unwrap_or_else(|| mime_for_extension(file_path).to_string());
        Ok(DocumentBytes::new(path_identifier.clone(), bytes, mime_type))
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("text") => "text/plain",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lister(dir: &Path, extensions: &[&str]) -> LocalFileLister {
        LocalFileLister::new(LocalFileListerConfig {
            source_dir: dir.to_path_buf(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_lister_filters_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "one").unwrap();
        fs::write(tmp.path().join("b.pdf"), "two").unwrap();
        fs::write(tmp.path().join("c.TXT"), "three").unwrap();

        let ctx = RunContext::new();
        let paths = lister(tmp.path(), &[".txt"]).list_files(&ctx).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.path.to_lowercase().ends_with(".txt")));
    }

    #[test]
    fn test_lister_recurses_into_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("top.txt"), "x").unwrap();
        fs::write(tmp.path().join("nested/inner.txt"), "y").unwrap();

        let ctx = RunContext::new();
        let paths = lister(tmp.path(), &["txt"]).list_files(&ctx).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_lister_empty_extensions_matches_everything() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "one").unwrap();
        fs::write(tmp.path().join("b.pdf"), "two").unwrap();

        let ctx = RunContext::new();
        let paths = lister(tmp.path(), &[]).list_files(&ctx).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_lister_missing_directory_is_error() {
        let ctx = RunContext::new();
        let result = lister(Path::new("/nonexistent/source"), &["txt"]).list_files(&ctx);
        assert!(result.is_err());
    }

    #[test]
    fn test_lister_output_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }

        let ctx = RunContext::new();
        let paths = lister(tmp.path(), &["txt"]).list_files(&ctx).unwrap();
        let names: Vec<&str> = paths.iter().map(|p| p.key()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_reader_reads_bytes_and_derives_mime() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("doc.txt");
        fs::write(&file, "contents").unwrap();

        let reader = LocalFileReader::new(LocalFileReaderConfig::default());
        let ctx = RunContext::new();
        let bytes = reader
            .read(&PathIdentifier::new(file.to_string_lossy()), &ctx)
            .unwrap();

        assert_eq!(bytes.bytes, b"contents");
        assert_eq!(bytes.mime_type, "text/plain");
    }

    #[test]
    fn test_reader_honors_configured_mime_type() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("doc.bin");
        fs::write(&file, [0u8, 1, 2]).unwrap();

        let reader = LocalFileReader::new(LocalFileReaderConfig {
            mime_type: Some("application/x-custom".to_string()),
        });
        let ctx = RunContext::new();
        let bytes = reader
            .read(&PathIdentifier::new(file.to_string_lossy()), &ctx)
            .unwrap();
        assert_eq!(bytes.mime_type, "application/x-custom");
    }

    #[test]
    fn test_reader_missing_file_is_error() {
        let reader = LocalFileReader::new(LocalFileReaderConfig::default());
        let ctx = RunContext::new();
        let result = reader.read(&PathIdentifier::new("/nonexistent/file.txt"), &ctx);
        assert!(result.is_err());
    }

    #[test]
    fn test_mime_for_extension_fallback() {
        assert_eq!(mime_for_extension(Path::new("a.xyz")), "application/octet-stream");
        assert_eq!(mime_for_extension(Path::new("a.PDF")), "application/pdf");
    }
}
