//! ZIP extraction, document discovery, and output packaging.

use std::fs::{self, File};
use std::io::{self, Cursor, Write};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{ProcessingError, ServiceError, ServiceResult};

/// Sanitize an archive entry name to prevent path traversal.
///
/// Keeps only normal path components, dropping parent references, current
/// directory references, and absolute path prefixes. Returns `None` if
/// nothing remains.
fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();

    for component in Path::new(name).components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Extract `bytes` as a ZIP archive into `dest`.
///
/// A malformed container maps to [`ServiceError::InvalidArchive`]. The caller
/// owns `dest` (a scratch directory) and its cleanup on every exit path.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> ServiceResult<()> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|source| ServiceError::InvalidArchive { source })?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|source| ServiceError::InvalidArchive { source })?;

        if entry.is_dir() {
            continue;
        }

        let Some(relative) = sanitize_entry_path(entry.name()) else {
            tracing::warn!(entry = %entry.name(), "Skipping entry with no usable path");
            continue;
        };

        let out_path = dest.join(relative);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(ProcessingError::Io)?;
        }
        let mut out = File::create(&out_path).map_err(ProcessingError::Io)?;
        io::copy(&mut entry, &mut out).map_err(ProcessingError::Io)?;
    }

    Ok(())
}

/// Recursively list extracted Markdown documents under `root`.
///
/// Traversal is depth-first with entries sorted by file name at each level,
/// so discovery order is deterministic for a given archive. Batch boundaries
/// in the merge pipeline depend on this order.
pub fn discover_documents(root: &Path) -> ServiceResult<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ProcessingError::Io(e.into()))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "md")
        {
            documents.push(entry.into_path());
        }
    }

    Ok(documents)
}

/// Pack ordered `(name, bytes)` entries into an in-memory ZIP.
///
/// Zero entries yields a valid, empty archive.
pub fn build_archive(entries: &[(String, Vec<u8>)]) -> ServiceResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, content) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(ProcessingError::Pack)?;
        writer.write_all(content).map_err(ProcessingError::Io)?;
    }

    let cursor = writer.finish().map_err(ProcessingError::Pack)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Helper: build a ZIP from (name, content) pairs.
    fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).expect("start_file");
            zip.write_all(content.as_bytes()).expect("write");
        }
        zip.finish().expect("finish").into_inner()
    }

    #[test]
    fn test_extract_and_discover_recursively() {
        let bytes = make_zip(&[
            ("notes/b.md", "beta"),
            ("a.md", "alpha"),
            ("readme.txt", "not a document"),
        ]);

        let scratch = TempDir::new().expect("tempdir");
        extract_archive(&bytes, scratch.path()).expect("extract");

        let documents = discover_documents(scratch.path()).expect("discover");
        let names: Vec<_> = documents
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        // Sorted traversal: a.md at the root before notes/b.md; .txt skipped.
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_malformed_archive_is_rejected() {
        let scratch = TempDir::new().expect("tempdir");
        let result = extract_archive(b"definitely not a zip", scratch.path());

        assert!(matches!(
            result,
            Err(ServiceError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn test_entry_paths_are_neutralized() {
        assert_eq!(
            sanitize_entry_path("../../etc/escape.md"),
            Some(PathBuf::from("etc/escape.md"))
        );
        assert_eq!(
            sanitize_entry_path("/abs/note.md"),
            Some(PathBuf::from("abs/note.md"))
        );
        assert_eq!(
            sanitize_entry_path("a/./b.md"),
            Some(PathBuf::from("a/b.md"))
        );
        assert_eq!(sanitize_entry_path(".."), None);
    }

    #[test]
    fn test_build_archive_round_trips_contents() {
        let entries = vec![
            ("one.md".to_string(), b"first".to_vec()),
            ("two.md".to_string(), b"second".to_vec()),
        ];
        let bytes = build_archive(&entries).expect("build");

        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open");
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        io::Read::read_to_string(&mut archive.by_name("two.md").expect("entry"), &mut content)
            .expect("read");
        assert_eq!(content, "second");
    }

    #[test]
    fn test_empty_output_archive_is_valid() {
        let bytes = build_archive(&[]).expect("build");
        let archive = ZipArchive::new(Cursor::new(bytes)).expect("open");
        assert_eq!(archive.len(), 0);
    }
}
