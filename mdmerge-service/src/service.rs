pub mod archive;
pub mod consolidate;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::StaticConfig;
use crate::error::{ProcessingError, ServiceResult};
use crate::progress::{ProgressEvent, ProgressRegistry};

/// Result of processing one uploaded archive
pub struct ProcessedArchive {
    /// ZIP bytes returned to the caller.
    pub bytes: Vec<u8>,
    /// Suggested download name for the attachment.
    pub download_name: String,
}

/// Main service coordinator
pub struct MergeService {
    pub config: StaticConfig,
    pub progress: ProgressRegistry,
}

impl MergeService {
    pub fn new(config: StaticConfig) -> Self {
        Self {
            config,
            progress: ProgressRegistry::new(),
        }
    }

    /// Process an uploaded ZIP of Markdown documents.
    ///
    /// Extracts the archive into a scratch directory, discovers documents in
    /// deterministic order, and either returns them unmerged (at or below the
    /// single-pass limit) or merged into capped batches. Progress events for
    /// `session_id` are pushed as a side effect; the scratch directory is
    /// reclaimed on every exit path, including errors.
    pub fn process_upload(
        &self,
        data: &[u8],
        filename: &str,
        session_id: &str,
    ) -> ServiceResult<ProcessedArchive> {
        let progress = self.progress.sender(session_id);
        let limits = &self.config.processing;

        let scratch = TempDir::new().map_err(ProcessingError::Io)?;
        archive::extract_archive(data, scratch.path())?;
        let documents = archive::discover_documents(scratch.path())?;
        let total = documents.len();

        info!(
            session_id = %session_id,
            documents = total,
            "Extracted uploaded archive"
        );

        let (entries, download_name) = if total <= limits.single_pass_limit {
            let entries = consolidate::passthrough_documents(&documents)?;
            let _ = progress.send(ProgressEvent {
                total_files: total,
                current_index: 0,
                done: true,
            });
            (entries, filename.to_string())
        } else {
            let entries = consolidate::merge_documents(&documents, limits, &progress)?;
            (entries, "merged_files.zip".to_string())
        };

        let bytes = archive::build_archive(&entries)?;
        debug!(
            session_id = %session_id,
            entries = entries.len(),
            "Packaged result archive"
        );

        Ok(ProcessedArchive {
            bytes,
            download_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::error::ServiceError;
    use std::io::{Cursor, Read, Write};
    use zip::ZipArchive;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn service_with(processing: ProcessingConfig) -> MergeService {
        let config = StaticConfig {
            processing,
            ..StaticConfig::default()
        };
        MergeService::new(config)
    }

    /// Helper: ZIP containing `count` identical one-line documents.
    fn zip_of_documents(count: usize, line: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for i in 0..count {
            zip.start_file(format!("doc{i:04}.md"), options)
                .expect("start_file");
            zip.write_all(line.as_bytes()).expect("write");
        }
        zip.finish().expect("finish").into_inner()
    }

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open");
        (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect()
    }

    #[test]
    fn test_small_upload_is_returned_unmerged() {
        let service = service_with(ProcessingConfig::default());
        let input = zip_of_documents(3, "hello");

        let processed = service
            .process_upload(&input, "notes.zip", "s1")
            .expect("process");

        assert_eq!(processed.download_name, "notes.zip");
        let mut archive = ZipArchive::new(Cursor::new(processed.bytes)).expect("open");
        assert_eq!(archive.len(), 3);
        let mut content = String::new();
        archive
            .by_name("doc0000.md")
            .expect("entry")
            .read_to_string(&mut content)
            .expect("read");
        assert_eq!(content, "hello");

        // Single-pass still signals completion to the subscriber.
        let mut rx = service.progress.take_receiver("s1").expect("receiver");
        let event = rx.try_recv().expect("event");
        assert!(event.done);
        assert_eq!(event.total_files, 3);
    }

    #[test]
    fn test_large_upload_is_merged_into_capped_batches() {
        let service = service_with(ProcessingConfig::default());
        let input = zip_of_documents(1000, "word");

        let processed = service
            .process_upload(&input, "big.zip", "s2")
            .expect("process");

        assert_eq!(processed.download_name, "merged_files.zip");
        let names = entry_names(processed.bytes);
        assert_eq!(names.len(), 20);
        assert!(names.iter().all(|n| n.contains("merged_part")));
        assert_eq!(names[0], "merged_part1.md");
        assert_eq!(names[19], "merged_part20.md");
    }

    #[test]
    fn test_count_just_over_limit_switches_to_batch_mode() {
        let service = service_with(ProcessingConfig {
            merge_batch_size: 50,
            single_pass_limit: 50,
            ..ProcessingConfig::default()
        });

        let at_limit = service
            .process_upload(&zip_of_documents(50, "x"), "a.zip", "s3")
            .expect("process");
        assert_eq!(entry_names(at_limit.bytes).len(), 50);

        let over_limit = service
            .process_upload(&zip_of_documents(51, "x"), "a.zip", "s4")
            .expect("process");
        let names = entry_names(over_limit.bytes);
        assert_eq!(names, vec!["merged_part1.md", "merged_part2.md"]);
    }

    #[test]
    fn test_archive_without_documents_yields_empty_result() {
        let service = service_with(ProcessingConfig::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("image.png", SimpleFileOptions::default())
            .expect("start_file");
        zip.write_all(b"\x89PNG").expect("write");
        let input = zip.finish().expect("finish").into_inner();

        let processed = service
            .process_upload(&input, "pics.zip", "s5")
            .expect("process");
        assert_eq!(entry_names(processed.bytes).len(), 0);
    }

    #[test]
    fn test_malformed_upload_is_rejected() {
        let service = service_with(ProcessingConfig::default());

        let result = service.process_upload(b"not a zip", "bad.zip", "s6");
        assert!(matches!(result, Err(ServiceError::InvalidArchive { .. })));
    }

    #[test]
    fn test_batch_mode_event_stream_is_consistent() {
        let service = service_with(ProcessingConfig {
            merge_batch_size: 2,
            single_pass_limit: 2,
            ..ProcessingConfig::default()
        });

        let mut rx = service.progress.take_receiver("s7").expect("receiver");
        service
            .process_upload(&zip_of_documents(5, "w"), "a.zip", "s7")
            .expect("process");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        let indices: Vec<_> = events.iter().map(|e| e.current_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 5]);
        assert!(events.iter().all(|e| e.total_files == 5));
        assert_eq!(events.iter().filter(|e| e.done).count(), 1);
        assert!(events.last().expect("events").done);
    }
}
