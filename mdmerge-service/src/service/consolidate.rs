//! Front-matter stripping, batch merging, and word-count flagging.

use std::fs;
use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, ServiceResult};
use crate::progress::ProgressEvent;

/// Filename suffix for merged parts whose word count exceeds the warning
/// threshold.
const OVER_THRESHOLD_SUFFIX: &str = "_OVER50000WORDS";

/// Strip a leading `---` front-matter block from document text.
///
/// The block is removed only when the text starts with the marker and a
/// second marker occurs later; everything through the second marker goes,
/// along with leading whitespace after it. Anything else, including empty
/// text, passes through unchanged.
pub fn strip_front_matter(text: &str) -> &str {
    if !text.starts_with("---") {
        return text;
    }

    let mut parts = text.splitn(3, "---");
    // The leading marker yields an empty first segment, then the block,
    // then the body.
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(body)) => body.trim_start(),
        _ => text,
    }
}

/// Count words by splitting on runs of whitespace.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Return documents unmerged, named by base filename, contents untouched.
pub fn passthrough_documents(documents: &[PathBuf]) -> ServiceResult<Vec<(String, Vec<u8>)>> {
    documents
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = fs::read(path).map_err(|source| ProcessingError::Read {
                path: path.display().to_string(),
                source,
            })?;
            Ok((name, content))
        })
        .collect()
}

/// Merge documents into sequential batches of `merge_batch_size`.
///
/// Documents are consumed in discovery order; each is normalized and appended
/// to its batch's text with a blank-line separator, and one progress event is
/// pushed per document with a global 1-indexed position. After all batches a
/// final event carries `done = true` and the last pushed index. Any read
/// failure aborts the whole merge.
pub fn merge_documents(
    documents: &[PathBuf],
    config: &ProcessingConfig,
    progress: &UnboundedSender<ProgressEvent>,
) -> ServiceResult<Vec<(String, Vec<u8>)>> {
    let total = documents.len();
    let mut outputs = Vec::new();
    let mut last_index = 0;

    for (batch_number, batch) in documents.chunks(config.merge_batch_size).enumerate() {
        let mut merged = String::new();

        for (offset, path) in batch.iter().enumerate() {
            let raw = fs::read_to_string(path).map_err(|source| ProcessingError::Read {
                path: path.display().to_string(),
                source,
            })?;
            merged.push_str(strip_front_matter(&raw));
            merged.push_str("\n\n");

            last_index = batch_number * config.merge_batch_size + offset + 1;
            // A failed send means the subscriber went away; progress is
            // advisory, so the event is dropped.
            let _ = progress.send(ProgressEvent {
                total_files: total,
                current_index: last_index,
                done: false,
            });
        }

        let word_count = count_words(&merged);
        let name = if word_count > config.word_count_warning {
            format!("merged_part{}{}.md", batch_number + 1, OVER_THRESHOLD_SUFFIX)
        } else {
            format!("merged_part{}.md", batch_number + 1)
        };
        debug!(part = batch_number + 1, word_count, "Built merged part");
        outputs.push((name, merged.into_bytes()));
    }

    let _ = progress.send(ProgressEvent {
        total_files: total,
        current_index: last_index,
        done: true,
    });

    Ok(outputs)
}
