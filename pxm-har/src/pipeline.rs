//! Batch pipeline
//!
//! Validates a batch of four HAR exports, reads them, folds the four source
//! mappers over one accumulator in a fixed order, then finalizes the table.
//!
//! Validation runs on file names alone, before anything is read or parsed.

use crate::accumulator::EventAccumulator;
use crate::capture::HarDocument;
use crate::error::{HarError, HarResult};
use crate::finalize::{finalize, FinishedEventRecord};
use crate::prune::prune_recommendation_columns;
use crate::sources::{IngestSummary, SourceKind};
use futures::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of files in a complete batch
pub const REQUIRED_FILE_COUNT: usize = SourceKind::ALL.len();

/// One input file, already read
#[derive(Debug, Clone, PartialEq)]
pub struct HarFile {
    /// File name used for classification and error messages
    pub name: String,
    pub contents: String,
}

impl HarFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a whole file from disk
    pub async fn read(path: &Path) -> HarResult<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| HarError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file_name(path), contents))
    }
}

/// Finished table plus one ingest summary per source, in fold order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub records: Vec<FinishedEventRecord>,
    pub summaries: Vec<IngestSummary>,
}

impl MetricsReport {
    /// Copy of this report with recommendation columns removed
    pub fn pruned(&self) -> Self {
        Self {
            records: prune_recommendation_columns(&self.records),
            summaries: self.summaries.clone(),
        }
    }

    pub fn summary(&self, kind: SourceKind) -> Option<&IngestSummary> {
        self.summaries.iter().find(|summary| summary.source == kind)
    }
}

/// Check a batch's file names
///
/// Missing types are reported first, listing every absent base name. With
/// all four types present the batch must still be exactly four files.
pub fn validate_file_names<S: AsRef<str>>(names: &[S]) -> HarResult<()> {
    let missing: Vec<String> = SourceKind::ALL
        .into_iter()
        .filter(|kind| {
            !names
                .iter()
                .any(|name| SourceKind::classify(name.as_ref()) == Some(*kind))
        })
        .map(|kind| kind.base_name().to_string())
        .collect();

    if !missing.is_empty() {
        return Err(HarError::MissingFiles { missing });
    }

    if names.len() != REQUIRED_FILE_COUNT {
        return Err(HarError::WrongFileCount {
            expected: REQUIRED_FILE_COUNT,
            found: names.len(),
        });
    }

    Ok(())
}

/// Pair each source kind with its file, in fold order
pub fn classify_batch(files: &[HarFile]) -> HarResult<Vec<(SourceKind, &HarFile)>> {
    let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
    validate_file_names(&names)?;

    let mut batch = Vec::with_capacity(REQUIRED_FILE_COUNT);
    for kind in SourceKind::ALL {
        let file = files
            .iter()
            .find(|file| SourceKind::classify(&file.name) == Some(kind))
            .ok_or_else(|| HarError::MissingFiles {
                missing: vec![kind.base_name().to_string()],
            })?;
        batch.push((kind, file));
    }
    Ok(batch)
}

/// Build the metrics table from four already-read files
///
/// Every file is parsed before any mapper runs, so a malformed file fails
/// the batch without partial output.
pub fn build_metrics(files: &[HarFile]) -> HarResult<MetricsReport> {
    let batch = classify_batch(files)?;

    let documents = batch
        .into_iter()
        .map(|(kind, file)| {
            debug!(source = %kind, file = %file.name, bytes = file.contents.len(), "Parsing HAR file");
            HarDocument::parse(&file.contents)
                .map(|doc| (kind, doc))
                .map_err(|source| HarError::InvalidJson {
                    file: file.name.clone(),
                    source,
                })
        })
        .collect::<HarResult<Vec<_>>>()?;

    let (acc, summaries) = documents.iter().fold(
        (EventAccumulator::new(), Vec::with_capacity(REQUIRED_FILE_COUNT)),
        |(acc, mut summaries), (kind, doc)| {
            let (acc, summary) = kind.mapper().fold(acc, doc);
            summaries.push(summary);
            (acc, summaries)
        },
    );

    let records = finalize(acc);
    info!(
        events = records.len(),
        captures = summaries.iter().map(|s| s.entries).sum::<usize>(),
        skipped = summaries.iter().map(IngestSummary::skipped_total).sum::<usize>(),
        "Metrics table built"
    );

    Ok(MetricsReport { records, summaries })
}

/// Validate, read and merge four HAR files from disk
///
/// Names are checked before any I/O. Reads run concurrently and must all
/// succeed before folding starts.
pub async fn build_metrics_from_paths(paths: &[PathBuf]) -> HarResult<MetricsReport> {
    let names: Vec<String> = paths.iter().map(|path| file_name(path)).collect();
    validate_file_names(&names)?;

    let files = try_join_all(paths.iter().map(|path| HarFile::read(path))).await?;
    build_metrics(&files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
