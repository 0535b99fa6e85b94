use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};
use rayon::prelude::*;

use crate::analysis::{ActivationWindow, Section};
use crate::config::AnalyzerConfig;
use crate::data::loader::{discover_scan_range, ScanRange};
use crate::error::AnalysisError;
use crate::pipeline::{run_wavebands, StabilityPipeline, WavebandReport};

// ---------------------------------------------------------------------------
// Per-folder results
// ---------------------------------------------------------------------------

/// What a successful folder produced.
#[derive(Debug, Clone)]
pub struct FolderAnalysis {
    pub sections: Vec<Section>,
    pub wavebands: Option<WavebandReport>,
}

/// One attempted folder. Failed folders keep their entry.
#[derive(Debug)]
pub struct FolderEntry {
    /// `Exp.<n>`, numbered from 1 in caller order.
    pub label: String,
    pub folder: PathBuf,
    pub scan_range: Option<ScanRange>,
    /// Kept even when sectioning failed after detection succeeded.
    pub window: Option<ActivationWindow>,
    pub outcome: Result<FolderAnalysis, AnalysisError>,
}

impl FolderEntry {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Folder-keyed results, in the order the folders were given.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub entries: Vec<FolderEntry>,
    /// Set when the batch stopped before reaching every folder.
    pub cancelled: bool,
}

impl BatchResult {
    pub fn get(&self, folder: &Path) -> Option<&FolderEntry> {
        self.entries.iter().find(|e| e.folder == folder)
    }

    /// Activation window per folder, same order as `entries`.
    pub fn windows(&self) -> Vec<(&Path, Option<ActivationWindow>)> {
        self.entries
            .iter()
            .map(|e| (e.folder.as_path(), e.window))
            .collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &FolderEntry> {
        self.entries.iter().filter(|e| e.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FolderEntry, &AnalysisError)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().err().map(|err| (e, err)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BatchOrchestrator
// ---------------------------------------------------------------------------

/// Runs the per-folder pipelines over a list of experiment folders.
///
/// Each folder owns its own store and observations, so folders never share
/// state; only the final `BatchResult` collects them.
pub struct BatchOrchestrator {
    config: AnalyzerConfig,
}

impl BatchOrchestrator {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyse `folders` in order. `cancel` is checked before each folder;
    /// folders finished before cancellation keep their results.
    pub fn run(&self, folders: &[PathBuf], cancel: &AtomicBool) -> BatchResult {
        self.run_with(folders, |_| cancel.load(Ordering::Relaxed))
    }

    /// Like [`run`](Self::run), with the cancellation check as a predicate
    /// over the position of the folder about to start.
    pub fn run_with<F>(&self, folders: &[PathBuf], should_cancel: F) -> BatchResult
    where
        F: Fn(usize) -> bool + Sync,
    {
        if self.config.batch.parallel {
            return self.run_parallel(folders, should_cancel);
        }

        let mut result = BatchResult::default();
        for (i, folder) in folders.iter().enumerate() {
            if should_cancel(i) {
                warn!("Batch cancelled after {} of {} folders", i, folders.len());
                result.cancelled = true;
                break;
            }
            result.entries.push(self.analyze_folder(i, folder));
        }
        self.log_summary(&result);
        result
    }

    fn run_parallel<F>(&self, folders: &[PathBuf], should_cancel: F) -> BatchResult
    where
        F: Fn(usize) -> bool + Sync,
    {
        let outcomes: Vec<Option<FolderEntry>> = folders
            .par_iter()
            .enumerate()
            .map(|(i, folder)| {
                if should_cancel(i) {
                    None
                } else {
                    Some(self.analyze_folder(i, folder))
                }
            })
            .collect();

        let cancelled = outcomes.iter().any(Option::is_none);
        let result = BatchResult {
            entries: outcomes.into_iter().flatten().collect(),
            cancelled,
        };
        self.log_summary(&result);
        result
    }

    /// Full pipeline for one folder. Failures are recorded in the entry.
    pub fn analyze_folder(&self, position: usize, folder: &Path) -> FolderEntry {
        let label = format!("Exp.{}", position + 1);
        info!("{label}: analysing {}", folder.display());

        let mut scan_range = None;
        let mut window = None;
        let outcome = self.analyze_into(folder, &mut scan_range, &mut window);
        if let Err(e) = &outcome {
            error!("{label} ({}) failed: {e}", folder.display());
        }

        FolderEntry {
            label,
            folder: folder.to_path_buf(),
            scan_range,
            window,
            outcome,
        }
    }

    fn analyze_into(
        &self,
        folder: &Path,
        scan_range: &mut Option<ScanRange>,
        window_out: &mut Option<ActivationWindow>,
    ) -> Result<FolderAnalysis, AnalysisError> {
        let range = discover_scan_range(folder)?;
        *scan_range = Some(range.clone());

        let mut pipeline = StabilityPipeline::new(self.config.stability.clone(), &self.config.ingest);
        let window = pipeline.detect(folder, &range)?;
        *window_out = Some(window);
        let (_, sections) = pipeline.sections(folder, &range.base_name, window)?;

        let wavebands = self
            .config
            .batch
            .include_wavebands
            .then(|| run_wavebands(&range.file_paths(folder), &self.config.wavebands));

        Ok(FolderAnalysis {
            sections,
            wavebands,
        })
    }

    fn log_summary(&self, result: &BatchResult) {
        info!(
            "Batch finished: {} ok, {} failed{}",
            result.successes().count(),
            result.failures().count(),
            if result.cancelled { " (cancelled)" } else { "" }
        );
    }
}
