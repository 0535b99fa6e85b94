use std::path::Path;

use log::info;

use crate::config::AnalyzerConfig;
use crate::data::loader::{discover_scan_range, ScanRange};
use crate::error::{AnalysisError, Result};
use crate::pipeline::{extract_wavebands, run_wavebands, StabilityPipeline, StabilityReport, WavebandExtraction, WavebandReport};
use crate::report::{self, Report};

// ---------------------------------------------------------------------------
// Analysis session
// ---------------------------------------------------------------------------

/// The analysis state of one front end, independent of presentation.
///
/// Holds the configuration plus the most recent result of each analysis; a
/// new run replaces the previous result wholesale.
pub struct AnalysisSession {
    pub config: AnalyzerConfig,

    /// Scan range of the last folder analysed.
    pub scan_range: Option<ScanRange>,

    /// Last stability result (None until a stability run succeeds).
    pub stability: Option<StabilityReport>,

    /// Last waveband result.
    pub wavebands: Option<WavebandReport>,
}

impl AnalysisSession {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            scan_range: None,
            stability: None,
            wavebands: None,
        }
    }

    /// Discover the folder's scan range and remember it.
    pub fn scan_folder(&mut self, folder: &Path) -> Result<&ScanRange> {
        self.scan_range = None;
        let range = discover_scan_range(folder)?;
        info!(
            "Detected file range: start index {}, end index {}",
            range.start, range.end
        );
        Ok(self.scan_range.insert(range))
    }

    fn range_for(&mut self, folder: &Path) -> Result<ScanRange> {
        self.scan_folder(folder).cloned()
    }

    pub fn run_stability(&mut self, folder: &Path) -> Result<&StabilityReport> {
        self.stability = None;
        let range = self.range_for(folder)?;
        let mut pipeline = StabilityPipeline::new(self.config.stability.clone(), &self.config.ingest);
        let report = pipeline.run(folder, &range)?;
        info!("Data analysis completed successfully.");
        Ok(self.stability.insert(report))
    }

    pub fn run_wavebands(&mut self, folder: &Path) -> Result<&WavebandReport> {
        self.wavebands = None;
        let range = self.range_for(folder)?;
        let report = run_wavebands(&range.file_paths(folder), &self.config.wavebands);
        Ok(self.wavebands.insert(report))
    }

    pub fn extract(&mut self, folder: &Path) -> Result<WavebandExtraction> {
        let range = self.range_for(folder)?;
        Ok(extract_wavebands(
            &range.file_paths(folder),
            &self.config.wavebands.wavebands,
        ))
    }

    /// Stability results as a report; an error before any successful run.
    pub fn stability_report(&self) -> Result<Report> {
        let result = self.stability.as_ref().ok_or(AnalysisError::NoResults)?;
        Ok(report::stability_report(&result.base_name, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saving_before_analysis_is_an_error() {
        let session = AnalysisSession::new(AnalyzerConfig::default());
        assert!(matches!(session.stability_report(), Err(AnalysisError::NoResults)));
    }

    #[test]
    fn empty_folder_fails_without_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AnalysisSession::new(AnalyzerConfig::default());
        let err = session.run_stability(dir.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoScanFiles(_)));
        assert!(session.stability.is_none());
    }

    #[test]
    fn failed_rerun_drops_previous_results() {
        let empty = tempfile::tempdir().unwrap();
        let mut session = AnalysisSession::new(AnalyzerConfig::default());
        session.wavebands = Some(run_wavebands(&[] as &[&Path], &session.config.wavebands));
        session.scan_range = Some(ScanRange {
            base_name: "old".into(),
            start: 1,
            end: 3,
        });

        assert!(session.run_wavebands(empty.path()).is_err());
        assert!(session.wavebands.is_none());
        assert!(session.scan_range.is_none());
    }
}
