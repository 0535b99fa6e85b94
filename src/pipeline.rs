use std::path::{Path, PathBuf};

use log::{error, info};
use serde::Serialize;

use crate::analysis::{
    analyze_sections, detect_window, evaluate_thresholds, find_peak_points, mark_peaks,
    max_intensity_series, ActivationWindow, PeakRecord, Section, ThresholdResult, WavebandSelection,
};
use crate::config::{FloorScope, IngestConfig, StabilityConfig, WavebandConfig};
use crate::data::filter::filter_low_intensity;
use crate::data::loader::{gather_observations, generate_scan_file_names, parse_scan_file, ScanRange};
use crate::data::model::{ScanFileName, TimeSeriesStore, WavelengthKey};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Stability: ingest → detect → narrowed re-ingest → sections
// ---------------------------------------------------------------------------

/// Outcome of a complete stability run on one folder.
#[derive(Debug, Clone, Serialize)]
pub struct StabilityReport {
    pub base_name: String,
    pub detect_wavelength: f64,
    pub threshold: f64,
    pub window: ActivationWindow,
    /// First and last scan index fed into the sectioning.
    pub analyzed_range: (u32, u32),
    pub sections: Vec<Section>,
}

/// Runs the stability steps over one owned [`TimeSeriesStore`].
///
/// The steps are exposed separately so a caller can keep the detected window
/// even when sectioning fails.
pub struct StabilityPipeline {
    store: TimeSeriesStore,
    config: StabilityConfig,
}

impl StabilityPipeline {
    pub fn new(config: StabilityConfig, ingest: &IngestConfig) -> Self {
        Self {
            store: TimeSeriesStore::with_merge_epsilon(ingest.merge_epsilon),
            config,
        }
    }

    /// Load the whole scan range and locate the activation window on the
    /// detection wavelength.
    pub fn detect(&mut self, folder: &Path, range: &ScanRange) -> Result<ActivationWindow> {
        info!(
            "Detecting activation at {} nm in {}",
            self.config.detect_wavelength,
            folder.display()
        );
        self.store.load(&range.file_names(), folder);
        let series = self.store.series(self.config.detect_wavelength)?;
        let window = detect_window(series, self.config.threshold, range.start)?;
        info!(
            "Activation window {}..{}",
            window.start_index, window.end_index
        );
        Ok(window)
    }

    /// Re-read the window shrunk by `margin` on both sides and section it.
    pub fn sections(
        &mut self,
        folder: &Path,
        base_name: &str,
        window: ActivationWindow,
    ) -> Result<((u32, u32), Vec<Section>)> {
        let margin = self.config.margin;
        let too_narrow = || AnalysisError::WindowTooNarrow {
            activation: window.start_index,
            deactivation: window.end_index,
            margin,
        };
        let first = window.start_index.checked_add(margin).ok_or_else(too_narrow)?;
        let last = window
            .end_index
            .checked_sub(margin)
            .filter(|last| *last >= first)
            .ok_or_else(too_narrow)?;

        self.store
            .load(&generate_scan_file_names(base_name, first, last), folder);
        let data = self.store.series(self.config.detect_wavelength)?;
        let sections = analyze_sections(data, self.config.sections)?;
        info!("Sectioned {} samples from scans {first}..={last}", data.len());
        Ok(((first, last), sections))
    }

    pub fn run(&mut self, folder: &Path, range: &ScanRange) -> Result<StabilityReport> {
        let window = self.detect(folder, range)?;
        let (analyzed_range, sections) = self.sections(folder, &range.base_name, window)?;
        Ok(StabilityReport {
            base_name: range.base_name.clone(),
            detect_wavelength: self.config.detect_wavelength,
            threshold: self.config.threshold,
            window,
            analyzed_range,
            sections,
        })
    }
}

// ---------------------------------------------------------------------------
// Wavebands: gather → floor → differences → peaks
// ---------------------------------------------------------------------------

/// Peak and difference analysis of one batch of scan files.
#[derive(Debug, Clone, Serialize)]
pub struct WavebandReport {
    /// Per threshold, the configured wavebands that swung past it.
    pub specific: Vec<ThresholdResult>,
    /// Per threshold, every wavelength that swung past it.
    pub all: Vec<ThresholdResult>,
    /// One peak per wavelength, highest first.
    pub peaks: Vec<PeakRecord>,
    /// Peaks chosen for annotation.
    pub marked: Vec<PeakRecord>,
    /// `(wavelength, max intensity)` ascending.
    pub spectrum: Vec<(f64, f64)>,
    pub exclusion_radius: f64,
}

impl WavebandReport {
    pub fn highest_peak(&self) -> Option<&PeakRecord> {
        self.peaks.first()
    }
}

pub fn run_wavebands<P: AsRef<Path>>(files: &[P], config: &WavebandConfig) -> WavebandReport {
    let mut observations = gather_observations(files, config.min_wavelength);

    let floor = config.intensity_floor;
    if let (Some(floor), FloorScope::PeaksAndDifferences) = (floor, config.floor_scope) {
        filter_low_intensity(&mut observations, floor);
    }

    let specific = evaluate_thresholds(
        &observations,
        &config.thresholds,
        WavebandSelection::Specific(&config.wavebands),
    );
    let all = evaluate_thresholds(&observations, &config.thresholds, WavebandSelection::All);

    if let (Some(floor), FloorScope::PeaksOnly) = (floor, config.floor_scope) {
        filter_low_intensity(&mut observations, floor);
    }

    let peaks = find_peak_points(&observations);
    let marked = mark_peaks(&peaks, config.skip_range_nm, config.max_marked_peaks);
    info!(
        "{} wavelengths ranked, {} peaks marked",
        peaks.len(),
        marked.len()
    );

    WavebandReport {
        specific,
        all,
        peaks,
        marked,
        spectrum: max_intensity_series(&observations),
        exclusion_radius: config.skip_range_nm,
    }
}

// ---------------------------------------------------------------------------
// Specific-waveband extraction
// ---------------------------------------------------------------------------

/// Intensities of the chosen wavebands in one scan file.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRow {
    pub file: String,
    pub scan_index: Option<u32>,
    /// One entry per requested waveband; `None` when the file lacks it.
    pub intensities: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WavebandExtraction {
    pub wavebands: Vec<f64>,
    pub rows: Vec<ExtractionRow>,
}

/// Read each file and pick out the requested wavebands (first occurrence in
/// the file). Unreadable files are logged and skipped.
pub fn extract_wavebands(files: &[PathBuf], wavebands: &[f64]) -> WavebandExtraction {
    let mut rows = Vec::with_capacity(files.len());

    for path in files {
        let records = match parse_scan_file(path) {
            Ok(r) => r,
            Err(e) => {
                error!("{e}");
                continue;
            }
        };
        let intensities = wavebands
            .iter()
            .map(|wb| {
                records
                    .iter()
                    .find(|r| WavelengthKey(r.wavelength) == WavelengthKey(*wb))
                    .map(|r| r.intensity)
            })
            .collect();
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        rows.push(ExtractionRow {
            scan_index: ScanFileName::parse(&file).map(|n| n.index),
            file,
            intensities,
        });
    }

    WavebandExtraction {
        wavebands: wavebands.to_vec(),
        rows,
    }
}
