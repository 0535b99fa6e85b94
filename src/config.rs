use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stability analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Wavelength (nm) whose series drives activation detection.
    #[serde(default = "StabilityConfig::default_detect_wavelength")]
    pub detect_wavelength: f64,
    /// Minimum step between consecutive scans that counts as an edge.
    #[serde(default = "StabilityConfig::default_threshold")]
    pub threshold: f64,
    #[serde(default = "StabilityConfig::default_sections")]
    pub sections: usize,
    /// Scans trimmed from each end of the detected window before sectioning.
    #[serde(default = "StabilityConfig::default_margin")]
    pub margin: u32,
}

impl StabilityConfig {
    fn default_detect_wavelength() -> f64 {
        657.0
    }
    fn default_threshold() -> f64 {
        1000.0
    }
    fn default_sections() -> usize {
        3
    }
    fn default_margin() -> u32 {
        10
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            detect_wavelength: Self::default_detect_wavelength(),
            threshold: Self::default_threshold(),
            sections: Self::default_sections(),
            margin: Self::default_margin(),
        }
    }
}

// ---------------------------------------------------------------------------
// Waveband / peak analysis
// ---------------------------------------------------------------------------

/// Which computations see the low-intensity floor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FloorScope {
    #[default]
    PeaksAndDifferences,
    PeaksOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavebandConfig {
    /// Wavelengths reported in the specific-waveband report.
    #[serde(default = "WavebandConfig::default_wavebands")]
    pub wavebands: Vec<f64>,
    #[serde(default = "WavebandConfig::default_thresholds")]
    pub thresholds: Vec<f64>,
    /// Exclusion radius (nm) between marked peaks.
    #[serde(default = "WavebandConfig::default_skip_range_nm")]
    pub skip_range_nm: f64,
    #[serde(default = "WavebandConfig::default_max_marked_peaks")]
    pub max_marked_peaks: usize,
    /// Observations below this intensity are zeroed when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_floor: Option<f64>,
    #[serde(default)]
    pub floor_scope: FloorScope,
    /// Wavelengths below this are ignored when gathering a batch.
    #[serde(default = "WavebandConfig::default_min_wavelength")]
    pub min_wavelength: f64,
}

impl WavebandConfig {
    fn default_wavebands() -> Vec<f64> {
        vec![486.0, 612.0, 656.0, 777.0]
    }
    fn default_thresholds() -> Vec<f64> {
        vec![250.0, 350.0, 450.0, 550.0]
    }
    fn default_skip_range_nm() -> f64 {
        10.0
    }
    fn default_max_marked_peaks() -> usize {
        5
    }
    fn default_min_wavelength() -> f64 {
        195.0
    }
}

impl Default for WavebandConfig {
    fn default() -> Self {
        Self {
            wavebands: Self::default_wavebands(),
            thresholds: Self::default_thresholds(),
            skip_range_nm: Self::default_skip_range_nm(),
            max_marked_peaks: Self::default_max_marked_peaks(),
            intensity_floor: None,
            floor_scope: FloorScope::default(),
            min_wavelength: Self::default_min_wavelength(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingestion and batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    /// Fold wavelengths closer than this into one series key of the
    /// stability time series; queries resolve to the nearest key too.
    /// Waveband gathering always keys on exact wavelengths. Exact keys
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_epsilon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Also run the waveband pipeline for each folder.
    #[serde(default = "BatchConfig::default_include_wavebands")]
    pub include_wavebands: bool,
    /// Analyse folders on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

impl BatchConfig {
    fn default_include_wavebands() -> bool {
        true
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            include_wavebands: Self::default_include_wavebands(),
            parallel: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalyzerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub wavebands: WavebandConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl AnalyzerConfig {
    /// Read `path` if it exists; fall back to defaults when it is missing or
    /// does not parse.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No config at {}; using defaults", path.display());
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse config {}: {err}. Using defaults.", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                warn!("Failed to read config {}: {err}. Using defaults.", path.display());
                Self::default()
            }
        }
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
