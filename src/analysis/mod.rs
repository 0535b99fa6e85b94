/// Analysis algorithms over the data layer.
///
/// * `activation`  – rising/falling edge detection on one wavelength's series
/// * `sections`    – mean / std / stability over N sections plus the whole range
/// * `peaks`       – per-wavelength maxima, ranking and exclusion-radius marking
/// * `differences` – wavelengths whose max-min swing exceeds a threshold

pub mod activation;
pub mod differences;
pub mod peaks;
pub mod sections;

pub use activation::{detect_activation, detect_window, ActivationWindow};
pub use differences::{evaluate_thresholds, find_differences, DifferenceRecord, ThresholdResult, WavebandSelection};
pub use peaks::{find_peak_points, mark_peaks, max_intensity_series, PeakRecord};
pub use sections::{analyze_sections, Section, SectionLabel};
