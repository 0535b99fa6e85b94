use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::{error, info};
use serde::Serialize;

use super::loader::parse_scan_file;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// ScanRecord – one line of one scan file
// ---------------------------------------------------------------------------

/// A single `wavelength;intensity` pair read from a scan file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRecord {
    pub wavelength: f64,
    pub intensity: f64,
}

// ---------------------------------------------------------------------------
// WavelengthKey – exact-match float key
// ---------------------------------------------------------------------------

/// Wavelength used as a map key. Matching is exact (bit-for-bit ordering via
/// `total_cmp`); there is no binning.
#[derive(Debug, Clone, Copy)]
pub struct WavelengthKey(pub f64);

impl WavelengthKey {
    pub fn value(self) -> f64 {
        self.0
    }
}

// -- Manual Eq/Ord so we can key a BTreeMap by wavelength --

impl PartialEq for WavelengthKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for WavelengthKey {}

impl PartialOrd for WavelengthKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WavelengthKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for WavelengthKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for WavelengthKey {
    fn from(v: f64) -> Self {
        WavelengthKey(v)
    }
}

impl fmt::Display for WavelengthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ScanFileName – `<base>_S<index:04>.txt`
// ---------------------------------------------------------------------------

/// Name of one scan file: a base name plus a zero-padded sequence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFileName {
    pub base_name: String,
    pub index: u32,
}

impl ScanFileName {
    pub const EXTENSION: &'static str = ".txt";

    pub fn new(base_name: impl Into<String>, index: u32) -> Self {
        Self {
            base_name: base_name.into(),
            index,
        }
    }

    /// Split `<base>_S<digits>.txt` into its parts. The base is everything
    /// before the last `_S`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(Self::EXTENSION)?;
        let (base, digits) = stem.rsplit_once("_S")?;
        if base.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = digits.parse().ok()?;
        Some(Self::new(base, index))
    }
}

impl fmt::Display for ScanFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_S{:04}{}", self.base_name, self.index, Self::EXTENSION)
    }
}

// ---------------------------------------------------------------------------
// TimeSeriesStore – wavelength → intensities in file order
// ---------------------------------------------------------------------------

/// Per-wavelength intensity series for the currently loaded file set.
///
/// Each loaded file appends one intensity to every wavelength it contains,
/// so series lengths may differ when a file lacks a wavelength.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    series: BTreeMap<WavelengthKey, Vec<f64>>,
    /// When set, a new wavelength within this distance of an existing key is
    /// folded into that key instead of opening a new bucket.
    merge_epsilon: Option<f64>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge_epsilon(merge_epsilon: Option<f64>) -> Self {
        Self {
            series: BTreeMap::new(),
            merge_epsilon: merge_epsilon.filter(|eps| *eps > 0.0),
        }
    }

    /// Replace the store contents with the given files (read from `base_dir`,
    /// in order). Unreadable files are logged and skipped.
    ///
    /// Returns the number of files that were read.
    pub fn load<S: AsRef<str>>(&mut self, file_names: &[S], base_dir: &Path) -> usize {
        self.clear();

        let mut loaded = 0;
        for name in file_names {
            let path = base_dir.join(name.as_ref());
            match parse_scan_file(&path) {
                Ok(records) => {
                    for record in records {
                        self.push(record);
                    }
                    loaded += 1;
                }
                Err(e) => error!("Error processing file {}: {e}", name.as_ref()),
            }
        }

        info!(
            "Processed {} files ({loaded} read) with {} wavelengths",
            file_names.len(),
            self.series.len()
        );
        loaded
    }

    /// Append one record's intensity to its wavelength bucket.
    pub fn push(&mut self, record: ScanRecord) {
        let key = self.resolve_key(record.wavelength);
        self.series.entry(key).or_default().push(record.intensity);
    }

    fn resolve_key(&self, wavelength: f64) -> WavelengthKey {
        self.lookup_key(wavelength)
            .unwrap_or(WavelengthKey(wavelength))
    }

    /// Existing bucket for `wavelength`: the exact key, or with merging
    /// enabled the nearest key within epsilon.
    fn lookup_key(&self, wavelength: f64) -> Option<WavelengthKey> {
        let exact = WavelengthKey(wavelength);
        if self.series.contains_key(&exact) {
            return Some(exact);
        }
        let eps = self.merge_epsilon?;
        let lo = WavelengthKey(wavelength - eps);
        let hi = WavelengthKey(wavelength + eps);
        self.series
            .range(lo..=hi)
            .map(|(k, _)| *k)
            .min_by(|a, b| (a.0 - wavelength).abs().total_cmp(&(b.0 - wavelength).abs()))
    }

    /// The series for `wavelength`, or `WavelengthNotFound`.
    pub fn series(&self, wavelength: f64) -> Result<&[f64]> {
        self.get(wavelength)
            .ok_or(AnalysisError::WavelengthNotFound(wavelength))
    }

    /// Queries resolve the same way pushes do, so with merging enabled a
    /// jittered key still answers for the nominal wavelength.
    pub fn get(&self, wavelength: f64) -> Option<&[f64]> {
        let key = self.lookup_key(wavelength)?;
        self.series.get(&key).map(|v| v.as_slice())
    }

    pub fn contains(&self, wavelength: f64) -> bool {
        self.lookup_key(wavelength).is_some()
    }

    /// Wavelengths in ascending order.
    pub fn wavelengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.series.keys().map(|k| k.0)
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Number of wavelength buckets.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BatchObservations – wavelength → [(file, intensity)] across a folder
// ---------------------------------------------------------------------------

/// One intensity reading of one wavelength, tagged with its source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub file: String,
    pub intensity: f64,
}

impl Observation {
    pub fn new(file: impl Into<String>, intensity: f64) -> Self {
        Self {
            file: file.into(),
            intensity,
        }
    }

    /// Sequence index taken from the `_S<index>` part of the file name.
    pub fn scan_index(&self) -> Option<u32> {
        ScanFileName::parse(&self.file).map(|n| n.index)
    }
}

/// Batch-wide observations: for every wavelength, the readings of every file
/// in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct BatchObservations {
    by_wavelength: BTreeMap<WavelengthKey, Vec<Observation>>,
}

impl BatchObservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, wavelength: f64, observation: Observation) {
        self.by_wavelength
            .entry(WavelengthKey(wavelength))
            .or_default()
            .push(observation);
    }

    pub fn get(&self, wavelength: f64) -> Option<&[Observation]> {
        self.by_wavelength
            .get(&WavelengthKey(wavelength))
            .map(|v| v.as_slice())
    }

    /// `(wavelength, observations)` in ascending wavelength order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[Observation])> + '_ {
        self.by_wavelength
            .iter()
            .map(|(k, v)| (k.0, v.as_slice()))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (f64, &mut Vec<Observation>)> + '_ {
        self.by_wavelength.iter_mut().map(|(k, v)| (k.0, v))
    }

    /// Number of wavelengths.
    pub fn len(&self) -> usize {
        self.by_wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_wavelength.is_empty()
    }
}

impl FromIterator<(f64, Vec<Observation>)> for BatchObservations {
    fn from_iter<T: IntoIterator<Item = (f64, Vec<Observation>)>>(iter: T) -> Self {
        let mut out = BatchObservations::new();
        for (wavelength, observations) in iter {
            out.by_wavelength
                .entry(WavelengthKey(wavelength))
                .or_default()
                .extend(observations);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_file_name_round_trip() {
        let name = ScanFileName::new("run_A", 7);
        assert_eq!(name.to_string(), "run_A_S0007.txt");
        assert_eq!(ScanFileName::parse("run_A_S0007.txt"), Some(name));
    }

    #[test]
    fn scan_file_name_uses_last_marker() {
        let parsed = ScanFileName::parse("OES_Sample_S0123.txt").unwrap();
        assert_eq!(parsed.base_name, "OES_Sample");
        assert_eq!(parsed.index, 123);
    }

    #[test]
    fn scan_file_name_rejects_other_shapes() {
        assert_eq!(ScanFileName::parse("notes.txt"), None);
        assert_eq!(ScanFileName::parse("run_S12a.txt"), None);
        assert_eq!(ScanFileName::parse("run_S0001.csv"), None);
        assert_eq!(ScanFileName::parse("_S0001.txt"), None);
    }

    #[test]
    fn missing_wavelength_is_an_error() {
        let mut store = TimeSeriesStore::new();
        store.push(ScanRecord {
            wavelength: 657.0,
            intensity: 1.0,
        });
        assert!(store.series(657.0).is_ok());
        assert!(matches!(
            store.series(656.9),
            Err(AnalysisError::WavelengthNotFound(w)) if w == 656.9
        ));
    }

    #[test]
    fn exact_keys_by_default() {
        let mut store = TimeSeriesStore::new();
        store.push(ScanRecord { wavelength: 500.0, intensity: 1.0 });
        store.push(ScanRecord { wavelength: 500.0001, intensity: 2.0 });
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn merge_epsilon_folds_near_duplicates() {
        let mut store = TimeSeriesStore::with_merge_epsilon(Some(0.01));
        store.push(ScanRecord { wavelength: 500.0, intensity: 1.0 });
        store.push(ScanRecord { wavelength: 500.004, intensity: 2.0 });
        store.push(ScanRecord { wavelength: 500.5, intensity: 3.0 });
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(500.0), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn merged_bucket_answers_for_nominal_wavelength() {
        let mut store = TimeSeriesStore::with_merge_epsilon(Some(0.01));
        store.push(ScanRecord { wavelength: 657.004, intensity: 1.0 });
        store.push(ScanRecord { wavelength: 657.0, intensity: 2.0 });
        assert_eq!(store.wavelengths().collect::<Vec<_>>(), vec![657.004]);
        assert_eq!(store.series(657.0).unwrap(), &[1.0, 2.0][..]);
        assert!(store.contains(657.0));
        assert!(!store.contains(657.02));

        let exact = {
            let mut s = TimeSeriesStore::new();
            s.push(ScanRecord { wavelength: 657.004, intensity: 1.0 });
            s
        };
        assert!(matches!(exact.series(657.0), Err(AnalysisError::WavelengthNotFound(_))));
    }

    #[test]
    fn observation_scan_index() {
        assert_eq!(Observation::new("x_S0042.txt", 1.0).scan_index(), Some(42));
        assert_eq!(Observation::new("x.txt", 1.0).scan_index(), None);
    }
}
