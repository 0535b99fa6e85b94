use serde::Serialize;

use crate::data::model::{BatchObservations, Observation};

/// Which wavelengths a difference scan looks at.
#[derive(Debug, Clone, Copy)]
pub enum WavebandSelection<'a> {
    /// Every wavelength in the batch.
    All,
    /// Only these wavelengths (exact match).
    Specific(&'a [f64]),
}

impl WavebandSelection<'_> {
    fn includes(&self, wavelength: f64) -> bool {
        match self {
            WavebandSelection::All => true,
            WavebandSelection::Specific(list) => list.iter().any(|w| *w == wavelength),
        }
    }
}

/// A wavelength whose swing across the batch exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferenceRecord {
    pub wavelength: f64,
    pub min: f64,
    pub max: f64,
    /// The reading farthest from `min` (earliest on ties).
    pub farthest: Observation,
    pub difference: f64,
}

impl DifferenceRecord {
    /// Scan index of the farthest reading.
    pub fn scan_index(&self) -> Option<u32> {
        self.farthest.scan_index()
    }
}

/// Results of one threshold, in ascending wavelength order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub threshold: f64,
    pub records: Vec<DifferenceRecord>,
}

fn difference_of(wavelength: f64, readings: &[Observation], threshold: f64) -> Option<DifferenceRecord> {
    let first = readings.first()?;
    let (min, max) = readings.iter().fold((first.intensity, first.intensity), |(lo, hi), o| {
        (lo.min(o.intensity), hi.max(o.intensity))
    });
    let difference = max - min;
    if difference.abs() <= threshold {
        return None;
    }
    let farthest = readings.iter().fold(first, |best, o| {
        if (o.intensity - min).abs() > (best.intensity - min).abs() {
            o
        } else {
            best
        }
    });
    Some(DifferenceRecord {
        wavelength,
        min,
        max,
        farthest: farthest.clone(),
        difference,
    })
}

/// Wavelengths in `selection` whose `max - min` exceeds `threshold`.
pub fn find_differences(
    observations: &BatchObservations,
    threshold: f64,
    selection: WavebandSelection<'_>,
) -> Vec<DifferenceRecord> {
    observations
        .iter()
        .filter(|(wavelength, _)| selection.includes(*wavelength))
        .filter_map(|(wavelength, readings)| difference_of(wavelength, readings, threshold))
        .collect()
}

/// Evaluate each threshold independently over the same observations.
pub fn evaluate_thresholds(
    observations: &BatchObservations,
    thresholds: &[f64],
    selection: WavebandSelection<'_>,
) -> Vec<ThresholdResult> {
    thresholds
        .iter()
        .map(|&threshold| ThresholdResult {
            threshold,
            records: find_differences(observations, threshold, selection),
        })
        .collect()
}
