use serde::Serialize;

use crate::data::model::BatchObservations;

/// Highest reading of one wavelength across a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakRecord {
    pub wavelength: f64,
    pub intensity: f64,
    /// File the maximum came from.
    pub file: String,
    /// Scan index parsed from `file`, when it follows the naming convention.
    pub scan_index: Option<u32>,
}

/// One peak per wavelength (earliest file wins ties), ranked by intensity,
/// highest first.
pub fn find_peak_points(observations: &BatchObservations) -> Vec<PeakRecord> {
    let mut peaks: Vec<PeakRecord> = observations
        .iter()
        .filter_map(|(wavelength, readings)| {
            let best = readings.iter().reduce(|best, o| {
                if o.intensity > best.intensity {
                    o
                } else {
                    best
                }
            })?;
            Some(PeakRecord {
                wavelength,
                intensity: best.intensity,
                file: best.file.clone(),
                scan_index: best.scan_index(),
            })
        })
        .collect();

    // stable: equal intensities keep ascending wavelength order
    peaks.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    peaks
}

/// Walk `ranked` (highest first) and keep up to `max_marks` peaks, skipping
/// any whose wavelength lies within `exclusion_radius` of one already kept.
pub fn mark_peaks(ranked: &[PeakRecord], exclusion_radius: f64, max_marks: usize) -> Vec<PeakRecord> {
    let mut marked: Vec<PeakRecord> = Vec::with_capacity(max_marks);
    for peak in ranked {
        if marked.len() >= max_marks {
            break;
        }
        let crowded = marked
            .iter()
            .any(|m| (peak.wavelength - m.wavelength).abs() <= exclusion_radius);
        if !crowded {
            marked.push(peak.clone());
        }
    }
    marked
}

/// `(wavelength, max intensity)` in ascending wavelength order.
pub fn max_intensity_series(observations: &BatchObservations) -> Vec<(f64, f64)> {
    observations
        .iter()
        .filter_map(|(wavelength, readings)| {
            readings
                .iter()
                .map(|o| o.intensity)
                .reduce(f64::max)
                .map(|max| (wavelength, max))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;

    fn peak(wavelength: f64, intensity: f64) -> PeakRecord {
        PeakRecord {
            wavelength,
            intensity,
            file: String::new(),
            scan_index: None,
        }
    }

    #[test]
    fn one_peak_per_wavelength_sorted_descending() {
        let obs: BatchObservations = [
            (
                300.0,
                vec![Observation::new("r_S0001.txt", 10.0), Observation::new("r_S0002.txt", 20.0)],
            ),
            (
                400.0,
                vec![Observation::new("r_S0001.txt", 90.0), Observation::new("r_S0002.txt", 5.0)],
            ),
        ]
        .into_iter()
        .collect();

        let peaks = find_peak_points(&obs);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].wavelength, 400.0);
        assert_eq!(peaks[0].intensity, 90.0);
        assert_eq!(peaks[0].scan_index, Some(1));
        assert_eq!(peaks[1].file, "r_S0002.txt");
    }

    #[test]
    fn ties_go_to_earliest_file() {
        let obs: BatchObservations = [(
            500.0,
            vec![
                Observation::new("a_S0003.txt", 7.0),
                Observation::new("a_S0004.txt", 9.0),
                Observation::new("a_S0005.txt", 9.0),
            ],
        )]
        .into_iter()
        .collect();
        assert_eq!(find_peak_points(&obs)[0].file, "a_S0004.txt");
    }

    #[test]
    fn exclusion_radius_separates_marks() {
        let ranked = [peak(500.0, 900.0), peak(500.5, 800.0), peak(600.0, 700.0)];
        let marked = mark_peaks(&ranked, 2.0, 5);
        let wl: Vec<f64> = marked.iter().map(|p| p.wavelength).collect();
        assert_eq!(wl, vec![500.0, 600.0]);
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let ranked = [peak(500.0, 900.0), peak(502.0, 800.0)];
        assert_eq!(mark_peaks(&ranked, 2.0, 5).len(), 1);
    }

    #[test]
    fn at_most_max_marks() {
        let ranked: Vec<PeakRecord> = (0..10)
            .map(|i| peak(300.0 + 50.0 * i as f64, 1000.0 - i as f64))
            .collect();
        assert_eq!(mark_peaks(&ranked, 10.0, 5).len(), 5);
    }

    #[test]
    fn max_series_ascending() {
        let obs: BatchObservations = [
            (700.0, vec![Observation::new("a", 1.0), Observation::new("b", 3.0)]),
            (200.0, vec![Observation::new("a", 2.0)]),
        ]
        .into_iter()
        .collect();
        assert_eq!(max_intensity_series(&obs), vec![(200.0, 2.0), (700.0, 3.0)]);
    }
}
