use super::model::BatchObservations;

// ---------------------------------------------------------------------------
// Observation filters
// ---------------------------------------------------------------------------

/// Zero, in place, every observation whose intensity is below `floor`.
///
/// Returns how many observations were zeroed.
pub fn filter_low_intensity(observations: &mut BatchObservations, floor: f64) -> usize {
    let mut zeroed = 0;
    for (_, readings) in observations.iter_mut() {
        for obs in readings.iter_mut() {
            if obs.intensity < floor {
                obs.intensity = 0.0;
                zeroed += 1;
            }
        }
    }
    log::debug!("Zeroed {zeroed} observations below {floor}");
    zeroed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;

    fn sample() -> BatchObservations {
        [
            (
                400.0,
                vec![Observation::new("a", 50.0), Observation::new("b", 1500.0)],
            ),
            (
                500.0,
                vec![Observation::new("a", 999.0), Observation::new("b", 10.0)],
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn zeroes_below_floor_only() {
        let mut obs = sample();
        assert_eq!(filter_low_intensity(&mut obs, 1000.0), 3);
        let w400: Vec<f64> = obs.get(400.0).unwrap().iter().map(|o| o.intensity).collect();
        assert_eq!(w400, vec![0.0, 1500.0]);
        assert!(obs.get(500.0).unwrap().iter().all(|o| o.intensity == 0.0));
        // file tags survive
        assert_eq!(obs.get(400.0).unwrap()[1].file, "b");
    }
}
