use log::debug;
use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// File-index interval during which the monitored wavelength is active.
/// Indices are absolute scan indices, not positions within a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivationWindow {
    pub start_index: u32,
    pub end_index: u32,
}

/// Single-pass edge detector.
///
/// The first step up by more than `threshold` marks activation; after that,
/// the first step down by more than `threshold` marks deactivation and ends
/// the scan. `start_index` is the scan index of `series[0]`.
pub fn detect_activation(series: &[f64], threshold: f64, start_index: u32) -> (Option<u32>, Option<u32>) {
    let mut activation = None;
    let mut deactivation = None;

    for (i, pair) in series.windows(2).enumerate() {
        let Some(index) = u32::try_from(i + 1)
            .ok()
            .and_then(|step| start_index.checked_add(step))
        else {
            debug!("Scan index past u32::MAX after {start_index}, stopping");
            break;
        };
        let diff = pair[1] - pair[0];
        if activation.is_none() {
            if diff > threshold {
                debug!("Activation detected at index {index}");
                activation = Some(index);
            }
        } else if diff < -threshold {
            debug!("Deactivation detected at index {index}");
            deactivation = Some(index);
            break;
        }
    }

    (activation, deactivation)
}

/// Like [`detect_activation`] but both edges are required.
pub fn detect_window(series: &[f64], threshold: f64, start_index: u32) -> Result<ActivationWindow> {
    match detect_activation(series, threshold, start_index) {
        (Some(start_index), Some(end_index)) => Ok(ActivationWindow {
            start_index,
            end_index,
        }),
        (activation, deactivation) => Err(AnalysisError::ActivationNotDetected {
            activation,
            deactivation,
        }),
    }
}
