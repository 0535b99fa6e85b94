use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Section – statistics over one contiguous range
// ---------------------------------------------------------------------------

/// Which range a [`Section`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLabel {
    /// 1-based section number.
    Index(usize),
    /// The whole input range.
    Whole,
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionLabel::Index(i) => write!(f, "Section {i}"),
            SectionLabel::Whole => write!(f, "Whole"),
        }
    }
}

impl Serialize for SectionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub label: SectionLabel,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// `std / mean * 100`, rounded to 3 decimals.
    pub stability_pct: f64,
    /// Number of samples in the range.
    pub len: usize,
}

impl Section {
    fn compute(label: SectionLabel, data: &[f64]) -> Result<Self> {
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        if mean == 0.0 {
            return Err(AnalysisError::ZeroMean {
                label: label.to_string(),
            });
        }
        let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Ok(Section {
            label,
            mean,
            std,
            stability_pct: round3(std / mean * 100.0),
            len: data.len(),
        })
    }
}

/// Round to 3 decimals, half to even on the exact decimal value of `x`.
///
/// A product landing on `.5` is only a true tie when the multiplication was
/// exact; otherwise the fma residual says which side the real value lies on.
fn round3(x: f64) -> f64 {
    let scaled = x * 1000.0;
    let residual = x.mul_add(1000.0, -scaled);
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 && residual != 0.0 {
        if residual > 0.0 {
            scaled.ceil()
        } else {
            scaled.floor()
        }
    } else {
        scaled.round_ties_even()
    };
    rounded / 1000.0
}

/// Split `data` into `sections` contiguous ranges of `len / sections`
/// samples, the last one absorbing the remainder, then append the whole range.
///
/// Returns `sections + 1` entries: `Section 1..=N`, then `Whole`.
pub fn analyze_sections(data: &[f64], sections: usize) -> Result<Vec<Section>> {
    if sections < 2 {
        return Err(AnalysisError::InvalidSectionCount(sections));
    }
    if data.len() < sections {
        return Err(AnalysisError::InsufficientSamples {
            len: data.len(),
            sections,
        });
    }

    let section_size = data.len() / sections;
    let mut out = Vec::with_capacity(sections + 1);
    for i in 0..sections {
        let start = i * section_size;
        let end = if i + 1 < sections {
            start + section_size
        } else {
            data.len()
        };
        out.push(Section::compute(SectionLabel::Index(i + 1), &data[start..end])?);
    }
    out.push(Section::compute(SectionLabel::Whole, data)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stability_rounds_half_to_even() {
        // exact ties
        assert_eq!(round3(0.0625), 0.062);
        assert_eq!(round3(0.1875), 0.188);
        assert_eq!(round3(-0.0625), -0.062);
        // near ties decided by the stored value
        assert_eq!(round3(0.0125), 0.013);
        assert_eq!(round3(1.0005), 1.0);
        assert_eq!(round3(2.675), 2.675);
    }

    #[test]
    fn last_section_absorbs_remainder() {
        let data = [1.0; 10];
        let sections = analyze_sections(&data, 3).unwrap();
        let sizes: Vec<usize> = sections.iter().map(|s| s.len).collect();
        assert_eq!(sizes, vec![3, 3, 4, 10]);
        assert!(sections.iter().all(|s| s.stability_pct == 0.0));
        assert!(sections.iter().all(|s| s.mean == 1.0));
    }

    #[test]
    fn labels_in_order() {
        let sections = analyze_sections(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        let labels: Vec<String> = sections.iter().map(|s| s.label.to_string()).collect();
        assert_eq!(labels, vec!["Section 1", "Section 2", "Whole"]);
    }

    #[test]
    fn population_std_and_rounding() {
        // [2, 4] -> mean 3, population std 1, stability 33.333
        let sections = analyze_sections(&[2.0, 4.0, 2.0, 4.0], 2).unwrap();
        let first = &sections[0];
        assert!((first.mean - 3.0).abs() < 1e-12);
        assert!((first.std - 1.0).abs() < 1e-12);
        assert_eq!(first.stability_pct, 33.333);
    }

    #[test]
    fn zero_mean_is_an_error() {
        let err = analyze_sections(&[0.0, 0.0, 5.0, 5.0], 2).unwrap_err();
        assert!(matches!(err, AnalysisError::ZeroMean { label } if label == "Section 1"));
    }

    #[test]
    fn rejects_bad_section_counts() {
        assert!(matches!(
            analyze_sections(&[1.0; 4], 1),
            Err(AnalysisError::InvalidSectionCount(1))
        ));
        assert!(matches!(
            analyze_sections(&[1.0; 2], 3),
            Err(AnalysisError::InsufficientSamples { len: 2, sections: 3 })
        ));
    }
}
