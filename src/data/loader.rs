use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::model::{BatchObservations, Observation, ScanFileName, ScanRecord, WavelengthKey};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Scan file parser
// ---------------------------------------------------------------------------

/// Parse one `wavelength;intensity` line. Anything else yields `None`.
///
/// Both fields are trimmed; a line needs exactly one `;`.
pub fn parse_scan_line(line: &str) -> Option<ScanRecord> {
    let (wl, intensity) = line.trim().split_once(';')?;
    if intensity.contains(';') {
        return None;
    }
    Some(ScanRecord {
        wavelength: wl.trim().parse().ok()?,
        intensity: intensity.trim().parse().ok()?,
    })
}

/// Read a scan file into its records, in line order.
///
/// Malformed lines are dropped. Only a file that cannot be read at all is an
/// error; a file with no valid line gives an empty list.
pub fn parse_scan_file(path: &Path) -> Result<Vec<ScanRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;

    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        match parse_scan_line(line) {
            Some(rec) => records.push(rec),
            None => {
                if !line.trim().is_empty() {
                    debug!("Skipping line {} in {}: {line:?}", line_no + 1, path.display());
                }
            }
        }
    }

    debug!("Read {} data points from {}", records.len(), path.display());
    Ok(records)
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// File names `<base>_S<index:04>.txt` for `start..=end`; empty when
/// `start > end`.
pub fn generate_scan_file_names(base_name: &str, start: u32, end: u32) -> Vec<String> {
    (start..=end)
        .map(|i| ScanFileName::new(base_name, i).to_string())
        .collect()
}

/// Base name and index range of the scan files found in a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub base_name: String,
    pub start: u32,
    pub end: u32,
}

impl ScanRange {
    pub fn file_names(&self) -> Vec<String> {
        generate_scan_file_names(&self.base_name, self.start, self.end)
    }

    /// Full paths of every file in the range, whether or not it exists.
    pub fn file_paths(&self, folder: &Path) -> Vec<PathBuf> {
        self.file_names()
            .into_iter()
            .map(|name| folder.join(name))
            .collect()
    }
}

/// Infer the scan range from directory entry names.
///
/// Entries are considered in sorted order; the first `<base>_S<index>.txt`
/// fixes the base name and files with any other base are ignored.
pub fn infer_scan_range<I, S>(entries: I) -> Option<ScanRange>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<ScanFileName> = entries
        .into_iter()
        .filter_map(|e| ScanFileName::parse(e.as_ref()))
        .collect();
    names.sort_by(|a, b| (&a.base_name, a.index).cmp(&(&b.base_name, b.index)));

    let base_name = names.first()?.base_name.clone();
    let mut indices = names
        .iter()
        .filter(|n| n.base_name == base_name)
        .map(|n| n.index);
    let first = indices.next()?;
    let (start, end) = indices.fold((first, first), |(lo, hi), i| (lo.min(i), hi.max(i)));

    Some(ScanRange {
        base_name,
        start,
        end,
    })
}

/// List a folder and infer its scan range.
pub fn discover_scan_range(folder: &Path) -> Result<ScanRange> {
    let entries = std::fs::read_dir(folder).map_err(|e| AnalysisError::io(folder, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::io(folder, e))?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    let range = infer_scan_range(&names)
        .ok_or_else(|| AnalysisError::NoScanFiles(folder.to_path_buf()))?;
    info!(
        "{}: base name {:?}, indices {}..={}",
        folder.display(),
        range.base_name,
        range.start,
        range.end
    );
    Ok(range)
}

// ---------------------------------------------------------------------------
// Batch gathering
// ---------------------------------------------------------------------------

/// Per-file wavelength map; a repeated wavelength keeps its last intensity.
/// Wavelengths below `min_wavelength` are ignored.
pub fn read_wavelength_map(path: &Path, min_wavelength: f64) -> Result<BTreeMap<WavelengthKey, f64>> {
    let mut values = BTreeMap::new();
    for rec in parse_scan_file(path)? {
        if rec.wavelength >= min_wavelength {
            values.insert(WavelengthKey(rec.wavelength), rec.intensity);
        }
    }
    Ok(values)
}

/// Collect every file's readings into one wavelength-keyed structure, keeping
/// file order within each wavelength. Unreadable or empty files are skipped.
pub fn gather_observations<P: AsRef<Path>>(files: &[P], min_wavelength: f64) -> BatchObservations {
    let mut observations = BatchObservations::new();

    for path in files {
        let path = path.as_ref();
        let file_values = match read_wavelength_map(path, min_wavelength) {
            Ok(v) => v,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        if file_values.is_empty() {
            info!("No valid data found in {}", path.display());
            continue;
        }

        let file_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        for (wavelength, intensity) in file_values {
            observations.push(wavelength.0, Observation::new(file_id.clone(), intensity));
        }
    }

    info!(
        "Gathered {} wavelengths from {} files",
        observations.len(),
        files.len()
    );
    observations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_lines() {
        assert_eq!(
            parse_scan_line("656.28;1234.5"),
            Some(ScanRecord {
                wavelength: 656.28,
                intensity: 1234.5
            })
        );
        assert_eq!(
            parse_scan_line("  200.0 ; -3e2 \r"),
            Some(ScanRecord {
                wavelength: 200.0,
                intensity: -300.0
            })
        );
    }

    #[test]
    fn drops_malformed_lines() {
        assert_eq!(parse_scan_line("Wavelength;Intensity"), None);
        assert_eq!(parse_scan_line("656.28 1234.5"), None);
        assert_eq!(parse_scan_line("656.28;1234.5;7"), None);
        assert_eq!(parse_scan_line("656.28;"), None);
        assert_eq!(parse_scan_line(""), None);
    }

    #[test]
    fn parsing_is_lossless() {
        let values: [(f64, f64); 3] = [
            (195.123456789012, 0.1 + 0.2),
            (1e-300, 123456789.987654321),
            (656.28, -0.0),
        ];
        for (wl, intensity) in values {
            let rec = parse_scan_line(&format!("{wl};{intensity}")).unwrap();
            assert_eq!(rec.wavelength.to_bits(), wl.to_bits());
            assert_eq!(rec.intensity.to_bits(), intensity.to_bits());
        }
    }

    #[test]
    fn file_names_are_zero_padded_and_inclusive() {
        assert_eq!(generate_scan_file_names("name", 5, 5), vec!["name_S0005.txt"]);
        assert!(generate_scan_file_names("name", 5, 3).is_empty());
        assert_eq!(
            generate_scan_file_names("run", 9, 11),
            vec!["run_S0009.txt", "run_S0010.txt", "run_S0011.txt"]
        );
    }

    #[test]
    fn infers_range_from_entries() {
        let entries = [
            "notes.txt",
            "exp_S0012.txt",
            "exp_S0003.txt",
            "exp_S0007.txt",
            "exp_S0007.csv",
            "summary.xlsx",
        ];
        assert_eq!(
            infer_scan_range(entries),
            Some(ScanRange {
                base_name: "exp".into(),
                start: 3,
                end: 12
            })
        );
    }

    #[test]
    fn infers_nothing_without_scan_files() {
        assert_eq!(infer_scan_range(["a.txt", "b_S.txt"]), None);
    }
}
