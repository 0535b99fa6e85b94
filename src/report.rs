use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};
use serde::Serialize;

use crate::analysis::{PeakRecord, ThresholdResult};
use crate::batch::BatchResult;
use crate::pipeline::{StabilityReport, WavebandExtraction, WavebandReport};

// ---------------------------------------------------------------------------
// Tabular records handed to the spreadsheet writer
// ---------------------------------------------------------------------------

/// One cell of a sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Integer(i64),
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Empty)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Integer(v as i64)
    }
}

/// A named table with a fixed column schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Single-cell sheet used when a threshold flagged nothing.
    fn no_data(name: impl Into<String>) -> Self {
        let mut sheet = Sheet::new(name, &["Message"]);
        sheet.push_row(vec!["No data available for this threshold".into()]);
        sheet
    }
}

/// One logical report: an ordered list of sheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

fn threshold_label(threshold: f64) -> String {
    format!("{threshold}")
}

pub fn stability_report(name: &str, result: &StabilityReport) -> Report {
    let mut sheet = Sheet::new(
        format!("Threshold_{}", threshold_label(result.threshold)),
        &["Section", "Mean", "Std", "Stability (%)"],
    );
    for s in &result.sections {
        sheet.push_row(vec![
            s.label.to_string().into(),
            s.mean.into(),
            s.std.into(),
            s.stability_pct.into(),
        ]);
    }
    Report {
        name: name.to_string(),
        sheets: vec![sheet],
    }
}

/// One sheet per threshold: wavelength, min, max, difference. The
/// specific-waveband flavour also carries the scan index of the farthest
/// reading.
pub fn difference_report(name: &str, results: &[ThresholdResult], with_scan_index: bool) -> Report {
    let columns: &[&str] = if with_scan_index {
        &["Wavelength", "Min", "Max", "Difference", "Scan index"]
    } else {
        &["Wavelength", "Min", "Max", "Difference"]
    };

    let sheets = results
        .iter()
        .map(|result| {
            let sheet_name = format!("threshold_{}", threshold_label(result.threshold));
            if result.records.is_empty() {
                return Sheet::no_data(sheet_name);
            }
            let mut sheet = Sheet::new(sheet_name, columns);
            for rec in &result.records {
                let mut row: Vec<Cell> = vec![
                    rec.wavelength.into(),
                    rec.min.into(),
                    rec.max.into(),
                    rec.difference.into(),
                ];
                if with_scan_index {
                    row.push(rec.scan_index().into());
                }
                sheet.push_row(row);
            }
            sheet
        })
        .collect();

    Report {
        name: name.to_string(),
        sheets,
    }
}

pub fn peaks_sheet(peaks: &[PeakRecord], marked: &[PeakRecord]) -> Sheet {
    let mut sheet = Sheet::new(
        "peaks",
        &["Rank", "Wavelength", "Intensity", "File", "Scan index", "Marked"],
    );
    for (rank, p) in peaks.iter().enumerate() {
        let is_marked = marked.iter().any(|m| m.wavelength == p.wavelength);
        sheet.push_row(vec![
            Cell::Integer(rank as i64 + 1),
            p.wavelength.into(),
            p.intensity.into(),
            p.file.clone().into(),
            p.scan_index.into(),
            Cell::from(if is_marked { "yes" } else { "" }),
        ]);
    }
    sheet
}

pub fn extraction_report(name: &str, extraction: &WavebandExtraction) -> Report {
    let mut columns = vec!["Scan index".to_string(), "File".to_string()];
    columns.extend(extraction.wavebands.iter().map(|wb| format!("{wb} nm")));

    let rows = extraction
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<Cell> = vec![row.scan_index.into(), row.file.clone().into()];
            cells.extend(row.intensities.iter().map(|v| Cell::from(*v)));
            cells
        })
        .collect();

    Report {
        name: name.to_string(),
        sheets: vec![Sheet {
            name: "wavebands".to_string(),
            columns,
            rows,
        }],
    }
}

/// Side-by-side comparison of a batch: one block of section rows per folder,
/// labeled `Exp.1, Exp.2, …` in caller order, failures listed with their
/// reason.
pub fn comparison_report(name: &str, batch: &BatchResult) -> Report {
    let mut sheet = Sheet::new(
        "comparison",
        &[
            "Experiment",
            "Folder",
            "Activation",
            "Deactivation",
            "Section",
            "Mean",
            "Std",
            "Stability (%)",
            "Status",
        ],
    );

    for entry in &batch.entries {
        let folder = entry.folder.display().to_string();
        let (activation, deactivation) = match entry.window {
            Some(w) => (Cell::from(w.start_index), Cell::from(w.end_index)),
            None => (Cell::Empty, Cell::Empty),
        };
        match &entry.outcome {
            Ok(analysis) => {
                for s in &analysis.sections {
                    sheet.push_row(vec![
                        entry.label.clone().into(),
                        folder.clone().into(),
                        activation.clone(),
                        deactivation.clone(),
                        s.label.to_string().into(),
                        s.mean.into(),
                        s.std.into(),
                        s.stability_pct.into(),
                        "ok".into(),
                    ]);
                }
            }
            Err(e) => sheet.push_row(vec![
                entry.label.clone().into(),
                folder.into(),
                activation,
                deactivation,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                format!("failed: {e}").into(),
            ]),
        }
    }

    let mut sheets = vec![sheet];
    if batch.cancelled {
        let mut note = Sheet::new("notes", &["Message"]);
        note.push_row(vec!["Batch cancelled before all folders were analysed".into()]);
        sheets.push(note);
    }

    Report {
        name: name.to_string(),
        sheets,
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet writer
// ---------------------------------------------------------------------------

/// Persists a [`Report`]; one call per logical report.
pub trait SheetWriter {
    /// Returns the paths written.
    fn write_report(&mut self, report: &Report) -> Result<Vec<PathBuf>>;
}

/// Writes each sheet as `<dir>/<report>_<sheet>.csv`.
pub struct CsvSheetWriter {
    dir: PathBuf,
}

impl CsvSheetWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_path(&self, report: &str, sheet: &str) -> PathBuf {
        self.dir.join(format!("{report}_{sheet}.csv"))
    }
}

impl SheetWriter for CsvSheetWriter {
    fn write_report(&mut self, report: &Report) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let mut written = Vec::with_capacity(report.sheets.len());
        for sheet in &report.sheets {
            let path = self.sheet_path(&report.name, &sheet.name);
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            writer
                .write_record(&sheet.columns)
                .context("writing CSV header")?;
            for (row_no, row) in sheet.rows.iter().enumerate() {
                writer
                    .write_record(row.iter().map(|c| c.to_string()))
                    .with_context(|| format!("writing CSV row {row_no}"))?;
            }
            writer.flush().context("flushing CSV")?;
            info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Plot renderer
// ---------------------------------------------------------------------------

/// Everything a renderer needs to draw the all-spectrum plot.
#[derive(Debug, Clone, Serialize)]
pub struct PlotRequest {
    pub title: String,
    /// `(wavelength, max intensity)` ascending.
    pub series: Vec<(f64, f64)>,
    /// Annotated peaks, exclusion radius already applied.
    pub marked_peaks: Vec<PeakRecord>,
    pub exclusion_radius: f64,
    pub suggested_path: PathBuf,
}

impl PlotRequest {
    /// `None` when the report has no peaks to title the plot with.
    pub fn from_report(report: &WavebandReport, output_dir: &Path, name: &str) -> Option<Self> {
        let highest = report.highest_peak()?;
        Some(Self {
            title: format!(
                "ALL_Spectrum & Higher Peaks\nMax_peak: {:.1}nm",
                highest.wavelength
            ),
            series: report.spectrum.clone(),
            marked_peaks: report.marked.clone(),
            exclusion_radius: report.exclusion_radius,
            suggested_path: output_dir.join(format!("{name}_allspectrum_highestPeaks.png")),
        })
    }
}

pub trait PlotRenderer {
    /// Path actually written, or `None` on failure.
    fn render(&mut self, request: &PlotRequest) -> Option<PathBuf>;
}

/// Hands the plot off as JSON next to the suggested image path, for an
/// external plotting tool to pick up.
#[derive(Debug, Default)]
pub struct JsonPlotWriter;

impl PlotRenderer for JsonPlotWriter {
    fn render(&mut self, request: &PlotRequest) -> Option<PathBuf> {
        let path = request.suggested_path.with_extension("json");
        let written = serde_json::to_string_pretty(request)
            .context("serializing plot request")
            .and_then(|text| {
                fs::write(&path, text).with_context(|| format!("writing {}", path.display()))
            });
        match written {
            Ok(()) => {
                info!("Wrote plot data {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Plot hand-off failed: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DifferenceRecord;
    use crate::data::model::Observation;

    #[test]
    fn empty_threshold_gets_message_sheet() {
        let results = vec![
            ThresholdResult {
                threshold: 250.0,
                records: vec![DifferenceRecord {
                    wavelength: 486.0,
                    min: 100.0,
                    max: 400.0,
                    farthest: Observation::new("r_S0009.txt", 400.0),
                    difference: 300.0,
                }],
            },
            ThresholdResult {
                threshold: 550.0,
                records: vec![],
            },
        ];
        let report = difference_report("specific", &results, true);
        assert_eq!(report.sheets.len(), 2);
        assert_eq!(report.sheets[0].name, "threshold_250");
        assert_eq!(report.sheets[0].rows[0][4], Cell::Integer(9));
        assert_eq!(report.sheets[1].columns, vec!["Message"]);
    }

    #[test]
    fn csv_writer_writes_one_file_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = Sheet::new("s1", &["a", "b"]);
        sheet.push_row(vec![Cell::Number(1.5), Cell::Empty]);
        let report = Report {
            name: "demo".into(),
            sheets: vec![sheet, Sheet::no_data("s2")],
        };

        let written = CsvSheetWriter::new(dir.path()).write_report(&report).unwrap();
        assert_eq!(written.len(), 2);
        let text = fs::read_to_string(dir.path().join("demo_s1.csv")).unwrap();
        assert_eq!(text, "a,b\n1.5,\n");
    }

    #[test]
    fn plot_request_needs_a_peak() {
        let report = WavebandReport {
            specific: vec![],
            all: vec![],
            peaks: vec![],
            marked: vec![],
            spectrum: vec![],
            exclusion_radius: 10.0,
        };
        assert!(PlotRequest::from_report(&report, Path::new("."), "x").is_none());
    }
}
