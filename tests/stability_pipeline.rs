mod common;

use std::fs;

use common::{test_config, write_run, write_scan, DETECT};
use oes_analyzer::analysis::ActivationWindow;
use oes_analyzer::data::loader::{discover_scan_range, generate_scan_file_names};
use oes_analyzer::data::model::TimeSeriesStore;
use oes_analyzer::error::AnalysisError;
use oes_analyzer::pipeline::StabilityPipeline;
use oes_analyzer::state::AnalysisSession;

#[test]
fn detects_window_and_sections_narrowed_range() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run");
    let config = test_config();

    let range = discover_scan_range(dir.path()).unwrap();
    assert_eq!((range.base_name.as_str(), range.start, range.end), ("run", 1, 40));

    let mut pipeline = StabilityPipeline::new(config.stability.clone(), &config.ingest);
    let report = pipeline.run(dir.path(), &range).unwrap();

    assert_eq!(
        report.window,
        ActivationWindow {
            start_index: 11,
            end_index: 31
        }
    );
    // 13..=29 -> 17 samples -> 5, 5, 7
    assert_eq!(report.analyzed_range, (13, 29));
    let sizes: Vec<usize> = report.sections.iter().map(|s| s.len).collect();
    assert_eq!(sizes, vec![5, 5, 7, 17]);
    for s in &report.sections {
        assert!((s.mean - 5000.0).abs() < 1e-9);
        assert_eq!(s.stability_pct, 0.0);
    }
    assert_eq!(report.sections.last().unwrap().label.to_string(), "Whole");
}

#[test]
fn missing_detection_wavelength_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run");
    let mut config = test_config();
    config.stability.detect_wavelength = 700.0;

    let mut session = AnalysisSession::new(config);
    let err = session.run_stability(dir.path()).unwrap_err();
    assert!(matches!(err, AnalysisError::WavelengthNotFound(w) if w == 700.0));
}

#[test]
fn threshold_too_high_finds_no_activation() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run");
    let mut config = test_config();
    config.stability.threshold = 10_000.0;

    let mut session = AnalysisSession::new(config);
    let err = session.run_stability(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::ActivationNotDetected {
            activation: None,
            deactivation: None
        }
    ));
}

#[test]
fn margin_wider_than_window_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run");
    let mut config = test_config();
    config.stability.margin = 15;

    let mut session = AnalysisSession::new(config);
    let err = session.run_stability(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::WindowTooNarrow {
            activation: 11,
            deactivation: 31,
            margin: 15
        }
    ));
}

#[test]
fn load_skips_missing_and_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run");
    fs::remove_file(dir.path().join("run_S0005.txt")).unwrap();
    // a directory where a scan file should be cannot be read as text
    fs::remove_file(dir.path().join("run_S0006.txt")).unwrap();
    fs::create_dir(dir.path().join("run_S0006.txt")).unwrap();

    let mut store = TimeSeriesStore::new();
    let loaded = store.load(&generate_scan_file_names("run", 1, 40), dir.path());
    assert_eq!(loaded, 38);
    assert_eq!(store.series(DETECT).unwrap().len(), 38);
}

#[test]
fn load_replaces_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    write_scan(dir.path(), "a", 1, &[(400.0, 1.0)]);
    write_scan(dir.path(), "b", 1, &[(500.0, 2.0)]);

    let mut store = TimeSeriesStore::new();
    store.load(&["a_S0001.txt"], dir.path());
    store.load(&["b_S0001.txt"], dir.path());
    assert!(!store.contains(400.0));
    assert_eq!(store.series(500.0).unwrap(), &[2.0]);
}

#[test]
fn wavelength_absent_from_some_files_gets_a_shorter_series() {
    let dir = tempfile::tempdir().unwrap();
    write_scan(dir.path(), "r", 1, &[(400.0, 1.0), (500.0, 10.0)]);
    write_scan(dir.path(), "r", 2, &[(400.0, 2.0)]);
    write_scan(dir.path(), "r", 3, &[(400.0, 3.0), (500.0, 30.0)]);

    let mut store = TimeSeriesStore::new();
    store.load(&generate_scan_file_names("r", 1, 3), dir.path());
    assert_eq!(store.series(400.0).unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(store.series(500.0).unwrap(), &[10.0, 30.0]);
}

#[test]
fn saved_report_has_one_row_per_section() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run");

    let mut session = AnalysisSession::new(test_config());
    session.run_stability(dir.path()).unwrap();
    let report = session.stability_report().unwrap();
    assert_eq!(report.name, "run");
    assert_eq!(report.sheets[0].name, "Threshold_1000");
    assert_eq!(report.sheets[0].rows.len(), 4);
}
