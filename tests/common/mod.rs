#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use oes_analyzer::config::AnalyzerConfig;

pub const DETECT: f64 = 657.0;

/// Write `<base>_S<index:04>.txt` with a header line and the given records.
pub fn write_scan(dir: &Path, base: &str, index: u32, records: &[(f64, f64)]) {
    let mut text = String::from("Wavelength;Intensity\n");
    for (wl, intensity) in records {
        writeln!(text, "{wl};{intensity}").unwrap();
    }
    fs::write(dir.join(format!("{base}_S{index:04}.txt")), text).unwrap();
}

/// Scans 1..=40: the detection line is at 100 counts, jumps to 5000 for
/// scans 11..=30 and drops back. Activation 11, deactivation 31.
pub fn write_run(dir: &Path, base: &str) {
    for index in 1..=40u32 {
        let detect = if (11..=30).contains(&index) { 5000.0 } else { 100.0 };
        let other = 300.0 + index as f64;
        write_scan(dir, base, index, &[(486.0, other), (DETECT, detect)]);
    }
}

pub fn test_config() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.stability.detect_wavelength = DETECT;
    config.stability.threshold = 1000.0;
    config.stability.sections = 3;
    config.stability.margin = 2;
    config
}
