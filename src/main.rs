mod cli;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use cli::{Args, Command};
use oes_analyzer::batch::BatchOrchestrator;
use oes_analyzer::config::AnalyzerConfig;
use oes_analyzer::report::{
    comparison_report, difference_report, extraction_report, peaks_sheet, CsvSheetWriter,
    JsonPlotWriter, PlotRenderer, PlotRequest, Report, SheetWriter,
};
use oes_analyzer::state::AnalysisSession;

const RESULTS_DIR: &str = "oes_results";

/// Results go into `<out>/oes_results` unless `out` already is that folder.
fn prepare_output_directory(out: &Path) -> Result<PathBuf> {
    let dir = if out.file_name().is_some_and(|n| n == RESULTS_DIR) {
        out.to_path_buf()
    } else {
        out.join(RESULTS_DIR)
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

fn write_reports(out: &Path, reports: &[Report]) -> Result<()> {
    let mut writer = CsvSheetWriter::new(prepare_output_directory(out)?);
    for report in reports {
        let paths = writer.write_report(report)?;
        println!("Saved {} sheet(s) for {}", paths.len(), report.name);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing results")?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AnalyzerConfig::load_or_default(&args.config);

    match args.command {
        Command::Scan { folder } => {
            let mut session = AnalysisSession::new(config);
            let range = session.scan_folder(&folder)?.clone();
            if args.json {
                print_json(&serde_json::json!({
                    "base_name": range.base_name,
                    "start": range.start,
                    "end": range.end,
                }))?;
            } else {
                println!(
                    "{}: base name {}, indices {}..={} ({} files)",
                    folder.display(),
                    range.base_name,
                    range.start,
                    range.end,
                    range.end - range.start + 1
                );
            }
        }

        Command::Stability {
            folder,
            wavelength,
            threshold,
            sections,
            margin,
            out,
        } => {
            let stability = &mut config.stability;
            if let Some(w) = wavelength {
                stability.detect_wavelength = w;
            }
            if let Some(t) = threshold {
                stability.threshold = t;
            }
            if let Some(s) = sections {
                stability.sections = s as usize;
            }
            if let Some(m) = margin {
                stability.margin = m;
            }

            let mut session = AnalysisSession::new(config);
            let result = session
                .run_stability(&folder)
                .with_context(|| format!("analysing {}", folder.display()))?;

            if args.json {
                print_json(result)?;
            } else {
                println!(
                    "Activation window: {}..{} (analysed scans {}..={})",
                    result.window.start_index,
                    result.window.end_index,
                    result.analyzed_range.0,
                    result.analyzed_range.1
                );
                println!("{:<12} {:>14} {:>14} {:>14}", "Section", "Mean", "Std", "Stability (%)");
                for s in &result.sections {
                    println!(
                        "{:<12} {:>14.3} {:>14.3} {:>14.3}",
                        s.label.to_string(),
                        s.mean,
                        s.std,
                        s.stability_pct
                    );
                }
            }

            if let Some(out) = out {
                write_reports(&out, &[session.stability_report()?])?;
            }
        }

        Command::Wavebands {
            folder,
            wavebands,
            thresholds,
            skip_range,
            floor,
            out,
        } => {
            let wb = &mut config.wavebands;
            if let Some(list) = wavebands {
                wb.wavebands = list;
            }
            if let Some(list) = thresholds {
                wb.thresholds = list;
            }
            if let Some(r) = skip_range {
                wb.skip_range_nm = r;
            }
            if floor.is_some() {
                wb.intensity_floor = floor;
            }

            let mut session = AnalysisSession::new(config);
            let base_name = session.scan_folder(&folder)?.base_name.clone();
            let report = session.run_wavebands(&folder)?;

            if args.json {
                print_json(report)?;
            } else {
                println!("{:<8} {:>12} {:>14} {:>8}", "Rank", "Wavelength", "Intensity", "Scan");
                for (i, p) in report.marked.iter().enumerate() {
                    println!(
                        "{:<8} {:>12.2} {:>14.1} {:>8}",
                        i + 1,
                        p.wavelength,
                        p.intensity,
                        p.scan_index.map(|s| s.to_string()).unwrap_or_default()
                    );
                }
            }

            let specific = difference_report(&format!("{base_name}_specific_wavebands"), &report.specific, true);
            let mut all = difference_report(&format!("{base_name}_all_wavebands"), &report.all, false);
            all.sheets.push(peaks_sheet(&report.peaks, &report.marked));
            write_reports(&out, &[specific, all])?;

            let dir = prepare_output_directory(&out)?;
            match PlotRequest::from_report(report, &dir, &base_name) {
                Some(request) => match JsonPlotWriter.render(&request) {
                    Some(path) => println!("Plot data: {}", path.display()),
                    None => println!("Plot data could not be written"),
                },
                None => info!("No peaks found; skipping plot"),
            }
        }

        Command::Extract {
            folder,
            wavebands,
            out,
        } => {
            if let Some(list) = wavebands {
                config.wavebands.wavebands = list;
            }
            if config.wavebands.wavebands.is_empty() {
                bail!("no wavebands given");
            }
            let mut session = AnalysisSession::new(config);
            let base_name = session.scan_folder(&folder)?.base_name.clone();
            let extraction = session.extract(&folder)?;
            if args.json {
                print_json(&extraction)?;
            }
            write_reports(
                &out,
                &[extraction_report(&format!("{base_name}_waveband_data"), &extraction)],
            )?;
        }

        Command::Batch {
            folders,
            parallel,
            no_wavebands,
            out,
        } => {
            config.batch.parallel |= parallel;
            if no_wavebands {
                config.batch.include_wavebands = false;
            }

            let cancel = AtomicBool::new(false);
            let result = BatchOrchestrator::new(config).run(&folders, &cancel);
            let report = comparison_report("batch_comparison", &result);

            if args.json {
                print_json(&report)?;
            } else {
                for entry in &result.entries {
                    match &entry.outcome {
                        Ok(analysis) => {
                            let whole = analysis.sections.last();
                            println!(
                                "{:<6} {}  window {}  whole-window stability {}%",
                                entry.label,
                                entry.folder.display(),
                                entry
                                    .window
                                    .map(|w| format!("{}..{}", w.start_index, w.end_index))
                                    .unwrap_or_default(),
                                whole.map(|s| s.stability_pct.to_string()).unwrap_or_default()
                            );
                        }
                        Err(e) => println!("{:<6} {}  FAILED: {e}", entry.label, entry.folder.display()),
                    }
                }
            }

            if let Some(out) = out {
                write_reports(&out, &[report])?;
            }
        }

        Command::InitConfig { force } => {
            if args.config.exists() && !force {
                bail!("{} already exists (use --force to replace it)", args.config.display());
            }
            let text = AnalyzerConfig::default()
                .to_toml_string()
                .context("serializing default config")?;
            std::fs::write(&args.config, text)
                .with_context(|| format!("writing {}", args.config.display()))?;
            println!("Wrote {}", args.config.display());
        }
    }

    Ok(())
}
