use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "oes-analyzer.toml", global = true)]
    pub config: PathBuf,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the base name and index range of a scan folder
    Scan {
        folder: PathBuf,
    },

    /// Detect the activation window and report section stability
    Stability {
        folder: PathBuf,

        /// Detection wavelength in nm (overrides config)
        #[arg(long)]
        wavelength: Option<f64>,

        /// Edge threshold in a.u. (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of sections, 2..=10 (overrides config)
        #[arg(long, value_parser = clap::value_parser!(u8).range(2..=10))]
        sections: Option<u8>,

        /// Scans trimmed from each end of the window (overrides config)
        #[arg(long)]
        margin: Option<u32>,

        /// Directory for the result sheets
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Peaks and significant differences across all scans of a folder
    Wavebands {
        folder: PathBuf,

        /// Comma-separated wavebands in nm, e.g. 486,612,656,777
        #[arg(long, value_delimiter = ',')]
        wavebands: Option<Vec<f64>>,

        /// Comma-separated difference thresholds
        #[arg(long, value_delimiter = ',')]
        thresholds: Option<Vec<f64>>,

        /// Minimum spacing in nm between marked peaks
        #[arg(long)]
        skip_range: Option<f64>,

        /// Zero observations below this intensity
        #[arg(long)]
        floor: Option<f64>,

        /// Directory for the reports and plot data
        #[arg(long)]
        out: PathBuf,
    },

    /// Per-scan intensities of selected wavebands
    Extract {
        folder: PathBuf,

        /// Comma-separated wavebands in nm
        #[arg(long, value_delimiter = ',')]
        wavebands: Option<Vec<f64>>,

        #[arg(long)]
        out: PathBuf,
    },

    /// Stability (and waveband) analysis over several experiment folders
    Batch {
        /// Folders in experiment order (Exp.1, Exp.2, ...)
        #[arg(required = true, num_args = 1..)]
        folders: Vec<PathBuf>,

        /// Analyse folders in parallel
        #[arg(long)]
        parallel: bool,

        /// Skip the waveband analysis of each folder
        #[arg(long)]
        no_wavebands: bool,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write the default configuration to the --config path
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}
