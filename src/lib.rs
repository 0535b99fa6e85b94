//! Analysis engine for optical-emission-spectroscopy scan folders.
//!
//! ```text
//!  scan files ─► data::loader ─► TimeSeriesStore ─► analysis::activation
//!                     │                                     │
//!                     │                      narrowed re-read ─► analysis::sections
//!                     ▼
//!              BatchObservations ─► data::filter ─► analysis::{differences, peaks}
//! ```
//!
//! `pipeline` wires one folder end to end, `batch` runs many folders, and
//! `report` turns results into sheets for an external writer.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod state;

pub use error::{AnalysisError, Result};
