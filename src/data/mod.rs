/// Data layer: core types, scan-file loading, and filtering.
///
/// Architecture:
/// ```text
///  <name>_S0001.txt, <name>_S0002.txt, ...
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<ScanRecord>
///   └──────────┘
///        │
///        ├────────────────────────────┐
///        ▼                            ▼
///   ┌────────────────┐        ┌───────────────────┐
///   │ TimeSeriesStore │        │ BatchObservations  │  wavelength → [(file, intensity)]
///   └────────────────┘        └───────────────────┘
///                                     │
///                                     ▼
///                              ┌──────────┐
///                              │  filter   │  zero low-intensity observations
///                              └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
