/// Data layer: core types, loading, alignment and windowing.
///
/// Architecture:
/// ```text
///  glob pattern
///        │
///        ▼
///   ┌──────────┐
///   │ discover  │  pattern → sorted paths
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  .csv / .json / .parquet → SampleFrame
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ resample  │  collapse → AlignedSeries, pivot → AlignedTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window   │  elapsed minutes, clip to the plotted range
///   └──────────┘
/// ```
///
/// `aligner` glues the first three together per pattern.

pub mod aligner;
pub mod discover;
pub mod loader;
pub mod model;
pub mod resample;
pub mod window;
