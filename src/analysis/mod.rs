//! Local analysis helpers.
//!
//! `visualization` derives the plot series from a sample series;
//! `aggregator` summarizes signals and matrices for the report.

pub mod aggregator;
pub mod visualization;

pub use aggregator::{MatrixSummary, SignalSummary};
pub use visualization::{derive, VisualizationStats};
