//! Session reports.
//!
//! A [`DemoReport`] wraps a session snapshot with run metadata and is
//! rendered as Markdown or JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};

use crate::session::SessionSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the session run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub service_url: String,
    pub generated_at: DateTime<Utc>,
    pub sample_source: String,
    pub analysis_type: String,
    pub duration_seconds: f64,
}

/// Complete report of one demonstration session.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub metadata: ReportMetadata,
    pub session: SessionSnapshot,
}

/// Rendering switches for the Markdown report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub max_signals: usize,
    pub include_series: bool,
    pub include_matrix: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_signals: 3,
            include_series: false,
            include_matrix: true,
        }
    }
}
