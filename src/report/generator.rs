//! Markdown report generation.
//!
//! This module renders a session snapshot as a Markdown document, and as
//! JSON for machine consumers.

use crate::analysis::{MatrixSummary, SignalSummary, VisualizationStats};
use crate::models::{DerivedVisualization, EntanglementResult, FlowAnalysisResult};
use crate::report::{DemoReport, ReportMetadata, ReportOptions};
use crate::session::{ErrorInfo, SessionSnapshot};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DemoReport, options: &ReportOptions) -> String {
    let mut output = String::new();
    let state = &report.session.state;

    // Title
    output.push_str("# QOFA Demo Session Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_session_section(&report.session));

    if let Some(ref error) = state.last_error {
        output.push_str(&generate_error_section(error));
    }

    if let Some(ref flow) = state.flow {
        output.push_str(&generate_flow_section(flow, options.max_signals));
    }

    if let Some(ref entanglement) = state.entanglement {
        output.push_str(&generate_entanglement_section(
            entanglement,
            options.include_matrix,
        ));
    }

    if let Some(ref viz) = state.visualization {
        output.push_str(&generate_visualization_section(viz, options.include_series));
    }

    if !state.has_results() && state.last_error.is_none() {
        output.push_str("No analysis run has completed yet.\n\n");
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Service:** {}\n", metadata.service_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Sample Source:** {}\n", metadata.sample_source));
    section.push_str(&format!("- **Analysis Type:** `{}`\n", metadata.analysis_type));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_session_section(snapshot: &SessionSnapshot) -> String {
    let state = &snapshot.state;
    let mut section = String::new();

    section.push_str("## Session\n\n");
    section.push_str(&format!(
        "- **Status:** {} {}\n",
        state.status.emoji(),
        state.status
    ));
    if let Some(ref symbol) = state.active_symbol {
        section.push_str(&format!("- **Active Symbol:** {}\n", symbol));
    }
    if let Some(ref symbol) = state.analyzed_symbol {
        if state.active_symbol.as_ref() != Some(symbol) {
            section.push_str(&format!("- **Results For:** {}\n", symbol));
        }
    }

    let symbols: Vec<&str> = snapshot.symbols.iter().map(|s| s.as_str()).collect();
    section.push_str(&format!(
        "- **Symbols:** {} ({} points each)\n",
        symbols.join(", "),
        snapshot.sample_points
    ));
    section.push_str(&format!("- **Run:** #{}\n", state.epoch));
    if let Some(completed_at) = state.completed_at {
        section.push_str(&format!(
            "- **Last Success:** {}\n",
            completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    section.push('\n');

    section
}

fn generate_error_section(error: &ErrorInfo) -> String {
    let mut section = String::new();

    section.push_str("## Error\n\n");
    match error.call {
        Some(call) => section.push_str(&format!("**{}** during {}\n\n", error.kind, call)),
        None => section.push_str(&format!("**{}**\n\n", error.kind)),
    }
    section.push_str(&format!("> {}\n\n", error.message));

    section
}

/// Generate the flow analysis section.
fn generate_flow_section(flow: &FlowAnalysisResult, max_signals: usize) -> String {
    let metrics = &flow.quantum_metrics;
    let mut section = String::new();

    section.push_str("## Flow Analysis\n\n");
    section.push_str("| Correlation | Coherence Time | Threshold | Signals |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.3} | {:.0}s | {:.2} | {} |\n\n",
        metrics.quantum_correlation,
        metrics.coherence_time,
        metrics.entanglement_threshold,
        metrics.signal_count
    ));

    if let Some(confidence) = flow.confidence {
        section.push_str(&format!(
            "**Mean Confidence:** {:.1}%\n\n",
            confidence * 100.0
        ));
    }

    if flow.signals.is_empty() {
        section.push_str("No signals detected.\n\n");
        return section;
    }

    let summary = SignalSummary::from_signals(&flow.signals);
    section.push_str(&format!(
        "*{} signals: {} buy, {} sell, average confidence {:.1}%*\n\n",
        summary.total,
        summary.buy,
        summary.sell,
        summary.mean_confidence * 100.0
    ));

    section.push_str("### Signals\n\n");
    section.push_str("| Action | Symbol | Confidence | Flow Type |\n");
    section.push_str("|:---|:---:|:---:|:---|\n");
    for signal in flow.signals.iter().take(max_signals) {
        section.push_str(&format!(
            "| {} {} | {} | {:.1}% | {} |\n",
            signal.action.emoji(),
            signal.action,
            signal.symbol,
            signal.confidence * 100.0,
            signal.metadata.flow_type
        ));
    }
    if flow.signals.len() > max_signals {
        section.push_str(&format!(
            "\n*{} more not shown*\n",
            flow.signals.len() - max_signals
        ));
    }
    section.push('\n');

    let ranked = summary.flow_types_ranked();
    if ranked.len() > 1 {
        section.push_str("### Flow Types\n\n");
        section.push_str("| Flow Type | Count |\n");
        section.push_str("|:---|:---:|\n");
        for (flow_type, count) in ranked {
            section.push_str(&format!("| {} | {} |\n", flow_type, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the entanglement section.
fn generate_entanglement_section(result: &EntanglementResult, include_matrix: bool) -> String {
    let summary = MatrixSummary::from_result(result);
    let mut section = String::new();

    section.push_str("## Entanglement Analysis\n\n");
    section.push_str(&format!(
        "- **Entropy:** {:.4}\n",
        result.entanglement_entropy
    ));
    section.push_str(&format!("- **Symbols:** {}\n", summary.size));
    section.push_str(&format!("- **Type:** {}\n", result.analysis_type));
    if let Some((ref a, ref b, value)) = summary.strongest_pair {
        section.push_str(&format!(
            "- **Strongest Pair:** {} / {} ({:.3})\n",
            a, b, value
        ));
    }
    section.push_str(&format!(
        "- **Mean Off-Diagonal:** {:.3}\n",
        summary.mean_off_diagonal
    ));
    if !summary.symmetric {
        section.push_str("- ⚠️ Matrix is not symmetric\n");
    }
    if !summary.zero_diagonal {
        section.push_str("- ⚠️ Matrix diagonal is not zero\n");
    }
    section.push('\n');

    if include_matrix && summary.size > 0 {
        section.push_str("### Matrix\n\n");

        let header: Vec<&str> = result.symbols.iter().map(|s| s.as_str()).collect();
        section.push_str(&format!("| | {} |\n", header.join(" | ")));
        section.push_str(&format!("|:---|{}\n", ":---:|".repeat(header.len())));

        for (symbol, row) in result.symbols.iter().zip(&result.entanglement_matrix) {
            let cells: Vec<String> = row.iter().map(|v| format!("{:.3}", v)).collect();
            section.push_str(&format!("| **{}** | {} |\n", symbol, cells.join(" | ")));
        }
        section.push('\n');
    }

    section
}

/// Generate the derived visualization section.
fn generate_visualization_section(viz: &DerivedVisualization, include_series: bool) -> String {
    let mut section = String::new();

    section.push_str("## Derived Series\n\n");

    let Some(stats) = VisualizationStats::from_visualization(viz) else {
        section.push_str("Empty series.\n\n");
        return section;
    };

    section.push_str(&format!("- **Points:** {}\n", stats.points));
    section.push_str(&format!(
        "- **Magnitude Range:** {:.2} to {:.2}\n",
        stats.min_magnitude, stats.max_magnitude
    ));
    section.push_str(&format!(
        "- **Mean Return:** {:.4}% (max move {:.4}%)\n",
        stats.mean_return * 100.0,
        stats.max_abs_return * 100.0
    ));
    section.push_str(&format!(
        "- **Mean Oscillator:** {:.4}\n\n",
        stats.mean_entanglement
    ));

    if include_series {
        section.push_str("<details>\n<summary>Full Series</summary>\n\n");
        section.push_str("| # | Price | Volume | Magnitude | Return | Oscillator |\n");
        section.push_str("|---:|---:|---:|---:|---:|---:|\n");
        for ((state, ret), osc) in viz
            .states
            .iter()
            .zip(&viz.correlations)
            .zip(&viz.entanglement)
        {
            section.push_str(&format!(
                "| {} | {:.2} | {:.0} | {:.2} | {:.5} | {:.5} |\n",
                state.x, state.y, state.z, state.magnitude, ret, osc
            ));
        }
        section.push_str("\n</details>\n\n");
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by qofa-demo v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DemoReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::derive;
    use crate::error::{CallKind, DemoError};
    use crate::models::Symbol;
    use crate::session::{SessionState, SessionStatus};
    use crate::testing;
    use chrono::Utc;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            service_url: "http://localhost:8001/api".to_string(),
            generated_at: Utc::now(),
            sample_source: "synthetic (100 points)".to_string(),
            analysis_type: "entanglement".to_string(),
            duration_seconds: 1.5,
        }
    }

    fn ready_report() -> DemoReport {
        let catalog = testing::sample_catalog();
        let aapl = Symbol::parse("AAPL").unwrap();
        let entanglement = EntanglementResult {
            symbols: testing::catalog_symbols(),
            entanglement_entropy: 1.35,
            analysis_type: "entanglement".to_string(),
            entanglement_matrix: vec![
                vec![0.0, 0.5, 0.6],
                vec![0.5, 0.0, 0.2],
                vec![0.6, 0.2, 0.0],
            ],
            timestamp: None,
        };

        let state = SessionState {
            active_symbol: Some(aapl.clone()),
            status: SessionStatus::Ready,
            flow: Some(serde_json::from_str(testing::flow_response()).unwrap()),
            entanglement: Some(entanglement),
            visualization: Some(derive(catalog.get(&aapl).unwrap())),
            analyzed_symbol: Some(aapl),
            completed_at: Some(Utc::now()),
            epoch: 1,
            ..SessionState::default()
        };

        DemoReport {
            metadata: metadata(),
            session: SessionSnapshot {
                state,
                symbols: catalog.symbols(),
                sample_points: catalog.series_len(),
            },
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&ready_report(), &ReportOptions::default());

        assert!(markdown.contains("# QOFA Demo Session Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("✅ ready"));
        assert!(markdown.contains("## Flow Analysis"));
        assert!(markdown.contains("call_sweep"));
        assert!(markdown.contains("## Entanglement Analysis"));
        assert!(markdown.contains("### Matrix"));
        assert!(markdown.contains("AAPL / SPY"));
        assert!(markdown.contains("## Derived Series"));
        assert!(!markdown.contains("Full Series"));
        assert!(!markdown.contains("## Error"));
    }

    #[test]
    fn test_signal_limit_and_series_toggle() {
        let options = ReportOptions {
            max_signals: 1,
            include_series: true,
            include_matrix: false,
        };
        let markdown = generate_markdown_report(&ready_report(), &options);

        assert!(markdown.contains("*1 more not shown*"));
        assert!(markdown.contains("Full Series"));
        assert!(!markdown.contains("### Matrix"));
    }

    #[test]
    fn test_failed_session_shows_error() {
        let mut report = ready_report();
        let err = DemoError::unavailable(CallKind::EntanglementAnalysis, "timeout: no response");
        report.session.state.status = SessionStatus::Failed;
        report.session.state.last_error = Some(ErrorInfo::from(&err));

        let markdown = generate_markdown_report(&report, &ReportOptions::default());
        assert!(markdown.contains("## Error"));
        assert!(markdown.contains("**Analysis Unavailable** during entanglement analysis"));
        // previous results are still rendered
        assert!(markdown.contains("## Flow Analysis"));
    }

    #[test]
    fn test_idle_session_has_placeholder() {
        let mut report = ready_report();
        report.session.state = SessionState::default();

        let markdown = generate_markdown_report(&report, &ReportOptions::default());
        assert!(markdown.contains("No analysis run has completed yet."));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&ready_report()).unwrap();

        assert!(json.contains("\"service_url\""));
        assert!(json.contains("\"status\": \"ready\""));
        assert!(json.contains("\"quantum_metrics\""));
        assert!(json.contains("\"entanglement_matrix\""));
        assert!(json.contains("\"sample_points\": 4"));
    }
}
