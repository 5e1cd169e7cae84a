//! Signal and matrix aggregation.
//!
//! This module provides utilities for summarizing the signals of a flow
//! analysis and the entanglement matrix for the report.

use crate::models::{EntanglementResult, Signal, SignalAction, Symbol};
use std::collections::HashMap;

/// Tolerance used when checking matrix symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Counts and confidence figures over a signal list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSummary {
    pub total: usize,
    pub buy: usize,
    pub sell: usize,
    pub mean_confidence: f64,
    pub by_flow_type: HashMap<String, usize>,
}

impl SignalSummary {
    pub fn from_signals(signals: &[Signal]) -> Self {
        let mut summary = SignalSummary {
            total: signals.len(),
            ..Default::default()
        };

        for signal in signals {
            match signal.action {
                SignalAction::Buy => summary.buy += 1,
                SignalAction::Sell => summary.sell += 1,
            }
            *summary
                .by_flow_type
                .entry(signal.metadata.flow_type.clone())
                .or_default() += 1;
        }

        if !signals.is_empty() {
            summary.mean_confidence =
                signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64;
        }

        summary
    }

    /// Flow types ordered by count (highest first), then name.
    pub fn flow_types_ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<_> = self
            .by_flow_type
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Shape and extreme figures of an entanglement matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSummary {
    pub size: usize,
    pub symmetric: bool,
    pub zero_diagonal: bool,
    /// Off-diagonal pair with the largest value.
    pub strongest_pair: Option<(Symbol, Symbol, f64)>,
    pub mean_off_diagonal: f64,
}

impl MatrixSummary {
    pub fn from_result(result: &EntanglementResult) -> Self {
        let m = &result.entanglement_matrix;
        let mut strongest: Option<(usize, usize, f64)> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        // Upper triangle only; the lower one mirrors it when symmetric
        for i in 0..m.len() {
            for j in (i + 1)..m.len() {
                let value = m[i][j];
                sum += value;
                count += 1;
                if strongest.map_or(true, |(_, _, best)| value > best) {
                    strongest = Some((i, j, value));
                }
            }
        }

        Self {
            size: result.size(),
            symmetric: result.is_symmetric(SYMMETRY_TOLERANCE),
            zero_diagonal: result
                .diagonal()
                .iter()
                .all(|v| v.abs() <= SYMMETRY_TOLERANCE),
            strongest_pair: strongest.map(|(i, j, value)| {
                (result.symbols[i].clone(), result.symbols[j].clone(), value)
            }),
            mean_off_diagonal: if count == 0 { 0.0 } else { sum / count as f64 },
        }
    }
}
