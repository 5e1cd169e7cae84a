//! Data models for the demo session.
//!
//! This module contains the instrument symbol, the sample series, the
//! results returned by the analysis service and the locally derived
//! visualization series.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

const MAX_SYMBOL_LEN: usize = 15;

/// Reasons a ticker string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol must not be empty")]
    Empty,
    #[error("symbol is {len} characters long (max {max})")]
    TooLong { len: usize, max: usize },
    #[error("symbol must start with a letter, found '{ch}'")]
    InvalidStart { ch: char },
    #[error("invalid character '{ch}' at position {index} in symbol")]
    InvalidChar { ch: char, index: usize },
}

/// Normalized instrument ticker (uppercase).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, SymbolError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(SymbolError::Empty);
        }

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some(first) = normalized.chars().next() {
            if !first.is_ascii_alphabetic() {
                return Err(SymbolError::InvalidStart { ch: first });
            }
        }

        for (index, ch) in normalized.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '-') {
                return Err(SymbolError::InvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// One instrument's price/volume series as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// Sample payload keyed by ticker, as returned by the sample endpoint.
pub type SamplePayload = BTreeMap<String, RawSeries>;

/// Validated, index-aligned price/volume series for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    pub symbol: Symbol,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl SampleSeries {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Aggregate metrics attached to a flow analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumMetrics {
    pub quantum_correlation: f64,
    /// Seconds.
    pub coherence_time: f64,
    pub entanglement_threshold: f64,
    pub signal_count: u64,
}

/// Direction of a trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
        }
    }
}

impl SignalAction {
    /// Returns an emoji representation of the action.
    pub fn emoji(&self) -> &'static str {
        match self {
            SignalAction::Buy => "🟢",
            SignalAction::Sell => "🔴",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// call_sweep, put_sweep, institutional_block or dark_pool.
    pub flow_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
}

/// A trading signal emitted by the flow analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: Symbol,
    pub action: SignalAction,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub metadata: SignalMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum_correlation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Result of a single-instrument flow analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowAnalysisResult {
    pub quantum_metrics: QuantumMetrics,
    pub signals: Vec<Signal>,
    /// Mean confidence over all detected flows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Result of a multi-instrument entanglement analysis call.
///
/// `entanglement_matrix` is always `symbols.len()` square once it has been
/// accepted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntanglementResult {
    pub symbols: Vec<Symbol>,
    pub entanglement_entropy: f64,
    pub analysis_type: String,
    pub entanglement_matrix: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl EntanglementResult {
    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    /// Check symmetry within `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let m = &self.entanglement_matrix;
        (0..m.len()).all(|i| (0..i).all(|j| (m[i][j] - m[j][i]).abs() <= tolerance))
    }

    pub fn diagonal(&self) -> Vec<f64> {
        self.entanglement_matrix
            .iter()
            .enumerate()
            .map(|(i, row)| row[i])
            .collect()
    }
}

/// One point of the price/volume state plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatePoint {
    pub x: usize,
    pub y: f64,
    pub z: f64,
    pub magnitude: f64,
}

/// Plot-ready series derived locally from a [`SampleSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedVisualization {
    pub states: Vec<StatePoint>,
    pub correlations: Vec<f64>,
    pub entanglement: Vec<f64>,
}

/// Analyzer parameters reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub planck_constant: f64,
    pub decoherence_time: f64,
    pub entanglement_threshold: f64,
    pub n_basis_states: u32,
    pub coherence_decay_rate: f64,
    pub system_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Banner returned by the service root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
}
