//! Error taxonomy for the demo session.
//!
//! Every failure carries its [`ErrorKind`] and, where it came from the
//! network, the [`CallKind`] that produced it, so the report can tell the
//! user which request broke and why.

use crate::models::{Symbol, SymbolError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Outbound call a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    SampleData,
    FlowAnalysis,
    EntanglementAnalysis,
    ServiceMetrics,
    ServiceInfo,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::SampleData => write!(f, "sample data"),
            CallKind::FlowAnalysis => write!(f, "flow analysis"),
            CallKind::EntanglementAnalysis => write!(f, "entanglement analysis"),
            CallKind::ServiceMetrics => write!(f, "service metrics"),
            CallKind::ServiceInfo => write!(f, "service info"),
        }
    }
}

/// Coarse error class shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataUnavailable,
    AnalysisUnavailable,
    InvalidResponse,
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DataUnavailable => write!(f, "Data Unavailable"),
            ErrorKind::AnalysisUnavailable => write!(f, "Analysis Unavailable"),
            ErrorKind::InvalidResponse => write!(f, "Invalid Response"),
            ErrorKind::InvalidInput => write!(f, "Invalid Input"),
        }
    }
}

/// Errors raised by the sample provider, the analysis client and the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DemoError {
    /// Sample source unreachable or returned malformed data.
    #[error("sample data unavailable: {reason}")]
    DataUnavailable { reason: String },

    /// Transport failure, timeout or non-success status on an analysis call.
    #[error("{call} unavailable: {reason}")]
    AnalysisUnavailable { call: CallKind, reason: String },

    /// The service answered but the payload breaks the expected schema.
    #[error("invalid {call} response: {reason}")]
    InvalidResponse { call: CallKind, reason: String },

    /// Request rejected locally before it reached the network.
    #[error("invalid {call} request: {reason}")]
    InvalidRequest { call: CallKind, reason: String },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(Symbol),

    #[error(transparent)]
    InvalidSymbol(#[from] SymbolError),

    #[error("no symbol selected (sample data not loaded)")]
    NoActiveSymbol,
}

impl DemoError {
    /// Build the "could not reach" error for a call.
    ///
    /// Sample-data failures are always [`DemoError::DataUnavailable`].
    pub fn unavailable(call: CallKind, reason: impl Into<String>) -> Self {
        match call {
            CallKind::SampleData => DemoError::DataUnavailable {
                reason: reason.into(),
            },
            _ => DemoError::AnalysisUnavailable {
                call,
                reason: reason.into(),
            },
        }
    }

    /// Build the "bad payload" error for a call.
    pub fn invalid(call: CallKind, reason: impl Into<String>) -> Self {
        match call {
            CallKind::SampleData => DemoError::DataUnavailable {
                reason: reason.into(),
            },
            _ => DemoError::InvalidResponse {
                call,
                reason: reason.into(),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DemoError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            DemoError::AnalysisUnavailable { .. } => ErrorKind::AnalysisUnavailable,
            DemoError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            DemoError::InvalidRequest { .. }
            | DemoError::UnknownSymbol(_)
            | DemoError::InvalidSymbol(_)
            | DemoError::NoActiveSymbol => ErrorKind::InvalidInput,
        }
    }

    pub fn call(&self) -> Option<CallKind> {
        match self {
            DemoError::DataUnavailable { .. } => Some(CallKind::SampleData),
            DemoError::AnalysisUnavailable { call, .. }
            | DemoError::InvalidResponse { call, .. }
            | DemoError::InvalidRequest { call, .. } => Some(*call),
            _ => None,
        }
    }
}
