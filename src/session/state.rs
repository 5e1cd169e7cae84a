//! Session state record and its transitions.
//!
//! All mutation goes through the methods below. The controller holds the
//! record behind a lock and only calls them at transition points, so the
//! single-run and epoch rules are enforced in one place.

use crate::error::{CallKind, DemoError, ErrorKind};
use crate::models::{DerivedVisualization, EntanglementResult, FlowAnalysisResult, Symbol};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Ready => write!(f, "ready"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl SessionStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "⏸️",
            SessionStatus::Loading => "⏳",
            SessionStatus::Ready => "✅",
            SessionStatus::Failed => "❌",
        }
    }
}

/// User-facing record of the last failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<CallKind>,
    pub message: String,
}

impl From<&DemoError> for ErrorInfo {
    fn from(err: &DemoError) -> Self {
        Self {
            kind: err.kind(),
            call: err.call(),
            message: err.to_string(),
        }
    }
}

impl ErrorInfo {
    /// Append a second failure from the same run.
    pub fn with_secondary(mut self, other: &DemoError) -> Self {
        self.message = format!("{}; {}", self.message, other);
        self
    }
}

/// Identity of a started run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    pub epoch: u64,
    /// Symbol active when the run started.
    pub symbol: Symbol,
}

/// Everything a successful run stores.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResults {
    pub flow: FlowAnalysisResult,
    pub entanglement: EntanglementResult,
    pub visualization: DerivedVisualization,
}

/// What happened to a finished run's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Reset or a newer run came first; nothing was stored.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub active_symbol: Option<Symbol>,
    pub status: SessionStatus,
    pub flow: Option<FlowAnalysisResult>,
    pub entanglement: Option<EntanglementResult>,
    pub visualization: Option<DerivedVisualization>,
    pub last_error: Option<ErrorInfo>,
    /// Symbol the stored results belong to.
    pub analyzed_symbol: Option<Symbol>,
    pub completed_at: Option<DateTime<Utc>>,
    pub epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_symbol: None,
            status: SessionStatus::Idle,
            flow: None,
            entanglement: None,
            visualization: None,
            last_error: None,
            analyzed_symbol: None,
            completed_at: None,
            epoch: 0,
        }
    }
}

impl SessionState {
    pub fn has_results(&self) -> bool {
        self.flow.is_some() || self.entanglement.is_some() || self.visualization.is_some()
    }

    /// Switch the active symbol and drop results of the previous one.
    ///
    /// Status and epoch are left alone; a run in flight still completes for
    /// the symbol it captured.
    pub fn select(&mut self, symbol: Symbol) {
        debug!("Active symbol -> {}", symbol);
        self.active_symbol = Some(symbol);
        self.clear_results();
    }

    /// Enter `loading` for `symbol`. Returns `None` while a run is in flight.
    pub fn begin_run(&mut self, symbol: Symbol) -> Option<RunTicket> {
        if self.status == SessionStatus::Loading {
            return None;
        }

        self.epoch += 1;
        self.status = SessionStatus::Loading;
        Some(RunTicket {
            epoch: self.epoch,
            symbol,
        })
    }

    /// Settle a run. Results from an older epoch are dropped.
    ///
    /// On failure the results of the previous successful run stay in place.
    pub fn complete_run(
        &mut self,
        ticket: &RunTicket,
        outcome: Result<RunResults, ErrorInfo>,
    ) -> Completion {
        if ticket.epoch != self.epoch || self.status != SessionStatus::Loading {
            debug!(
                "Dropping run {} (current epoch {}, status {})",
                ticket.epoch, self.epoch, self.status
            );
            return Completion::Stale;
        }

        match outcome {
            Ok(results) => {
                self.flow = Some(results.flow);
                self.entanglement = Some(results.entanglement);
                self.visualization = Some(results.visualization);
                self.analyzed_symbol = Some(ticket.symbol.clone());
                self.last_error = None;
                self.completed_at = Some(Utc::now());
                self.status = SessionStatus::Ready;
            }
            Err(info) => {
                self.last_error = Some(info);
                self.status = SessionStatus::Failed;
            }
        }

        Completion::Applied
    }

    /// Initialization failed; the session holds no data.
    pub fn fail_init(&mut self, err: &DemoError) {
        self.active_symbol = None;
        self.clear_results();
        self.last_error = Some(ErrorInfo::from(err));
        self.status = SessionStatus::Failed;
    }

    /// Back to `idle`, discarding results and any in-flight run.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.clear_results();
        self.last_error = None;
        self.completed_at = None;
        self.status = SessionStatus::Idle;
    }

    fn clear_results(&mut self) {
        self.flow = None;
        self.entanglement = None;
        self.visualization = None;
        self.analyzed_symbol = None;
    }
}
