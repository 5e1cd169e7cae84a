//! Session controller: loads samples, runs the analysis calls and keeps the
//! session record consistent.

use crate::analysis::derive;
use crate::client::AnalysisClient;
use crate::error::DemoError;
use crate::models::{DerivedVisualization, Symbol};
use crate::sample::{SampleCatalog, SampleDataProvider};
use crate::session::state::{Completion, RunResults};
use crate::session::{ErrorInfo, SessionState, SessionStatus};
use futures::future::join;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Knobs the controller needs beyond the client.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub analysis_type: String,
}

/// Result of a `run_analysis` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Ready,
    Failed(ErrorInfo),
    /// A run was already in flight; nothing was issued.
    AlreadyRunning,
    /// The session was reset or rerun before this run settled.
    Superseded,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub symbols: Vec<Symbol>,
    pub sample_points: usize,
}

pub struct SessionController {
    client: AnalysisClient,
    catalog: SampleCatalog,
    analysis_type: String,
    state: Mutex<SessionState>,
}

impl SessionController {
    /// Load the sample catalog and open a session.
    ///
    /// A provider failure yields a session in `failed` with an empty catalog;
    /// no retry is attempted.
    pub async fn start(
        provider: &dyn SampleDataProvider,
        client: AnalysisClient,
        settings: SessionSettings,
    ) -> Self {
        let mut state = SessionState::default();

        info!("Loading sample data from {}", provider.describe());
        let catalog = match provider.fetch_all().await {
            Ok(catalog) => {
                state.active_symbol = catalog.symbols().into_iter().next();
                catalog
            }
            Err(e) => {
                error!("Sample data load failed: {}", e);
                state.fail_init(&e);
                SampleCatalog::default()
            }
        };

        Self {
            client,
            catalog,
            analysis_type: settings.analysis_type,
            state: Mutex::new(state),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await.clone();
        SessionSnapshot {
            state,
            symbols: self.catalog.symbols(),
            sample_points: self.catalog.series_len(),
        }
    }

    /// Make `input` the active symbol. It must be in the loaded catalog.
    pub async fn select_symbol(&self, input: &str) -> Result<Symbol, DemoError> {
        let symbol = Symbol::parse(input)?;
        if !self.catalog.contains(&symbol) {
            return Err(DemoError::UnknownSymbol(symbol));
        }

        self.state.lock().await.select(symbol.clone());
        Ok(symbol)
    }

    /// Run flow and entanglement analysis for the active symbol.
    ///
    /// Both calls are issued together and joined. The lock is never held
    /// across the network round trip.
    pub async fn run_analysis(&self) -> Result<RunOutcome, DemoError> {
        let (ticket, series) = {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Loading {
                debug!("Run already in flight (epoch {})", state.epoch);
                return Ok(RunOutcome::AlreadyRunning);
            }

            let symbol = state
                .active_symbol
                .clone()
                .ok_or(DemoError::NoActiveSymbol)?;
            let series = self
                .catalog
                .get(&symbol)
                .cloned()
                .ok_or_else(|| DemoError::UnknownSymbol(symbol.clone()))?;

            let Some(ticket) = state.begin_run(symbol) else {
                return Ok(RunOutcome::AlreadyRunning);
            };
            (ticket, series)
        };

        info!(
            "Run {} started for {} ({} points, {} symbols)",
            ticket.epoch,
            ticket.symbol,
            series.len(),
            self.catalog.len()
        );

        let symbols = self.catalog.symbols();
        let (flow, entanglement) = join(
            self.client
                .analyze_flow(&series.symbol, &series.prices, &series.volumes),
            self.client
                .analyze_entanglement(&symbols, &self.analysis_type),
        )
        .await;

        let outcome = match (flow, entanglement) {
            (Ok(flow), Ok(entanglement)) => Ok(RunResults {
                flow,
                entanglement,
                visualization: derive(&series),
            }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(ErrorInfo::from(&e)),
            (Err(flow_err), Err(entanglement_err)) => {
                Err(ErrorInfo::from(&flow_err).with_secondary(&entanglement_err))
            }
        };

        let mut state = self.state.lock().await;
        match state.complete_run(&ticket, outcome.clone()) {
            Completion::Stale => {
                info!("Run {} superseded; results dropped", ticket.epoch);
                Ok(RunOutcome::Superseded)
            }
            Completion::Applied => match outcome {
                Ok(_) => {
                    info!("Run {} ready for {}", ticket.epoch, ticket.symbol);
                    Ok(RunOutcome::Ready)
                }
                Err(info) => {
                    warn!("Run {} failed: {}", ticket.epoch, info.message);
                    Ok(RunOutcome::Failed(info))
                }
            },
        }
    }

    /// Clear results and errors. The sample catalog stays loaded.
    #[allow(dead_code)] // The one-shot CLI never resets
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.reset();
        info!("Session reset (epoch {})", state.epoch);
    }

    /// Derive the active symbol's visualization without storing it.
    pub async fn preview(&self) -> Option<DerivedVisualization> {
        let state = self.state.lock().await;
        let symbol = state.active_symbol.as_ref()?;
        self.catalog.get(symbol).map(derive)
    }
}
