//! Analysis service client.
//!
//! Issues the flow, entanglement and sample-data requests and turns the
//! JSON payloads into typed results. Anything that does not match the
//! expected schema is rejected here, so the session only ever stores
//! well-formed results.

use crate::client::transport::{HttpRequest, Transport};
use crate::error::{CallKind, DemoError};
use crate::models::{
    EntanglementResult, FlowAnalysisResult, SamplePayload, ServiceInfo, ServiceMetrics, Symbol,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entropies this far below zero are rounding noise from the service.
const ENTROPY_TOLERANCE: f64 = 1e-9;

/// Characters of an error body kept in messages.
const MAX_ERROR_BODY: usize = 200;

/// Resolves service URLs from a base URL and an API prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_root: String,
}

impl Endpoints {
    pub fn new(base_url: &str, api_prefix: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let prefix = api_prefix.trim_matches('/');
        let api_root = if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, prefix)
        };

        Self { api_root }
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn service_info(&self) -> String {
        format!("{}/", self.api_root)
    }

    pub fn sample_data(&self) -> String {
        format!("{}/demo/generate-sample-data", self.api_root)
    }

    pub fn quantum_flow(&self) -> String {
        format!("{}/analyze/quantum-flow", self.api_root)
    }

    pub fn entanglement(&self) -> String {
        format!("{}/analyze/entanglement", self.api_root)
    }

    pub fn quantum_metrics(&self) -> String {
        format!("{}/quantum-metrics", self.api_root)
    }
}

/// Entanglement payload as sent by the service, before validation.
#[derive(Debug, Deserialize)]
struct EntanglementPayload {
    symbols: Vec<Symbol>,
    entanglement_entropy: f64,
    analysis_type: String,
    entanglement_matrix: Vec<Vec<MatrixCell>>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Matrix cells arrive either as plain numbers or as complex pairs.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum MatrixCell {
    Real(f64),
    Complex { real: f64, imag: f64 },
}

impl MatrixCell {
    /// Modulus for complex cells.
    fn value(self) -> f64 {
        match self {
            MatrixCell::Real(v) => v,
            MatrixCell::Complex { real, imag } => real.hypot(imag),
        }
    }
}

/// Client for the analysis service. Results are not cached here.
#[derive(Clone)]
pub struct AnalysisClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
}

impl AnalysisClient {
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Request a single-instrument flow analysis.
    ///
    /// `prices` and `volumes` must be index-aligned with at least two points.
    pub async fn analyze_flow(
        &self,
        symbol: &Symbol,
        prices: &[f64],
        volumes: &[f64],
    ) -> Result<FlowAnalysisResult, DemoError> {
        let call = CallKind::FlowAnalysis;

        if prices.len() != volumes.len() {
            return Err(DemoError::InvalidRequest {
                call,
                reason: format!(
                    "price/volume length mismatch ({} vs {})",
                    prices.len(),
                    volumes.len()
                ),
            });
        }
        if prices.len() < 2 {
            return Err(DemoError::InvalidRequest {
                call,
                reason: format!("at least 2 points required, got {}", prices.len()),
            });
        }

        debug!("Flow analysis for {} over {} points", symbol, prices.len());
        let request = HttpRequest::post_json(
            self.endpoints.quantum_flow(),
            json!({
                "symbol": symbol,
                "price_data": prices,
                "volume_data": volumes,
            }),
        );

        let body = self.execute(call, request).await?;
        let result: FlowAnalysisResult = decode(call, &body)?;
        validate_flow(&result)?;

        info!(
            "Flow analysis for {}: {} signals, correlation {:.3}",
            symbol,
            result.signals.len(),
            result.quantum_metrics.quantum_correlation
        );
        Ok(result)
    }

    /// Request a multi-instrument entanglement analysis.
    pub async fn analyze_entanglement(
        &self,
        symbols: &[Symbol],
        analysis_type: &str,
    ) -> Result<EntanglementResult, DemoError> {
        let call = CallKind::EntanglementAnalysis;

        if symbols.is_empty() {
            return Err(DemoError::InvalidRequest {
                call,
                reason: "at least one symbol required".to_string(),
            });
        }

        debug!(
            "Entanglement analysis ({}) across {} symbols",
            analysis_type,
            symbols.len()
        );
        let request = HttpRequest::post_json(
            self.endpoints.entanglement(),
            json!({
                "symbols": symbols,
                "analysis_type": analysis_type,
            }),
        );

        let body = self.execute(call, request).await?;
        let payload: EntanglementPayload = decode(call, &body)?;
        let result = accept_entanglement(payload, symbols)?;

        info!(
            "Entanglement analysis: entropy {:.3} over {} symbols",
            result.entanglement_entropy,
            result.size()
        );
        Ok(result)
    }

    /// Fetch the raw sample payload. Failures are `DataUnavailable`.
    pub async fn sample_data(&self) -> Result<SamplePayload, DemoError> {
        let call = CallKind::SampleData;
        let body = self
            .execute(call, HttpRequest::get(self.endpoints.sample_data()))
            .await?;
        decode(call, &body)
    }

    /// Fetch the analyzer parameters.
    pub async fn service_metrics(&self) -> Result<ServiceMetrics, DemoError> {
        let call = CallKind::ServiceMetrics;
        let body = self
            .execute(call, HttpRequest::get(self.endpoints.quantum_metrics()))
            .await?;
        decode(call, &body)
    }

    /// Fetch the service banner.
    pub async fn service_info(&self) -> Result<ServiceInfo, DemoError> {
        let call = CallKind::ServiceInfo;
        let body = self
            .execute(call, HttpRequest::get(self.endpoints.service_info()))
            .await?;
        decode(call, &body)
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, call: CallKind, request: HttpRequest) -> Result<String, DemoError> {
        let url = request.url.clone();

        let response = self.transport.send(request).await.map_err(|e| {
            warn!("{} request to {} failed: {}", call, url, e);
            let reason = if e.timed_out() {
                format!("timeout: {}", e.message())
            } else {
                e.message().to_string()
            };
            DemoError::unavailable(call, reason)
        })?;

        if !response.is_success() {
            let snippet: String = response.body.chars().take(MAX_ERROR_BODY).collect();
            warn!("{} request to {} returned HTTP {}", call, url, response.status);
            return Err(DemoError::unavailable(
                call,
                format!("service returned HTTP {}: {}", response.status, snippet),
            ));
        }

        Ok(response.body)
    }
}

fn decode<T: DeserializeOwned>(call: CallKind, body: &str) -> Result<T, DemoError> {
    serde_json::from_str(body).map_err(|e| {
        warn!("Malformed {} payload: {}", call, e);
        DemoError::invalid(call, e.to_string())
    })
}

fn ensure_finite(call: CallKind, field: &str, value: f64) -> Result<(), DemoError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DemoError::invalid(call, format!("{} is not finite", field)))
    }
}

fn ensure_probability(call: CallKind, field: &str, value: f64) -> Result<(), DemoError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DemoError::invalid(
            call,
            format!("{} {} outside [0, 1]", field, value),
        ))
    }
}

fn validate_flow(result: &FlowAnalysisResult) -> Result<(), DemoError> {
    let call = CallKind::FlowAnalysis;
    let metrics = &result.quantum_metrics;

    ensure_finite(call, "quantum_correlation", metrics.quantum_correlation)?;
    ensure_finite(call, "entanglement_threshold", metrics.entanglement_threshold)?;
    if !(metrics.coherence_time.is_finite() && metrics.coherence_time > 0.0) {
        return Err(DemoError::invalid(
            call,
            format!("coherence_time {} must be positive", metrics.coherence_time),
        ));
    }

    if let Some(confidence) = result.confidence {
        ensure_probability(call, "confidence", confidence)?;
    }

    for (index, signal) in result.signals.iter().enumerate() {
        ensure_probability(
            call,
            &format!("signal {} confidence", index),
            signal.confidence,
        )?;
    }

    Ok(())
}

fn accept_entanglement(
    payload: EntanglementPayload,
    requested: &[Symbol],
) -> Result<EntanglementResult, DemoError> {
    let call = CallKind::EntanglementAnalysis;
    let size = payload.symbols.len();

    if payload.entanglement_matrix.len() != size {
        return Err(DemoError::invalid(
            call,
            format!(
                "matrix has {} rows for {} symbols",
                payload.entanglement_matrix.len(),
                size
            ),
        ));
    }
    if let Some((row, cells)) = payload
        .entanglement_matrix
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != size)
    {
        return Err(DemoError::invalid(
            call,
            format!("row {} has {} columns, expected {}", row, cells.len(), size),
        ));
    }
    if payload.symbols != requested {
        return Err(DemoError::invalid(
            call,
            format!(
                "response covers {} symbols that differ from the {} requested",
                size,
                requested.len()
            ),
        ));
    }

    let matrix: Vec<Vec<f64>> = payload
        .entanglement_matrix
        .into_iter()
        .map(|row| row.into_iter().map(MatrixCell::value).collect())
        .collect();
    if matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(DemoError::invalid(call, "matrix contains non-finite values"));
    }

    let entropy = payload.entanglement_entropy;
    if !entropy.is_finite() || entropy < -ENTROPY_TOLERANCE {
        return Err(DemoError::invalid(
            call,
            format!("entanglement_entropy {} must be non-negative", entropy),
        ));
    }

    Ok(EntanglementResult {
        symbols: payload.symbols,
        entanglement_entropy: entropy.max(0.0),
        analysis_type: payload.analysis_type,
        entanglement_matrix: matrix,
        timestamp: payload.timestamp,
    })
}
