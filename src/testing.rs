//! Test doubles and fixtures shared by the unit tests.

use crate::client::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::client::{AnalysisClient, Endpoints};
use crate::error::DemoError;
use crate::models::{SamplePayload, Symbol};
use crate::sample::{SampleCatalog, SampleDataProvider};
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub const FLOW_PATH: &str = "/analyze/quantum-flow";
pub const ENTANGLEMENT_PATH: &str = "/analyze/entanglement";
pub const SAMPLE_PATH: &str = "/demo/generate-sample-data";

pub fn flow_response() -> &'static str {
    include_str!("../fixtures/flow_response.json")
}

pub fn entanglement_response() -> &'static str {
    include_str!("../fixtures/entanglement_response.json")
}

pub fn sample_data() -> &'static str {
    include_str!("../fixtures/sample_data.json")
}

/// Symbols covered by the fixtures, in fixture order.
pub fn catalog_symbols() -> Vec<Symbol> {
    ["AAPL", "MSFT", "SPY"]
        .iter()
        .map(|s| Symbol::parse(s).unwrap())
        .collect()
}

pub fn sample_catalog() -> SampleCatalog {
    let payload: SamplePayload = serde_json::from_str(sample_data()).unwrap();
    SampleCatalog::from_payload(payload, &catalog_symbols()).unwrap()
}

type Scripted = Result<HttpResponse, TransportError>;

/// In-memory transport answering by URL suffix.
///
/// Each route holds a queue of answers; the last one is replayed once the
/// queue runs down to it. A gated transport records the call, then parks
/// until [`ScriptedTransport::release`] hands out a permit.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<HttpRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn respond(&self, path: &str, body: impl Into<String>) {
        self.push(path, Ok(HttpResponse::ok_json(body)));
    }

    pub fn respond_status(&self, path: &str, status: u16, body: impl Into<String>) {
        self.push(
            path,
            Ok(HttpResponse {
                status,
                body: body.into(),
            }),
        );
    }

    pub fn fail(&self, path: &str, error: TransportError) {
        self.push(path, Err(error));
    }

    /// Let `n` parked requests through.
    pub fn release(&self, n: usize) {
        if let Some(ref gate) = self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Wait until at least `n` requests have been issued.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..500 {
            if self.call_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("expected {} calls, saw {}", n, self.call_count());
    }

    fn push(&self, path: &str, answer: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(answer);
    }

    fn answer(&self, url: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .iter_mut()
            .filter(|(path, _)| url.ends_with(path.as_str()))
            .max_by_key(|(path, _)| path.len())
            .map(|(_, queue)| queue);

        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(TransportError::new(format!("no scripted response for {}", url))),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        let url = request.url.clone();
        self.calls.lock().unwrap().push(request);

        Box::pin(async move {
            if let Some(ref gate) = self.gate {
                let permit = gate.acquire().await.unwrap();
                permit.forget();
            }
            self.answer(&url)
        })
    }
}

/// Client over a scripted transport with the default API prefix.
pub fn client(transport: &Arc<ScriptedTransport>) -> AnalysisClient {
    AnalysisClient::new(transport.clone(), Endpoints::new("http://svc", "/api"))
}

/// Provider returning a fixed catalog, counting fetches.
pub struct StaticSampleSource {
    catalog: SampleCatalog,
    fetches: AtomicUsize,
}

impl StaticSampleSource {
    pub fn new(catalog: SampleCatalog) -> Self {
        Self {
            catalog,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SampleDataProvider for StaticSampleSource {
    fn describe(&self) -> String {
        "static".to_string()
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<SampleCatalog, DemoError>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let catalog = self.catalog.clone();
        Box::pin(async move { Ok(catalog) })
    }
}

/// Provider that always fails.
pub struct FailingSampleSource;

impl SampleDataProvider for FailingSampleSource {
    fn describe(&self) -> String {
        "failing".to_string()
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<SampleCatalog, DemoError>> {
        Box::pin(async {
            Err(DemoError::DataUnavailable {
                reason: "source offline".to_string(),
            })
        })
    }
}
