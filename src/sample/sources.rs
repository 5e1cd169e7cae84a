//! Sample data sources: the analysis service, a local JSON file, or an
//! offline generator.

use crate::client::AnalysisClient;
use crate::error::DemoError;
use crate::models::{RawSeries, SamplePayload, Symbol};
use crate::sample::{SampleCatalog, SampleDataProvider};
use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use std::path::PathBuf;
use tracing::info;

/// Points per generated series.
pub const SYNTHETIC_POINTS: usize = 100;

/// Loads samples from the service's sample endpoint.
pub struct ServiceSampleSource {
    client: AnalysisClient,
    symbols: Vec<Symbol>,
}

impl ServiceSampleSource {
    pub fn new(client: AnalysisClient, symbols: Vec<Symbol>) -> Self {
        Self { client, symbols }
    }
}

impl SampleDataProvider for ServiceSampleSource {
    fn describe(&self) -> String {
        self.client.endpoints().sample_data()
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<SampleCatalog, DemoError>> {
        Box::pin(async move {
            let payload = self.client.sample_data().await?;
            let catalog = SampleCatalog::from_payload(payload, &self.symbols)?;
            info!(
                "Loaded {} sample series from service ({} points each)",
                catalog.len(),
                catalog.series_len()
            );
            Ok(catalog)
        })
    }
}

/// Loads samples from a JSON file shaped like the sample endpoint's payload.
pub struct FileSampleSource {
    path: PathBuf,
    symbols: Vec<Symbol>,
}

impl FileSampleSource {
    pub fn new(path: PathBuf, symbols: Vec<Symbol>) -> Self {
        Self { path, symbols }
    }
}

impl SampleDataProvider for FileSampleSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<SampleCatalog, DemoError>> {
        Box::pin(async move {
            let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                DemoError::DataUnavailable {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                }
            })?;

            let payload: SamplePayload =
                serde_json::from_str(&content).map_err(|e| DemoError::DataUnavailable {
                    reason: format!("failed to parse {}: {}", self.path.display(), e),
                })?;

            let catalog = SampleCatalog::from_payload(payload, &self.symbols)?;
            info!(
                "Loaded {} sample series from {}",
                catalog.len(),
                self.path.display()
            );
            Ok(catalog)
        })
    }
}

/// Generates deterministic random-walk samples without touching the network.
///
/// Prices start from a per-symbol base in `[50, 200)` and walk with
/// N(0, 2) steps; volumes are `1000 + |Δprice| * 500 + Exp(200)`.
pub struct SyntheticSampleSource {
    symbols: Vec<Symbol>,
    points: usize,
}

impl SyntheticSampleSource {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            points: SYNTHETIC_POINTS,
        }
    }

    #[allow(dead_code)] // Used by tests to keep fixtures short
    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }
}

impl SampleDataProvider for SyntheticSampleSource {
    fn describe(&self) -> String {
        format!("synthetic ({} points)", self.points)
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<SampleCatalog, DemoError>> {
        Box::pin(async move {
            let payload = self
                .symbols
                .iter()
                .map(|symbol| {
                    generate_series(symbol, self.points)
                        .map(|series| (symbol.as_str().to_string(), series))
                })
                .collect::<Result<SamplePayload, DemoError>>()?;

            SampleCatalog::from_payload(payload, &self.symbols)
        })
    }
}

/// Stable per-symbol seed.
fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol
        .as_str()
        .bytes()
        .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
        % 1000
}

fn generate_series(symbol: &Symbol, points: usize) -> Result<RawSeries, DemoError> {
    const MIN_PRICE: f64 = 1.0;
    const STEP_STD_DEV: f64 = 2.0;
    const VOLUME_NOISE_MEAN: f64 = 200.0;

    let step = Normal::new(0.0, STEP_STD_DEV).map_err(|e| DemoError::DataUnavailable {
        reason: format!("invalid price step distribution: {}", e),
    })?;
    let noise = Exp::new(1.0 / VOLUME_NOISE_MEAN).map_err(|e| DemoError::DataUnavailable {
        reason: format!("invalid volume noise distribution: {}", e),
    })?;

    let mut rng = StdRng::seed_from_u64(symbol_seed(symbol));
    let base: f64 = rng.random_range(50.0..200.0);

    let mut level = base;
    let prices: Vec<f64> = (0..points)
        .map(|_| {
            level = (level + step.sample(&mut rng)).max(MIN_PRICE);
            level
        })
        .collect();

    let volumes = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let change = if i == 0 { 0.0 } else { price - prices[i - 1] };
            1000.0 + change.abs() * 500.0 + noise.sample(&mut rng)
        })
        .collect();

    Ok(RawSeries {
        prices,
        volumes,
        symbol: Some(symbol.as_str().to_string()),
    })
}
