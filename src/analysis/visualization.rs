//! Plot-ready series derived locally from a sample series.
//!
//! Nothing here touches the network. The output is a pure function of the
//! input series and is never sent back to the service.

use crate::models::{DerivedVisualization, SampleSeries, StatePoint};

/// Derive the state, return and oscillator series for one instrument.
///
/// - `states[i]` pairs price and volume with their Euclidean magnitude.
/// - `correlations[i]` is the period-over-period return; index 0 is 0, and
///   a zero previous price also yields 0 rather than an error.
/// - `entanglement[i] = sin(0.1 i) * cos(0.001 volume[i])`.
pub fn derive(series: &SampleSeries) -> DerivedVisualization {
    let prices = &series.prices;
    let volumes = &series.volumes;

    let states = prices
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&price, &volume))| StatePoint {
            x: i,
            y: price,
            z: volume,
            magnitude: price.hypot(volume),
        })
        .collect();

    let correlations = (0..prices.len())
        .map(|i| if i == 0 { 0.0 } else { period_return(prices[i - 1], prices[i]) })
        .collect();

    let entanglement = volumes
        .iter()
        .enumerate()
        .map(|(i, &volume)| (0.1 * i as f64).sin() * (0.001 * volume).cos())
        .collect();

    DerivedVisualization {
        states,
        correlations,
        entanglement,
    }
}

fn period_return(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        current / previous - 1.0
    }
}

/// Summary figures for a derived visualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualizationStats {
    pub points: usize,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub mean_return: f64,
    pub max_abs_return: f64,
    pub mean_entanglement: f64,
}

impl VisualizationStats {
    /// Returns `None` for an empty visualization.
    pub fn from_visualization(viz: &DerivedVisualization) -> Option<Self> {
        if viz.states.is_empty() {
            return None;
        }

        let magnitudes = viz.states.iter().map(|s| s.magnitude);
        let min_magnitude = magnitudes.clone().fold(f64::INFINITY, f64::min);
        let max_magnitude = magnitudes.fold(f64::NEG_INFINITY, f64::max);

        // correlations[0] is a placeholder, not a return
        let returns = &viz.correlations[1.min(viz.correlations.len())..];
        let mean_return = mean(returns);
        let max_abs_return = returns.iter().map(|r| r.abs()).fold(0.0, f64::max);

        Some(Self {
            points: viz.states.len(),
            min_magnitude,
            max_magnitude,
            mean_return,
            max_abs_return,
            mean_entanglement: mean(&viz.entanglement),
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
