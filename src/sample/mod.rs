//! Sample data loading and validation.
//!
//! A [`SampleDataProvider`] supplies one price/volume series per configured
//! symbol. Whatever the backing source, the payload goes through
//! [`SampleCatalog::from_payload`], which rejects the whole load on the first
//! malformed series so a session never starts with partial data.

pub mod sources;

use crate::error::DemoError;
use crate::models::{SamplePayload, SampleSeries, Symbol};
use futures::future::BoxFuture;
use tracing::debug;

pub use sources::{FileSampleSource, ServiceSampleSource, SyntheticSampleSource};

/// Supplier of the per-symbol sample series.
pub trait SampleDataProvider: Send + Sync {
    /// Short label for logs and reports.
    fn describe(&self) -> String;

    /// Load every series. Fails with [`DemoError::DataUnavailable`].
    fn fetch_all(&self) -> BoxFuture<'_, Result<SampleCatalog, DemoError>>;
}

/// Validated sample series in configured symbol order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleCatalog {
    series: Vec<SampleSeries>,
}

impl SampleCatalog {
    /// Validate a payload against the allowed symbol set.
    ///
    /// Every symbol in `symbols` must be present; payload entries for other
    /// tickers are ignored. All series must share one length of at least two
    /// points, with positive prices and non-negative volumes.
    pub fn from_payload(payload: SamplePayload, symbols: &[Symbol]) -> Result<Self, DemoError> {
        if symbols.is_empty() {
            return Err(malformed("no symbols configured"));
        }

        let mut series = Vec::with_capacity(symbols.len());
        let mut expected_len: Option<usize> = None;

        for symbol in symbols {
            let raw = payload
                .get(symbol.as_str())
                .ok_or_else(|| malformed(format!("no series for {}", symbol)))?;

            if let Some(ref named) = raw.symbol {
                if !named.eq_ignore_ascii_case(symbol.as_str()) {
                    return Err(malformed(format!(
                        "series under {} is labelled {}",
                        symbol, named
                    )));
                }
            }

            if raw.prices.len() != raw.volumes.len() {
                return Err(malformed(format!(
                    "{}: {} prices but {} volumes",
                    symbol,
                    raw.prices.len(),
                    raw.volumes.len()
                )));
            }
            if raw.prices.len() < 2 {
                return Err(malformed(format!(
                    "{}: at least 2 points required, got {}",
                    symbol,
                    raw.prices.len()
                )));
            }
            match expected_len {
                Some(len) if len != raw.prices.len() => {
                    return Err(malformed(format!(
                        "{}: {} points, other series have {}",
                        symbol,
                        raw.prices.len(),
                        len
                    )));
                }
                _ => expected_len = Some(raw.prices.len()),
            }

            if let Some(i) = raw.prices.iter().position(|p| !(p.is_finite() && *p > 0.0)) {
                return Err(malformed(format!(
                    "{}: price {} at index {} is not positive",
                    symbol, raw.prices[i], i
                )));
            }
            if let Some(i) = raw.volumes.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
                return Err(malformed(format!(
                    "{}: volume {} at index {} is negative",
                    symbol, raw.volumes[i], i
                )));
            }

            series.push(SampleSeries {
                symbol: symbol.clone(),
                prices: raw.prices.clone(),
                volumes: raw.volumes.clone(),
            });
        }

        let ignored = payload.len().saturating_sub(series.len());
        if ignored > 0 {
            debug!("Ignoring {} sample series outside the symbol set", ignored);
        }

        Ok(Self { series })
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&SampleSeries> {
        self.series.iter().find(|s| &s.symbol == symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.get(symbol).is_some()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.series.iter().map(|s| s.symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Points per series (identical across the catalog).
    pub fn series_len(&self) -> usize {
        self.series.first().map(SampleSeries::len).unwrap_or(0)
    }
}

fn malformed(reason: impl Into<String>) -> DemoError {
    DemoError::DataUnavailable {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::RawSeries;
    use crate::testing;

    fn raw(prices: Vec<f64>, volumes: Vec<f64>) -> RawSeries {
        RawSeries {
            prices,
            volumes,
            symbol: None,
        }
    }

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(|s| Symbol::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_catalog_from_fixture() {
        let catalog = testing::sample_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.series_len(), 4);
        assert_eq!(catalog.symbols(), testing::catalog_symbols());

        let msft = catalog.get(&Symbol::parse("MSFT").unwrap()).unwrap();
        assert_eq!(msft.prices.len(), msft.volumes.len());
    }

    #[test]
    fn test_catalog_keeps_configured_order() {
        let mut payload = SamplePayload::new();
        payload.insert("B".into(), raw(vec![1.0, 2.0], vec![0.0, 1.0]));
        payload.insert("A".into(), raw(vec![3.0, 4.0], vec![5.0, 6.0]));
        payload.insert("C".into(), raw(vec![3.0, 4.0], vec![5.0, 6.0]));

        let catalog = SampleCatalog::from_payload(payload, &symbols(&["B", "A"])).unwrap();
        assert_eq!(catalog.symbols(), symbols(&["B", "A"]));
        assert!(!catalog.contains(&Symbol::parse("C").unwrap()));
    }

    #[test]
    fn test_missing_symbol_fails() {
        let mut payload = SamplePayload::new();
        payload.insert("A".into(), raw(vec![1.0, 2.0], vec![1.0, 1.0]));

        let err = SampleCatalog::from_payload(payload, &symbols(&["A", "B"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.to_string().contains("no series for B"));
    }

    #[test]
    fn test_misaligned_lengths_fail() {
        let mut payload = SamplePayload::new();
        payload.insert("A".into(), raw(vec![1.0, 2.0, 3.0], vec![1.0, 1.0]));

        let err = SampleCatalog::from_payload(payload, &symbols(&["A"])).unwrap_err();
        assert!(err.to_string().contains("3 prices but 2 volumes"));
    }

    #[test]
    fn test_uneven_series_lengths_fail() {
        let mut payload = SamplePayload::new();
        payload.insert("A".into(), raw(vec![1.0, 2.0], vec![1.0, 1.0]));
        payload.insert("B".into(), raw(vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 1.0]));

        let err = SampleCatalog::from_payload(payload, &symbols(&["A", "B"])).unwrap_err();
        assert!(err.to_string().contains("other series have 2"));
    }

    #[test]
    fn test_bad_values_fail() {
        let mut payload = SamplePayload::new();
        payload.insert("A".into(), raw(vec![1.0, 0.0], vec![1.0, 1.0]));
        assert!(SampleCatalog::from_payload(payload, &symbols(&["A"])).is_err());

        let mut payload = SamplePayload::new();
        payload.insert("A".into(), raw(vec![1.0, 2.0], vec![1.0, -1.0]));
        assert!(SampleCatalog::from_payload(payload, &symbols(&["A"])).is_err());
    }

    #[test]
    fn test_mislabelled_series_fails() {
        let mut payload = SamplePayload::new();
        payload.insert(
            "A".into(),
            RawSeries {
                prices: vec![1.0, 2.0],
                volumes: vec![1.0, 1.0],
                symbol: Some("B".into()),
            },
        );

        assert!(SampleCatalog::from_payload(payload, &symbols(&["A"])).is_err());
    }
}
