//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.qofa.toml` files.

use crate::models::Symbol;
use crate::report::ReportOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".qofa.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Demo session settings.
    #[serde(default)]
    pub demo: DemoConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "qofa_report.md".to_string()
}

/// Analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the API routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Where sample series come from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleSourceKind {
    /// The service's sample endpoint
    #[default]
    Service,
    /// A local JSON file
    File,
    /// Generated offline
    Synthetic,
}

/// Demo session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Instrument symbols loaded into the session.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Symbol selected before the first run.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    /// Label sent with the entanglement request.
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,

    /// Sample data source.
    #[serde(default)]
    pub sample_source: SampleSourceKind,

    /// JSON file for the `file` source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_file: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            default_symbol: default_symbol(),
            analysis_type: default_analysis_type(),
            sample_source: SampleSourceKind::default(),
            sample_file: None,
        }
    }
}

fn default_symbols() -> Vec<String> {
    vec!["AAPL", "GOOGL", "MSFT", "TSLA", "SPY"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_symbol() -> String {
    "AAPL".to_string()
}

fn default_analysis_type() -> String {
    "entanglement".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Signals listed in the report.
    #[serde(default = "default_max_signals")]
    pub max_signals: usize,

    /// Include the full derived series table.
    #[serde(default)]
    pub include_series: bool,

    /// Include the entanglement matrix table.
    #[serde(default = "default_true")]
    pub include_matrix: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_signals: default_max_signals(),
            include_series: false,
            include_matrix: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_signals() -> usize {
    3
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            max_signals: config.max_signals,
            include_series: config.include_series,
            include_matrix: config.include_matrix,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.backend_url {
            self.service.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.service.timeout_seconds = timeout;
        }

        if let Some(ref symbol) = args.symbol {
            self.demo.default_symbol = symbol.clone();
        }
        if let Some(ref symbols) = args.symbols {
            self.demo.symbols = symbols.clone();
            if args.symbol.is_none() {
                self.fall_back_default_symbol();
            }
        }
        if let Some(ref analysis_type) = args.analysis_type {
            self.demo.analysis_type = analysis_type.clone();
        }
        if let Some(source) = args.sample_source {
            self.demo.sample_source = source;
        }
        // A sample file on the command line implies the file source
        if let Some(ref path) = args.sample_file {
            self.demo.sample_file = Some(path.clone());
            if args.sample_source.is_none() {
                self.demo.sample_source = SampleSourceKind::File;
            }
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(max_signals) = args.max_signals {
            self.report.max_signals = max_signals;
        }

        // Flags always override
        if args.include_series {
            self.report.include_series = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Point `default_symbol` at the first listed symbol when the current
    /// default is not in the list. Invalid lists are left for `validate`.
    fn fall_back_default_symbol(&mut self) {
        let Ok(symbols) = self.symbols() else {
            return;
        };
        let listed = Symbol::parse(&self.demo.default_symbol)
            .map(|s| symbols.contains(&s))
            .unwrap_or(false);
        if !listed {
            if let Some(first) = symbols.first() {
                self.demo.default_symbol = first.as_str().to_string();
            }
        }
    }

    /// Check cross-field constraints after merging.
    pub fn validate(&self) -> Result<()> {
        if !self.service.base_url.starts_with("http://")
            && !self.service.base_url.starts_with("https://")
        {
            bail!(
                "Service URL must start with 'http://' or 'https://': {}",
                self.service.base_url
            );
        }
        if self.service.timeout_seconds == 0 {
            bail!("Timeout must be at least 1 second");
        }

        let symbols = self.symbols()?;
        let default_symbol = Symbol::parse(&self.demo.default_symbol)
            .with_context(|| format!("Invalid default symbol '{}'", self.demo.default_symbol))?;
        if !symbols.contains(&default_symbol) {
            bail!(
                "Default symbol {} is not in the configured symbols",
                default_symbol
            );
        }

        if self.demo.analysis_type.trim().is_empty() {
            bail!("Analysis type must not be empty");
        }
        if self.demo.sample_source == SampleSourceKind::File && self.demo.sample_file.is_none() {
            bail!("Sample source 'file' requires sample_file (or --sample-file)");
        }

        Ok(())
    }

    /// Parsed, de-duplicated symbol list in configured order.
    pub fn symbols(&self) -> Result<Vec<Symbol>> {
        let mut symbols: Vec<Symbol> = Vec::with_capacity(self.demo.symbols.len());
        for raw in &self.demo.symbols {
            let symbol =
                Symbol::parse(raw).with_context(|| format!("Invalid symbol '{}'", raw))?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        if symbols.is_empty() {
            bail!("At least one symbol must be configured");
        }
        Ok(symbols)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "http://localhost:8001");
        assert_eq!(config.service.api_prefix, "/api");
        assert_eq!(config.service.timeout_seconds, 30);
        assert_eq!(config.demo.symbols.len(), 5);
        assert_eq!(config.demo.default_symbol, "AAPL");
        assert_eq!(config.demo.sample_source, SampleSourceKind::Service);
        assert_eq!(config.report.max_signals, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[service]
base_url = "http://qofa.internal:9000"

[demo]
symbols = ["aapl", "msft"]
default_symbol = "MSFT"
sample_source = "synthetic"

[report]
include_series = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.service.base_url, "http://qofa.internal:9000");
        assert_eq!(config.service.api_prefix, "/api");
        assert_eq!(config.demo.sample_source, SampleSourceKind::Synthetic);
        assert!(config.report.include_series);
        assert!(config.report.include_matrix);

        let symbols = config.symbols().unwrap();
        assert_eq!(symbols[0].as_str(), "AAPL");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[service]\ntimeout_seconds = 5").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.service.timeout_seconds, 5);
        assert_eq!(config.demo.analysis_type, "entanglement");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[service\nbase_url = ").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut args = make_args();
        args.backend_url = Some("https://svc.example".to_string());
        args.symbol = Some("tsla".to_string());
        args.sample_file = Some(PathBuf::from("samples.json"));
        args.timeout = Some(10);

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.service.base_url, "https://svc.example");
        assert_eq!(config.service.timeout_seconds, 10);
        assert_eq!(config.demo.default_symbol, "tsla");
        assert_eq!(config.demo.sample_source, SampleSourceKind::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_symbols_without_symbol_uses_first_listed() {
        let mut args = make_args();
        args.symbols = Some(vec!["msft".to_string(), "SPY".to_string()]);

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.demo.default_symbol, "MSFT");
        assert!(config.validate().is_ok());

        // A default that is still listed is kept
        args.symbols = Some(vec!["SPY".to_string(), "AAPL".to_string()]);
        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.demo.default_symbol, "AAPL");

        // An explicit --symbol is never replaced
        args.symbol = Some("NFLX".to_string());
        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.demo.default_symbol, "NFLX");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.demo.default_symbol = "NFLX".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.demo.sample_source = SampleSourceKind::File;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.demo.symbols = vec!["AAPL".to_string(), "9X".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.base_url = "localhost:8001".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_symbols_deduplicated() {
        let mut config = Config::default();
        config.demo.symbols = vec!["spy".into(), "SPY".into(), "aapl".into()];
        let symbols = config.symbols().unwrap();
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[service]"));
        assert!(toml_str.contains("[demo]"));
        assert!(toml_str.contains("sample_source = \"service\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.demo.symbols, Config::default().demo.symbols);
    }
}
