//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::SampleSourceKind;
use clap::Parser;
use std::path::PathBuf;

/// qofa-demo - QOFA options-flow demo session
///
/// Loads sample price/volume series, runs the flow and entanglement
/// analyses against the QOFA service, derives the plot series locally
/// and writes a Markdown or JSON session report.
///
/// Examples:
///   qofa-demo
///   qofa-demo --symbol TSLA --backend-url http://localhost:8001
///   qofa-demo --sample-source synthetic --dry-run
///   qofa-demo --sample-file samples.json --format json -o session.json
///   qofa-demo --check
///   qofa-demo --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Symbol to analyze
    ///
    /// Must be one of the configured symbols. Defaults to demo.default_symbol.
    #[arg(short, long, value_name = "TICKER")]
    pub symbol: Option<String>,

    /// Symbols to load into the session (comma-separated)
    ///
    /// Example: --symbols AAPL,MSFT,SPY
    #[arg(long, value_name = "TICKERS", value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Analysis service base URL
    ///
    /// Can also be set via QOFA_BACKEND_URL env var or .qofa.toml config.
    #[arg(short, long, value_name = "URL", env = "QOFA_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .qofa.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Label sent with the entanglement request
    #[arg(long, value_name = "TYPE")]
    pub analysis_type: Option<String>,

    /// Where sample series come from (service, file, synthetic)
    #[arg(long, value_name = "SOURCE")]
    pub sample_source: Option<SampleSourceKind>,

    /// JSON file with sample series (implies --sample-source file)
    #[arg(long, value_name = "FILE")]
    pub sample_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of signals listed in the report
    #[arg(long, value_name = "COUNT")]
    pub max_signals: Option<usize>,

    /// Include the full derived series table in the report
    #[arg(long)]
    pub include_series: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load samples and derive the plot series without calling
    /// the analysis endpoints
    #[arg(long, conflicts_with = "check")]
    pub dry_run: bool,

    /// Print the service banner and analyzer parameters, then exit
    #[arg(long)]
    pub check: bool,

    /// Generate a default .qofa.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.backend_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Backend URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref path) = self.sample_file {
            if !path.is_file() {
                return Err(format!("Sample file does not exist: {}", path.display()));
            }
        }

        if let Some(ref symbols) = self.symbols {
            if symbols.iter().all(|s| s.trim().is_empty()) {
                return Err("--symbols must list at least one symbol".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub fn make_args() -> Args {
        Args {
            symbol: None,
            symbols: None,
            backend_url: None,
            output: None,
            config: None,
            format: OutputFormat::Markdown,
            analysis_type: None,
            sample_source: None,
            sample_file: None,
            timeout: None,
            max_signals: None,
            include_series: false,
            verbose: false,
            quiet: false,
            dry_run: false,
            check: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "qofa-demo",
            "--symbol",
            "tsla",
            "--symbols",
            "AAPL,TSLA",
            "--sample-source",
            "synthetic",
            "--format",
            "json",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.symbol.as_deref(), Some("tsla"));
        assert_eq!(
            args.symbols,
            Some(vec!["AAPL".to_string(), "TSLA".to_string()])
        );
        assert_eq!(args.sample_source, Some(SampleSourceKind::Synthetic));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.dry_run);
    }

    #[test]
    fn test_dry_run_conflicts_with_check() {
        assert!(Args::try_parse_from(["qofa-demo", "--dry-run", "--check"]).is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.backend_url = Some("localhost:8001".to_string());
        assert!(args.validate().is_err());

        args.backend_url = Some("http://localhost:8001".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_sample_file() {
        let mut args = make_args();
        args.sample_file = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{}}").unwrap();
        args.sample_file = Some(file.path().to_path_buf());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
