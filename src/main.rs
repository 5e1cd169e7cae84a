//! qofa-demo - QOFA options-flow demonstration session
//!
//! A CLI front-end that loads sample price/volume series, runs the flow and
//! entanglement analyses against the QOFA service, derives the plot series
//! locally and writes a session report.
//!
//! Exit codes:
//!   0 - Session reached `ready` (or dry run / check completed)
//!   1 - Runtime error (config, connection, sample data, etc.)
//!   2 - Analysis run failed (the report is still written)

mod analysis;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod report;
mod sample;
mod session;
#[cfg(test)]
mod testing;

use analysis::VisualizationStats;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use client::{AnalysisClient, Endpoints, ReqwestTransport};
use config::{Config, SampleSourceKind, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::Symbol;
use report::{DemoReport, ReportMetadata, ReportOptions};
use sample::{FileSampleSource, SampleDataProvider, ServiceSampleSource, SyntheticSampleSource};
use session::{RunOutcome, SessionController, SessionSettings, SessionStatus};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("qofa-demo v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_demo(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Demo failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .qofa.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the service URL, symbols, and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one demonstration session. Returns the exit code (0 or 2).
async fn run_demo(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    if args.verbose || config.general.verbose {
        debug!("Effective config: {:?}", config);
    }
    config.validate().context("Invalid configuration")?;

    let symbols = config.symbols()?;
    let endpoints = Endpoints::new(&config.service.base_url, &config.service.api_prefix);
    let transport = ReqwestTransport::new(Duration::from_secs(config.service.timeout_seconds))?;
    let client = AnalysisClient::new(Arc::new(transport), endpoints);

    if args.check {
        return handle_check(&client).await;
    }

    // Step 1: Load sample data
    let provider = build_provider(&config, &client, symbols);
    println!("📥 Loading sample data: {}", provider.describe());

    let session = SessionController::start(
        provider.as_ref(),
        client.clone(),
        SessionSettings {
            analysis_type: config.demo.analysis_type.clone(),
        },
    )
    .await;

    let snapshot = session.snapshot().await;
    if snapshot.state.status == SessionStatus::Failed {
        let message = snapshot
            .state
            .last_error
            .map(|e| e.message)
            .unwrap_or_else(|| "sample data unavailable".to_string());
        bail!("{}", message);
    }
    println!(
        "   {} symbols, {} points each",
        snapshot.symbols.len(),
        snapshot.sample_points
    );

    let symbol = session
        .select_symbol(&config.demo.default_symbol)
        .await
        .context("Cannot select symbol")?;

    // Handle --dry-run: derive locally and exit
    if args.dry_run {
        return handle_dry_run(&session, &symbol).await;
    }

    // Step 2: Run the analysis
    println!("\n🔬 Running analysis for {}...", symbol);
    println!("   Service: {}", client.endpoints().api_root());
    println!("   Timeout: {}s", config.service.timeout_seconds);

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.set_message("Waiting for flow and entanglement analysis...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let outcome = session.run_analysis().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let outcome = outcome?;

    // Step 3: Build and save the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let report = DemoReport {
        metadata: ReportMetadata {
            service_url: client.endpoints().api_root().to_string(),
            generated_at: Utc::now(),
            sample_source: provider.describe(),
            analysis_type: config.demo.analysis_type.clone(),
            duration_seconds: duration,
        },
        session: session.snapshot().await,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, &ReportOptions::from(&config.report))
        }
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let state = &report.session.state;
    if let Some(ref flow) = state.flow {
        let metrics = &flow.quantum_metrics;
        println!("\n📊 Analysis Summary:");
        println!(
            "   Correlation: {:.3} | Coherence: {:.0}s | Signals: {}",
            metrics.quantum_correlation, metrics.coherence_time, metrics.signal_count
        );
        for signal in flow.signals.iter().take(config.report.max_signals) {
            println!(
                "   {} {} {} ({:.1}%, {})",
                signal.action.emoji(),
                signal.action,
                signal.symbol,
                signal.confidence * 100.0,
                signal.metadata.flow_type
            );
        }
    }
    if let Some(ref entanglement) = state.entanglement {
        println!(
            "   Entanglement entropy: {:.4} across {} symbols",
            entanglement.entanglement_entropy,
            entanglement.size()
        );
    }
    println!("   Duration: {:.1}s", duration);

    match outcome {
        RunOutcome::Ready => {
            println!(
                "\n✅ Session ready! Report saved to: {}",
                output_path.display()
            );
            Ok(0)
        }
        RunOutcome::Failed(info) => {
            eprintln!("\n⛔ Analysis failed ({}): {}", info.kind, info.message);
            eprintln!("   Report saved to: {}", output_path.display());
            Ok(2)
        }
        other => {
            warn!("Run did not settle: {:?}", other);
            Ok(1)
        }
    }
}

/// Pick the sample source from the merged configuration.
fn build_provider(
    config: &Config,
    client: &AnalysisClient,
    symbols: Vec<Symbol>,
) -> Box<dyn SampleDataProvider> {
    match config.demo.sample_source {
        SampleSourceKind::Service => Box::new(ServiceSampleSource::new(client.clone(), symbols)),
        SampleSourceKind::File => {
            // validate() guarantees a path for the file source
            let path = config.demo.sample_file.clone().unwrap_or_default();
            Box::new(FileSampleSource::new(path, symbols))
        }
        SampleSourceKind::Synthetic => Box::new(SyntheticSampleSource::new(symbols)),
    }
}

/// Handle --check: print service banner and analyzer parameters, exit.
async fn handle_check(client: &AnalysisClient) -> Result<i32> {
    println!("🩺 Checking service at {}...\n", client.endpoints().api_root());

    let info = client.service_info().await?;
    println!("   {} (v{})", info.message, info.version);

    let metrics = client.service_metrics().await?;
    println!("   Status: {}", metrics.system_status);
    println!("   Basis states: {}", metrics.n_basis_states);
    println!("   Decoherence time: {:.0}s", metrics.decoherence_time);
    println!(
        "   Entanglement threshold: {:.2}",
        metrics.entanglement_threshold
    );
    println!(
        "   Coherence decay rate: {:.3}",
        metrics.coherence_decay_rate
    );
    println!("   Planck constant: {:e}", metrics.planck_constant);

    println!("\n✅ Service reachable.");
    Ok(0)
}

/// Handle --dry-run: derive the plot series locally, print a summary, exit.
async fn handle_dry_run(session: &SessionController, symbol: &Symbol) -> Result<i32> {
    println!("\n🔍 Dry run: deriving series for {} (no analysis calls)...\n", symbol);

    let stats = session
        .preview()
        .await
        .as_ref()
        .and_then(VisualizationStats::from_visualization);

    match stats {
        Some(stats) => {
            println!("   Points: {}", stats.points);
            println!(
                "   Magnitude: {:.2} to {:.2}",
                stats.min_magnitude, stats.max_magnitude
            );
            println!(
                "   Returns: mean {:.4}%, max move {:.4}%",
                stats.mean_return * 100.0,
                stats.max_abs_return * 100.0
            );
            println!("   Oscillator mean: {:.4}", stats.mean_entanglement);
        }
        None => println!("   No sample series for {}.", symbol),
    }

    println!("\n✅ Dry run complete. No analysis calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
