use clap::Parser;
use optrade::application::ml::load_classifier;
use optrade::application::orchestrator::Orchestrator;
use optrade::application::report::CycleResult;
use optrade::config::Config;
use optrade::domain::ports::{CandleSource, OptionChainSource};
use optrade::infrastructure::dispatcher::FyersDispatcher;
use optrade::infrastructure::nse::{CsvCandleSource, NseOptionChainClient, SyntheticCandleSource};
use optrade::infrastructure::persistence::TradeJournal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Options-trading decision engine for Indian index derivatives.
#[derive(Debug, Parser)]
#[command(name = "optrade", version, about)]
struct Cli {
    /// Comma-separated indices to analyze (NIFTY,BANKNIFTY,...)
    #[arg(long)]
    indices: Option<String>,

    /// Risk profile: conservative, moderate or aggressive
    #[arg(long)]
    profile: Option<String>,

    /// Cycle period in seconds
    #[arg(long)]
    period: Option<u64>,

    /// Run a single analysis round and exit
    #[arg(long)]
    once: bool,

    /// Directory for the trade journal and reports
    #[arg(long)]
    data_dir: Option<String>,

    /// Classifier artifact path
    #[arg(long)]
    model: Option<String>,

    /// Candle CSV file (otherwise candles are synthesized from the chain)
    #[arg(long)]
    candles: Option<String>,

    /// Analyze outside session hours too
    #[arg(long)]
    ignore_session_hours: bool,
}

fn apply_cli(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(indices) = &cli.indices {
        config.indices = indices
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse())
            .collect::<Result<_, _>>()?;
    }
    if let Some(profile) = &cli.profile {
        config.risk_profile = profile.parse()?;
    }
    if let Some(period) = cli.period {
        config.cycle_period = std::time::Duration::from_secs(period);
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.into();
    }
    if let Some(model) = &cli.model {
        config.model_path = model.into();
    }
    if let Some(candles) = &cli.candles {
        config.candle_file = Some(candles.into());
    }
    if cli.ignore_session_hours {
        config.ignore_session_hours = true;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e:#}");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = apply_cli(&mut config, &cli) {
        error!("Invalid arguments: {e:#}");
        return ExitCode::from(1);
    }

    let dispatcher = match FyersDispatcher::from_config(&config.broker) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            // missing credentials downgrade to paper mode instead of
            // blocking analysis
            error!("Dispatcher configuration: {e}; continuing in paper mode");
            Arc::new(FyersDispatcher::paper())
        }
    };

    let chain_source: Arc<dyn OptionChainSource> =
        Arc::new(NseOptionChainClient::new(config.http_timeout));
    let candle_source: Arc<dyn CandleSource> = match &config.candle_file {
        Some(path) => Arc::new(CsvCandleSource::new(path.clone())),
        None => Arc::new(SyntheticCandleSource::new(Arc::clone(&chain_source))),
    };
    let classifier = load_classifier(&config.model_path);

    let journal = match TradeJournal::open(&config.data_dir) {
        Ok(journal) => Arc::new(journal),
        Err(e) => {
            error!("Failed to open trade journal: {e}");
            return ExitCode::from(1);
        }
    };

    let once = cli.once;
    let orchestrator = Orchestrator::new(
        config,
        candle_source,
        chain_source,
        classifier,
        dispatcher,
        journal,
    );

    if once {
        let reports = orchestrator.run_once().await;
        let all_failed = !reports.is_empty()
            && reports
                .iter()
                .all(|r| matches!(r.result, CycleResult::Failed { .. }));
        for report in &reports {
            match &report.result {
                CycleResult::Completed {
                    signal,
                    confidence,
                    reason,
                } => info!(
                    index = %report.index,
                    signal = %signal,
                    confidence = *confidence,
                    reason = %reason,
                    "Cycle complete"
                ),
                CycleResult::Failed { error: cause } => {
                    error!(index = %report.index, cause = %cause, "Cycle failed")
                }
            }
        }
        if all_failed {
            return ExitCode::from(2);
        }
        return ExitCode::SUCCESS;
    }

    orchestrator.run().await;
    ExitCode::SUCCESS
}
