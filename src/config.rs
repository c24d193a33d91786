//! Runtime configuration, loaded from environment variables with an
//! optional `optrade.toml` overlay. CLI flags override both.

use crate::domain::market::MarketIndex;
use crate::domain::trading::RiskProfile;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Indices analyzed each cycle.
    pub indices: Vec<MarketIndex>,
    pub risk_profile: RiskProfile,
    /// Cycle period during session hours.
    pub cycle_period: Duration,
    /// Account balance used by the lot-size calculator.
    pub account_balance: f64,
    /// Fraction of balance risked per trade.
    pub risk_per_trade: f64,
    /// Directory holding trades.json / performance.json / stats.json and
    /// per-cycle reports.
    pub data_dir: PathBuf,
    /// Classifier artifact path; the rule fallback is used when absent.
    pub model_path: PathBuf,
    /// Candle CSV file, when candles come from disk instead of the
    /// synthetic source.
    pub candle_file: Option<PathBuf>,
    /// End-to-end deadline for HTTP fetches.
    pub http_timeout: Duration,
    /// Deadline for classifier inference.
    pub inference_timeout: Duration,
    pub broker: BrokerConfig,
    /// Run outside session hours too (replay / development).
    pub ignore_session_hours: bool,
}

/// Broker credentials and the real-trading gate. Credentials are consumed
/// only by the external dispatcher.
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    pub api_key: String,
    pub api_secret: String,
    pub client_id: String,
    pub real_trading: bool,
}

impl BrokerConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty() && !self.client_id.is_empty()
    }
}

/// Optional TOML overlay (`optrade.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    indices: Option<Vec<String>>,
    risk_profile: Option<String>,
    cycle_period_secs: Option<u64>,
    account_balance: Option<f64>,
    risk_per_trade: Option<f64>,
    data_dir: Option<String>,
    model_path: Option<String>,
    candle_file: Option<String>,
    ignore_session_hours: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indices: vec![MarketIndex::Nifty],
            risk_profile: RiskProfile::Moderate,
            cycle_period: Duration::from_secs(300),
            account_balance: 100_000.0,
            risk_per_trade: 0.02,
            data_dir: PathBuf::from("trade_logs"),
            model_path: PathBuf::from("models/classifier.json"),
            candle_file: None,
            http_timeout: Duration::from_secs(15),
            inference_timeout: Duration::from_secs(5),
            broker: BrokerConfig::default(),
            ignore_session_hours: false,
        }
    }
}

impl Config {
    /// Loads configuration: defaults, then `optrade.toml` if present, then
    /// environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();
        if Path::new("optrade.toml").exists() {
            let text = std::fs::read_to_string("optrade.toml")
                .context("Failed to read optrade.toml")?;
            let file: FileConfig =
                toml::from_str(&text).context("Failed to parse optrade.toml")?;
            config.apply_file(file)?;
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(indices) = file.indices {
            self.indices = parse_indices(&indices.join(","))?;
        }
        if let Some(profile) = file.risk_profile {
            self.risk_profile = RiskProfile::from_str(&profile)?;
        }
        if let Some(secs) = file.cycle_period_secs {
            self.cycle_period = Duration::from_secs(secs);
        }
        if let Some(balance) = file.account_balance {
            self.account_balance = balance;
        }
        if let Some(risk) = file.risk_per_trade {
            self.risk_per_trade = risk;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = file.model_path {
            self.model_path = PathBuf::from(path);
        }
        if let Some(path) = file.candle_file {
            self.candle_file = Some(PathBuf::from(path));
        }
        if let Some(ignore) = file.ignore_session_hours {
            self.ignore_session_hours = ignore;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = env::var("OPTRADE_INDICES") {
            self.indices = parse_indices(&value)?;
        }
        if let Ok(value) = env::var("OPTRADE_RISK_PROFILE") {
            self.risk_profile = RiskProfile::from_str(&value)?;
        }
        if let Ok(value) = env::var("OPTRADE_CYCLE_PERIOD_SECS") {
            let secs: u64 = value
                .parse()
                .context("OPTRADE_CYCLE_PERIOD_SECS must be an integer")?;
            self.cycle_period = Duration::from_secs(secs);
        }
        if let Ok(value) = env::var("OPTRADE_ACCOUNT_BALANCE") {
            self.account_balance = value
                .parse()
                .context("OPTRADE_ACCOUNT_BALANCE must be a number")?;
        }
        if let Ok(value) = env::var("OPTRADE_RISK_PER_TRADE") {
            self.risk_per_trade = value
                .parse()
                .context("OPTRADE_RISK_PER_TRADE must be a number")?;
        }
        if let Ok(value) = env::var("OPTRADE_DATA_DIR") {
            self.data_dir = PathBuf::from(value);
        }
        if let Ok(value) = env::var("OPTRADE_MODEL_PATH") {
            self.model_path = PathBuf::from(value);
        }
        if let Ok(value) = env::var("OPTRADE_CANDLE_FILE") {
            self.candle_file = Some(PathBuf::from(value));
        }

        self.broker.api_key = env::var("FYERS_API_KEY").unwrap_or_default();
        self.broker.api_secret = env::var("FYERS_API_SECRET").unwrap_or_default();
        self.broker.client_id = env::var("FYERS_CLIENT_ID").unwrap_or_default();
        self.broker.real_trading = env::var("ENABLE_REAL_TRADING")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.indices.is_empty() {
            anyhow::bail!("At least one index must be configured");
        }
        if self.account_balance <= 0.0 {
            anyhow::bail!("Account balance must be positive");
        }
        if !(0.0..=1.0).contains(&self.risk_per_trade) {
            anyhow::bail!("risk_per_trade must be in [0, 1]");
        }
        Ok(())
    }
}

fn parse_indices(value: &str) -> Result<Vec<MarketIndex>> {
    let mut indices = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let index = MarketIndex::from_str(part)?;
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_indices() {
        let parsed = parse_indices("NIFTY, banknifty,NIFTY").unwrap();
        assert_eq!(parsed, vec![MarketIndex::Nifty, MarketIndex::BankNifty]);
        assert!(parse_indices("NIFTY,BAD").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cycle_period, Duration::from_secs(300));
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(!config.broker.real_trading);
    }

    #[test]
    fn test_file_overlay() {
        let mut config = Config::default();
        let file: FileConfig = toml::from_str(
            r#"
            indices = ["BANKNIFTY"]
            risk_profile = "aggressive"
            cycle_period_secs = 60
            "#,
        )
        .unwrap();
        config.apply_file(file).unwrap();
        assert_eq!(config.indices, vec![MarketIndex::BankNifty]);
        assert_eq!(config.risk_profile, RiskProfile::Aggressive);
        assert_eq!(config.cycle_period, Duration::from_secs(60));
    }
}
