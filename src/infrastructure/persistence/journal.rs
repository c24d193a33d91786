use crate::application::report::CycleReport;
use crate::domain::errors::JournalError;
use crate::domain::market::MarketIndex;
use crate::domain::performance::{
    PerformanceReport, TradeStats, compute_performance, compute_stats,
};
use crate::domain::trading::{
    PsychologySnapshot, SignalKind, TradeRecord, TradeStatus, TradeUpdate,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Fields the orchestrator supplies when opening a trade; the journal owns
/// id assignment, status and the log timestamp.
#[derive(Debug, Clone)]
pub struct TradeDraft {
    pub index: MarketIndex,
    pub signal: SignalKind,
    pub entry_time: NaiveDateTime,
    pub entry_price: Decimal,
    pub quantity: u32,
    pub strike: f64,
    pub expiry: String,
    pub stop_loss: Option<Decimal>,
    pub target: Option<Decimal>,
    pub confidence: Option<f64>,
    pub patterns_detected: Vec<String>,
    pub psychology: Option<PsychologySnapshot>,
}

struct JournalState {
    trades: Vec<TradeRecord>,
    counter: u64,
    performance: PerformanceReport,
    stats: TradeStats,
}

/// The append-only trade journal and its derived caches.
///
/// Single-writer discipline: every mutation goes through one mutex, and
/// readers receive cloned snapshots recomputed at mutation time. Files:
/// `trades.json`, `performance.json`, `stats.json`, plus per-cycle report
/// JSONs, all under one directory.
pub struct TradeJournal {
    dir: PathBuf,
    state: Mutex<JournalState>,
}

impl TradeJournal {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let trades = load_trades(&dir.join("trades.json"))?;
        let counter = trades.len() as u64;
        let performance = compute_performance(&trades);
        let stats = compute_stats(&trades);
        info!(dir = %dir.display(), trades = trades.len(), "Opened trade journal");
        Ok(Self {
            dir,
            state: Mutex::new(JournalState {
                trades,
                counter,
                performance,
                stats,
            }),
        })
    }

    /// Appends a new OPEN trade and returns its id.
    pub async fn log(&self, draft: TradeDraft) -> Result<String, JournalError> {
        let mut state = self.state.lock().await;
        state.counter += 1;
        let trade_id = format!(
            "TRADE_{}_{}",
            state.counter,
            Local::now().naive_local().format("%Y%m%d%H%M%S")
        );
        let record = TradeRecord {
            trade_id: trade_id.clone(),
            index: draft.index,
            signal: draft.signal,
            entry_time: draft.entry_time,
            entry_price: draft.entry_price,
            quantity: draft.quantity,
            strike: draft.strike,
            expiry: draft.expiry,
            status: TradeStatus::Open,
            log_time: Local::now().naive_local(),
            exit_time: None,
            exit_price: None,
            pnl: None,
            stop_loss: draft.stop_loss,
            target: draft.target,
            confidence: draft.confidence,
            patterns_detected: draft.patterns_detected,
            psychology: draft.psychology,
            notes: None,
        };
        record.validate()?;
        state.trades.push(record);
        self.recompute_and_save(&mut state)?;
        info!(trade_id = %trade_id, "Logged trade");
        Ok(trade_id)
    }

    /// Patches an existing trade; exit fields close it and derive pnl.
    pub async fn update(&self, trade_id: &str, update: TradeUpdate) -> Result<(), JournalError> {
        let mut state = self.state.lock().await;
        let trade = state
            .trades
            .iter_mut()
            .find(|t| t.trade_id == trade_id)
            .ok_or_else(|| JournalError::TradeNotFound {
                trade_id: trade_id.to_string(),
            })?;
        trade.apply(update);
        self.recompute_and_save(&mut state)?;
        info!(trade_id = %trade_id, "Updated trade");
        Ok(())
    }

    pub async fn get(&self, trade_id: &str) -> Option<TradeRecord> {
        let state = self.state.lock().await;
        state.trades.iter().find(|t| t.trade_id == trade_id).cloned()
    }

    pub async fn all_trades(&self) -> Vec<TradeRecord> {
        self.state.lock().await.trades.clone()
    }

    pub async fn trades_by_index(&self, index: MarketIndex) -> Vec<TradeRecord> {
        let state = self.state.lock().await;
        state
            .trades
            .iter()
            .filter(|t| t.index == index)
            .cloned()
            .collect()
    }

    pub async fn trades_by_status(&self, status: TradeStatus) -> Vec<TradeRecord> {
        let state = self.state.lock().await;
        state
            .trades
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    pub async fn trades_by_signal(&self, signal: SignalKind) -> Vec<TradeRecord> {
        let state = self.state.lock().await;
        state
            .trades
            .iter()
            .filter(|t| t.signal == signal)
            .cloned()
            .collect()
    }

    /// Entry dates in [start, end]; the end date is inclusive.
    pub async fn trades_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<TradeRecord> {
        let state = self.state.lock().await;
        state
            .trades
            .iter()
            .filter(|t| {
                let date = t.entry_time.date();
                date >= start && date <= end
            })
            .cloned()
            .collect()
    }

    /// The performance view as of the last completed mutation.
    pub async fn performance(&self) -> PerformanceReport {
        self.state.lock().await.performance.clone()
    }

    pub async fn stats(&self) -> TradeStats {
        self.state.lock().await.stats.clone()
    }

    /// Writes a cycle report under its timestamped file name.
    pub fn write_report(&self, report: &CycleReport) -> Result<PathBuf, JournalError> {
        let path = self.dir.join(report.file_name());
        write_json(&path, report)?;
        Ok(path)
    }

    fn recompute_and_save(&self, state: &mut JournalState) -> Result<(), JournalError> {
        state.performance = compute_performance(&state.trades);
        state.stats = compute_stats(&state.trades);
        write_json(&self.dir.join("trades.json"), &state.trades)?;
        write_json(&self.dir.join("performance.json"), &state.performance)?;
        write_json(&self.dir.join("stats.json"), &state.stats)?;
        Ok(())
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), JournalError> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Loads the journal file, skipping malformed records with a warning; a
/// single bad record must never take the journal down.
fn load_trades(path: &Path) -> Result<Vec<TradeRecord>, JournalError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<Value> = serde_json::from_str(&text)?;
    let mut trades = Vec::with_capacity(raw.len());
    for (i, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<TradeRecord>(value) {
            Ok(trade) => trades.push(trade),
            Err(e) => warn!("Skipping malformed trade record #{i}: {e}"),
        }
    }
    Ok(trades)
}
