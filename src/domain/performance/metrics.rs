use crate::domain::performance::correlations::{
    BucketOutcome, PsychologyCorrelation, compute_pattern_effectiveness,
    compute_psychology_correlation,
};
use crate::domain::trading::TradeRecord;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Counting and ratio metrics over closed trades.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub total_trades: usize,
    pub closed_trades: usize,
    pub open_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl_per_trade: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Σ wins / |Σ losses|; absent when there are no losses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_factor: Option<f64>,
    /// avg_win / |avg_loss|; absent when there are no losses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_loss_ratio: Option<f64>,
}

/// Equity-curve and volatility metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub std_deviation: f64,
    pub max_drawdown: f64,
    pub longest_underwater_period: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortino_ratio: Option<f64>,
}

/// Daily win-rate distribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsistencyMetrics {
    pub win_rate_consistency: f64,
    pub daily_win_rate_mean: f64,
    pub daily_win_rate_median: f64,
    pub daily_win_rate_std: f64,
}

/// The re-computable performance view. Never the source of truth; the
/// journal is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub basic: BasicMetrics,
    pub risk: RiskMetrics,
    pub consistency: ConsistencyMetrics,
    pub by_index: BTreeMap<String, BucketOutcome>,
    pub by_signal: BTreeMap<String, BucketOutcome>,
    pub by_month: BTreeMap<String, BucketOutcome>,
    pub by_hour: BTreeMap<String, BucketOutcome>,
}

/// Streaks, hold times and correlation analytics (the stats.json cache).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    pub avg_hold_time_minutes: f64,
    pub pattern_effectiveness: BTreeMap<String, f64>,
    pub pattern_performance: BTreeMap<String, BucketOutcome>,
    pub psychology: PsychologyCorrelation,
}

fn effective_time(trade: &TradeRecord) -> NaiveDateTime {
    trade.exit_time.unwrap_or(trade.entry_time)
}

/// Closed trades ordered by exit time (entry time when exit is absent).
fn closed_sorted(trades: &[TradeRecord]) -> Vec<&TradeRecord> {
    let mut closed: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_closed()).collect();
    closed.sort_by_key(|t| effective_time(t));
    closed
}

/// Per-day pnl sums in exit-time order.
fn daily_returns(closed: &[&TradeRecord]) -> Vec<f64> {
    let mut by_day: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    for trade in closed {
        *by_day.entry(effective_time(trade).date()).or_insert(0.0) += trade.pnl_f64();
    }
    by_day.into_values().collect()
}

fn annualized(mean: f64, std: f64) -> Option<f64> {
    if std > 0.0 {
        Some(mean / std * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        None
    }
}

/// Recomputes the full performance view from the trade set.
pub fn compute_performance(trades: &[TradeRecord]) -> PerformanceReport {
    let closed = closed_sorted(trades);

    let mut report = PerformanceReport {
        basic: BasicMetrics {
            total_trades: trades.len(),
            closed_trades: closed.len(),
            open_trades: trades.len() - closed.len(),
            ..Default::default()
        },
        ..Default::default()
    };
    if closed.is_empty() {
        return report;
    }

    let pnls: Vec<f64> = closed.iter().map(|t| t.pnl_f64()).collect();
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

    let total_pnl: f64 = pnls.iter().sum();
    let gross_win: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum::<f64>().abs();
    let avg_win = if wins.is_empty() {
        0.0
    } else {
        gross_win / wins.len() as f64
    };
    let avg_loss = if losses.is_empty() {
        0.0
    } else {
        losses.iter().sum::<f64>() / losses.len() as f64
    };

    report.basic.winning_trades = wins.len();
    report.basic.losing_trades = losses.len();
    report.basic.breakeven_trades = closed.len() - wins.len() - losses.len();
    report.basic.win_rate = wins.len() as f64 / closed.len() as f64;
    report.basic.total_pnl = total_pnl;
    report.basic.avg_pnl_per_trade = total_pnl / closed.len() as f64;
    report.basic.avg_win = avg_win;
    report.basic.avg_loss = avg_loss;
    report.basic.profit_factor = (gross_loss > 0.0).then(|| gross_win / gross_loss);
    report.basic.win_loss_ratio = (avg_loss != 0.0).then(|| avg_win / avg_loss.abs());

    report.risk = compute_risk(&closed, &pnls, total_pnl);
    report.consistency = compute_consistency(&closed);

    for trade in &closed {
        bucket_add(&mut report.by_index, trade.index.to_string(), trade);
        bucket_add(&mut report.by_signal, trade.signal.to_string(), trade);
        bucket_add(
            &mut report.by_month,
            effective_time(trade).format("%Y-%m").to_string(),
            trade,
        );
        bucket_add(
            &mut report.by_hour,
            trade.entry_time.hour().to_string(),
            trade,
        );
    }

    report
}

fn bucket_add(buckets: &mut BTreeMap<String, BucketOutcome>, key: String, trade: &TradeRecord) {
    buckets.entry(key).or_default().add(trade.pnl_f64());
}

fn compute_risk(closed: &[&TradeRecord], pnls: &[f64], total_pnl: f64) -> RiskMetrics {
    let mut risk = RiskMetrics::default();
    if pnls.len() > 1 {
        risk.std_deviation = pnls.iter().std_dev();
    }

    // Equity curve and drawdown in exit-time order.
    let mut equity = 0.0;
    let mut peak = f64::MIN;
    let mut max_drawdown: f64 = 0.0;
    let mut underwater_len = 0usize;
    let mut longest_underwater = 0usize;
    for trade in closed {
        equity += trade.pnl_f64();
        if equity > peak {
            peak = equity;
            underwater_len = 0;
        } else {
            underwater_len += 1;
            longest_underwater = longest_underwater.max(underwater_len);
        }
        max_drawdown = max_drawdown.max(peak - equity);
    }
    risk.max_drawdown = max_drawdown;
    risk.longest_underwater_period = longest_underwater;
    risk.recovery_factor = (max_drawdown > 0.0).then(|| total_pnl / max_drawdown);

    let daily = daily_returns(closed);
    if daily.len() > 1 {
        let mean = daily.iter().mean();
        let std = daily.iter().std_dev();
        risk.sharpe_ratio = annualized(mean, std);

        let downside: Vec<f64> = daily.iter().copied().filter(|r| *r < 0.0).collect();
        if downside.len() > 1 {
            risk.sortino_ratio = annualized(mean, downside.iter().std_dev());
        }
    }
    risk
}

fn compute_consistency(closed: &[&TradeRecord]) -> ConsistencyMetrics {
    let mut by_day: BTreeMap<chrono::NaiveDate, (usize, usize)> = BTreeMap::new();
    for trade in closed {
        let entry = by_day.entry(effective_time(trade).date()).or_insert((0, 0));
        let pnl = trade.pnl_f64();
        if pnl > 0.0 {
            entry.0 += 1;
        } else if pnl < 0.0 {
            entry.1 += 1;
        }
    }

    let rates: Vec<f64> = by_day
        .values()
        .filter(|(w, l)| w + l > 0)
        .map(|(w, l)| *w as f64 / (w + l) as f64)
        .collect();
    if rates.is_empty() {
        return ConsistencyMetrics::default();
    }

    let std = if rates.len() > 1 {
        rates.iter().std_dev()
    } else {
        0.0
    };
    ConsistencyMetrics {
        win_rate_consistency: 1.0 - std,
        daily_win_rate_mean: rates.iter().mean(),
        daily_win_rate_median: median(&rates),
        daily_win_rate_std: std,
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Recomputes streak, hold-time and correlation stats.
pub fn compute_stats(trades: &[TradeRecord]) -> TradeStats {
    let closed = closed_sorted(trades);
    let mut stats = TradeStats::default();
    if closed.is_empty() {
        return stats;
    }

    let mut streak = 0usize;
    let mut streak_is_win: Option<bool> = None;
    for trade in &closed {
        let is_win = trade.pnl_f64() > 0.0;
        match streak_is_win {
            Some(prev) if prev == is_win => streak += 1,
            _ => {
                flush_streak(&mut stats, streak_is_win, streak);
                streak_is_win = Some(is_win);
                streak = 1;
            }
        }
    }
    flush_streak(&mut stats, streak_is_win, streak);

    let hold_minutes: Vec<f64> = closed
        .iter()
        .filter_map(|t| {
            t.exit_time
                .map(|exit| (exit - t.entry_time).num_seconds() as f64 / 60.0)
        })
        .collect();
    if !hold_minutes.is_empty() {
        stats.avg_hold_time_minutes = hold_minutes.iter().sum::<f64>() / hold_minutes.len() as f64;
    }

    let (effectiveness, performance) = compute_pattern_effectiveness(&closed);
    stats.pattern_effectiveness = effectiveness;
    stats.pattern_performance = performance;
    stats.psychology = compute_psychology_correlation(&closed);
    stats
}

fn flush_streak(stats: &mut TradeStats, streak_is_win: Option<bool>, streak: usize) {
    match streak_is_win {
        Some(true) => stats.max_win_streak = stats.max_win_streak.max(streak),
        Some(false) => stats.max_loss_streak = stats.max_loss_streak.max(streak),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketIndex;
    use crate::domain::trading::{SignalKind, TradeStatus};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn closed_trade(day: u32, hour: u32, pnl: f64, signal: SignalKind) -> TradeRecord {
        let entry = NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap();
        let entry_price = Decimal::from(100);
        let quantity = 50u32;
        // exit price consistent with the requested pnl
        let exit_price = entry_price
            + Decimal::from_f64(pnl).unwrap() * Decimal::from(signal.direction())
                / Decimal::from(quantity);
        let mut trade = TradeRecord {
            trade_id: format!("TRADE_{day}_{hour}"),
            index: MarketIndex::Nifty,
            signal,
            entry_time: entry,
            entry_price,
            quantity,
            strike: 22500.0,
            expiry: "2025-01-09".into(),
            status: TradeStatus::Open,
            log_time: entry,
            exit_time: None,
            exit_price: None,
            pnl: None,
            stop_loss: None,
            target: None,
            confidence: None,
            patterns_detected: vec![],
            psychology: None,
            notes: None,
        };
        trade.apply(crate::domain::trading::TradeUpdate {
            exit_time: Some(entry + chrono::Duration::minutes(60)),
            exit_price: Some(exit_price),
            ..Default::default()
        });
        trade
    }

    #[test]
    fn test_pnl_identity_and_totals() {
        let trades = vec![
            closed_trade(2, 9, 300.0, SignalKind::BuyCall),
            closed_trade(2, 10, -100.0, SignalKind::BuyPut),
            closed_trade(3, 11, 200.0, SignalKind::BuyCall),
        ];
        let report = compute_performance(&trades);
        assert_eq!(report.basic.closed_trades, 3);
        assert!((report.basic.total_pnl - 400.0).abs() < 1e-9);
        assert!((report.basic.win_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.basic.profit_factor, Some(5.0));
        assert!((report.basic.avg_win - 250.0).abs() < 1e-9);
        assert!((report.basic.avg_loss + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_winner_matches_lifecycle_scenario() {
        let trades = vec![closed_trade(2, 9, 300.0, SignalKind::BuyCall)];
        let report = compute_performance(&trades);
        assert!((report.basic.total_pnl - 300.0).abs() < 1e-9);
        assert_eq!(report.basic.win_rate, 1.0);
        assert_eq!(report.basic.profit_factor, None);
    }

    #[test]
    fn test_drawdown_and_underwater() {
        // equity: 100, 300, 100, 50, 250 -> peak 300, trough 50, dd 250
        let trades = vec![
            closed_trade(2, 9, 100.0, SignalKind::BuyCall),
            closed_trade(2, 10, 200.0, SignalKind::BuyCall),
            closed_trade(2, 11, -200.0, SignalKind::BuyCall),
            closed_trade(2, 12, -50.0, SignalKind::BuyCall),
            closed_trade(2, 13, 200.0, SignalKind::BuyCall),
        ];
        let report = compute_performance(&trades);
        assert!((report.risk.max_drawdown - 250.0).abs() < 1e-9);
        assert_eq!(report.risk.longest_underwater_period, 3);
    }

    #[test]
    fn test_open_trades_do_not_count() {
        let mut open = closed_trade(2, 9, 100.0, SignalKind::BuyCall);
        open.status = TradeStatus::Open;
        open.pnl = None;
        let report = compute_performance(&[open]);
        assert_eq!(report.basic.closed_trades, 0);
        assert_eq!(report.basic.open_trades, 1);
        assert_eq!(report.basic.total_pnl, 0.0);
    }

    #[test]
    fn test_buckets() {
        let trades = vec![
            closed_trade(2, 9, 100.0, SignalKind::BuyCall),
            closed_trade(2, 9, -50.0, SignalKind::BuyPut),
            closed_trade(3, 14, 75.0, SignalKind::BuyCall),
        ];
        let report = compute_performance(&trades);
        assert_eq!(report.by_signal["BUY CALL"].trades, 2);
        assert_eq!(report.by_signal["BUY PUT"].trades, 1);
        assert_eq!(report.by_hour["9"].trades, 2);
        assert_eq!(report.by_month["2025-01"].trades, 3);
        assert!((report.by_index["NIFTY"].total_pnl - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_streaks_and_hold_time() {
        let trades = vec![
            closed_trade(2, 9, 100.0, SignalKind::BuyCall),
            closed_trade(2, 10, 100.0, SignalKind::BuyCall),
            closed_trade(2, 11, 100.0, SignalKind::BuyCall),
            closed_trade(2, 12, -10.0, SignalKind::BuyCall),
            closed_trade(2, 13, -10.0, SignalKind::BuyCall),
            closed_trade(2, 14, 100.0, SignalKind::BuyCall),
        ];
        let stats = compute_stats(&trades);
        assert_eq!(stats.max_win_streak, 3);
        assert_eq!(stats.max_loss_streak, 2);
        assert!((stats.avg_hold_time_minutes - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_sortino_uses_downside_only() {
        let trades = vec![
            closed_trade(2, 9, 120.0, SignalKind::BuyCall),
            closed_trade(3, 9, -60.0, SignalKind::BuyCall),
            closed_trade(6, 9, 90.0, SignalKind::BuyCall),
            closed_trade(7, 9, -30.0, SignalKind::BuyCall),
        ];
        let report = compute_performance(&trades);
        let sharpe = report.risk.sharpe_ratio.unwrap();
        let sortino = report.risk.sortino_ratio.unwrap();
        // downside std (n-1) over {-60,-30} is smaller than the full-set std
        assert!(sortino > sharpe);
    }
}
