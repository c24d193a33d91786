//! The scheduled analysis pipeline: per-index cycles that fetch, analyze,
//! fuse and log, with the candle and chain sub-pipelines running
//! concurrently inside each cycle.

use crate::application::chain::{
    self, ChainAnalysis, ChainSignals, PositionSuggestion, PsychologyReport,
};
use crate::application::fusion::{FusionContext, FusionEngine, calculate_lots};
use crate::application::indicators::{
    IndicatorConfig, IndicatorFrame, TrendDirection, get_indicator_signals, get_trend_strength,
};
use crate::application::patterns::{PatternMarks, detect_patterns, pattern_to_signal};
use crate::application::report::{ChainChartData, CycleReport, CycleResult, TrendSummary};
use crate::config::Config;
use crate::domain::market::{MarketIndex, OptionChainSnapshot};
use crate::domain::ml::feature_registry::FeatureSet;
use crate::domain::ports::{
    CandleSource, OptionChainSource, OrderDispatcher, OrderPayload, SignalClassifier,
    option_symbol,
};
use crate::domain::trading::{Decision, Signal, SignalKind, TradeAction, TradeUpdate};
use crate::infrastructure::persistence::{TradeDraft, TradeJournal};
use chrono::{Datelike, Local, NaiveDateTime, Weekday};
use futures::future::join_all;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Everything produced by the candle-side sub-pipeline.
struct CandleAnalysis {
    frame: IndicatorFrame,
    marks: PatternMarks,
    trend: TrendDirection,
    strength: f64,
    indicator_signal: Signal,
    pattern_signal: Signal,
}

/// Everything produced by the chain-side sub-pipeline.
struct ChainPipeline {
    snapshot: OptionChainSnapshot,
    analysis: ChainAnalysis,
    psychology: PsychologyReport,
    signals: ChainSignals,
    suggestion: Option<PositionSuggestion>,
}

pub struct Orchestrator {
    config: Config,
    candle_source: Arc<dyn CandleSource>,
    chain_source: Arc<dyn OptionChainSource>,
    classifier: Arc<dyn SignalClassifier>,
    dispatcher: Arc<dyn OrderDispatcher>,
    journal: Arc<TradeJournal>,
    indicator_config: IndicatorConfig,
    fusion: FusionEngine,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        candle_source: Arc<dyn CandleSource>,
        chain_source: Arc<dyn OptionChainSource>,
        classifier: Arc<dyn SignalClassifier>,
        dispatcher: Arc<dyn OrderDispatcher>,
        journal: Arc<TradeJournal>,
    ) -> Self {
        let fusion = FusionEngine::new(config.risk_profile);
        Self {
            config,
            candle_source,
            chain_source,
            classifier,
            dispatcher,
            journal,
            indicator_config: IndicatorConfig::default(),
            fusion,
        }
    }

    pub fn journal(&self) -> Arc<TradeJournal> {
        Arc::clone(&self.journal)
    }

    /// The periodic scheduler. Ticks are skipped rather than overlapped
    /// when a round runs past its period.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.cycle_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            period_secs = self.config.cycle_period.as_secs(),
            indices = ?self.config.indices,
            "Orchestrator started"
        );
        loop {
            ticker.tick().await;
            if !self.config.ignore_session_hours && !in_session(Local::now().naive_local()) {
                continue;
            }
            self.run_once().await;
        }
    }

    /// One analysis round: every configured index in parallel.
    pub async fn run_once(&self) -> Vec<CycleReport> {
        let cycles = self.config.indices.iter().map(|&index| async move {
            // stagger workers so parallel cycles do not hit the source at
            // the same instant
            let jitter = rand::rng().random_range(0..400u64);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
            self.run_cycle(index).await
        });
        let reports = join_all(cycles).await;
        for report in &reports {
            if let Err(e) = self.journal.write_report(report) {
                error!(index = %report.index, "Failed to write cycle report: {e}");
            }
        }
        reports
    }

    /// One full cycle for one index. Failures abort the cycle without
    /// mutating any state; the report carries the cause.
    pub async fn run_cycle(&self, index: MarketIndex) -> CycleReport {
        let started = Local::now().naive_local();
        match self.analyze_index(index).await {
            Ok(report) => report,
            Err(e) => {
                warn!(index = %index, "Cycle aborted: {e:#}");
                CycleReport::failed(index, started, format!("{e:#}"))
            }
        }
    }

    async fn analyze_index(&self, index: MarketIndex) -> anyhow::Result<CycleReport> {
        let started = Local::now().naive_local();
        let deadline = self.config.http_timeout + Duration::from_secs(5);

        // candle and chain pipelines are independent until fusion
        let (candle_side, chain_side) = tokio::join!(
            tokio::time::timeout(deadline, self.candle_pipeline(index)),
            tokio::time::timeout(deadline, self.chain_pipeline(index)),
        );
        let candle_side = candle_side
            .map_err(|_| anyhow::anyhow!("candle pipeline exceeded its deadline"))??;
        let chain_side =
            chain_side.map_err(|_| anyhow::anyhow!("chain pipeline exceeded its deadline"))??;

        let ml_signal = self.classify(&candle_side).await?;
        let psychology_signal = chain_side.psychology.signal();

        let last = candle_side.frame.last_index();
        let context = FusionContext {
            index,
            underlying: chain_side.snapshot.underlying,
            atr: candle_side.frame.volatility.atr[last],
            atr_percent: candle_side.frame.volatility.atr_percent[last],
            adx: candle_side.frame.trend.adx[last],
            today: started.date(),
        };
        let decision = self.fusion.decide(
            &ml_signal,
            &candle_side.indicator_signal,
            Some(&candle_side.pattern_signal),
            Some(&psychology_signal),
            &context,
        );
        info!(
            index = %index,
            signal = %decision.signal.kind,
            action = %decision.action,
            confidence = decision.adjusted_confidence,
            "Cycle decision"
        );

        if matches!(
            decision.action,
            TradeAction::ExecuteTrade | TradeAction::SuggestTrade
        ) {
            self.record_decision(index, &decision, &candle_side, &chain_side)
                .await?;
        }

        let (_, strategies) =
            chain::recommend_strategies(&chain_side.snapshot, &chain_side.analysis, None);
        let latest_patterns: Vec<String> = candle_side
            .marks
            .last()
            .map(|patterns| patterns.iter().map(|p| p.label().to_string()).collect())
            .unwrap_or_default();

        Ok(CycleReport {
            index,
            timestamp: started,
            result: CycleResult::Completed {
                signal: decision.signal.kind.to_string(),
                confidence: decision.adjusted_confidence,
                reason: decision.signal.reason.clone(),
            },
            chart_data: Some(ChainChartData::from_snapshot(
                &chain_side.snapshot,
                &chain_side.analysis,
            )),
            analysis: Some(chain_side.analysis),
            psychology: Some(chain_side.psychology),
            chain_signals: Some(chain_side.signals),
            trade_suggestion: chain_side.suggestion,
            strategy_recommendations: strategies,
            trend: Some(TrendSummary {
                trend: candle_side.trend,
                strength: candle_side.strength,
                rsi: candle_side.frame.momentum.rsi[last],
                macd: candle_side.frame.momentum.macd[last],
                atr: candle_side.frame.volatility.atr[last],
                patterns: latest_patterns,
            }),
            decision: Some(decision),
        })
    }

    async fn candle_pipeline(&self, index: MarketIndex) -> anyhow::Result<CandleAnalysis> {
        let candles = self.candle_source.fetch_candles(index).await?;
        if candles.is_empty() {
            anyhow::bail!("candle source returned no bars for {index}");
        }
        let frame = IndicatorFrame::build(candles, &self.indicator_config);
        let marks = detect_patterns(&frame.candles);
        let (trend, strength) = get_trend_strength(&frame);
        let indicator_signal = get_indicator_signals(&frame);
        let pattern_signal = pattern_to_signal(&marks, trend);
        Ok(CandleAnalysis {
            frame,
            marks,
            trend,
            strength,
            indicator_signal,
            pattern_signal,
        })
    }

    async fn chain_pipeline(&self, index: MarketIndex) -> anyhow::Result<ChainPipeline> {
        let snapshot = self.chain_source.fetch_chain(index).await?;
        snapshot.validate()?;
        let analysis = ChainAnalysis::analyze(&snapshot);
        let psychology = chain::analyze_psychology(&analysis, &snapshot);
        let signals = chain::generate_chain_signals(&analysis);
        let suggestion = chain::suggest_position(&analysis, &snapshot, &signals.final_signal);
        Ok(ChainPipeline {
            snapshot,
            analysis,
            psychology,
            signals,
            suggestion,
        })
    }

    async fn classify(&self, candle_side: &CandleAnalysis) -> anyhow::Result<Signal> {
        let features = assemble_features(&candle_side.frame, &candle_side.marks);
        let classifier = Arc::clone(&self.classifier);
        let inference = tokio::task::spawn_blocking(move || classifier.classify(&features));
        match tokio::time::timeout(self.config.inference_timeout, inference).await {
            Ok(result) => Ok(result?),
            Err(_) => anyhow::bail!("classifier exceeded its deadline"),
        }
    }

    /// Persists the trade (status OPEN) and, for executions, hands the
    /// order payload to the dispatcher.
    async fn record_decision(
        &self,
        index: MarketIndex,
        decision: &Decision,
        candle_side: &CandleAnalysis,
        chain_side: &ChainPipeline,
    ) -> anyhow::Result<()> {
        let strike = decision.strike.unwrap_or(chain_side.analysis.atm_strike);
        let entry_underlying = decision.entry.unwrap_or(chain_side.snapshot.underlying);
        let premium = premium_for(&chain_side.snapshot, strike, decision.signal.kind);
        let entry_price = premium.unwrap_or(entry_underlying);

        let risk_lots = match decision.stop_loss {
            Some(stop) => calculate_lots(
                self.config.account_balance,
                self.config.risk_per_trade,
                entry_underlying,
                stop,
                index,
            ),
            None => decision.lots,
        };
        let lots = decision.lots.min(risk_lots).max(1);
        let quantity = lots * index.lot_size();

        let patterns: Vec<String> = candle_side
            .marks
            .last()
            .map(|marks| marks.iter().map(|p| p.label().to_string()).collect())
            .unwrap_or_default();

        let draft = TradeDraft {
            index,
            signal: decision.signal.kind,
            entry_time: Local::now().naive_local(),
            entry_price: Decimal::from_f64(entry_price).unwrap_or_default(),
            quantity,
            strike,
            expiry: decision.expiry.clone().unwrap_or_default(),
            stop_loss: decision.stop_loss.and_then(Decimal::from_f64),
            target: decision.target.and_then(Decimal::from_f64),
            confidence: Some(decision.adjusted_confidence),
            patterns_detected: patterns,
            psychology: Some(chain_side.psychology.to_snapshot()),
        };
        let trade_id = self.journal.log(draft).await?;

        if decision.action == TradeAction::ExecuteTrade {
            let expiry = decision
                .expiry
                .as_deref()
                .and_then(|e| chrono::NaiveDate::parse_from_str(e, "%Y-%m-%d").ok())
                .unwrap_or_else(|| Local::now().date_naive());
            let payload = OrderPayload {
                symbol: option_symbol(index, expiry, strike, decision.signal.kind),
                qty: quantity,
                side: 1,
                order_type: 2,
                product_type: "INTRADAY".into(),
                validity: "DAY".into(),
                disclosed_qty: 0,
                limit_price: None,
            };
            match self.dispatcher.place_order(payload).await {
                Ok(ack) => info!(
                    trade_id = %trade_id,
                    order = %ack.order_number,
                    status = %ack.status,
                    "Order dispatched"
                ),
                Err(e) => {
                    // the trade stays logged as a suggestion-grade record
                    warn!(trade_id = %trade_id, "Order dispatch failed: {e:#}");
                }
            }
        }
        Ok(())
    }

    /// Exit observation from the dispatcher: closes the trade and derives
    /// pnl.
    pub async fn record_exit(
        &self,
        trade_id: &str,
        exit_time: NaiveDateTime,
        exit_price: f64,
    ) -> anyhow::Result<()> {
        self.journal
            .update(
                trade_id,
                TradeUpdate {
                    exit_time: Some(exit_time),
                    exit_price: Decimal::from_f64(exit_price),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}

/// Session gate: 09:15-15:30 exchange time, Monday to Friday.
pub fn in_session(now: NaiveDateTime) -> bool {
    let weekday = now.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return false;
    }
    let time = now.time();
    time >= MarketIndex::session_open() && time <= MarketIndex::session_close()
}

fn premium_for(snapshot: &OptionChainSnapshot, strike: f64, kind: SignalKind) -> Option<f64> {
    let entry = snapshot.entry_at(strike)?;
    let premium = match kind {
        SignalKind::BuyPut => entry.pe.last_price,
        _ => entry.ce.last_price,
    };
    (premium > 0.0).then_some(premium)
}

/// Builds the classifier feature row from the latest bar.
pub fn assemble_features(frame: &IndicatorFrame, marks: &PatternMarks) -> FeatureSet {
    let i = frame.last_index();
    let candle = &frame.candles[i];
    let latest_marks = marks.last().map(Vec::as_slice).unwrap_or(&[]);
    FeatureSet {
        open: candle.open,
        high: candle.high,
        low: candle.low,
        close: candle.close,
        bullish_pattern: latest_marks.iter().any(|p| p.direction() > 0),
        bearish_pattern: latest_marks.iter().any(|p| p.direction() < 0),
        rsi: frame.momentum.rsi[i],
        macd: frame.momentum.macd[i],
        macd_signal: frame.momentum.macd_signal[i],
        volume: Some(candle.volume),
        vwap: Some(frame.volume.vwap[i]),
        supertrend_direction: Some(frame.trend.supertrend_direction[i]),
        atr: Some(frame.volatility.atr[i]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_session_gate() {
        let monday_open = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        assert!(in_session(monday_open));

        let monday_pre_open = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(!in_session(monday_pre_open));

        let monday_post_close = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(15, 31, 0)
            .unwrap();
        assert!(!in_session(monday_post_close));

        let saturday = NaiveDate::from_ymd_opt(2025, 1, 4)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert!(!in_session(saturday));
    }

    #[test]
    fn test_feature_assembly_flags_patterns() {
        use crate::application::indicators::test_support::series_from_closes;
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let frame = IndicatorFrame::build(
            series_from_closes(&closes, 1000.0),
            &IndicatorConfig::default(),
        );
        let marks = detect_patterns(&frame.candles);
        let features = assemble_features(&frame, &marks);
        assert_eq!(features.close, *closes.last().unwrap());
        assert!(features.vwap.is_some());
        assert!(features.atr.is_some());
    }
}
