//! Multi-source decision fusion: weighted combination of the ML,
//! indicator, pattern and psychology signals under a risk profile, with
//! the pre-execution risk gate, lot sizing and expiry selection.

use crate::domain::market::MarketIndex;
use crate::domain::trading::{
    Decision, RiskProfile, Signal, SignalKind, SignalSource, SourceContribution, TradeAction,
};
use chrono::{Datelike, Days, NaiveDate, Weekday};

const UNANIMITY_BOOST: f64 = 0.10;
const CONFIDENCE_CAP: f64 = 0.98;
const STOP_ATR_MULTIPLIER: f64 = 1.5;
const TARGET_ATR_MULTIPLIER: f64 = 2.5;

/// Market state the gate and level calculation need at decision time.
#[derive(Debug, Clone)]
pub struct FusionContext {
    pub index: MarketIndex,
    pub underlying: f64,
    pub atr: f64,
    pub atr_percent: f64,
    pub adx: f64,
    pub today: NaiveDate,
}

pub struct FusionEngine {
    profile: RiskProfile,
}

impl FusionEngine {
    pub fn new(profile: RiskProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> RiskProfile {
        self.profile
    }

    /// Weighted vote over the contributing sources. Absent sources drop
    /// out and the remaining weights renormalize.
    pub fn fuse(
        &self,
        ml: &Signal,
        indicators: &Signal,
        patterns: Option<&Signal>,
        psychology: Option<&Signal>,
    ) -> (Signal, Vec<SourceContribution>) {
        let (w_ml, w_ind, w_sentiment) = self.profile.weights();
        let mut weighted: Vec<(&Signal, f64)> = vec![(ml, w_ml), (indicators, w_ind)];
        if let Some(signal) = patterns {
            weighted.push((signal, w_sentiment));
        }
        if let Some(signal) = psychology {
            weighted.push((signal, w_sentiment));
        }

        let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
        let contributions: Vec<SourceContribution> = weighted
            .iter()
            .map(|(signal, weight)| SourceContribution {
                source: signal.source,
                kind: signal.kind,
                confidence: signal.confidence,
                weight: weight / total_weight,
            })
            .collect();

        let score = |kind: SignalKind| -> f64 {
            contributions
                .iter()
                .filter(|c| c.kind == kind)
                .map(|c| c.weight * c.confidence)
                .sum()
        };
        let call_score = score(SignalKind::BuyCall);
        let put_score = score(SignalKind::BuyPut);
        let wait_score = score(SignalKind::Wait);

        let (kind, mut confidence) =
            if call_score >= put_score && call_score >= wait_score && call_score > 0.0 {
                (SignalKind::BuyCall, call_score)
            } else if put_score >= wait_score && put_score > 0.0 {
                (SignalKind::BuyPut, put_score)
            } else {
                (SignalKind::Wait, wait_score)
            };

        // consensus boost over the ml / indicator / pattern trio; the
        // psychology vote never blocks it. With the pattern source in the
        // vote, unanimity additionally clears the strongest of the three
        // by the boost margin.
        let trio_agrees = ml.kind == kind
            && indicators.kind == kind
            && patterns.is_none_or(|p| p.kind == kind);
        if kind.is_directional() && trio_agrees {
            confidence += UNANIMITY_BOOST;
            if let Some(patterns) = patterns {
                let best = ml
                    .confidence
                    .max(indicators.confidence)
                    .max(patterns.confidence);
                confidence = confidence.max(best + UNANIMITY_BOOST);
            }
            confidence = confidence.min(CONFIDENCE_CAP);
        }

        let reason = match kind {
            SignalKind::Wait => "No directional consensus across sources".to_string(),
            _ => {
                let leaders: Vec<String> = contributions
                    .iter()
                    .filter(|c| c.kind == kind)
                    .map(|c| c.source.to_string())
                    .collect();
                format!("{} consensus from {}", kind, leaders.join(" + "))
            }
        };

        let mut signal = Signal::new(kind, confidence, SignalSource::Ml, reason);
        // the fused signal is multi-source; tag it with the strongest leg
        signal.source = contributions
            .iter()
            .filter(|c| c.kind == kind)
            .max_by(|a, b| (a.weight * a.confidence).total_cmp(&(b.weight * b.confidence)))
            .map(|c| c.source)
            .unwrap_or(SignalSource::Ml);
        (signal, contributions)
    }

    /// Gate rejection reason, when the trade should not execute.
    fn gate_rejection(&self, risk_reward: f64, context: &FusionContext) -> Option<String> {
        if risk_reward < self.profile.min_risk_reward() {
            return Some(format!(
                "risk/reward {risk_reward:.2} below {:.1} minimum",
                self.profile.min_risk_reward()
            ));
        }
        if context.atr_percent > self.profile.max_atr_percent() {
            return Some(format!(
                "volatility {:.2}% above {:.1}% ceiling",
                context.atr_percent,
                self.profile.max_atr_percent()
            ));
        }
        if context.adx < self.profile.min_adx() {
            return Some(format!(
                "trend strength ADX {:.1} below {:.0} floor",
                context.adx,
                self.profile.min_adx()
            ));
        }
        None
    }

    /// Full decision: fused signal, action, strike/expiry, levels, sizing.
    pub fn decide(
        &self,
        ml: &Signal,
        indicators: &Signal,
        patterns: Option<&Signal>,
        psychology: Option<&Signal>,
        context: &FusionContext,
    ) -> Decision {
        let (signal, contributions) = self.fuse(ml, indicators, patterns, psychology);
        let confidence = signal.confidence;

        if signal.kind == SignalKind::Wait {
            return Decision {
                signal,
                action: TradeAction::NoAction,
                adjusted_confidence: confidence,
                lots: 1,
                strike: None,
                expiry: None,
                entry: None,
                stop_loss: None,
                target: None,
                risk_reward: None,
                contributions,
                gate_rejection: None,
            };
        }

        let entry = context.underlying;
        let floor = entry * 0.001;
        let stop_distance = (context.atr * STOP_ATR_MULTIPLIER).max(floor);
        let target_distance =
            (context.atr * TARGET_ATR_MULTIPLIER).max(floor * TARGET_ATR_MULTIPLIER / STOP_ATR_MULTIPLIER);
        let (stop_loss, target) = match signal.kind {
            SignalKind::BuyCall => (entry - stop_distance, entry + target_distance),
            _ => (entry + stop_distance, entry - target_distance),
        };
        // reward over risk from the actual levels; the gate compares this
        // against the profile minimum
        let risk_reward = match signal.kind {
            SignalKind::BuyCall => (target - entry) / (entry - stop_loss),
            _ => (entry - target) / (stop_loss - entry),
        };

        let step = context.index.strike_step();
        let atm = context.index.atm_strike(entry);
        let strike = match signal.kind {
            SignalKind::BuyCall => atm - step,
            _ => atm + step,
        };
        let expiry = next_expiry(context.today, context.index, self.profile);

        let mut action = if confidence >= self.profile.confidence_threshold() {
            TradeAction::ExecuteTrade
        } else {
            TradeAction::SuggestTrade
        };
        let gate_rejection = if action == TradeAction::ExecuteTrade {
            let rejection = self.gate_rejection(risk_reward, context);
            if rejection.is_some() {
                action = TradeAction::SuggestTrade;
            }
            rejection
        } else {
            None
        };

        let lots = if confidence > 0.9 {
            3
        } else if confidence > 0.8 {
            2
        } else {
            1
        };

        Decision {
            signal,
            action,
            adjusted_confidence: confidence,
            lots,
            strike: Some(strike),
            expiry: Some(expiry.format("%Y-%m-%d").to_string()),
            entry: Some(entry),
            stop_loss: Some(stop_loss),
            target: Some(target),
            risk_reward: Some(risk_reward),
            contributions,
            gate_rejection,
        }
    }
}

/// Balance-scaled lot count: `max(1, floor(balance · risk_per_trade /
/// (|entry − stop| · lot_size)))`.
pub fn calculate_lots(
    balance: f64,
    risk_per_trade: f64,
    entry: f64,
    stop_loss: f64,
    index: MarketIndex,
) -> u32 {
    let risk_per_lot = (entry - stop_loss).abs() * index.lot_size() as f64;
    if risk_per_lot <= 0.0 {
        return 1;
    }
    let lots = (balance * risk_per_trade / risk_per_lot).floor() as i64;
    lots.max(1) as u32
}

/// The next weekly expiry for the index calendar, rolling to the
/// following week when the current expiry is too close for the profile.
pub fn next_expiry(today: NaiveDate, index: MarketIndex, profile: RiskProfile) -> NaiveDate {
    let expiry_day = index.expiry_weekday();
    let days_until = days_until_weekday(today.weekday(), expiry_day);
    let roll = if days_until < profile.expiry_roll_days() {
        7
    } else {
        0
    };
    today
        .checked_add_days(Days::new((days_until + roll) as u64))
        .expect("expiry date within calendar range")
}

fn days_until_weekday(from: Weekday, to: Weekday) -> i64 {
    let from = from.num_days_from_monday() as i64;
    let to = to.num_days_from_monday() as i64;
    (to - from).rem_euclid(7)
}
