use super::analyzer::ChainAnalysis;
use crate::domain::market::OptionChainSnapshot;
use crate::domain::trading::{Signal, SignalKind, SignalSource};
use serde::{Deserialize, Serialize};

/// The micro-signal list plus the aggregated recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSignals {
    pub signals: Vec<Signal>,
    pub final_signal: Signal,
}

/// A sized, levelled trade suggestion derived from the final chain signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSuggestion {
    pub signal: SignalKind,
    pub confidence: f64,
    pub reason: String,
    pub entry: f64,
    pub strike: f64,
    pub premium: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub lots: u32,
    pub expiry: String,
    pub risk_reward: f64,
}

const OI_BUILDUP_THRESHOLD: f64 = 100_000.0;
const OI_DOMINANCE_THRESHOLD: f64 = 500_000.0;
const AGGREGATE_GATE: f64 = 0.65;
const STOP_LOSS_PERCENT: f64 = 0.01;
const TARGET_PERCENT: f64 = 0.02;

/// Produces the five chain micro-signals and aggregates them.
///
/// Aggregation sums each side's confidences, normalizes by the signal-slot
/// count (5), and requires the winning side to clear 0.65.
pub fn generate_chain_signals(analysis: &ChainAnalysis) -> ChainSignals {
    let mut signals: Vec<Signal> = Vec::new();
    let underlying = analysis.underlying;

    // 1. PCR extremes (contrarian)
    let pcr = analysis.pcr_oi;
    if pcr > 1.5 {
        signals.push(Signal::new(
            SignalKind::BuyCall,
            0.70,
            SignalSource::OptionChain,
            format!("Extremely high PCR ({pcr}) indicates potential reversal"),
        ));
    } else if pcr > 0.0 && pcr < 0.5 {
        signals.push(Signal::new(
            SignalKind::BuyPut,
            0.70,
            SignalSource::OptionChain,
            format!("Extremely low PCR ({pcr}) indicates potential reversal"),
        ));
    }

    // 2. OI buildup clusters above/below price
    if let Some(ce_change) = analysis.key_levels.significant_ce_change.first()
        && ce_change.strike > underlying
        && ce_change.change_in_oi > OI_BUILDUP_THRESHOLD
    {
        let mut signal = Signal::new(
            SignalKind::BuyPut,
            0.65,
            SignalSource::OptionChain,
            format!(
                "Strong call writing at {} creating resistance",
                ce_change.strike
            ),
        );
        signal.target = Some(ce_change.strike);
        signals.push(signal);
    }
    if let Some(pe_change) = analysis.key_levels.significant_pe_change.first()
        && pe_change.strike < underlying
        && pe_change.change_in_oi > OI_BUILDUP_THRESHOLD
    {
        let mut signal = Signal::new(
            SignalKind::BuyCall,
            0.65,
            SignalSource::OptionChain,
            format!("Strong put writing at {} creating support", pe_change.strike),
        );
        signal.target = Some(pe_change.strike);
        signals.push(signal);
    }

    // 3. Distance from max pain
    if underlying > 0.0 {
        let gap_percent = (analysis.max_pain - underlying) / underlying * 100.0;
        if gap_percent > 1.0 {
            signals.push(Signal::new(
                SignalKind::BuyCall,
                0.60,
                SignalSource::OptionChain,
                format!(
                    "Price ({underlying}) below max pain ({}), potential upward drift",
                    analysis.max_pain
                ),
            ));
        } else if gap_percent < -1.0 {
            signals.push(Signal::new(
                SignalKind::BuyPut,
                0.60,
                SignalSource::OptionChain,
                format!(
                    "Price ({underlying}) above max pain ({}), potential downward drift",
                    analysis.max_pain
                ),
            ));
        }
    }

    // 4. Steep IV skew
    if let (Some(put_delta), Some(call_delta)) = (
        analysis.iv_skew.avg_put_delta(),
        analysis.iv_skew.avg_call_delta(),
    ) {
        if put_delta > 5.0 && put_delta > call_delta * 1.5 {
            signals.push(Signal::new(
                SignalKind::BuyCall,
                0.55,
                SignalSource::OptionChain,
                "Steep put IV skew indicates market fear and potential reversal",
            ));
        } else if call_delta > 5.0 && call_delta > put_delta * 1.5 {
            signals.push(Signal::new(
                SignalKind::BuyPut,
                0.55,
                SignalSource::OptionChain,
                "Steep call IV skew indicates excessive optimism and potential reversal",
            ));
        }
    }

    // 5. OI momentum dominance
    let ce_change = analysis.momentum.ce_oi_change;
    let pe_change = analysis.momentum.pe_oi_change;
    if ce_change > OI_DOMINANCE_THRESHOLD && ce_change > pe_change * 2.0 {
        signals.push(Signal::new(
            SignalKind::BuyPut,
            0.60,
            SignalSource::OptionChain,
            "Heavy call writing indicating bearish sentiment",
        ));
    }
    if pe_change > OI_DOMINANCE_THRESHOLD && pe_change > ce_change * 2.0 {
        signals.push(Signal::new(
            SignalKind::BuyCall,
            0.60,
            SignalSource::OptionChain,
            "Heavy put writing indicating bullish sentiment",
        ));
    }

    let final_signal = aggregate(&signals);
    ChainSignals {
        signals,
        final_signal,
    }
}

fn aggregate(signals: &[Signal]) -> Signal {
    if signals.is_empty() {
        return Signal::wait(SignalSource::OptionChain, "No clear signals detected");
    }

    let call_confidence: f64 = signals
        .iter()
        .filter(|s| s.kind == SignalKind::BuyCall)
        .map(|s| s.confidence)
        .sum::<f64>()
        / 5.0;
    let put_confidence: f64 = signals
        .iter()
        .filter(|s| s.kind == SignalKind::BuyPut)
        .map(|s| s.confidence)
        .sum::<f64>()
        / 5.0;

    let best = |kind: SignalKind| {
        signals
            .iter()
            .filter(|s| s.kind == kind)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    };

    if call_confidence > put_confidence && call_confidence > AGGREGATE_GATE {
        let strongest = best(SignalKind::BuyCall).expect("call side is non-empty");
        let mut signal = Signal::new(
            SignalKind::BuyCall,
            call_confidence,
            SignalSource::OptionChain,
            strongest.reason.clone(),
        );
        signal.target = strongest.target;
        signal
    } else if put_confidence > call_confidence && put_confidence > AGGREGATE_GATE {
        let strongest = best(SignalKind::BuyPut).expect("put side is non-empty");
        let mut signal = Signal::new(
            SignalKind::BuyPut,
            put_confidence,
            SignalSource::OptionChain,
            strongest.reason.clone(),
        );
        signal.target = strongest.target;
        signal
    } else {
        let mut signal = Signal::wait(
            SignalSource::OptionChain,
            "Conflicting signals or low confidence",
        );
        signal.confidence = call_confidence.max(put_confidence).max(0.0);
        signal
    }
}

/// Turns the final chain signal into a strike / premium / level suggestion.
///
/// Strike selection prefers one step into the money for better delta;
/// stop is 1% against the direction, target 2% with it. Lots scale with
/// confidence (1 / 2 above 0.7 / 3 above 0.8).
pub fn suggest_position(
    analysis: &ChainAnalysis,
    snapshot: &OptionChainSnapshot,
    final_signal: &Signal,
) -> Option<PositionSuggestion> {
    if !final_signal.kind.is_directional() {
        return None;
    }
    let underlying = analysis.underlying;
    let step = snapshot.index.strike_step();
    let atm = analysis.atm_strike;

    let preferred = match final_signal.kind {
        SignalKind::BuyCall => atm - step,
        SignalKind::BuyPut => atm + step,
        SignalKind::Wait => unreachable!(),
    };
    // fall back to ATM when the ITM strike is not listed
    let entry_row = snapshot
        .entry_at(preferred)
        .or_else(|| snapshot.entry_at(atm))?;
    let premium = match final_signal.kind {
        SignalKind::BuyCall => entry_row.ce.last_price,
        _ => entry_row.pe.last_price,
    };

    let (stop_loss, target, risk_reward) = match final_signal.kind {
        SignalKind::BuyCall => {
            let stop = underlying * (1.0 - STOP_LOSS_PERCENT);
            let target = underlying * (1.0 + TARGET_PERCENT);
            let risk = underlying - stop;
            let reward = target - underlying;
            (stop, target, if risk > 0.0 { reward / risk } else { 0.0 })
        }
        _ => {
            let stop = underlying * (1.0 + STOP_LOSS_PERCENT);
            let target = underlying * (1.0 - TARGET_PERCENT);
            let risk = stop - underlying;
            let reward = underlying - target;
            (stop, target, if risk > 0.0 { reward / risk } else { 0.0 })
        }
    };

    let lots = if final_signal.confidence > 0.8 {
        3
    } else if final_signal.confidence > 0.7 {
        2
    } else {
        1
    };

    Some(PositionSuggestion {
        signal: final_signal.kind,
        confidence: final_signal.confidence,
        reason: final_signal.reason.clone(),
        entry: underlying,
        strike: entry_row.strike,
        premium,
        stop_loss,
        target,
        lots,
        expiry: snapshot.expiry.clone(),
        risk_reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::option_chain::test_support::snapshot;

    fn bullish_chain() -> (ChainAnalysis, crate::domain::market::OptionChainSnapshot) {
        let mut snap = snapshot(
            22510.0,
            &[22400.0, 22450.0, 22500.0, 22550.0, 22600.0],
            &[900.0, 950.0, 1000.0, 1100.0, 1200.0],
            &[2100.0, 1900.0, 1700.0, 1200.0, 900.0],
        );
        // pcr = 7800/5150 = 1.51 -> contrarian bullish micro-signal
        // heavy put writing below price + dominance
        snap.strikes[1].pe.change_in_oi = 700_000.0;
        for entry in &mut snap.strikes {
            entry.ce.change_in_oi = 10_000.0;
            entry.ce.last_price = 120.0;
            entry.pe.last_price = 95.0;
        }
        (ChainAnalysis::analyze(&snap), snap)
    }

    #[test]
    fn test_micro_signals_collected() {
        let (analysis, _snap) = bullish_chain();
        let chain_signals = generate_chain_signals(&analysis);
        let calls = chain_signals
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::BuyCall)
            .count();
        assert!(calls >= 3, "expected pcr + support + dominance calls, got {calls}");
    }

    #[test]
    fn test_aggregation_gate() {
        let (analysis, _snap) = bullish_chain();
        let chain_signals = generate_chain_signals(&analysis);
        // call side: 0.70 + 0.65 + 0.60 (+ max-pain maybe) / 5 > 0.65 gate
        // is not guaranteed; verify the arithmetic instead of the verdict
        let call_sum: f64 = chain_signals
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::BuyCall)
            .map(|s| s.confidence)
            .sum();
        if call_sum / 5.0 > 0.65 {
            assert_eq!(chain_signals.final_signal.kind, SignalKind::BuyCall);
            assert!((chain_signals.final_signal.confidence - call_sum / 5.0).abs() < 1e-9);
        } else {
            assert_eq!(chain_signals.final_signal.kind, SignalKind::Wait);
        }
    }

    #[test]
    fn test_quiet_chain_waits() {
        let snap = snapshot(
            22500.0,
            &[22450.0, 22500.0, 22550.0],
            &[1000.0, 1000.0, 1000.0],
            &[1000.0, 1000.0, 1000.0],
        );
        let analysis = ChainAnalysis::analyze(&snap);
        let chain_signals = generate_chain_signals(&analysis);
        assert_eq!(chain_signals.final_signal.kind, SignalKind::Wait);
    }

    #[test]
    fn test_position_suggestion_prefers_itm_call() {
        let (analysis, snap) = bullish_chain();
        let signal = Signal::new(
            SignalKind::BuyCall,
            0.82,
            SignalSource::OptionChain,
            "test",
        );
        let suggestion = suggest_position(&analysis, &snap, &signal).unwrap();
        // ATM 22500, step 50 -> ITM call at 22450
        assert_eq!(suggestion.strike, 22450.0);
        assert_eq!(suggestion.premium, 120.0);
        assert_eq!(suggestion.lots, 3);
        assert!((suggestion.stop_loss - 22510.0 * 0.99).abs() < 1e-9);
        assert!((suggestion.target - 22510.0 * 1.02).abs() < 1e-9);
        assert!((suggestion.risk_reward - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_suggestion_put_side() {
        let (analysis, snap) = bullish_chain();
        let signal = Signal::new(SignalKind::BuyPut, 0.72, SignalSource::OptionChain, "test");
        let suggestion = suggest_position(&analysis, &snap, &signal).unwrap();
        assert_eq!(suggestion.strike, 22550.0);
        assert_eq!(suggestion.premium, 95.0);
        assert_eq!(suggestion.lots, 2);
        assert!(suggestion.stop_loss > suggestion.entry);
        assert!(suggestion.target < suggestion.entry);
    }

    #[test]
    fn test_no_suggestion_for_wait() {
        let (analysis, snap) = bullish_chain();
        let signal = Signal::wait(SignalSource::OptionChain, "quiet");
        assert!(suggest_position(&analysis, &snap, &signal).is_none());
    }
}
