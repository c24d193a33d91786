use super::analyzer::ChainAnalysis;
use crate::domain::market::{OptionChainSnapshot, StrikeEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller-supplied market outlook driving template selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketView {
    Bullish,
    Bearish,
    Neutral,
    Volatile,
}

impl fmt::Display for MarketView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Neutral => write!(f, "neutral"),
            Self::Volatile => write!(f, "volatile"),
        }
    }
}

impl FromStr for MarketView {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bullish" => Ok(Self::Bullish),
            "bearish" => Ok(Self::Bearish),
            "neutral" => Ok(Self::Neutral),
            "volatile" => Ok(Self::Volatile),
            _ => anyhow::bail!("Unknown market view: {}", s),
        }
    }
}

/// A parametrized multi-leg strategy suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyTemplate {
    pub strategy: String,
    pub description: String,
    pub market_outlook: String,
    /// Strikes in leg order with signed quantity (+ long, - short).
    pub legs: Vec<StrategyLeg>,
    pub net_premium: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward: Option<f64>,
    pub break_even_lower: f64,
    pub break_even_upper: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StrategyLeg {
    pub strike: f64,
    pub is_call: bool,
    /// Signed lots: positive buys, negative sells.
    pub quantity: i32,
    pub premium: f64,
}

fn leg(strike: f64, is_call: bool, quantity: i32, premium: f64) -> StrategyLeg {
    StrategyLeg {
        strike,
        is_call,
        quantity,
        premium,
    }
}

/// Long straddle at the strike with the cheapest combined IV.
pub fn straddle(snapshot: &OptionChainSnapshot) -> Option<StrategyTemplate> {
    let entry = snapshot
        .strikes
        .iter()
        .filter(|s| s.ce.implied_volatility > 0.0 || s.pe.implied_volatility > 0.0)
        .min_by(|a, b| {
            let iv_a = a.ce.implied_volatility + a.pe.implied_volatility;
            let iv_b = b.ce.implied_volatility + b.pe.implied_volatility;
            iv_a.total_cmp(&iv_b)
        })
        .or_else(|| snapshot.atm_entry())?;
    let cost = entry.ce.last_price + entry.pe.last_price;
    Some(StrategyTemplate {
        strategy: "Straddle".into(),
        description: "Buy both a call and a put at the same strike".into(),
        market_outlook: "Expecting a significant move, direction uncertain".into(),
        legs: vec![
            leg(entry.strike, true, 1, entry.ce.last_price),
            leg(entry.strike, false, 1, entry.pe.last_price),
        ],
        net_premium: -cost,
        max_profit: None,
        max_loss: Some(cost),
        risk_reward: None,
        break_even_lower: entry.strike - cost,
        break_even_upper: entry.strike + cost,
    })
}

/// Long strangle with OTM legs near ±5% of the underlying.
pub fn strangle(snapshot: &OptionChainSnapshot, atm_strike: f64) -> Option<StrategyTemplate> {
    let underlying = snapshot.underlying;
    let call_row = nearest(
        snapshot.strikes.iter().filter(|s| s.strike > atm_strike),
        underlying * 1.05,
    )?;
    let put_row = nearest(
        snapshot.strikes.iter().filter(|s| s.strike < atm_strike),
        underlying * 0.95,
    )?;
    let cost = call_row.ce.last_price + put_row.pe.last_price;
    Some(StrategyTemplate {
        strategy: "Strangle".into(),
        description: "Buy an OTM call and an OTM put".into(),
        market_outlook: "Expecting a significant move, direction uncertain".into(),
        legs: vec![
            leg(call_row.strike, true, 1, call_row.ce.last_price),
            leg(put_row.strike, false, 1, put_row.pe.last_price),
        ],
        net_premium: -cost,
        max_profit: None,
        max_loss: Some(cost),
        risk_reward: None,
        break_even_lower: put_row.strike - cost,
        break_even_upper: call_row.strike + cost,
    })
}

/// Bull call spread: scans adjacent OTM call pairs for the best
/// max-profit / max-loss ratio.
pub fn bull_call_spread(
    snapshot: &OptionChainSnapshot,
    atm_strike: f64,
) -> Option<StrategyTemplate> {
    let otm: Vec<&StrikeEntry> = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike > atm_strike)
        .collect();
    let mut best: Option<(f64, StrategyTemplate)> = None;
    for pair in otm.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        let debit = lower.ce.last_price - upper.ce.last_price;
        if debit <= 0.0 {
            continue;
        }
        let max_profit = (upper.strike - lower.strike) - debit;
        let risk_reward = max_profit / debit;
        if best.as_ref().is_none_or(|(rr, _)| risk_reward > *rr) {
            best = Some((
                risk_reward,
                StrategyTemplate {
                    strategy: "Bull Call Spread".into(),
                    description: "Buy the lower strike call, sell the higher strike call".into(),
                    market_outlook: "Moderately bullish".into(),
                    legs: vec![
                        leg(lower.strike, true, 1, lower.ce.last_price),
                        leg(upper.strike, true, -1, upper.ce.last_price),
                    ],
                    net_premium: -debit,
                    max_profit: Some(max_profit),
                    max_loss: Some(debit),
                    risk_reward: Some(risk_reward),
                    break_even_lower: lower.strike + debit,
                    break_even_upper: upper.strike,
                },
            ));
        }
    }
    best.map(|(_, template)| template)
}

/// Bear put spread: adjacent OTM put pairs below ATM.
pub fn bear_put_spread(
    snapshot: &OptionChainSnapshot,
    atm_strike: f64,
) -> Option<StrategyTemplate> {
    let otm: Vec<&StrikeEntry> = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike < atm_strike)
        .collect();
    let mut best: Option<(f64, StrategyTemplate)> = None;
    for pair in otm.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        let debit = upper.pe.last_price - lower.pe.last_price;
        if debit <= 0.0 {
            continue;
        }
        let max_profit = (upper.strike - lower.strike) - debit;
        let risk_reward = max_profit / debit;
        if best.as_ref().is_none_or(|(rr, _)| risk_reward > *rr) {
            best = Some((
                risk_reward,
                StrategyTemplate {
                    strategy: "Bear Put Spread".into(),
                    description: "Buy the higher strike put, sell the lower strike put".into(),
                    market_outlook: "Moderately bearish".into(),
                    legs: vec![
                        leg(upper.strike, false, 1, upper.pe.last_price),
                        leg(lower.strike, false, -1, lower.pe.last_price),
                    ],
                    net_premium: -debit,
                    max_profit: Some(max_profit),
                    max_loss: Some(debit),
                    risk_reward: Some(risk_reward),
                    break_even_lower: lower.strike,
                    break_even_upper: upper.strike - debit,
                },
            ));
        }
    }
    best.map(|(_, template)| template)
}

/// Iron condor from the first two OTM strikes on each side.
pub fn iron_condor(snapshot: &OptionChainSnapshot, atm_strike: f64) -> Option<StrategyTemplate> {
    let calls: Vec<&StrikeEntry> = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike > atm_strike)
        .take(2)
        .collect();
    let puts: Vec<&StrikeEntry> = snapshot
        .strikes
        .iter()
        .rev()
        .filter(|s| s.strike < atm_strike)
        .take(2)
        .collect();
    if calls.len() < 2 || puts.len() < 2 {
        return None;
    }
    let (short_call, long_call) = (calls[0], calls[1]);
    let (short_put, long_put) = (puts[0], puts[1]);

    let put_credit = short_put.pe.last_price - long_put.pe.last_price;
    let call_credit = short_call.ce.last_price - long_call.ce.last_price;
    let net_premium = put_credit + call_credit;
    let put_wing_risk = (short_put.strike - long_put.strike) - put_credit;
    let call_wing_risk = (long_call.strike - short_call.strike) - call_credit;
    let max_risk = put_wing_risk.max(call_wing_risk);

    Some(StrategyTemplate {
        strategy: "Iron Condor".into(),
        description: "Sell an OTM put and call, buy further OTM wings for protection".into(),
        market_outlook: "Neutral, expecting consolidation".into(),
        legs: vec![
            leg(short_put.strike, false, -1, short_put.pe.last_price),
            leg(long_put.strike, false, 1, long_put.pe.last_price),
            leg(short_call.strike, true, -1, short_call.ce.last_price),
            leg(long_call.strike, true, 1, long_call.ce.last_price),
        ],
        net_premium,
        max_profit: Some(net_premium),
        max_loss: Some(max_risk),
        risk_reward: (net_premium > 0.0).then(|| max_risk / net_premium),
        break_even_lower: short_put.strike - net_premium,
        break_even_upper: short_call.strike + net_premium,
    })
}

/// Call butterfly: 1 / -2 / 1 around ATM with wings two strike steps wide.
pub fn call_butterfly(snapshot: &OptionChainSnapshot, atm_strike: f64) -> Option<StrategyTemplate> {
    if snapshot.strikes.len() < 3 {
        return None;
    }
    let wing_width = snapshot.index.strike_step() * 2.0;
    let middle = snapshot.entry_at(atm_strike)?;
    let lower = nearest(snapshot.strikes.iter(), atm_strike - wing_width)?;
    let upper = nearest(snapshot.strikes.iter(), atm_strike + wing_width)?;
    if lower.strike >= middle.strike || upper.strike <= middle.strike {
        return None;
    }

    let net_debit = lower.ce.last_price + upper.ce.last_price - 2.0 * middle.ce.last_price;
    let max_profit = (middle.strike - lower.strike) - net_debit;
    Some(StrategyTemplate {
        strategy: "Call Butterfly".into(),
        description: "Buy the lower and upper strikes, sell twice the middle strike".into(),
        market_outlook: "Highly neutral, expecting price to pin the middle strike".into(),
        legs: vec![
            leg(lower.strike, true, 1, lower.ce.last_price),
            leg(middle.strike, true, -2, middle.ce.last_price),
            leg(upper.strike, true, 1, upper.ce.last_price),
        ],
        net_premium: -net_debit,
        max_profit: Some(max_profit),
        max_loss: Some(net_debit),
        risk_reward: (net_debit > 0.0).then(|| max_profit / net_debit),
        break_even_lower: lower.strike + net_debit,
        break_even_upper: upper.strike - net_debit,
    })
}

fn nearest<'a>(
    strikes: impl Iterator<Item = &'a StrikeEntry>,
    target: f64,
) -> Option<&'a StrikeEntry> {
    strikes.min_by(|a, b| {
        (a.strike - target)
            .abs()
            .total_cmp(&(b.strike - target).abs())
    })
}

/// Templates matching one market view.
pub fn strategy_for_view(
    snapshot: &OptionChainSnapshot,
    analysis: &ChainAnalysis,
    view: MarketView,
) -> Vec<StrategyTemplate> {
    let atm = analysis.atm_strike;
    let mut templates = Vec::new();
    match view {
        MarketView::Bullish => {
            templates.extend(bull_call_spread(snapshot, atm));
        }
        MarketView::Bearish => {
            templates.extend(bear_put_spread(snapshot, atm));
        }
        MarketView::Neutral => {
            templates.extend(iron_condor(snapshot, atm));
            templates.extend(call_butterfly(snapshot, atm));
        }
        MarketView::Volatile => {
            templates.extend(straddle(snapshot));
            templates.extend(strangle(snapshot, atm));
        }
    }
    templates
}

/// Recommends strategies; without an explicit view the PCR decides
/// (>1.2 bearish, <0.8 bullish, else neutral).
pub fn recommend_strategies(
    snapshot: &OptionChainSnapshot,
    analysis: &ChainAnalysis,
    view: Option<MarketView>,
) -> (MarketView, Vec<StrategyTemplate>) {
    let view = view.unwrap_or({
        if analysis.pcr_oi > 1.2 {
            MarketView::Bearish
        } else if analysis.pcr_oi > 0.0 && analysis.pcr_oi < 0.8 {
            MarketView::Bullish
        } else {
            MarketView::Neutral
        }
    });
    (view, strategy_for_view(snapshot, analysis, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::option_chain::test_support::snapshot;

    fn priced_snapshot() -> crate::domain::market::OptionChainSnapshot {
        let mut snap = snapshot(
            22500.0,
            &[22400.0, 22450.0, 22500.0, 22550.0, 22600.0],
            &[1000.0; 5],
            &[1000.0; 5],
        );
        let ce_prices = [150.0, 110.0, 80.0, 55.0, 35.0];
        let pe_prices = [30.0, 45.0, 70.0, 100.0, 140.0];
        let ivs = [16.0, 14.5, 13.0, 14.0, 15.5];
        for (i, entry) in snap.strikes.iter_mut().enumerate() {
            entry.ce.last_price = ce_prices[i];
            entry.pe.last_price = pe_prices[i];
            entry.ce.implied_volatility = ivs[i];
            entry.pe.implied_volatility = ivs[i];
        }
        snap
    }

    #[test]
    fn test_straddle_picks_cheapest_combined_iv() {
        let snap = priced_snapshot();
        let template = straddle(&snap).unwrap();
        assert_eq!(template.legs[0].strike, 22500.0);
        assert_eq!(template.max_loss, Some(150.0));
        assert_eq!(template.break_even_upper, 22650.0);
        assert_eq!(template.break_even_lower, 22350.0);
    }

    #[test]
    fn test_bull_call_spread_risk_reward() {
        let snap = priced_snapshot();
        let template = bull_call_spread(&snap, 22500.0).unwrap();
        // candidates: 22550/22600 debit 20 profit 30 rr 1.5
        assert_eq!(template.legs[0].strike, 22550.0);
        assert_eq!(template.legs[1].strike, 22600.0);
        assert_eq!(template.max_loss, Some(20.0));
        assert_eq!(template.max_profit, Some(30.0));
        assert_eq!(template.risk_reward, Some(1.5));
    }

    #[test]
    fn test_bear_put_spread_legs() {
        let snap = priced_snapshot();
        let template = bear_put_spread(&snap, 22500.0).unwrap();
        assert_eq!(template.legs[0].quantity, 1);
        assert!(!template.legs[0].is_call);
        assert!(template.legs[0].strike > template.legs[1].strike);
        assert!(template.max_loss.unwrap() > 0.0);
    }

    #[test]
    fn test_iron_condor_wings() {
        let snap = priced_snapshot();
        let template = iron_condor(&snap, 22500.0).unwrap();
        assert_eq!(template.legs.len(), 4);
        // put wing credit: 45 - 30 = 15; call wing credit: 55 - 35 = 20
        assert_eq!(template.net_premium, 35.0);
        assert_eq!(template.break_even_lower, 22450.0 - 35.0);
        assert_eq!(template.break_even_upper, 22550.0 + 35.0);
    }

    #[test]
    fn test_butterfly_body_and_wings() {
        let snap = priced_snapshot();
        let template = call_butterfly(&snap, 22500.0).unwrap();
        assert_eq!(template.legs[1].quantity, -2);
        // debit: 150 + 35 - 160 = 25; profit: 100 - 25 = 75
        assert_eq!(template.max_loss, Some(25.0));
        assert_eq!(template.max_profit, Some(75.0));
    }

    #[test]
    fn test_view_inference_from_pcr() {
        let snap = priced_snapshot();
        let analysis = ChainAnalysis::analyze(&snap);
        let (view, templates) = recommend_strategies(&snap, &analysis, None);
        // balanced OI -> pcr 1.0 -> neutral book
        assert_eq!(view, MarketView::Neutral);
        assert!(templates.iter().any(|t| t.strategy == "Iron Condor"));
    }

    #[test]
    fn test_too_few_strikes_yields_nothing() {
        let snap = snapshot(100.0, &[100.0], &[10.0], &[10.0]);
        assert!(iron_condor(&snap, 100.0).is_none());
        assert!(bull_call_spread(&snap, 100.0).is_none());
    }
}
