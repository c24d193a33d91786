use crate::domain::market::OptionChainSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional read of OI or volume flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumBucket {
    Bullish,
    Bearish,
}

impl fmt::Display for MomentumBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
        }
    }
}

/// OI and volume change totals with their directional buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OiMomentum {
    pub ce_oi_change: f64,
    pub pe_oi_change: f64,
    pub net_oi_change: f64,
    /// Bullish when put writing outpaces call writing (strictly).
    pub oi_momentum: MomentumBucket,
    pub ce_volume: f64,
    pub pe_volume: f64,
    pub volume_momentum: MomentumBucket,
}

/// OI concentration within a band around the underlying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeDistribution {
    pub range_low: f64,
    pub range_high: f64,
    pub ce_oi_within_range: f64,
    pub pe_oi_within_range: f64,
    pub total_oi_within_range: f64,
    pub max_call_oi_strike: Option<f64>,
    pub max_put_oi_strike: Option<f64>,
}

/// One leg of the IV-skew ladder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SkewPoint {
    pub strike: f64,
    pub iv: f64,
    pub delta_from_atm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvSkew {
    pub atm_strike: f64,
    pub atm_call_iv: f64,
    pub atm_put_iv: f64,
    /// Up to three OTM calls above ATM, nearest first.
    pub otm_calls: Vec<SkewPoint>,
    /// Up to three OTM puts below ATM, nearest first.
    pub otm_puts: Vec<SkewPoint>,
}

impl IvSkew {
    pub fn avg_put_delta(&self) -> Option<f64> {
        average(self.otm_puts.iter().map(|p| p.delta_from_atm))
    }

    pub fn avg_call_delta(&self) -> Option<f64> {
        average(self.otm_calls.iter().map(|p| p.delta_from_atm))
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        None
    } else {
        Some(collected.iter().sum::<f64>() / collected.len() as f64)
    }
}

/// A strike with its OI standing and change, for key-level tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OiLevel {
    pub strike: f64,
    pub open_interest: f64,
    pub change_in_oi: f64,
}

/// Support/resistance tables from OI concentration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLevels {
    /// Top strikes by PE OI, largest first.
    pub put_support: Vec<OiLevel>,
    /// Top strikes by CE OI, largest first.
    pub call_resistance: Vec<OiLevel>,
    /// Top strikes by |change in PE OI|, largest first.
    pub significant_pe_change: Vec<OiLevel>,
    /// Top strikes by |change in CE OI|, largest first.
    pub significant_ce_change: Vec<OiLevel>,
}

/// Every derived metric of one chain snapshot. Deterministic pure function
/// of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAnalysis {
    pub underlying: f64,
    pub expiry: String,
    pub total_ce_oi: f64,
    pub total_pe_oi: f64,
    pub pcr_oi: f64,
    pub pcr_volume: f64,
    pub atm_strike: f64,
    pub max_pain: f64,
    pub strike_distribution: StrikeDistribution,
    pub iv_skew: IvSkew,
    pub key_levels: KeyLevels,
    pub momentum: OiMomentum,
}

const KEY_LEVEL_COUNT: usize = 3;
const DISTRIBUTION_RANGE_PERCENT: f64 = 5.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ChainAnalysis {
    pub fn analyze(snapshot: &OptionChainSnapshot) -> Self {
        let total_ce_oi = snapshot.total_ce_oi();
        let total_pe_oi = snapshot.total_pe_oi();
        let total_ce_volume = snapshot.total_ce_volume();
        let total_pe_volume = snapshot.total_pe_volume();

        let pcr_oi = if total_ce_oi > 0.0 {
            round2(total_pe_oi / total_ce_oi)
        } else {
            0.0
        };
        let pcr_volume = if total_ce_volume > 0.0 {
            round2(total_pe_volume / total_ce_volume)
        } else {
            0.0
        };

        let atm = snapshot
            .atm_entry()
            .expect("snapshot parsing guarantees at least one strike");

        Self {
            underlying: snapshot.underlying,
            expiry: snapshot.expiry.clone(),
            total_ce_oi,
            total_pe_oi,
            pcr_oi,
            pcr_volume,
            atm_strike: atm.strike,
            max_pain: max_pain(snapshot),
            strike_distribution: strike_distribution(snapshot, DISTRIBUTION_RANGE_PERCENT),
            iv_skew: iv_skew(snapshot),
            key_levels: key_levels(snapshot),
            momentum: momentum(snapshot),
        }
    }
}

/// The strike minimizing the unsigned writer-pain function; ties take the
/// lowest strike.
fn max_pain(snapshot: &OptionChainSnapshot) -> f64 {
    let mut best_strike = snapshot.strikes[0].strike;
    let mut best_pain = f64::MAX;
    for candidate in &snapshot.strikes {
        let k = candidate.strike;
        let mut pain = 0.0;
        for entry in &snapshot.strikes {
            if entry.strike < k {
                pain += entry.ce.open_interest * (entry.strike - k);
            }
            if entry.strike > k {
                pain += entry.pe.open_interest * (k - entry.strike);
            }
        }
        let pain = pain.abs();
        // strict < keeps the lowest strike on ties (ascending scan)
        if pain < best_pain {
            best_pain = pain;
            best_strike = k;
        }
    }
    best_strike
}

fn strike_distribution(snapshot: &OptionChainSnapshot, range_percent: f64) -> StrikeDistribution {
    let low = snapshot.underlying * (1.0 - range_percent / 100.0);
    let high = snapshot.underlying * (1.0 + range_percent / 100.0);
    let in_range: Vec<_> = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike >= low && s.strike <= high)
        .collect();

    let ce_oi: f64 = in_range.iter().map(|s| s.ce.open_interest).sum();
    let pe_oi: f64 = in_range.iter().map(|s| s.pe.open_interest).sum();
    StrikeDistribution {
        range_low: low,
        range_high: high,
        ce_oi_within_range: ce_oi,
        pe_oi_within_range: pe_oi,
        total_oi_within_range: ce_oi + pe_oi,
        max_call_oi_strike: in_range
            .iter()
            .max_by(|a, b| a.ce.open_interest.total_cmp(&b.ce.open_interest))
            .map(|s| s.strike),
        max_put_oi_strike: in_range
            .iter()
            .max_by(|a, b| a.pe.open_interest.total_cmp(&b.pe.open_interest))
            .map(|s| s.strike),
    }
}

fn iv_skew(snapshot: &OptionChainSnapshot) -> IvSkew {
    let atm = snapshot
        .atm_entry()
        .expect("snapshot parsing guarantees at least one strike");
    let atm_call_iv = atm.ce.implied_volatility;
    let atm_put_iv = atm.pe.implied_volatility;

    let otm_calls = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike > atm.strike)
        .take(3)
        .map(|s| SkewPoint {
            strike: s.strike,
            iv: s.ce.implied_volatility,
            delta_from_atm: s.ce.implied_volatility - atm_call_iv,
        })
        .collect();
    let otm_puts = snapshot
        .strikes
        .iter()
        .rev()
        .filter(|s| s.strike < atm.strike)
        .take(3)
        .map(|s| SkewPoint {
            strike: s.strike,
            iv: s.pe.implied_volatility,
            delta_from_atm: s.pe.implied_volatility - atm_put_iv,
        })
        .collect();

    IvSkew {
        atm_strike: atm.strike,
        atm_call_iv,
        atm_put_iv,
        otm_calls,
        otm_puts,
    }
}

fn key_levels(snapshot: &OptionChainSnapshot) -> KeyLevels {
    let mut by_pe_oi: Vec<OiLevel> = snapshot
        .strikes
        .iter()
        .map(|s| OiLevel {
            strike: s.strike,
            open_interest: s.pe.open_interest,
            change_in_oi: s.pe.change_in_oi,
        })
        .collect();
    by_pe_oi.sort_by(|a, b| b.open_interest.total_cmp(&a.open_interest));

    let mut by_ce_oi: Vec<OiLevel> = snapshot
        .strikes
        .iter()
        .map(|s| OiLevel {
            strike: s.strike,
            open_interest: s.ce.open_interest,
            change_in_oi: s.ce.change_in_oi,
        })
        .collect();
    by_ce_oi.sort_by(|a, b| b.open_interest.total_cmp(&a.open_interest));

    let mut by_pe_change = by_pe_oi.clone();
    by_pe_change.sort_by(|a, b| b.change_in_oi.abs().total_cmp(&a.change_in_oi.abs()));
    let mut by_ce_change = by_ce_oi.clone();
    by_ce_change.sort_by(|a, b| b.change_in_oi.abs().total_cmp(&a.change_in_oi.abs()));

    by_pe_oi.truncate(KEY_LEVEL_COUNT);
    by_ce_oi.truncate(KEY_LEVEL_COUNT);
    by_pe_change.truncate(KEY_LEVEL_COUNT);
    by_ce_change.truncate(KEY_LEVEL_COUNT);
    KeyLevels {
        put_support: by_pe_oi,
        call_resistance: by_ce_oi,
        significant_pe_change: by_pe_change,
        significant_ce_change: by_ce_change,
    }
}

fn momentum(snapshot: &OptionChainSnapshot) -> OiMomentum {
    let ce_change: f64 = snapshot.strikes.iter().map(|s| s.ce.change_in_oi).sum();
    let pe_change: f64 = snapshot.strikes.iter().map(|s| s.pe.change_in_oi).sum();
    let ce_volume = snapshot.total_ce_volume();
    let pe_volume = snapshot.total_pe_volume();
    OiMomentum {
        ce_oi_change: ce_change,
        pe_oi_change: pe_change,
        net_oi_change: pe_change - ce_change,
        oi_momentum: if pe_change > ce_change {
            MomentumBucket::Bullish
        } else {
            MomentumBucket::Bearish
        },
        ce_volume,
        pe_volume,
        volume_momentum: if pe_volume > ce_volume {
            MomentumBucket::Bullish
        } else {
            MomentumBucket::Bearish
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::option_chain::test_support::snapshot;

    fn scenario_snapshot() -> crate::domain::market::OptionChainSnapshot {
        snapshot(
            110.0,
            &[100.0, 105.0, 110.0, 115.0, 120.0],
            &[30.0, 40.0, 50.0, 20.0, 10.0],
            &[5.0, 10.0, 60.0, 50.0, 40.0],
        )
    }

    #[test]
    fn test_pcr_matches_oi_totals() {
        let analysis = ChainAnalysis::analyze(&scenario_snapshot());
        assert_eq!(analysis.total_pe_oi, 165.0);
        assert_eq!(analysis.total_ce_oi, 150.0);
        assert_eq!(analysis.pcr_oi, 1.10);
        assert!(analysis.pcr_oi >= 0.0);
    }

    #[test]
    fn test_pcr_zero_denominator() {
        let snap = snapshot(110.0, &[100.0, 120.0], &[0.0, 0.0], &[5.0, 6.0]);
        let analysis = ChainAnalysis::analyze(&snap);
        assert_eq!(analysis.pcr_oi, 0.0);
    }

    #[test]
    fn test_momentum_tie_breaks_bearish() {
        let analysis = ChainAnalysis::analyze(&scenario_snapshot());
        // all change-in-OI values are zero: ce == pe
        assert_eq!(analysis.momentum.oi_momentum, MomentumBucket::Bearish);
        assert_eq!(analysis.momentum.net_oi_change, 0.0);
    }

    #[test]
    fn test_max_pain_is_listed_strike() {
        let snap = scenario_snapshot();
        let analysis = ChainAnalysis::analyze(&snap);
        assert!(
            snap.strikes
                .iter()
                .any(|s| s.strike == analysis.max_pain)
        );
    }

    #[test]
    fn test_max_pain_insensitive_to_small_underlying_move() {
        let mut snap = scenario_snapshot();
        let analysis = ChainAnalysis::analyze(&snap);
        snap.underlying += 5.0; // one strike step, OI unchanged
        let shifted = ChainAnalysis::analyze(&snap);
        assert_eq!(analysis.max_pain, shifted.max_pain);
    }

    #[test]
    fn test_max_pain_tie_takes_lowest_strike() {
        // symmetric chain: pain is equal at both inner strikes
        let snap = snapshot(
            105.0,
            &[100.0, 110.0],
            &[10.0, 10.0],
            &[10.0, 10.0],
        );
        let analysis = ChainAnalysis::analyze(&snap);
        assert_eq!(analysis.max_pain, 100.0);
    }

    #[test]
    fn test_atm_strike() {
        let analysis = ChainAnalysis::analyze(&scenario_snapshot());
        assert_eq!(analysis.atm_strike, 110.0);
    }

    #[test]
    fn test_key_levels_ranked() {
        let analysis = ChainAnalysis::analyze(&scenario_snapshot());
        assert_eq!(analysis.key_levels.put_support[0].strike, 110.0);
        assert_eq!(analysis.key_levels.call_resistance[0].strike, 110.0);
        assert_eq!(analysis.key_levels.put_support.len(), 3);
    }

    #[test]
    fn test_iv_skew_sides() {
        let mut snap = scenario_snapshot();
        for (i, entry) in snap.strikes.iter_mut().enumerate() {
            entry.ce.implied_volatility = 10.0 + i as f64;
            entry.pe.implied_volatility = 20.0 - i as f64;
        }
        let skew = ChainAnalysis::analyze(&snap).iv_skew;
        assert_eq!(skew.atm_strike, 110.0);
        assert_eq!(skew.otm_calls.len(), 2);
        assert_eq!(skew.otm_puts.len(), 2);
        // nearest first on both sides
        assert_eq!(skew.otm_calls[0].strike, 115.0);
        assert_eq!(skew.otm_puts[0].strike, 105.0);
        assert!((skew.otm_calls[0].delta_from_atm - 1.0).abs() < 1e-9);
        assert!((skew.otm_puts[0].delta_from_atm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_strike_distribution_band() {
        let analysis = ChainAnalysis::analyze(&scenario_snapshot());
        let dist = &analysis.strike_distribution;
        // ±5% of 110 = [104.5, 115.5] -> strikes 105, 110, 115
        assert_eq!(dist.ce_oi_within_range, 110.0);
        assert_eq!(dist.pe_oi_within_range, 120.0);
        assert_eq!(dist.max_put_oi_strike, Some(110.0));
    }
}
