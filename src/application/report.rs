use crate::application::chain::{
    ChainAnalysis, ChainSignals, PositionSuggestion, PsychologyReport, StrategyTemplate,
};
use crate::application::indicators::TrendDirection;
use crate::domain::market::{MarketIndex, OptionChainSnapshot};
use crate::domain::trading::Decision;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A labelled series for chart rendering. Rendering itself is an external
/// concern; this is the data contract only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// The per-strike series and markers the option-chain dashboard plots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainChartData {
    pub strikes: Vec<f64>,
    pub series: Vec<ChartSeries>,
    pub underlying_marker: f64,
    pub max_pain_marker: f64,
    pub atm_marker: f64,
}

impl ChainChartData {
    pub fn from_snapshot(snapshot: &OptionChainSnapshot, analysis: &ChainAnalysis) -> Self {
        let strikes: Vec<f64> = snapshot.strikes.iter().map(|s| s.strike).collect();
        let series = vec![
            ChartSeries {
                label: "Call OI".into(),
                values: snapshot.strikes.iter().map(|s| s.ce.open_interest).collect(),
            },
            ChartSeries {
                label: "Put OI".into(),
                values: snapshot.strikes.iter().map(|s| s.pe.open_interest).collect(),
            },
            ChartSeries {
                label: "Call OI Change".into(),
                values: snapshot.strikes.iter().map(|s| s.ce.change_in_oi).collect(),
            },
            ChartSeries {
                label: "Put OI Change".into(),
                values: snapshot.strikes.iter().map(|s| s.pe.change_in_oi).collect(),
            },
        ];
        Self {
            strikes,
            series,
            underlying_marker: snapshot.underlying,
            max_pain_marker: analysis.max_pain,
            atm_marker: analysis.atm_strike,
        }
    }
}

/// Outcome summary of one cycle: a signal when the pipeline completed, a
/// human-readable cause when it did not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CycleResult {
    Completed {
        signal: String,
        confidence: f64,
        reason: String,
    },
    Failed {
        error: String,
    },
}

/// Candle-side context carried into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub trend: TrendDirection,
    pub strength: f64,
    pub rsi: f64,
    pub macd: f64,
    pub atr: f64,
    pub patterns: Vec<String>,
}

/// The artifact serialized as `<INDEX>_report_<YYYYMMDD_HHMMSS>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub index: MarketIndex,
    pub timestamp: NaiveDateTime,
    pub result: CycleResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ChainAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psychology: Option<PsychologyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_signals: Option<ChainSignals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_suggestion: Option<PositionSuggestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategy_recommendations: Vec<StrategyTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChainChartData>,
}

impl CycleReport {
    pub fn failed(index: MarketIndex, timestamp: NaiveDateTime, error: impl Into<String>) -> Self {
        Self {
            index,
            timestamp,
            result: CycleResult::Failed {
                error: error.into(),
            },
            analysis: None,
            psychology: None,
            chain_signals: None,
            trade_suggestion: None,
            strategy_recommendations: Vec::new(),
            trend: None,
            decision: None,
            chart_data: None,
        }
    }

    /// File stem: `<INDEX>_report_<YYYYMMDD_HHMMSS>`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_report_{}.json",
            self.index.symbol(),
            self.timestamp.format("%Y%m%d_%H%M%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::option_chain::test_support::snapshot;

    #[test]
    fn test_report_file_name() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 35, 20)
            .unwrap();
        let report = CycleReport::failed(MarketIndex::BankNifty, ts, "boom");
        assert_eq!(report.file_name(), "BANKNIFTY_report_20250102_103520.json");
    }

    #[test]
    fn test_chart_data_series_shape() {
        let snap = snapshot(
            110.0,
            &[100.0, 110.0, 120.0],
            &[10.0, 20.0, 30.0],
            &[5.0, 15.0, 25.0],
        );
        let analysis = ChainAnalysis::analyze(&snap);
        let chart = ChainChartData::from_snapshot(&snap, &analysis);
        assert_eq!(chart.strikes.len(), 3);
        assert_eq!(chart.series.len(), 4);
        assert_eq!(chart.series[0].label, "Call OI");
        assert_eq!(chart.series[1].values, vec![5.0, 15.0, 25.0]);
        assert_eq!(chart.underlying_marker, 110.0);
    }

    #[test]
    fn test_failed_report_serializes_error() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let report = CycleReport::failed(MarketIndex::Nifty, ts, "chain fetch timed out");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"]["error"], "chain fetch timed out");
        assert!(json["result"].get("signal").is_none());
    }
}
