mod correlations;
mod metrics;

pub use correlations::{
    BucketOutcome, PsychologyCorrelation, compute_pattern_effectiveness,
    compute_psychology_correlation,
};
pub use metrics::{
    BasicMetrics, ConsistencyMetrics, PerformanceReport, RiskMetrics, TradeStats,
    compute_performance, compute_stats,
};
