//! Option-chain analytics: derived metrics, market psychology, chain
//! signals and strategy templates.

mod analyzer;
mod psychology;
mod signals;
mod strategies;

pub use analyzer::{
    ChainAnalysis, IvSkew, KeyLevels, MomentumBucket, OiLevel, OiMomentum, SkewPoint,
    StrikeDistribution,
};
pub use psychology::{
    ContrarianBias, ContrarianSignal, FearGreedBucket, PsychologyReport, RetailPositioning,
    SmartMoneySign, VolumeProfile, VolumeProfileInsight, analyze_psychology,
};
pub use signals::{ChainSignals, PositionSuggestion, generate_chain_signals, suggest_position};
pub use strategies::{MarketView, StrategyTemplate, recommend_strategies, strategy_for_view};
