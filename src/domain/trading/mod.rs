mod decision;
mod signal;
mod trade;

pub use decision::{Decision, RiskProfile, SourceContribution, TradeAction};
pub use signal::{Signal, SignalKind, SignalSource};
pub use trade::{PsychologySnapshot, TradeRecord, TradeStatus, TradeUpdate};
