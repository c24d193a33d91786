pub(crate) mod candle;
mod index;
pub(crate) mod option_chain;

pub use candle::{Candle, CandleSeries};
pub use index::MarketIndex;
pub use option_chain::{OptionChainSnapshot, OptionLeg, StrikeEntry};
