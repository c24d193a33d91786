mod candle_source;
mod option_chain_client;

pub use candle_source::{CsvCandleSource, SyntheticCandleSource};
pub use option_chain_client::NseOptionChainClient;
