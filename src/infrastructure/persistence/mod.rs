mod journal;

pub use journal::{TradeDraft, TradeJournal};
