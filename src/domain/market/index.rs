use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// NSE/BSE index underlyings with weekly option chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketIndex {
    Nifty,
    BankNifty,
    FinNifty,
    Sensex,
    MidcpNifty,
}

impl MarketIndex {
    pub const ALL: [MarketIndex; 5] = [
        MarketIndex::Nifty,
        MarketIndex::BankNifty,
        MarketIndex::FinNifty,
        MarketIndex::Sensex,
        MarketIndex::MidcpNifty,
    ];

    /// Exchange symbol, as used by the option-chain endpoint and order symbols.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Nifty => "NIFTY",
            Self::BankNifty => "BANKNIFTY",
            Self::FinNifty => "FINNIFTY",
            Self::Sensex => "SENSEX",
            Self::MidcpNifty => "MIDCPNIFTY",
        }
    }

    /// Contracts per lot.
    pub fn lot_size(&self) -> u32 {
        match self {
            Self::Nifty => 50,
            Self::BankNifty => 25,
            Self::FinNifty => 40,
            Self::Sensex => 10,
            Self::MidcpNifty => 75,
        }
    }

    /// Distance between adjacent listed strikes.
    pub fn strike_step(&self) -> f64 {
        match self {
            Self::Nifty | Self::FinNifty => 50.0,
            Self::BankNifty | Self::Sensex => 100.0,
            Self::MidcpNifty => 25.0,
        }
    }

    /// Strike closest to the underlying; ties go to the lower strike.
    pub fn atm_strike(&self, underlying: f64) -> f64 {
        let step = self.strike_step();
        let below = (underlying / step).floor() * step;
        let above = below + step;
        if (underlying - below) <= (above - underlying) {
            below
        } else {
            above
        }
    }

    /// Weekly expiry weekday for the index calendar.
    pub fn expiry_weekday(&self) -> Weekday {
        Weekday::Thu
    }

    pub fn session_open() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 15, 0).unwrap()
    }

    pub fn session_close() -> NaiveTime {
        NaiveTime::from_hms_opt(15, 30, 0).unwrap()
    }
}

impl fmt::Display for MarketIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for MarketIndex {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NIFTY" => Ok(Self::Nifty),
            "BANKNIFTY" => Ok(Self::BankNifty),
            "FINNIFTY" => Ok(Self::FinNifty),
            "SENSEX" => Ok(Self::Sensex),
            "MIDCPNIFTY" => Ok(Self::MidcpNifty),
            _ => anyhow::bail!(
                "Unknown index: {}. Must be one of NIFTY, BANKNIFTY, FINNIFTY, SENSEX, MIDCPNIFTY",
                s
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_round_trip() {
        for index in MarketIndex::ALL {
            assert_eq!(index.symbol().parse::<MarketIndex>().unwrap(), index);
        }
    }

    #[test]
    fn test_atm_strike_ties_take_lower() {
        // 22525 is equidistant between 22500 and 22550
        assert_eq!(MarketIndex::Nifty.atm_strike(22525.0), 22500.0);
        assert_eq!(MarketIndex::Nifty.atm_strike(22530.0), 22550.0);
        assert_eq!(MarketIndex::BankNifty.atm_strike(48049.0), 48000.0);
    }

    #[test]
    fn test_lot_sizes() {
        assert_eq!(MarketIndex::Nifty.lot_size(), 50);
        assert_eq!(MarketIndex::MidcpNifty.lot_size(), 75);
        assert_eq!(MarketIndex::Sensex.lot_size(), 10);
    }
}
