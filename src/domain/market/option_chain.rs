use crate::domain::errors::EngineError;
use crate::domain::market::MarketIndex;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One side (CE or PE) of a strike row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub open_interest: f64,
    pub change_in_oi: f64,
    pub volume: f64,
    pub implied_volatility: f64,
    pub last_price: f64,
    pub bid_price: f64,
    pub bid_qty: f64,
    pub ask_price: f64,
    pub ask_qty: f64,
}

/// A strike row with its call and put legs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeEntry {
    pub strike: f64,
    pub ce: OptionLeg,
    pub pe: OptionLeg,
}

/// A parsed option-chain snapshot for one index and one expiry.
///
/// Invariant: strikes are unique and sorted ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    pub index: MarketIndex,
    pub underlying: f64,
    pub fetched_at: NaiveDateTime,
    pub expiry: String,
    pub strikes: Vec<StrikeEntry>,
}

/// Wire shape of the NSE option-chain endpoint.
#[derive(Debug, Deserialize)]
struct RawChain {
    records: RawRecords,
    #[serde(default)]
    filtered: Option<RawFiltered>,
}

#[derive(Debug, Deserialize)]
struct RawRecords {
    #[serde(default)]
    data: Vec<RawRow>,
    #[serde(rename = "underlyingValue")]
    underlying_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFiltered {
    #[serde(default)]
    data: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "strikePrice")]
    strike_price: Option<f64>,
    #[serde(rename = "expiryDate")]
    expiry_date: Option<String>,
    #[serde(rename = "CE")]
    ce: Option<RawLeg>,
    #[serde(rename = "PE")]
    pe: Option<RawLeg>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLeg {
    #[serde(rename = "openInterest", default)]
    open_interest: f64,
    #[serde(rename = "changeinOpenInterest", default)]
    change_in_oi: f64,
    #[serde(rename = "totalTradedVolume", default)]
    total_traded_volume: f64,
    #[serde(rename = "impliedVolatility", default)]
    implied_volatility: f64,
    #[serde(rename = "lastPrice", default)]
    last_price: f64,
    #[serde(rename = "bidprice", default)]
    bid_price: f64,
    #[serde(rename = "bidQty", default)]
    bid_qty: f64,
    #[serde(rename = "askPrice", default)]
    ask_price: f64,
    #[serde(rename = "askQty", default)]
    ask_qty: f64,
}

impl From<RawLeg> for OptionLeg {
    fn from(raw: RawLeg) -> Self {
        Self {
            open_interest: raw.open_interest,
            change_in_oi: raw.change_in_oi,
            volume: raw.total_traded_volume,
            implied_volatility: raw.implied_volatility,
            last_price: raw.last_price,
            bid_price: raw.bid_price,
            bid_qty: raw.bid_qty,
            ask_price: raw.ask_price,
            ask_qty: raw.ask_qty,
        }
    }
}

impl OptionChainSnapshot {
    /// Parses the raw endpoint JSON, keeping only the selected expiry.
    ///
    /// `filtered.data` is preferred over `records.data` (the endpoint
    /// pre-filters it to near expiries); the nearest listed expiry is
    /// selected when none is requested. Strikes are de-duplicated and
    /// sorted ascending.
    pub fn from_raw_json(
        index: MarketIndex,
        body: &serde_json::Value,
        requested_expiry: Option<&str>,
        fetched_at: NaiveDateTime,
    ) -> Result<Self, EngineError> {
        let raw: RawChain = serde_json::from_value(body.clone())
            .map_err(|e| EngineError::invalid_input(format!("malformed chain JSON: {e}")))?;

        let underlying = raw
            .records
            .underlying_value
            .ok_or_else(|| EngineError::invalid_input("missing records.underlyingValue"))?;

        let rows = match raw.filtered {
            Some(f) if !f.data.is_empty() => f.data,
            _ => raw.records.data,
        };
        if rows.is_empty() {
            return Err(EngineError::invalid_input("option chain has no rows"));
        }

        let expiry = match requested_expiry {
            Some(e) => e.to_string(),
            None => {
                // Nearest expiry = first in the endpoint's chronological order.
                rows.iter()
                    .find_map(|r| r.expiry_date.clone())
                    .ok_or_else(|| EngineError::invalid_input("no expiry dates in chain"))?
            }
        };

        let mut strikes: Vec<StrikeEntry> = Vec::new();
        for row in rows {
            let Some(strike) = row.strike_price else {
                continue;
            };
            if row.expiry_date.as_deref() != Some(expiry.as_str()) {
                continue;
            }
            strikes.push(StrikeEntry {
                strike,
                ce: row.ce.map(OptionLeg::from).unwrap_or_default(),
                pe: row.pe.map(OptionLeg::from).unwrap_or_default(),
            });
        }
        if strikes.is_empty() {
            return Err(EngineError::invalid_input(format!(
                "no strikes for expiry {expiry}"
            )));
        }

        strikes.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        strikes.dedup_by(|a, b| a.strike == b.strike);

        let snapshot = Self {
            index,
            underlying,
            fetched_at,
            expiry,
            strikes,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks the sorted-unique strike invariant. Violations here mean a
    /// construction bug, not bad input.
    pub fn validate(&self) -> Result<(), EngineError> {
        for w in self.strikes.windows(2) {
            if w[1].strike <= w[0].strike {
                return Err(EngineError::InvariantViolation {
                    reason: format!(
                        "strike order broken: {} before {}",
                        w[0].strike, w[1].strike
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn total_ce_oi(&self) -> f64 {
        self.strikes.iter().map(|s| s.ce.open_interest).sum()
    }

    pub fn total_pe_oi(&self) -> f64 {
        self.strikes.iter().map(|s| s.pe.open_interest).sum()
    }

    pub fn total_ce_volume(&self) -> f64 {
        self.strikes.iter().map(|s| s.ce.volume).sum()
    }

    pub fn total_pe_volume(&self) -> f64 {
        self.strikes.iter().map(|s| s.pe.volume).sum()
    }

    /// Entry for the strike nearest the underlying (lower strike on ties).
    pub fn atm_entry(&self) -> Option<&StrikeEntry> {
        self.strikes.iter().min_by(|a, b| {
            let da = (a.strike - self.underlying).abs();
            let db = (b.strike - self.underlying).abs();
            da.total_cmp(&db)
                .then(a.strike.total_cmp(&b.strike))
        })
    }

    pub fn entry_at(&self, strike: f64) -> Option<&StrikeEntry> {
        self.strikes
            .iter()
            .find(|s| (s.strike - strike).abs() < f64::EPSILON)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    /// Builds a snapshot from parallel per-strike arrays; zero-valued fields
    /// are left defaulted.
    pub fn snapshot(
        underlying: f64,
        strikes: &[f64],
        ce_oi: &[f64],
        pe_oi: &[f64],
    ) -> OptionChainSnapshot {
        let entries = strikes
            .iter()
            .enumerate()
            .map(|(i, &strike)| StrikeEntry {
                strike,
                ce: OptionLeg {
                    open_interest: ce_oi[i],
                    ..Default::default()
                },
                pe: OptionLeg {
                    open_interest: pe_oi[i],
                    ..Default::default()
                },
            })
            .collect();
        OptionChainSnapshot {
            index: MarketIndex::Nifty,
            underlying,
            fetched_at: NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            expiry: "09-Jan-2025".to_string(),
            strikes: entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_body() -> serde_json::Value {
        json!({
            "records": {
                "underlyingValue": 22510.5,
                "data": [
                    {
                        "strikePrice": 22500.0,
                        "expiryDate": "09-Jan-2025",
                        "CE": {"openInterest": 1000.0, "lastPrice": 110.5, "impliedVolatility": 13.2},
                        "PE": {"openInterest": 2200.0, "lastPrice": 95.0, "impliedVolatility": 14.8}
                    },
                    {
                        "strikePrice": 22550.0,
                        "expiryDate": "09-Jan-2025",
                        "CE": {"openInterest": 800.0},
                        "PE": {"openInterest": 400.0}
                    },
                    {
                        "strikePrice": 22500.0,
                        "expiryDate": "16-Jan-2025",
                        "CE": {"openInterest": 50.0},
                        "PE": {"openInterest": 60.0}
                    }
                ]
            },
            "filtered": {"data": []}
        })
    }

    #[test]
    fn test_parse_keeps_selected_expiry_only() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let snap =
            OptionChainSnapshot::from_raw_json(MarketIndex::Nifty, &raw_body(), None, ts).unwrap();
        assert_eq!(snap.expiry, "09-Jan-2025");
        assert_eq!(snap.strikes.len(), 2);
        assert_eq!(snap.underlying, 22510.5);
        assert_eq!(snap.total_ce_oi(), 1800.0);
        assert_eq!(snap.total_pe_oi(), 2600.0);
    }

    #[test]
    fn test_parse_missing_leg_defaults_to_zero() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let body = json!({
            "records": {
                "underlyingValue": 100.0,
                "data": [{"strikePrice": 105.0, "expiryDate": "09-Jan-2025", "PE": {"openInterest": 7.0}}]
            }
        });
        let snap =
            OptionChainSnapshot::from_raw_json(MarketIndex::Nifty, &body, None, ts).unwrap();
        assert_eq!(snap.strikes[0].ce.open_interest, 0.0);
        assert_eq!(snap.strikes[0].pe.open_interest, 7.0);
    }

    #[test]
    fn test_parse_rejects_missing_underlying() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let body = json!({"records": {"data": [{"strikePrice": 100.0, "expiryDate": "x"}]}});
        assert!(OptionChainSnapshot::from_raw_json(MarketIndex::Nifty, &body, None, ts).is_err());
    }

    #[test]
    fn test_atm_entry_tie_takes_lower_strike() {
        let snap = test_support::snapshot(
            22525.0,
            &[22500.0, 22550.0],
            &[1.0, 1.0],
            &[1.0, 1.0],
        );
        assert_eq!(snap.atm_entry().unwrap().strike, 22500.0);
    }
}
