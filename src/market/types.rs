use super::odds::OddsFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_book_rating() -> f64 {
    1.0
}

/// One book's prices for a market.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookQuotes {
    /// Trust score in [0, 1]; books that omit it are fully trusted.
    #[serde(default = "default_book_rating")]
    pub rating: f64,
    #[serde(default)]
    pub odds: BTreeMap<String, f64>,
}

/// Every book's prices for one `(sport, event, market)` at a point in time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OddsSnapshot {
    pub sport: String,
    pub event: String,
    pub market: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub format: OddsFormat,
    #[serde(default)]
    pub books: BTreeMap<String, BookQuotes>,
}

impl OddsSnapshot {
    pub fn new(sport: impl Into<String>, event: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            sport: sport.into(),
            event: event.into(),
            market: market.into(),
            timestamp: None,
            format: OddsFormat::Decimal,
            books: BTreeMap::new(),
        }
    }

    /// Builder-style helper for tests and the simulator.
    pub fn with_book(mut self, book: impl Into<String>, rating: f64, odds: &[(&str, f64)]) -> Self {
        let odds = odds.iter().map(|(o, p)| (o.to_string(), *p)).collect();
        self.books.insert(book.into(), BookQuotes { rating, odds });
        self
    }
}

/// One usable price after filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsQuote {
    pub book: String,
    pub outcome: String,
    pub price: f64,
    pub rating: f64,
}

/// One leg of an arbitrage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageBet {
    pub book: String,
    pub outcome: String,
    pub odds: f64,
    pub stake: f64,
    pub rating: f64,
}

impl ArbitrageBet {
    pub fn payout(&self) -> f64 {
        self.stake * self.odds
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub total_books: usize,
    pub total_outcomes: usize,
    pub avg_book_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeOdds {
    pub selected: f64,
    pub market_avg: f64,
    pub market_min: f64,
    pub market_max: f64,
    /// De-vigged probability from the cross-book average price.
    pub fair_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageDetails {
    pub market_overview: MarketOverview,
    pub selected_books: Vec<String>,
    pub odds_distribution: BTreeMap<String, OutcomeOdds>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub sport: String,
    pub event: String,
    pub market: String,
    pub timestamp: DateTime<Utc>,
    pub profit_margin: f64,
    pub required_bets: Vec<ArbitrageBet>,
    pub total_stake: f64,
    pub expected_profit: f64,
    pub confidence: f64,
    pub details: ArbitrageDetails,
}
