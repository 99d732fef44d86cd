//! Cross-book arbitrage.
//!
//! Take the best price for every outcome across books. If the implied
//! probabilities of those prices sum below 1, staking each leg in proportion
//! to `1 / price` locks in the same payout whichever outcome lands.

use super::odds::{decimal_to_probability, devig};
use super::types::{
    ArbitrageBet, ArbitrageDetails, ArbitrageOpportunity, MarketOverview, OddsQuote, OddsSnapshot,
    OutcomeOdds,
};
use crate::config::ArbitrageConfig;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

/// Margin at which stake sizing and margin confidence saturate.
const REFERENCE_MARGIN: f64 = 0.05;

/// Confidence lost per leg beyond two.
const EXTRA_LEG_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct ArbitrageDetector {
    config: ArbitrageConfig,
}

impl ArbitrageDetector {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArbitrageConfig {
        &self.config
    }

    /// Usable quotes: trusted books, strictly positive decimal prices.
    pub fn extract_market_odds(&self, snapshot: &OddsSnapshot) -> Vec<OddsQuote> {
        let mut quotes = Vec::new();
        for (book, data) in &snapshot.books {
            if data.rating < self.config.min_book_rating {
                continue;
            }
            for (outcome, price) in &data.odds {
                let price = snapshot.format.to_decimal(*price);
                if price > 0.0 && price.is_finite() {
                    quotes.push(OddsQuote {
                        book: book.clone(),
                        outcome: outcome.clone(),
                        price,
                        rating: data.rating,
                    });
                }
            }
        }
        quotes
    }

    pub fn find_arbitrage(&self, snapshot: &OddsSnapshot) -> Option<ArbitrageOpportunity> {
        // Outcomes are every name any book quotes, so a market where only an
        // untrusted book offers one side is not mistaken for a smaller market.
        let outcomes: BTreeSet<&str> = snapshot
            .books
            .values()
            .flat_map(|b| b.odds.keys().map(String::as_str))
            .collect();
        if outcomes.len() < 2 {
            return None;
        }

        let quotes = self.extract_market_odds(snapshot);
        let mut best: BTreeMap<&str, &OddsQuote> = BTreeMap::new();
        for q in &quotes {
            let entry = best.entry(q.outcome.as_str()).or_insert(q);
            if q.price > entry.price {
                *entry = q;
            }
        }
        if best.len() != outcomes.len() {
            return None;
        }

        let total_inverse: f64 = best.values().map(|q| decimal_to_probability(q.price)).sum();
        if total_inverse >= 1.0 {
            return None;
        }
        let margin = 1.0 - total_inverse;
        if margin < self.config.min_profit_margin {
            return None;
        }

        let total_stake = self.optimal_stake(margin);
        let bets: Vec<ArbitrageBet> = best
            .values()
            .map(|q| ArbitrageBet {
                book: q.book.clone(),
                outcome: q.outcome.clone(),
                odds: q.price,
                stake: total_stake / (q.price * total_inverse),
                rating: q.rating,
            })
            .collect();
        let confidence = Self::confidence(&bets, margin);

        tracing::info!(
            sport = %snapshot.sport,
            event = %snapshot.event,
            market = %snapshot.market,
            margin,
            total_stake,
            legs = bets.len(),
            "arbitrage detected"
        );

        Some(ArbitrageOpportunity {
            sport: snapshot.sport.clone(),
            event: snapshot.event.clone(),
            market: snapshot.market.clone(),
            timestamp: snapshot.timestamp.unwrap_or_else(Utc::now),
            profit_margin: margin,
            details: details(&quotes, &bets),
            required_bets: bets,
            total_stake,
            expected_profit: total_stake * margin,
            confidence,
        })
    }

    /// Linear in margin up to the reference margin, square-root damped past it,
    /// never above `max_stake`.
    pub fn optimal_stake(&self, margin: f64) -> f64 {
        let mut stake = self.config.max_stake * (margin / REFERENCE_MARGIN);
        if margin > REFERENCE_MARGIN {
            stake *= (REFERENCE_MARGIN / margin).sqrt();
        }
        stake.min(self.config.max_stake)
    }

    /// `min(1, margin / 5%) × avg_rating² × legs penalty`.
    pub fn confidence(bets: &[ArbitrageBet], margin: f64) -> f64 {
        if bets.is_empty() {
            return 0.0;
        }
        let base = (margin / REFERENCE_MARGIN).min(1.0);
        let avg_rating = bets.iter().map(|b| b.rating).sum::<f64>() / bets.len() as f64;
        let legs_factor = (1.0 - EXTRA_LEG_PENALTY * (bets.len() as f64 - 2.0)).clamp(0.5, 1.0);
        base * avg_rating.powi(2) * legs_factor
    }
}

fn details(quotes: &[OddsQuote], bets: &[ArbitrageBet]) -> ArbitrageDetails {
    let books: BTreeSet<&str> = quotes.iter().map(|q| q.book.as_str()).collect();
    let outcomes: BTreeSet<&str> = quotes.iter().map(|q| q.outcome.as_str()).collect();
    let avg_book_rating = if quotes.is_empty() {
        0.0
    } else {
        quotes.iter().map(|q| q.rating).sum::<f64>() / quotes.len() as f64
    };

    let spreads: Vec<(f64, f64, f64)> = bets
        .iter()
        .map(|bet| {
            let prices: Vec<f64> = quotes
                .iter()
                .filter(|q| q.outcome == bet.outcome)
                .map(|q| q.price)
                .collect();
            let market_avg = prices.iter().sum::<f64>() / prices.len().max(1) as f64;
            let market_min = prices.iter().copied().fold(f64::INFINITY, f64::min);
            let market_max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (market_avg, market_min, market_max)
        })
        .collect();
    // Consensus view of each outcome with the average overround taken out.
    let implied: Vec<f64> = spreads
        .iter()
        .map(|(avg, _, _)| decimal_to_probability(*avg))
        .collect();
    let fair = devig(&implied);

    let odds_distribution = bets
        .iter()
        .zip(spreads)
        .zip(fair)
        .map(|((bet, (market_avg, market_min, market_max)), fair_probability)| {
            (
                bet.outcome.clone(),
                OutcomeOdds {
                    selected: bet.odds,
                    market_avg,
                    market_min,
                    market_max,
                    fair_probability,
                },
            )
        })
        .collect();

    ArbitrageDetails {
        market_overview: MarketOverview {
            total_books: books.len(),
            total_outcomes: outcomes.len(),
            avg_book_rating,
        },
        selected_books: bets.iter().map(|b| b.book.clone()).collect(),
        odds_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::odds::OddsFormat;

    fn two_way(a: f64, b: f64) -> OddsSnapshot {
        OddsSnapshot::new("nba", "LAL@BOS", "h2h")
            .with_book("book_a", 1.0, &[("home", a), ("away", 1.50)])
            .with_book("book_b", 1.0, &[("home", 1.50), ("away", b)])
    }

    #[test]
    fn test_arbitrage_found() {
        // 1/2.10 + 1/2.05 = 0.47619 + 0.48780 = 0.96399
        let opp = ArbitrageDetector::default()
            .find_arbitrage(&two_way(2.10, 2.05))
            .unwrap();
        assert!((opp.profit_margin - 0.0360).abs() < 1e-3);
        assert_eq!(opp.required_bets.len(), 2);
        let payouts: Vec<f64> = opp.required_bets.iter().map(|b| b.payout()).collect();
        assert!((payouts[0] - payouts[1]).abs() < 1e-6);
        let staked: f64 = opp.required_bets.iter().map(|b| b.stake).sum();
        assert!((staked - opp.total_stake).abs() < 1e-6);
        assert!((opp.expected_profit - opp.total_stake * opp.profit_margin).abs() < 1e-9);
        assert_eq!(opp.details.selected_books, vec!["book_b", "book_a"]);
    }

    #[test]
    fn test_no_arbitrage_when_overround() {
        // 2 / 1.90 = 1.0526
        assert!(ArbitrageDetector::default()
            .find_arbitrage(&two_way(1.90, 1.90))
            .is_none());
    }

    #[test]
    fn test_margin_below_minimum() {
        // 1/2.02 + 1/2.00 = 0.995 -> margin 0.5% < 1%
        assert!(ArbitrageDetector::default()
            .find_arbitrage(&two_way(2.02, 2.00))
            .is_none());
    }

    #[test]
    fn test_low_rated_book_filtered() {
        let snap = OddsSnapshot::new("nba", "e", "h2h")
            .with_book("good", 0.9, &[("home", 1.90), ("away", 1.90)])
            .with_book("shady", 0.3, &[("home", 3.00), ("away", 3.00)]);
        assert!(ArbitrageDetector::default().find_arbitrage(&snap).is_none());
    }

    #[test]
    fn test_missing_outcome_blocks() {
        // Only the untrusted book prices "away".
        let snap = OddsSnapshot::new("nba", "e", "h2h")
            .with_book("good", 1.0, &[("home", 5.0)])
            .with_book("shady", 0.1, &[("away", 5.0)]);
        assert!(ArbitrageDetector::default().find_arbitrage(&snap).is_none());
    }

    #[test]
    fn test_invalid_prices_ignored() {
        let snap = OddsSnapshot::new("nba", "e", "h2h")
            .with_book("a", 1.0, &[("home", 2.10), ("away", -3.0)])
            .with_book("b", 1.0, &[("home", 0.0), ("away", 2.05)]);
        let opp = ArbitrageDetector::default().find_arbitrage(&snap).unwrap();
        assert_eq!(opp.details.market_overview.total_books, 2);
        assert_eq!(opp.details.odds_distribution["home"].market_max, 2.10);
    }

    #[test]
    fn test_stake_sizing() {
        let det = ArbitrageDetector::default();
        // linear below 5%
        assert!((det.optimal_stake(0.025) - 500.0).abs() < 1e-9);
        // 1000 * 0.08/0.05 * sqrt(0.05/0.08) = 1264.9 -> capped
        assert_eq!(det.optimal_stake(0.08), 1000.0);
        let small = ArbitrageDetector::new(ArbitrageConfig {
            max_stake: 100.0,
            ..Default::default()
        });
        assert!(small.optimal_stake(0.01) <= 100.0);
    }

    #[test]
    fn test_confidence_penalizes_legs_and_ratings() {
        let leg = |rating| ArbitrageBet {
            book: "b".into(),
            outcome: "o".into(),
            odds: 3.5,
            stake: 1.0,
            rating,
        };
        // 0.05 margin, ratings 1.0, 2 legs -> 1.0
        assert!((ArbitrageDetector::confidence(&[leg(1.0), leg(1.0)], 0.05) - 1.0).abs() < 1e-12);
        // three legs -> 0.9
        let three = [leg(1.0), leg(1.0), leg(1.0)];
        assert!((ArbitrageDetector::confidence(&three, 0.05) - 0.9).abs() < 1e-12);
        // rating 0.8 -> 0.64; margin 0.025 -> 0.5
        let c = ArbitrageDetector::confidence(&[leg(0.8), leg(0.8)], 0.025);
        assert!((c - 0.32).abs() < 1e-12);
        // floor at 0.5 for many legs
        let many = vec![leg(1.0); 10];
        assert!((ArbitrageDetector::confidence(&many, 0.05) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_american_snapshot() {
        // +110 = 2.10, +105 = 2.05
        let mut snap = OddsSnapshot::new("nfl", "e", "h2h")
            .with_book("a", 1.0, &[("home", 110.0), ("away", -200.0)])
            .with_book("b", 1.0, &[("home", -200.0), ("away", 105.0)]);
        snap.format = OddsFormat::American;
        let opp = ArbitrageDetector::default().find_arbitrage(&snap).unwrap();
        assert!((opp.profit_margin - 0.0360).abs() < 1e-3);
    }

    #[test]
    fn test_fair_probabilities_from_consensus() {
        let snap = OddsSnapshot::new("nba", "LAL@BOS", "h2h")
            .with_book("a", 1.0, &[("home", 2.10), ("away", 1.80)])
            .with_book("b", 1.0, &[("home", 1.70), ("away", 2.05)]);
        let opp = ArbitrageDetector::default().find_arbitrage(&snap).unwrap();
        let dist = &opp.details.odds_distribution;
        // avg home 1.90, avg away 1.925: 0.5263 + 0.5195 = 1.0458 overround
        let fair_home = dist["home"].fair_probability;
        let fair_away = dist["away"].fair_probability;
        assert!((fair_home + fair_away - 1.0).abs() < 1e-12);
        assert!((fair_home - 0.5263 / 1.0458).abs() < 1e-3);
        assert!(fair_home > fair_away);
    }

    #[test]
    fn test_three_way_market() {
        let snap = OddsSnapshot::new("epl", "ARS-CHE", "1x2")
            .with_book("a", 1.0, &[("home", 3.0), ("draw", 3.2), ("away", 3.1)])
            .with_book("b", 1.0, &[("home", 2.5), ("draw", 3.6), ("away", 3.3)]);
        // 1/3.0 + 1/3.6 + 1/3.3 = 0.9141
        let opp = ArbitrageDetector::default().find_arbitrage(&snap).unwrap();
        assert_eq!(opp.required_bets.len(), 3);
        let first = opp.required_bets[0].payout();
        for bet in &opp.required_bets {
            assert!((bet.payout() - first).abs() < 1e-6);
        }
    }
}
