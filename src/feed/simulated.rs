//! Synthetic season generator for demos and smoke runs.
//!
//! Each batch is one week: a random pairing of the league, box scores drawn
//! from hidden team strengths, and for every game an odds snapshot across a
//! few books, an intraday line history and a public/sharp money split.

use super::types::{FeedRecord, LineRecord, SplitRecord};
use super::MarketFeed;
use crate::market::OddsSnapshot;
use crate::ratings::GameResult;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const BOOKS: [(&str, f64); 4] = [
    ("pinnacle", 1.0),
    ("circa", 0.95),
    ("draftkings", 0.85),
    ("offshore", 0.6),
];

const BASE_POINTS: f64 = 100.0;
const HOME_EDGE: f64 = 3.0;
const SCORE_NOISE: f64 = 11.0;
const BOOK_VIG: f64 = 0.045;

struct SimTeam {
    name: String,
    strength: f64,
}

pub struct SimulatedSeason {
    rng: StdRng,
    teams: Vec<SimTeam>,
    weeks: usize,
    week: usize,
    opening: DateTime<Utc>,
}

impl SimulatedSeason {
    /// `seed` pins the season for reproducible runs.
    pub fn new(teams: usize, weeks: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let teams = (0..teams.max(2))
            .map(|i| SimTeam {
                name: format!("Team {:02}", i + 1),
                strength: rng.gen_range(-12.0..12.0),
            })
            .collect();
        Self {
            rng,
            teams,
            weeks,
            week: 0,
            opening: Utc
                .with_ymd_and_hms(2024, 9, 5, 0, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Hidden strengths, for checking recovered ratings.
    pub fn strengths(&self) -> impl Iterator<Item = (&str, f64)> {
        self.teams.iter().map(|t| (t.name.as_str(), t.strength))
    }

    /// Roughly normal noise from the sum of uniforms.
    fn noise(&mut self, scale: f64) -> f64 {
        let sum: f64 = (0..6).map(|_| self.rng.gen_range(-1.0_f64..1.0)).sum();
        sum * scale / 1.41
    }

    fn play_week(&mut self) -> Vec<FeedRecord> {
        let kickoff = self.opening + Duration::days(7 * self.week as i64);
        let mut order: Vec<usize> = (0..self.teams.len()).collect();
        order.shuffle(&mut self.rng);

        let mut records = Vec::new();
        for (slot, pair) in order.chunks_exact(2).enumerate() {
            let (home, away) = (pair[0], pair[1]);
            let date = kickoff + Duration::hours(slot as i64);
            let expected = self.teams[home].strength - self.teams[away].strength + HOME_EDGE;
            let event = format!("{}@{}", self.teams[away].name, self.teams[home].name);

            records.extend(self.market_records(&event, expected, date));

            let total = BASE_POINTS * 2.0 + self.noise(SCORE_NOISE);
            let margin = expected + self.noise(SCORE_NOISE);
            let home_score = ((total + margin) / 2.0).round().max(0.0);
            let away_score = ((total - margin) / 2.0).round().max(0.0);
            records.push(FeedRecord::Game(GameResult::new(
                self.teams[home].name.clone(),
                self.teams[away].name.clone(),
                home_score,
                away_score,
                date,
                true,
            )));
        }
        records
    }

    /// Pre-game market for one event: moneyline snapshot, spread moves and a split.
    fn market_records(&mut self, event: &str, expected: f64, date: DateTime<Utc>) -> Vec<FeedRecord> {
        let (home, away) = event
            .split_once('@')
            .map(|(a, h)| (h.to_string(), a.to_string()))
            .unwrap_or_default();
        let p_home = 1.0 / (1.0 + (-expected / 8.0).exp());

        let mut snapshot = OddsSnapshot::new("sim", event, "h2h");
        snapshot.timestamp = Some(date - Duration::hours(1));
        for (book, rating) in BOOKS {
            let skew = self.noise(0.03);
            let home_price = 1.0 / ((p_home + skew).clamp(0.05, 0.95) + BOOK_VIG / 2.0);
            let away_price = 1.0 / ((1.0 - p_home - skew).clamp(0.05, 0.95) + BOOK_VIG / 2.0);
            snapshot = snapshot.with_book(
                book,
                rating,
                &[(home.as_str(), round_price(home_price)), (away.as_str(), round_price(away_price))],
            );
        }

        let mut records = vec![FeedRecord::Odds(snapshot)];
        let opener = -(expected * 2.0).round() / 2.0;
        let mut line = opener;
        let steam = self.rng.gen_bool(0.15);
        let mut at = date - Duration::hours(3);
        for (book, _) in BOOKS {
            let step = if steam { -1.0 } else { self.noise(0.25) };
            line = ((line + step) * 2.0).round() / 2.0;
            records.push(FeedRecord::Line(LineRecord {
                sport: "sim".to_string(),
                event: event.to_string(),
                market: "spread".to_string(),
                line,
                timestamp: at,
                book: book.to_string(),
            }));
            at += Duration::seconds(self.rng.gen_range(20..90));
        }

        let public_pct = (50.0 + self.noise(20.0)).clamp(5.0, 95.0);
        let sharp_pct = self.rng.gen_range(20.0..80.0);
        records.push(FeedRecord::Split(SplitRecord {
            sport: "sim".to_string(),
            event: event.to_string(),
            market: "spread".to_string(),
            public_pct,
            sharp_pct,
            line,
        }));
        records
    }
}

fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[async_trait]
impl MarketFeed for SimulatedSeason {
    async fn next_batch(&mut self) -> Result<Option<Vec<FeedRecord>>> {
        if self.week >= self.weeks {
            return Ok(None);
        }
        let records = self.play_week();
        self.week += 1;
        Ok(Some(records))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
