use super::formulas::{calculate_win_probability, mean, recency_weighted_mean, std_dev, variance};
use super::lookup;
use super::types::GameResult;
use crate::config::AnalysisConfig;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// z for a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// Head-to-head games needed before the sample-size factor saturates.
const FULL_SAMPLE_GAMES: f64 = 5.0;

/// Rating gap at which the separation factor saturates.
const FULL_SEPARATION: f64 = 200.0;

const BASE_CONFIDENCE: f64 = 0.7;

const TREND_GAMES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingAnalysis {
    pub rating: f64,
    pub power: f64,
    pub offense: f64,
    pub defense: f64,
    pub schedule_strength: f64,
    pub expected_wins: f64,
    pub win_probability: f64,
    pub confidence_interval: (f64, f64),
    pub variance: f64,
    pub trend: f64,
}

impl RatingAnalysis {
    /// Record for a team that has not played.
    pub fn neutral() -> Self {
        Self {
            rating: 0.0,
            power: 0.0,
            offense: 0.0,
            defense: 0.0,
            schedule_strength: 0.0,
            expected_wins: 0.0,
            win_probability: 0.5,
            confidence_interval: (f64::NEG_INFINITY, f64::INFINITY),
            variance: f64::INFINITY,
            trend: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalResult {
    pub date: DateTime<Utc>,
    pub team_a: String,
    pub team_b: String,
    pub score_a: f64,
    pub score_b: f64,
    pub winner: String,
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupAnalysis {
    pub win_probability: f64,
    pub expected_margin: f64,
    pub upset_probability: f64,
    pub key_factors: Vec<String>,
    pub confidence: f64,
    pub historical_results: Vec<HistoricalResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub win_probability: f64,
    pub expected_margin: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionFactors {
    pub prediction: Prediction,
    pub advantages: Vec<String>,
    pub risks: Vec<String>,
    pub key_factors: Vec<String>,
    pub historical: Vec<HistoricalResult>,
}

/// Per-team and per-matchup breakdowns from a rating map and game log.
#[derive(Debug, Clone, Default)]
pub struct RatingAnalyzer {
    config: AnalysisConfig,
}

impl RatingAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// A team with no games gets [`RatingAnalysis::neutral`]. A team with
    /// games but no rating (or an opponent without one) is an error.
    pub fn analyze_team(
        &self,
        team: &str,
        ratings: &HashMap<String, f64>,
        games: &[GameResult],
    ) -> Result<RatingAnalysis, EngineError> {
        let mut played: Vec<&GameResult> = games.iter().filter(|g| g.involves(team)).collect();
        if played.is_empty() {
            return Ok(RatingAnalysis::neutral());
        }
        played.sort_by_key(|g| g.date);

        let rating = lookup(ratings, team)?;
        let margins: Vec<f64> = played.iter().map(|g| g.margin_for(team)).collect();
        let recent = &margins[margins.len().saturating_sub(TREND_GAMES)..];
        let trend = recency_weighted_mean(recent);

        let (points_for, points_against): (Vec<f64>, Vec<f64>) =
            played.iter().filter_map(|g| g.perspective(team)).unzip();

        let mut opponent_ratings = Vec::with_capacity(played.len());
        for g in &played {
            if let Some(opp) = g.opponent_of(team) {
                opponent_ratings.push(lookup(ratings, opp)?);
            }
        }
        let expected_wins = opponent_ratings
            .iter()
            .map(|opp| self.win_probability(rating, *opp))
            .sum();

        let all: Vec<f64> = ratings.values().copied().collect();
        let std_error = std_dev(&margins) / (margins.len() as f64).sqrt();

        Ok(RatingAnalysis {
            rating,
            power: rating + trend,
            offense: mean(&points_for),
            defense: -mean(&points_against),
            schedule_strength: mean(&opponent_ratings),
            expected_wins,
            win_probability: self.win_probability(rating, mean(&all)),
            confidence_interval: (rating - Z_95 * std_error, rating + Z_95 * std_error),
            variance: variance(&margins),
            trend,
        })
    }

    pub fn analyze_matchup(
        &self,
        team_a: &str,
        team_b: &str,
        ratings: &HashMap<String, f64>,
        games: &[GameResult],
    ) -> Result<MatchupAnalysis, EngineError> {
        let r_a = lookup(ratings, team_a)?;
        let r_b = lookup(ratings, team_b)?;
        let h2h: Vec<&GameResult> = games
            .iter()
            .filter(|g| g.involves(team_a) && g.involves(team_b))
            .collect();

        let confidence = (BASE_CONFIDENCE
            * (h2h.len() as f64 / FULL_SAMPLE_GAMES).min(1.0)
            * ((r_a - r_b).abs() / FULL_SEPARATION).min(1.0))
        .min(1.0);

        Ok(MatchupAnalysis {
            win_probability: self.win_probability(r_a, r_b),
            expected_margin: (r_a - r_b) * self.config.margin_scale,
            upset_probability: self.upset_probability(&h2h, ratings)?,
            key_factors: self.key_factors(team_a, team_b, ratings, games)?,
            confidence,
            historical_results: h2h.iter().map(|g| historical(g)).collect(),
        })
    }

    pub fn decision_factors(
        &self,
        team_a: &str,
        team_b: &str,
        ratings: &HashMap<String, f64>,
        games: &[GameResult],
    ) -> Result<DecisionFactors, EngineError> {
        let a = self.analyze_team(team_a, ratings, games)?;
        let b = self.analyze_team(team_b, ratings, games)?;
        let matchup = self.analyze_matchup(team_a, team_b, ratings, games)?;

        let mut advantages = Vec::new();
        if a.offense > b.defense {
            advantages.push(format!("{team_a} offense vs {team_b} defense"));
        }
        if a.defense > b.offense {
            advantages.push(format!("{team_a} defense vs {team_b} offense"));
        }

        let mut risks = Vec::new();
        if a.variance > 0.2 {
            risks.push(format!("High variance in {team_a} performance"));
        }
        if a.trend.abs() > 50.0 {
            risks.push(format!("Significant recent trend for {team_a}"));
        }

        Ok(DecisionFactors {
            prediction: Prediction {
                win_probability: matchup.win_probability,
                expected_margin: matchup.expected_margin,
                confidence: matchup.confidence,
            },
            advantages,
            risks,
            key_factors: matchup.key_factors,
            historical: matchup.historical_results,
        })
    }

    fn win_probability(&self, r_a: f64, r_b: f64) -> f64 {
        calculate_win_probability(r_a, r_b, 0.0, 0.0, self.config.sigma)
    }

    /// Blend of the head-to-head upset rate with the prior; the prior alone
    /// without history. The favourite is judged by current ratings.
    fn upset_probability(
        &self,
        h2h: &[&GameResult],
        ratings: &HashMap<String, f64>,
    ) -> Result<f64, EngineError> {
        if h2h.is_empty() {
            return Ok(self.config.upset_prior);
        }
        let mut upsets = 0usize;
        for g in h2h {
            let favourite = if lookup(ratings, &g.team_a)? > lookup(ratings, &g.team_b)? {
                g.team_a.as_str()
            } else {
                g.team_b.as_str()
            };
            if g.winner() != favourite {
                upsets += 1;
            }
        }
        let rate = upsets as f64 / h2h.len() as f64;
        Ok((rate + self.config.upset_prior) / 2.0)
    }

    fn key_factors(
        &self,
        team_a: &str,
        team_b: &str,
        ratings: &HashMap<String, f64>,
        games: &[GameResult],
    ) -> Result<Vec<String>, EngineError> {
        let a = self.analyze_team(team_a, ratings, games)?;
        let b = self.analyze_team(team_b, ratings, games)?;
        let mut factors = Vec::new();

        if (a.offense - b.defense).abs() > 10.0 {
            let edge = if a.offense > b.defense {
                "advantage"
            } else {
                "disadvantage"
            };
            factors.push(format!("Significant {edge} for {team_a} offense"));
        }
        if a.trend.abs() > 20.0 {
            let direction = if a.trend > 0.0 { "positive" } else { "negative" };
            factors.push(format!("{team_a} has {direction} momentum"));
        }
        if (a.schedule_strength - b.schedule_strength).abs() > 100.0 {
            let tougher = if a.schedule_strength > b.schedule_strength {
                team_a
            } else {
                team_b
            };
            factors.push(format!("{tougher} has played tougher schedule"));
        }
        Ok(factors)
    }
}

fn historical(g: &GameResult) -> HistoricalResult {
    HistoricalResult {
        date: g.date,
        team_a: g.team_a.clone(),
        team_b: g.team_b.clone(),
        score_a: g.score_a,
        score_b: g.score_b,
        winner: g.winner().to_string(),
        margin: g.margin().abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::massey::RatingEngine;
    use crate::ratings::types::fixtures::{game, ladder};

    fn setup() -> (RatingAnalyzer, HashMap<String, f64>, Vec<GameResult>) {
        let games = ladder();
        let ratings = RatingEngine::default().calculate_ratings(&games);
        (RatingAnalyzer::default(), ratings, games)
    }

    #[test]
    fn test_team_without_games_is_neutral() {
        let (analyzer, ratings, games) = setup();
        let a = analyzer.analyze_team("Bulls", &ratings, &games).unwrap();
        assert_eq!(a, RatingAnalysis::neutral());
        assert!(a.variance.is_infinite());
        assert_eq!(a.win_probability, 0.5);
    }

    #[test]
    fn test_analyze_team_ladder() {
        let (analyzer, ratings, games) = setup();
        let w = analyzer.analyze_team("Warriors", &ratings, &games).unwrap();
        // points for 120, 115, 110; against 100, 100, 90
        assert!((w.offense - 115.0).abs() < 1e-9);
        assert!((w.defense + 96.666_666).abs() < 1e-4);
        // margins 20, 15, 20 -> mean 18.33, var 5.556
        assert!((w.variance - 50.0 / 9.0).abs() < 1e-9);
        assert!(w.trend > 15.0 && w.trend < 20.0);
        assert!((w.power - (w.rating + w.trend)).abs() < 1e-12);
        assert!(w.confidence_interval.0 < w.rating && w.rating < w.confidence_interval.1);
        assert!(w.win_probability > 0.5);
        // opponents L -0.5, C -2.5, N -10.75
        assert!((w.schedule_strength + 13.75 / 3.0).abs() < 1e-9);
        assert!(w.expected_wins > 1.5 && w.expected_wins < 3.0);
    }

    #[test]
    fn test_analyze_team_missing_rating_fails() {
        let (analyzer, _, games) = setup();
        let err = analyzer
            .analyze_team("Warriors", &HashMap::new(), &games)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnratedTeam(_)));
    }

    #[test]
    fn test_matchup_without_history() {
        let games = vec![game("A", "C", 10.0, 0.0, 0), game("B", "C", 5.0, 0.0, 1)];
        let ratings: HashMap<String, f64> =
            [("A".into(), 100.0), ("B".into(), 0.0), ("C".into(), -100.0)].into();
        let m = RatingAnalyzer::default()
            .analyze_matchup("A", "B", &ratings, &games)
            .unwrap();
        assert_eq!(m.upset_probability, 0.3);
        assert_eq!(m.confidence, 0.0);
        assert!((m.expected_margin - 350.0).abs() < 1e-9);
        assert!(m.historical_results.is_empty());
        assert!(m.win_probability > 0.5);
    }

    #[test]
    fn test_matchup_upset_blend_and_confidence() {
        // A rated above B but B won one of two meetings -> rate 0.5
        let games = vec![
            game("A", "B", 10.0, 5.0, 0),
            game("B", "A", 7.0, 3.0, 1),
        ];
        let ratings: HashMap<String, f64> = [("A".into(), 300.0), ("B".into(), 0.0)].into();
        let m = RatingAnalyzer::default()
            .analyze_matchup("A", "B", &ratings, &games)
            .unwrap();
        assert!((m.upset_probability - 0.4).abs() < 1e-12);
        // 0.7 * (2/5) * min(1, 300/200) = 0.28
        assert!((m.confidence - 0.28).abs() < 1e-12);
        assert_eq!(m.historical_results.len(), 2);
        assert_eq!(m.historical_results[1].winner, "B");
        assert_eq!(m.historical_results[1].margin, 4.0);
    }

    #[test]
    fn test_margin_scale_override() {
        let (_, ratings, games) = setup();
        let analyzer = RatingAnalyzer::new(AnalysisConfig {
            margin_scale: 1.0,
            ..Default::default()
        });
        let m = analyzer
            .analyze_matchup("Warriors", "Nets", &ratings, &games)
            .unwrap();
        assert!((m.expected_margin - 24.5).abs() < 1e-9);
    }

    #[test]
    fn test_matchup_unknown_team() {
        let (analyzer, ratings, games) = setup();
        assert_eq!(
            analyzer
                .analyze_matchup("Warriors", "Bulls", &ratings, &games)
                .unwrap_err(),
            EngineError::UnratedTeam("Bulls".to_string())
        );
    }

    #[test]
    fn test_decision_factors() {
        let (analyzer, ratings, games) = setup();
        let d = analyzer
            .decision_factors("Warriors", "Nets", &ratings, &games)
            .unwrap();
        // Warriors offense 115 > Nets defense -106
        assert!(d.advantages.contains(&"Warriors offense vs Nets defense".to_string()));
        assert!(d.risks.contains(&"High variance in Warriors performance".to_string()));
        assert_eq!(d.historical.len(), 1);
        assert!(d.key_factors.iter().any(|f| f.contains("advantage for Warriors offense")));
    }
}
