//! Derived per-team statistics on top of Massey ratings.

use super::formulas::{mean, recency_weighted_mean, std_dev};
use super::massey::{OffenseDefense, RatingEngine};
use super::types::{GameResult, TeamIndex};
use crate::config::AnalysisConfig;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Share of the power rating taken from the raw Massey rating.
const POWER_RAW_WEIGHT: f64 = 0.7;

/// Games (league-wide, most recent) feeding the recency component.
const RECENT_GAMES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TeamStats {
    pub rating: f64,
    pub power: f64,
    pub offense: f64,
    pub defense: f64,
    pub home_advantage: f64,
    pub schedule_strength: f64,
    pub expected_wins: f64,
    pub expected_losses: f64,
    pub std_error: f64,
    pub parity_index: f64,
    pub games_played: usize,
}

pub struct RatingStatistics {
    engine: RatingEngine,
    config: AnalysisConfig,
    registered: BTreeSet<String>,
}

impl RatingStatistics {
    pub fn new(engine: RatingEngine, config: AnalysisConfig) -> Self {
        Self {
            engine,
            config,
            registered: BTreeSet::new(),
        }
    }

    /// Teams that should appear in every output map even without games.
    pub fn register_teams<I, S>(&mut self, teams: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registered.extend(teams.into_iter().map(Into::into));
    }

    pub fn engine(&self) -> &RatingEngine {
        &self.engine
    }

    fn teams(&self, games: &[GameResult]) -> Vec<String> {
        let mut all = self.registered.clone();
        for g in games {
            all.insert(g.team_a.clone());
            all.insert(g.team_b.clone());
        }
        all.into_iter().collect()
    }

    /// Massey ratings with 0.0 (the league mean) for teams the solver did
    /// not rate.
    pub fn base_ratings(&self, games: &[GameResult]) -> HashMap<String, f64> {
        let mut ratings = self.engine.calculate_ratings(games);
        for team in self.teams(games) {
            ratings.entry(team).or_insert(0.0);
        }
        ratings
    }

    pub fn calculate_power_ratings(&self, games: &[GameResult]) -> HashMap<String, f64> {
        let ratings = self.base_ratings(games);
        power_from(games, &ratings)
    }

    /// Solver split, or the averaged fallback when the schedule is too thin.
    pub fn calculate_offense_defense_ratings(&self, games: &[GameResult]) -> OffenseDefense {
        let index = TeamIndex::from_teams(self.teams(games));
        let od = RatingEngine::decompose_offense_defense(games, &index);
        if od.exact {
            od
        } else {
            simple_offense_defense(games, &index)
        }
    }

    /// Mean opponent power rating, plus the home bump for each home game.
    /// 0.0 for a team without games.
    pub fn calculate_schedule_strength(&self, games: &[GameResult]) -> HashMap<String, f64> {
        let power = self.calculate_power_ratings(games);
        self.schedule_strength_from(games, &power)
    }

    fn schedule_strength_from(
        &self,
        games: &[GameResult],
        power: &HashMap<String, f64>,
    ) -> HashMap<String, f64> {
        self.teams(games)
            .into_iter()
            .map(|team| {
                let faced: Vec<f64> = games
                    .iter()
                    .filter_map(|g| {
                        let opp = g.opponent_of(&team)?;
                        let mut strength = power.get(opp).copied().unwrap_or(0.0);
                        if g.is_home_for(&team) {
                            strength += self.config.home_schedule_bump;
                        }
                        Some(strength)
                    })
                    .collect();
                let s = if faced.is_empty() { 0.0 } else { mean(&faced) };
                (team, s)
            })
            .collect()
    }

    /// (expected wins, expected losses) over the games already played.
    pub fn calculate_expected_wins_losses(
        &self,
        games: &[GameResult],
    ) -> HashMap<String, (f64, f64)> {
        let ratings = self.base_ratings(games);
        self.expected_from(games, &ratings)
    }

    fn expected_from(
        &self,
        games: &[GameResult],
        ratings: &HashMap<String, f64>,
    ) -> HashMap<String, (f64, f64)> {
        let mut expected: HashMap<String, (f64, f64)> = self
            .teams(games)
            .into_iter()
            .map(|t| (t, (0.0, 0.0)))
            .collect();
        for g in games {
            let Ok((p_a, _)) = self
                .engine
                .predict_game(ratings, &g.team_a, &g.team_b, !g.is_home_a)
            else {
                continue;
            };
            if let Some(e) = expected.get_mut(&g.team_a) {
                e.0 += p_a;
                e.1 += 1.0 - p_a;
            }
            if let Some(e) = expected.get_mut(&g.team_b) {
                e.0 += 1.0 - p_a;
                e.1 += p_a;
            }
        }
        expected
    }

    /// `1 / (1 + mean |r_team - r_opp| / σ_league)`, in (0, 1]. Teams without
    /// games, or a league with zero spread, get 1.0.
    pub fn calculate_parity_indices(&self, games: &[GameResult]) -> HashMap<String, f64> {
        let ratings = self.base_ratings(games);
        self.parity_from(games, &ratings)
    }

    fn parity_from(
        &self,
        games: &[GameResult],
        ratings: &HashMap<String, f64>,
    ) -> HashMap<String, f64> {
        let all: Vec<f64> = ratings.values().copied().collect();
        let spread = std_dev(&all);
        self.teams(games)
            .into_iter()
            .map(|team| {
                let diffs: Vec<f64> = games
                    .iter()
                    .filter(|g| g.involves(&team))
                    .map(|g| {
                        let r_a = ratings.get(&g.team_a).copied().unwrap_or(0.0);
                        let r_b = ratings.get(&g.team_b).copied().unwrap_or(0.0);
                        (r_a - r_b).abs()
                    })
                    .collect();
                let parity = if diffs.is_empty() || spread <= 0.0 {
                    1.0
                } else {
                    1.0 / (1.0 + mean(&diffs) / spread)
                };
                (team, parity)
            })
            .collect()
    }

    /// Standard error of a team's rating: spread of its opponent-adjusted
    /// margins over √games. Infinite below two games.
    pub fn calculate_rating_confidence(&self, games: &[GameResult]) -> HashMap<String, f64> {
        let ratings = self.base_ratings(games);
        confidence_from(&self.teams(games), games, &ratings)
    }

    pub fn complete_team_stats(&self, games: &[GameResult]) -> BTreeMap<String, TeamStats> {
        let ratings = self.base_ratings(games);
        let power = power_from(games, &ratings);
        let od = self.calculate_offense_defense_ratings(games);
        let schedule = self.schedule_strength_from(games, &power);
        let expected = self.expected_from(games, &ratings);
        let parity = self.parity_from(games, &ratings);
        let teams = self.teams(games);
        let confidence = confidence_from(&teams, games, &ratings);

        teams
            .into_iter()
            .map(|team| {
                let get = |m: &HashMap<String, f64>, default: f64| {
                    m.get(&team).copied().unwrap_or(default)
                };
                let (expected_wins, expected_losses) =
                    expected.get(&team).copied().unwrap_or((0.0, 0.0));
                let stats = TeamStats {
                    rating: get(&ratings, 0.0),
                    power: get(&power, 0.0),
                    offense: get(&od.offense, 0.0),
                    defense: get(&od.defense, 0.0),
                    home_advantage: self.config.home_schedule_bump,
                    schedule_strength: get(&schedule, 0.0),
                    expected_wins,
                    expected_losses,
                    std_error: get(&confidence, f64::INFINITY),
                    parity_index: get(&parity, 1.0),
                    games_played: games.iter().filter(|g| g.involves(&team)).count(),
                };
                (team, stats)
            })
            .collect()
    }
}

/// Blend raw ratings with recent form. Recent form only looks at the
/// league's last few games; a team absent from them keeps its raw rating.
fn power_from(games: &[GameResult], ratings: &HashMap<String, f64>) -> HashMap<String, f64> {
    let mut ordered: Vec<&GameResult> = games.iter().collect();
    ordered.sort_by_key(|g| g.date);
    let recent = &ordered[ordered.len().saturating_sub(RECENT_GAMES)..];

    let mut performances: HashMap<&str, Vec<f64>> = HashMap::new();
    for g in recent {
        let r_a = ratings.get(&g.team_a).copied().unwrap_or(0.0);
        let r_b = ratings.get(&g.team_b).copied().unwrap_or(0.0);
        performances
            .entry(g.team_a.as_str())
            .or_default()
            .push(g.margin() + r_b);
        performances
            .entry(g.team_b.as_str())
            .or_default()
            .push(-g.margin() + r_a);
    }

    ratings
        .iter()
        .map(|(team, &raw)| {
            let recent = performances
                .get(team.as_str())
                .map(|p| recency_weighted_mean(p))
                .unwrap_or(raw);
            (
                team.clone(),
                POWER_RAW_WEIGHT * raw + (1.0 - POWER_RAW_WEIGHT) * recent,
            )
        })
        .collect()
}

/// Mean points for/against per game, each re-centred on the league mean.
/// Defense is negated so that allowing fewer points scores higher.
fn simple_offense_defense(games: &[GameResult], index: &TeamIndex) -> OffenseDefense {
    let mut scored: Vec<f64> = Vec::with_capacity(index.len());
    let mut allowed: Vec<f64> = Vec::with_capacity(index.len());
    for team in index.teams() {
        let (pf, pa): (Vec<f64>, Vec<f64>) =
            games.iter().filter_map(|g| g.perspective(team)).unzip();
        scored.push(mean(&pf));
        allowed.push(mean(&pa));
    }
    let off_mean = mean(&scored);
    let def_mean = mean(&allowed);
    let offense: Vec<f64> = scored.iter().map(|s| s - off_mean).collect();
    let defense: Vec<f64> = allowed.iter().map(|a| -(a - def_mean)).collect();

    let all_points: Vec<f64> = games.iter().flat_map(|g| [g.score_a, g.score_b]).collect();
    OffenseDefense {
        offense: index.to_map(&offense),
        defense: index.to_map(&defense),
        baseline: mean(&all_points),
        exact: false,
    }
}

fn confidence_from(
    teams: &[String],
    games: &[GameResult],
    ratings: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    teams
        .iter()
        .map(|team| {
            let own = ratings.get(team).copied().unwrap_or(0.0);
            let adjusted: Vec<f64> = games
                .iter()
                .filter_map(|g| {
                    let opp = g.opponent_of(team)?;
                    let opp_rating = ratings.get(opp).copied().unwrap_or(0.0);
                    Some(g.margin_for(team) + own - opp_rating)
                })
                .collect();
            let se = if adjusted.len() < 2 {
                f64::INFINITY
            } else {
                std_dev(&adjusted) / (adjusted.len() as f64).sqrt()
            };
            (team.clone(), se)
        })
        .collect()
}
