//! Massey least-squares ratings.
//!
//! Every game contributes one equation `r_a - r_b ≈ margin`. The normal
//! equations `M r = b` are rank-deficient (ratings are only defined up to a
//! constant), so the last row is replaced by `Σ r = 0`.

use super::formulas::{
    calculate_bayesian_correction, calculate_win_probability, game_outcome_measure, mean,
    time_weight,
};
use super::linalg::{least_squares, solve, Matrix};
use super::types::{win_loss_records, GameResult, Solution, TeamIndex};
use super::lookup;
use crate::config::{RatingsConfig, ScoreTransform};
use crate::error::EngineError;
use serde::Serialize;
use std::collections::HashMap;

/// Offense and defense ratings from the points-scored model
/// `points = baseline + offense[scorer] + defense_raw[opponent]`.
///
/// `defense` is reported with the sign flipped so positive means the team
/// holds opponents below the baseline.
#[derive(Debug, Clone, Serialize)]
pub struct OffenseDefense {
    pub offense: HashMap<String, f64>,
    pub defense: HashMap<String, f64>,
    pub baseline: f64,
    pub exact: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RatingEngine {
    config: RatingsConfig,
}

impl RatingEngine {
    pub fn new(config: RatingsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatingsConfig {
        &self.config
    }

    /// Raw Massey system: each game's stored weight and unadjusted margin.
    pub fn build_massey_matrix(games: &[GameResult], index: &TeamIndex) -> (Matrix, Vec<f64>) {
        accumulate(games, index, |g| (g.weight, g.margin()))
    }

    /// Solve a Massey system. A singular system yields `Degenerate` zeros.
    pub fn solve_massey(m: &Matrix, b: &[f64]) -> Solution {
        match solve(m, b) {
            Some(r) => Solution::Computed(r),
            None => {
                tracing::warn!(teams = b.len(), "Massey system singular, using zero ratings");
                Solution::Degenerate(vec![0.0; b.len()])
            }
        }
    }

    /// Massey system with the configured home adjustment, score transform and
    /// time decay applied on top of each game's own weight.
    pub fn build_system(&self, games: &[GameResult], index: &TeamIndex) -> (Matrix, Vec<f64>) {
        let latest = games.iter().map(|g| g.date).max();
        accumulate(games, index, |g| {
            let mut margin = g.margin();
            if g.is_home_a {
                margin -= self.config.home_advantage;
            }
            if self.config.score_transform == ScoreTransform::SignedSqrt {
                margin = game_outcome_measure(margin);
            }
            let decay = match (self.config.half_life_days, latest) {
                (Some(half_life), Some(now)) => time_weight(g.date, now, half_life),
                _ => 1.0,
            };
            (g.weight * decay, margin)
        })
    }

    /// Solve and keep the team index alongside, so callers can tell an exact
    /// solve from the zero fallback. `None` below `min_games`.
    pub fn solve_ratings(&self, games: &[GameResult]) -> Option<(TeamIndex, Solution)> {
        if games.is_empty() || games.len() < self.config.min_games {
            tracing::debug!(
                games = games.len(),
                min_games = self.config.min_games,
                "not enough games to rate"
            );
            return None;
        }
        let index = TeamIndex::from_games(games);
        let (m, b) = self.build_system(games, &index);
        Some((index, Self::solve_massey(&m, &b)))
    }

    /// Team -> rating. Empty below `min_games`; all zeros on a singular system.
    pub fn calculate_ratings(&self, games: &[GameResult]) -> HashMap<String, f64> {
        match self.solve_ratings(games) {
            Some((index, solution)) => index.to_map(solution.values()),
            None => HashMap::new(),
        }
    }

    /// Massey ratings shrunk toward each team's average opponent, with
    /// `prior_scale` controlling how fast the record takes over.
    pub fn calculate_bayesian_ratings(&self, games: &[GameResult]) -> HashMap<String, f64> {
        let raw = self.calculate_ratings(games);
        if raw.is_empty() {
            return raw;
        }
        let (wins, losses) = win_loss_records(games);
        let mut opponents: HashMap<String, Vec<f64>> = HashMap::new();
        for g in games {
            for team in [&g.team_a, &g.team_b] {
                let Some(opp) = g.opponent_of(team) else { continue };
                if let Some(r) = raw.get(opp) {
                    opponents.entry(team.clone()).or_default().push(*r);
                }
            }
        }
        calculate_bayesian_correction(&raw, &wins, &losses, &opponents, self.config.prior_scale)
    }

    /// `(P(team_a wins), predicted margin)`. Home advantage goes to team_a
    /// unless `neutral`.
    pub fn predict_game(
        &self,
        ratings: &HashMap<String, f64>,
        team_a: &str,
        team_b: &str,
        neutral: bool,
    ) -> Result<(f64, f64), EngineError> {
        let r_a = lookup(ratings, team_a)?;
        let r_b = lookup(ratings, team_b)?;
        let home = if neutral { 0.0 } else { self.config.home_advantage };
        let win_prob = calculate_win_probability(r_a, r_b, home, 0.0, self.config.sigma);
        let margin = (r_a - r_b + home) * self.config.margin_factor;
        Ok((win_prob, margin))
    }

    /// Least-squares offense/defense split with both rating vectors pinned to
    /// zero mean. Falls back to zeros (baseline = mean points) when the
    /// schedule does not pin down every team.
    pub fn decompose_offense_defense(games: &[GameResult], index: &TeamIndex) -> OffenseDefense {
        let n = index.len();
        let unknowns = 2 * n + 1;
        let mut design = Matrix::zeros(0, unknowns);
        let mut points = Vec::with_capacity(2 * games.len() + 2);

        for game in games {
            let (Some(a), Some(b)) = (index.position(&game.team_a), index.position(&game.team_b))
            else {
                continue;
            };
            let w = game.weight.max(0.0).sqrt();
            for (scorer, defender, score) in [(a, b, game.score_a), (b, a, game.score_b)] {
                let mut row = vec![0.0; unknowns];
                row[scorer] = w;
                row[n + defender] = w;
                row[2 * n] = w;
                design.push_row(&row);
                points.push(w * score);
            }
        }

        let mut offense_sum = vec![0.0; unknowns];
        offense_sum[..n].fill(1.0);
        design.push_row(&offense_sum);
        points.push(0.0);
        let mut defense_sum = vec![0.0; unknowns];
        defense_sum[n..2 * n].fill(1.0);
        design.push_row(&defense_sum);
        points.push(0.0);

        let solution = match least_squares(&design, &points) {
            Some(x) if n > 0 => Solution::Computed(x),
            _ => {
                tracing::warn!(teams = n, games = games.len(), "offense/defense system degenerate");
                Solution::Degenerate(vec![0.0; unknowns])
            }
        };

        let exact = solution.is_exact();
        let x = solution.into_values();
        let baseline = if exact {
            x[2 * n]
        } else {
            let all_points: Vec<f64> = games.iter().flat_map(|g| [g.score_a, g.score_b]).collect();
            mean(&all_points)
        };
        let defense: Vec<f64> = x[n..2 * n].iter().map(|d| -d).collect();
        OffenseDefense {
            offense: index.to_map(&x[..n]),
            defense: index.to_map(&defense),
            baseline,
            exact,
        }
    }
}

/// Fold games into `(M, b)`. `f` yields `(weight, margin)` per game. Games
/// naming a team outside `index` are skipped.
fn accumulate<F>(games: &[GameResult], index: &TeamIndex, f: F) -> (Matrix, Vec<f64>)
where
    F: Fn(&GameResult) -> (f64, f64),
{
    let n = index.len();
    let mut m = Matrix::zeros(n, n);
    let mut b = vec![0.0; n];
    if n == 0 {
        return (m, b);
    }

    for game in games {
        let (Some(i), Some(j)) = (index.position(&game.team_a), index.position(&game.team_b)) else {
            continue;
        };
        let (w, margin) = f(game);
        m.add(i, i, w);
        m.add(j, j, w);
        m.add(i, j, -w);
        m.add(j, i, -w);
        b[i] += w * margin;
        b[j] -= w * margin;
    }

    // Σ r = 0
    m.fill_row(n - 1, 1.0);
    b[n - 1] = 0.0;
    (m, b)
}
