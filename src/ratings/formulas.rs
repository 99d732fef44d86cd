/// Closed-form rating formulas shared by the Massey solver, the statistics
/// layer, and the analyzer.
///
/// Win probability model: `P(A beats B) = Φ((r_a + h_a - r_b - h_b) / (σ·√2))`.
/// Game outcome function: `Φ(GOF_SCALE · diff / total^¼)`, calibrated so a
/// one-point win in a low-scoring game is worth more than in a shootout.
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Default spread of the rating-difference distribution.
pub const DEFAULT_SIGMA: f64 = 100.0;

/// Default half-life for time decay, in days.
pub const DEFAULT_HALF_LIFE_DAYS: f64 = 30.0;

/// Steepness of the game outcome curve. Fit against the published anchors
/// (30-29 -> 0.527, 56-3 -> 0.9998).
pub const GOF_SCALE: f64 = 0.188;

/// Default scale for the Bayesian prior; larger means slower shrinkage decay.
pub const DEFAULT_PRIOR_SCALE: f64 = 100.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

#[inline]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Exponential decay weight: 1.0 for a game played `now`, 0.5 one half-life ago.
/// Future-dated games are clamped to weight 1.0.
pub fn time_weight(date: DateTime<Utc>, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 1.0;
    }
    let days = ((now - date).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY).max(0.0);
    (-std::f64::consts::LN_2 * days / half_life_days).exp()
}

/// Probability team A beats team B under the normal rating model.
pub fn calculate_win_probability(r_a: f64, r_b: f64, h_a: f64, h_b: f64, sigma: f64) -> f64 {
    let diff = (r_a + h_a) - (r_b + h_b);
    if sigma <= 0.0 {
        return if diff > 0.0 {
            1.0
        } else if diff < 0.0 {
            0.0
        } else {
            0.5
        };
    }
    normal_cdf(diff / (sigma * std::f64::consts::SQRT_2))
}

/// Map a final score to the probability the winner would win a rematch.
pub fn game_outcome_function(p_a: f64, p_b: f64) -> f64 {
    let diff = p_a - p_b;
    let total = p_a + p_b;
    let adjusted = if total > 0.0 {
        diff / total.powf(0.25)
    } else {
        diff
    };
    normal_cdf(GOF_SCALE * adjusted)
}

/// Signed square root of a margin: diminishing returns on blowouts.
pub fn game_outcome_measure(margin: f64) -> f64 {
    margin.signum() * margin.abs().sqrt()
}

/// Shrink raw ratings toward each team's average opponent.
///
/// `prior_weight = 1 / (1 + games / prior_scale)`, so teams with few games
/// lean on their raw rating less. Teams with no games pass through.
pub fn calculate_bayesian_correction(
    raw: &HashMap<String, f64>,
    wins: &HashMap<String, u32>,
    losses: &HashMap<String, u32>,
    opponent_ratings: &HashMap<String, Vec<f64>>,
    prior_scale: f64,
) -> HashMap<String, f64> {
    raw.iter()
        .map(|(team, &r)| {
            let w = wins.get(team).copied().unwrap_or(0) as f64;
            let l = losses.get(team).copied().unwrap_or(0) as f64;
            let games = w + l;
            if games == 0.0 {
                return (team.clone(), r);
            }
            let avg_opp = opponent_ratings
                .get(team)
                .filter(|v| !v.is_empty())
                .map(|v| v.iter().sum::<f64>() / v.len() as f64)
                .unwrap_or(0.0);
            let win_ratio = w / games;
            let prior_weight = 1.0 / (1.0 + games / prior_scale);
            let corrected = (1.0 - prior_weight) * (win_ratio * r + (1.0 - win_ratio) * avg_opp)
                + prior_weight * r;
            (team.clone(), corrected)
        })
        .collect()
}

/// Weights `exp(linspace(-1, 0, n))`, normalized to sum to 1. Most recent last.
pub fn recency_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let raw: Vec<f64> = (0..n)
        .map(|i| {
            let x = if n == 1 {
                0.0
            } else {
                -1.0 + i as f64 / (n - 1) as f64
            };
            x.exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Weighted mean with [`recency_weights`]; 0.0 for an empty slice.
pub fn recency_weighted_mean(values: &[f64]) -> f64 {
    recency_weights(values.len())
        .iter()
        .zip(values)
        .map(|(w, v)| w * v)
        .sum()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (ddof = 0).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}
