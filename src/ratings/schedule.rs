//! Discrete-tier schedule strength.
//!
//! Elo-scale ratings are mapped onto a small "quality" scale centred on 1.30
//! and bucketed into five tiers. Expected wins come from a fixed tier-vs-tier
//! table rather than a continuous model.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Rescaled value of a league-average (1000) rating.
pub const AVERAGE_QUALITY: f64 = 1.30;

/// Schedule variance above which the opponent mix counts as "varied".
const VARIED_SCHEDULE_VARIANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleTier {
    Pathetic,
    Bad,
    Average,
    Good,
    Great,
}

impl ScheduleTier {
    /// Weakest first.
    pub const ALL: [ScheduleTier; 5] = [
        ScheduleTier::Pathetic,
        ScheduleTier::Bad,
        ScheduleTier::Average,
        ScheduleTier::Good,
        ScheduleTier::Great,
    ];

    fn from_quality(quality: f64) -> Self {
        if quality >= 1.40 {
            ScheduleTier::Great
        } else if quality >= 1.35 {
            ScheduleTier::Good
        } else if quality >= 1.30 {
            ScheduleTier::Average
        } else if quality >= 1.25 {
            ScheduleTier::Bad
        } else {
            ScheduleTier::Pathetic
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleTier::Pathetic => "PATHETIC",
            ScheduleTier::Bad => "BAD",
            ScheduleTier::Average => "AVERAGE",
            ScheduleTier::Good => "GOOD",
            ScheduleTier::Great => "GREAT",
        }
    }
}

impl fmt::Display for ScheduleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `WIN_TABLE[us][them]` = P(us beats them), indexed weakest-first.
/// Antisymmetric: `WIN_TABLE[a][b] + WIN_TABLE[b][a] == 1`.
static WIN_TABLE: [[f64; 5]; 5] = [
    // vs PATHETIC, BAD, AVERAGE, GOOD, GREAT
    [0.50, 0.25, 0.10, 0.03, 0.00], // PATHETIC
    [0.75, 0.50, 0.25, 0.10, 0.03], // BAD
    [0.90, 0.75, 0.50, 0.25, 0.10], // AVERAGE
    [0.97, 0.90, 0.75, 0.50, 0.25], // GOOD
    [1.00, 0.97, 0.90, 0.75, 0.50], // GREAT
];

/// Stateless: the tier table is static.
pub struct ScheduleAnalyzer;

impl ScheduleAnalyzer {
    /// `(rating - 1000) / 100 + 1.30`
    pub fn rescale(rating: f64) -> f64 {
        (rating - 1000.0) / 100.0 + AVERAGE_QUALITY
    }

    pub fn classify_team(rating: f64) -> ScheduleTier {
        ScheduleTier::from_quality(Self::rescale(rating))
    }

    pub fn win_probability(team: ScheduleTier, opponent: ScheduleTier) -> f64 {
        WIN_TABLE[team.index()][opponent.index()]
    }

    /// Sum of table win probabilities against each opponent rating.
    pub fn calculate_expected_wins(schedule: &[f64], team_rating: f64) -> f64 {
        let tier = Self::classify_team(team_rating);
        schedule
            .iter()
            .map(|opp| Self::win_probability(tier, Self::classify_team(*opp)))
            .sum()
    }

    /// Mean rescaled opponent rating; [`AVERAGE_QUALITY`] for an empty schedule.
    pub fn calculate_schedule_strength(schedule: &[f64]) -> f64 {
        if schedule.is_empty() {
            return AVERAGE_QUALITY;
        }
        schedule.iter().map(|r| Self::rescale(*r)).sum::<f64>() / schedule.len() as f64
    }

    /// Opponent count per tier; every tier present.
    pub fn schedule_distribution(schedule: &[f64]) -> BTreeMap<ScheduleTier, usize> {
        let mut counts: BTreeMap<ScheduleTier, usize> =
            ScheduleTier::ALL.iter().map(|t| (*t, 0)).collect();
        for rating in schedule {
            *counts.entry(Self::classify_team(*rating)).or_insert(0) += 1;
        }
        counts
    }

    /// One-line description of how the opponent mix suits this team,
    /// e.g. "Highly varied schedule - More challenging for a strong team -
    /// Tough schedule (3 strong opponents)".
    pub fn schedule_insight(schedule: &[f64], team_rating: f64) -> String {
        if schedule.is_empty() {
            return "No games played yet".to_string();
        }

        let distribution = Self::schedule_distribution(schedule);
        let own = Self::classify_team(team_rating);
        let tough: usize = distribution.range(own..).map(|(_, n)| n).sum();
        let easy: usize = distribution.range(..own).map(|(_, n)| n).sum();

        let qualities: Vec<f64> = schedule.iter().map(|r| Self::rescale(*r)).collect();
        let variance = super::formulas::variance(&qualities);
        let strong_team = team_rating > 1000.0;

        let mut parts: Vec<String> = Vec::new();
        if variance > VARIED_SCHEDULE_VARIANCE {
            parts.push("Highly varied schedule".into());
            parts.push(if strong_team {
                "More challenging for a strong team".into()
            } else {
                "Favorable for a weaker team".into()
            });
        } else {
            parts.push("Consistent level of competition".into());
            parts.push(if strong_team {
                "Favorable for a strong team".into()
            } else {
                "More challenging for a weaker team".into()
            });
        }

        if tough > easy {
            parts.push(format!("Tough schedule ({tough} strong opponents)"));
        } else if easy > tough {
            parts.push(format!("Easier schedule ({easy} weaker opponents)"));
        }
        parts.join(" - ")
    }
}
