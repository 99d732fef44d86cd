pub mod analysis;
pub mod elo;
pub mod formulas;
pub mod linalg;
pub mod massey;
pub mod schedule;
pub mod statistics;
pub mod types;

pub use analysis::{MatchupAnalysis, RatingAnalysis, RatingAnalyzer};
pub use elo::{EloRatingTracker, EloTier, GamePoints};
pub use massey::{OffenseDefense, RatingEngine};
pub use schedule::{ScheduleAnalyzer, ScheduleTier};
pub use statistics::{RatingStatistics, TeamStats};
pub use types::{GameResult, Solution, TeamIndex};

use crate::error::EngineError;
use std::collections::HashMap;

/// Rating for `team`, or `UnratedTeam` if it was never registered.
pub fn lookup(ratings: &HashMap<String, f64>, team: &str) -> Result<f64, EngineError> {
    ratings
        .get(team)
        .copied()
        .ok_or_else(|| EngineError::UnratedTeam(team.to_string()))
}
