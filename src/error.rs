use thiserror::Error;

/// Errors surfaced by the rating and market engines.
///
/// Numerical degeneracy and empty data are recovered locally and never show
/// up here; only caller mistakes do.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no rating for team '{0}'; register it before querying")]
    UnratedTeam(String),

    #[error("invalid game '{team_a}' vs '{team_b}': {reason}")]
    InvalidGame {
        team_a: String,
        team_b: String,
        reason: String,
    },
}
