use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

fn default_weight() -> f64 {
    1.0
}

/// One completed game. Immutable once produced by a collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub team_a: String,
    pub team_b: String,
    pub score_a: f64,
    pub score_b: f64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub is_home_a: bool,
    /// Decay multiplier applied when the game enters a weighted system.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl GameResult {
    pub fn new(
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        score_a: f64,
        score_b: f64,
        date: DateTime<Utc>,
        is_home_a: bool,
    ) -> Self {
        Self {
            team_a: team_a.into(),
            team_b: team_b.into(),
            score_a,
            score_b,
            date,
            is_home_a,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Score margin, positive when team_a won.
    pub fn margin(&self) -> f64 {
        self.score_a - self.score_b
    }

    pub fn involves(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if self.team_a == team {
            Some(&self.team_b)
        } else if self.team_b == team {
            Some(&self.team_a)
        } else {
            None
        }
    }

    /// (points_for, points_against) from `team`'s side of the box score.
    pub fn perspective(&self, team: &str) -> Option<(f64, f64)> {
        if self.team_a == team {
            Some((self.score_a, self.score_b))
        } else if self.team_b == team {
            Some((self.score_b, self.score_a))
        } else {
            None
        }
    }

    /// Margin from `team`'s side; 0.0 if the team did not play.
    pub fn margin_for(&self, team: &str) -> f64 {
        self.perspective(team).map(|(pf, pa)| pf - pa).unwrap_or(0.0)
    }

    /// Whether `team` was the home side (team_b is home whenever team_a is not).
    pub fn is_home_for(&self, team: &str) -> bool {
        (self.team_a == team && self.is_home_a) || (self.team_b == team && !self.is_home_a)
    }

    /// Winner id; ties go to team_b (matches the rating updaters, which
    /// only credit team_a on a strictly positive margin).
    pub fn winner(&self) -> &str {
        if self.score_a > self.score_b {
            &self.team_a
        } else {
            &self.team_b
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let reason = if self.team_a == self.team_b {
            Some("team cannot play itself")
        } else if !(self.score_a >= 0.0 && self.score_b >= 0.0) {
            Some("scores must be non-negative")
        } else if !(self.weight.is_finite() && self.weight >= 0.0) {
            Some("weight must be finite and non-negative")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(EngineError::InvalidGame {
                team_a: self.team_a.clone(),
                team_b: self.team_b.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Outcome of a linear solve. Degenerate systems still carry a usable
/// vector (the documented fallback) so callers never have to unwind.
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    Computed(Vec<f64>),
    Degenerate(Vec<f64>),
}

impl Solution {
    pub fn values(&self) -> &[f64] {
        match self {
            Solution::Computed(v) | Solution::Degenerate(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        match self {
            Solution::Computed(v) | Solution::Degenerate(v) => v,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Solution::Computed(_))
    }
}

/// Sorted team ids and their matrix positions.
#[derive(Debug, Clone, Default)]
pub struct TeamIndex {
    teams: Vec<String>,
    positions: HashMap<String, usize>,
}

impl TeamIndex {
    pub fn from_games(games: &[GameResult]) -> Self {
        let set: BTreeSet<&str> = games
            .iter()
            .flat_map(|g| [g.team_a.as_str(), g.team_b.as_str()])
            .collect();
        Self::from_sorted(set.into_iter().map(str::to_string).collect())
    }

    pub fn from_teams<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = teams.into_iter().map(Into::into).collect();
        Self::from_sorted(set.into_iter().collect())
    }

    fn from_sorted(teams: Vec<String>) -> Self {
        let positions = teams
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { teams, positions }
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn position(&self, team: &str) -> Option<usize> {
        self.positions.get(team).copied()
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Zip a solution vector back onto team ids.
    pub fn to_map(&self, values: &[f64]) -> HashMap<String, f64> {
        self.teams
            .iter()
            .zip(values.iter())
            .map(|(t, v)| (t.clone(), *v))
            .collect()
    }
}

/// Wins and losses per team. Ties count as a loss for team_a, matching
/// [`GameResult::winner`].
pub fn win_loss_records(games: &[GameResult]) -> (HashMap<String, u32>, HashMap<String, u32>) {
    let mut wins: HashMap<String, u32> = HashMap::new();
    let mut losses: HashMap<String, u32> = HashMap::new();
    for game in games {
        let winner = game.winner();
        let loser = if winner == game.team_a {
            &game.team_b
        } else {
            &game.team_a
        };
        *wins.entry(winner.to_string()).or_insert(0) += 1;
        *losses.entry(loser.to_string()).or_insert(0) += 1;
    }
    (wins, losses)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::GameResult;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    pub fn game(a: &str, b: &str, sa: f64, sb: f64, d: i64) -> GameResult {
        GameResult::new(a, b, sa, sb, day(d), true)
    }

    /// Four teams with a clear pecking order: W > L > C > N.
    pub fn ladder() -> Vec<GameResult> {
        vec![
            game("Warriors", "Lakers", 120.0, 100.0, 0),
            game("Warriors", "Celtics", 115.0, 100.0, 1),
            game("Warriors", "Nets", 110.0, 90.0, 2),
            game("Lakers", "Celtics", 105.0, 100.0, 3),
            game("Lakers", "Nets", 108.0, 95.0, 4),
            game("Celtics", "Nets", 100.0, 90.0, 5),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_perspective_and_margin() {
        let g = game("A", "B", 100.0, 90.0, 0);
        assert_eq!(g.margin(), 10.0);
        assert_eq!(g.perspective("B"), Some((90.0, 100.0)));
        assert_eq!(g.margin_for("B"), -10.0);
        assert_eq!(g.perspective("C"), None);
        assert_eq!(g.opponent_of("A"), Some("B"));
    }

    #[test]
    fn test_home_side() {
        let g = game("A", "B", 1.0, 0.0, 0);
        assert!(g.is_home_for("A"));
        assert!(!g.is_home_for("B"));
    }

    #[test]
    fn test_validate_rejects_self_play() {
        let g = game("A", "A", 1.0, 0.0, 0);
        assert!(g.validate().is_err());
        let g = game("A", "B", -1.0, 0.0, 0);
        assert!(g.validate().is_err());
        assert!(game("A", "B", 0.0, 0.0, 0).validate().is_ok());
    }

    #[test]
    fn test_team_index_sorted() {
        let idx = TeamIndex::from_games(&ladder());
        assert_eq!(idx.teams(), &["Celtics", "Lakers", "Nets", "Warriors"]);
        assert_eq!(idx.position("Nets"), Some(2));
        assert_eq!(idx.position("Bulls"), None);
    }

    #[test]
    fn test_win_loss_records() {
        let (w, l) = win_loss_records(&ladder());
        assert_eq!(w.get("Warriors"), Some(&3));
        assert_eq!(l.get("Nets"), Some(&3));
        assert_eq!(w.get("Nets"), None);
    }

    #[test]
    fn test_deserialize_default_weight() {
        let json = r#"{"team_a":"A","team_b":"B","score_a":3,"score_b":1,"date":"2024-01-01T00:00:00Z"}"#;
        let g: GameResult = serde_json::from_str(json).unwrap();
        assert_eq!(g.weight, 1.0);
        assert!(!g.is_home_a);
    }
}
