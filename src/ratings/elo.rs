use super::types::GameResult;
use crate::config::EloConfig;
use crate::error::EngineError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Elo bands, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EloTier {
    Elite,
    Strong,
    Average,
    Weak,
    Poor,
}

impl EloTier {
    pub const ALL: [EloTier; 5] = [
        EloTier::Elite,
        EloTier::Strong,
        EloTier::Average,
        EloTier::Weak,
        EloTier::Poor,
    ];

    pub fn from_rating(rating: f64) -> Self {
        if rating >= 1200.0 {
            EloTier::Elite
        } else if rating >= 1100.0 {
            EloTier::Strong
        } else if rating >= 1000.0 {
            EloTier::Average
        } else if rating >= 900.0 {
            EloTier::Weak
        } else {
            EloTier::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EloTier::Elite => "ELITE",
            EloTier::Strong => "STRONG",
            EloTier::Average => "AVERAGE",
            EloTier::Weak => "WEAK",
            EloTier::Poor => "POOR",
        }
    }
}

impl fmt::Display for EloTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast for a prospective game, from team_a's side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GamePoints {
    pub winner_points: f64,
    pub loser_points: f64,
    pub win_probability: f64,
}

/// Point-differential Elo ("Sauceda" ratings).
///
/// Ratings mutate game by game, so results depend on the order games are
/// applied. Use [`EloRatingTracker::replay`] for a batch.
#[derive(Debug, Clone, Default)]
pub struct EloRatingTracker {
    config: EloConfig,
    ratings: HashMap<String, f64>,
}

impl EloRatingTracker {
    pub fn new(config: EloConfig) -> Self {
        Self {
            config,
            ratings: HashMap::new(),
        }
    }

    pub fn ratings(&self) -> &HashMap<String, f64> {
        &self.ratings
    }

    pub fn rating(&self, team: &str) -> Option<f64> {
        self.ratings.get(team).copied()
    }

    /// Saturating credit for a win by `point_differential` (absolute value).
    /// A one-point win is worth ~0.63, a blowout approaches 1.0.
    pub fn calculate_game_points(&self, point_differential: f64) -> f64 {
        1.0 - 0.4_f64.powf(1.0 + point_differential.abs() / self.config.pd_factor)
    }

    /// Expected score for team A. The home side gets `home_advantage`
    /// rating points.
    pub fn calculate_win_expectancy(&self, rating_a: f64, rating_b: f64, is_a_home: bool) -> f64 {
        let home_adj = if is_a_home {
            self.config.home_advantage
        } else {
            -self.config.home_advantage
        };
        1.0 / (1.0 + 10f64.powf((rating_b - rating_a - home_adj) / self.config.k))
    }

    /// Apply one game and return a snapshot of every rating.
    pub fn update_ratings(&mut self, game: &GameResult) -> HashMap<String, f64> {
        let initial = self.config.initial_rating;
        let r_a = *self.ratings.entry(game.team_a.clone()).or_insert(initial);
        let r_b = *self.ratings.entry(game.team_b.clone()).or_insert(initial);

        let margin = game.margin();
        let gp = self.calculate_game_points(margin);
        let we_a = self.calculate_win_expectancy(r_a, r_b, game.is_home_a);
        // Ties credit team_b as the winner.
        let a_won = margin > 0.0;
        let we_winner = if a_won { we_a } else { 1.0 - we_a };

        // A favourite's narrow win can score below its expectancy; the winner
        // still gains at least `min_win_gain`. Zero-sum either way.
        let delta = (self.config.k * (gp - we_winner)).max(self.config.min_win_gain);
        let (new_a, new_b) = if a_won {
            (r_a + delta, r_b - delta)
        } else {
            (r_a - delta, r_b + delta)
        };
        self.ratings.insert(game.team_a.clone(), new_a);
        self.ratings.insert(game.team_b.clone(), new_b);

        tracing::trace!(
            team_a = %game.team_a,
            team_b = %game.team_b,
            margin,
            new_a,
            new_b,
            "elo update"
        );
        self.ratings.clone()
    }

    /// Apply a batch in chronological order. Games on the same date keep
    /// their input order.
    pub fn replay(&mut self, games: &[GameResult]) -> HashMap<String, f64> {
        let mut ordered: Vec<&GameResult> = games.iter().collect();
        ordered.sort_by_key(|g| g.date);
        for game in ordered {
            self.update_ratings(game);
        }
        self.ratings.clone()
    }

    pub fn predict_game(
        &self,
        team_a: &str,
        team_b: &str,
        is_a_home: bool,
    ) -> Result<GamePoints, EngineError> {
        let r_a = self
            .rating(team_a)
            .ok_or_else(|| EngineError::UnratedTeam(team_a.to_string()))?;
        let r_b = self
            .rating(team_b)
            .ok_or_else(|| EngineError::UnratedTeam(team_b.to_string()))?;
        let win_probability = self.calculate_win_expectancy(r_a, r_b, is_a_home);
        Ok(GamePoints {
            winner_points: win_probability,
            loser_points: 1.0 - win_probability,
            win_probability,
        })
    }

    pub fn tier(&self, team: &str) -> Option<EloTier> {
        self.rating(team).map(EloTier::from_rating)
    }

    /// Every tier (empty ones included) -> sorted team ids.
    pub fn rating_distribution(&self) -> BTreeMap<EloTier, Vec<String>> {
        let mut distribution: BTreeMap<EloTier, Vec<String>> =
            EloTier::ALL.iter().map(|t| (*t, Vec::new())).collect();
        for (team, rating) in &self.ratings {
            distribution
                .entry(EloTier::from_rating(*rating))
                .or_default()
                .push(team.clone());
        }
        for teams in distribution.values_mut() {
            teams.sort();
        }
        distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::types::fixtures::{game, ladder};

    #[test]
    fn test_game_points_saturate() {
        let elo = EloRatingTracker::default();
        // 1 - 0.4^(1 + 1/11) = 0.6318
        assert!((elo.calculate_game_points(1.0) - 0.6318).abs() < 1e-3);
        assert!(elo.calculate_game_points(60.0) > 0.99);
        assert!(elo.calculate_game_points(60.0) < 1.0);
        assert_eq!(elo.calculate_game_points(-5.0), elo.calculate_game_points(5.0));
    }

    #[test]
    fn test_win_expectancy_favours_home() {
        let elo = EloRatingTracker::default();
        // 1 / (1 + 10^(-100/300)) = 0.6831
        assert!((elo.calculate_win_expectancy(1000.0, 1000.0, true) - 0.6831).abs() < 1e-3);
        let away = elo.calculate_win_expectancy(1000.0, 1000.0, false);
        assert!((away - 0.3169).abs() < 1e-3);
        // home edge worth exactly home_advantage rating points
        let even = elo.calculate_win_expectancy(1000.0, 1100.0, true);
        assert!((even - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_game_winner_up_loser_down() {
        let mut elo = EloRatingTracker::default();
        let ratings = elo.update_ratings(&game("A", "B", 101.0, 100.0, 0));
        assert!(ratings["A"] > 1000.0);
        assert!(ratings["B"] < 1000.0);
        assert!((ratings["A"] + ratings["B"] - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_point_winner_gains_home_or_away() {
        for is_home_a in [true, false] {
            let mut elo = EloRatingTracker::default();
            let mut g = game("A", "B", 101.0, 100.0, 0);
            g.is_home_a = is_home_a;
            let ratings = elo.update_ratings(&g);
            assert!(ratings["A"] > 1000.0, "home={is_home_a}: {}", ratings["A"]);
            assert!(ratings["B"] < 1000.0, "home={is_home_a}: {}", ratings["B"]);
            assert!((ratings["A"] + ratings["B"] - 2000.0).abs() < 1e-9);
        }

        // favourite at home by one: gp 0.632 < we 0.683, floor applies
        let mut elo = EloRatingTracker::default();
        let ratings = elo.update_ratings(&game("A", "B", 101.0, 100.0, 0));
        assert!((ratings["A"] - 1001.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_credits_team_b() {
        let mut elo = EloRatingTracker::default();
        let mut g = game("A", "B", 100.0, 100.0, 0);
        g.is_home_a = false;
        // B at home is credited the tie: gp 0.6 < we(B) 0.6831, floor applies
        let ratings = elo.update_ratings(&g);
        assert!(ratings["A"] < 1000.0);
        assert!(ratings["B"] > 1000.0);
    }

    #[test]
    fn test_replay_sorts_chronologically() {
        let mut games = ladder();
        games.reverse();
        let mut shuffled = EloRatingTracker::default();
        shuffled.replay(&games);

        let mut ordered = EloRatingTracker::default();
        for g in &ladder() {
            ordered.update_ratings(g);
        }
        assert_eq!(shuffled.ratings(), ordered.ratings());
    }

    #[test]
    fn test_predict_requires_ratings() {
        let mut elo = EloRatingTracker::default();
        assert_eq!(
            elo.predict_game("A", "B", true).unwrap_err(),
            EngineError::UnratedTeam("A".to_string())
        );
        elo.update_ratings(&game("A", "B", 90.0, 80.0, 0));
        let p = elo.predict_game("A", "B", false).unwrap();
        assert!((p.winner_points + p.loser_points - 1.0).abs() < 1e-12);
        assert!(elo.predict_game("A", "C", false).is_err());
    }

    #[test]
    fn test_tiers() {
        assert_eq!(EloTier::from_rating(1200.0), EloTier::Elite);
        assert_eq!(EloTier::from_rating(1150.0), EloTier::Strong);
        assert_eq!(EloTier::from_rating(1000.0), EloTier::Average);
        assert_eq!(EloTier::from_rating(999.9), EloTier::Weak);
        assert_eq!(EloTier::from_rating(850.0), EloTier::Poor);
    }

    #[test]
    fn test_rating_distribution_lists_every_tier() {
        let mut elo = EloRatingTracker::default();
        elo.replay(&ladder());
        let dist = elo.rating_distribution();
        assert_eq!(dist.len(), 5);
        let total: usize = dist.values().map(Vec::len).sum();
        assert_eq!(total, 4);
        assert_eq!(dist.keys().next(), Some(&EloTier::Elite));
    }
}
