//! Rankings table: Massey rating alongside box-score averages, Elo tier and
//! the schedule tier implied by opponents' Elo ratings.

use crate::ratings::{EloRatingTracker, EloTier, GameResult, ScheduleAnalyzer, ScheduleTier};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub rank: usize,
    pub team: String,
    pub rating: f64,
    pub games: usize,
    pub ppg: f64,
    pub papg: f64,
    pub point_diff: f64,
    pub elo: Option<f64>,
    pub elo_tier: Option<EloTier>,
    pub schedule_strength: f64,
    pub schedule_tier: ScheduleTier,
}

/// Rows sorted by rating, best first, ties broken by team name.
/// `top` keeps only the first N.
pub fn rankings(
    games: &[GameResult],
    ratings: &HashMap<String, f64>,
    elo: &EloRatingTracker,
    top: Option<usize>,
) -> Vec<RankingRow> {
    let mut ordered: Vec<(&String, f64)> = ratings.iter().map(|(t, r)| (t, *r)).collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ordered
        .into_iter()
        .take(top.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, (team, rating))| {
            let (points_for, points_against): (Vec<f64>, Vec<f64>) =
                games.iter().filter_map(|g| g.perspective(team)).unzip();
            let played = points_for.len();
            let per_game = |total: f64| if played == 0 { 0.0 } else { total / played as f64 };
            let ppg = per_game(points_for.iter().sum());
            let papg = per_game(points_against.iter().sum());

            let opponents: Vec<f64> = games
                .iter()
                .filter_map(|g| g.opponent_of(team))
                .filter_map(|opp| elo.rating(opp))
                .collect();
            let schedule_strength = ScheduleAnalyzer::calculate_schedule_strength(&opponents);
            let schedule_tier = if opponents.is_empty() {
                ScheduleTier::Average
            } else {
                let avg = opponents.iter().sum::<f64>() / opponents.len() as f64;
                ScheduleAnalyzer::classify_team(avg)
            };

            RankingRow {
                rank: i + 1,
                team: team.clone(),
                rating,
                games: played,
                ppg,
                papg,
                point_diff: ppg - papg,
                elo: elo.rating(team),
                elo_tier: elo.tier(team),
                schedule_strength,
                schedule_tier,
            }
        })
        .collect()
}

/// Fixed-width text rendering for the CLI.
pub fn render_table(rows: &[RankingRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<20} {:>8} {:>4} {:>7} {:>7} {:>7} {:>7}  {:<9} {:<8}",
        "#", "Team", "Rating", "GP", "PPG", "PAPG", "Diff", "Elo", "Elo tier", "Schedule"
    );
    for row in rows {
        let elo = row.elo.map(|e| format!("{e:.0}")).unwrap_or_else(|| "-".to_string());
        let tier = row.elo_tier.map(|t| t.as_str()).unwrap_or("-");
        let _ = writeln!(
            out,
            "{:>4}  {:<20} {:>8.2} {:>4} {:>7.1} {:>7.1} {:>+7.1} {:>7}  {:<9} {:<8}",
            row.rank,
            row.team,
            row.rating,
            row.games,
            row.ppg,
            row.papg,
            row.point_diff,
            elo,
            tier,
            row.schedule_tier.as_str()
        );
    }
    out
}
