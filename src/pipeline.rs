//! Routes feed records into the rating engines and market detectors.
//!
//! Games accumulate for batch Massey solves and are applied to Elo as they
//! arrive. Odds snapshots go to the arbitrage detector; line and split
//! observations go to the alert system. Outputs are collected so callers can
//! read them after (or during) a run.

use crate::config::Config;
use crate::feed::types::FeedRecord;
use crate::feed::MarketFeed;
use crate::market::{Alert, AlertSystem, ArbitrageDetector, ArbitrageOpportunity, ManualClock};
use crate::ratings::{
    EloRatingTracker, GameResult, RatingAnalysis, RatingAnalyzer, RatingEngine, RatingStatistics,
    TeamStats,
};
use crate::report::{self, RankingRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// What happened to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    GameRecorded,
    GameRejected(String),
    Opportunity(Box<ArbitrageOpportunity>),
    NoOpportunity,
    LineTracked,
    SplitTracked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub batches: usize,
    pub games: usize,
    pub rejected_games: usize,
    pub snapshots: usize,
    pub opportunities: usize,
    pub lines: usize,
    pub splits: usize,
    pub alerts: usize,
}

pub struct SignalPipeline {
    config: Config,
    games: Vec<GameResult>,
    elo: EloRatingTracker,
    arbitrage: ArbitrageDetector,
    alerts: AlertSystem,
    feed_clock: Option<Arc<ManualClock>>,
    opportunities: Vec<ArbitrageOpportunity>,
    collected_alerts: Vec<Alert>,
    summary: RunSummary,
}

impl SignalPipeline {
    /// Pipeline whose alert system has no background monitor.
    pub fn new(config: Config) -> Self {
        let alerts = AlertSystem::new(config.alerts.clone());
        Self::with_alerts(config, alerts)
    }

    /// Pipeline with a running alert monitor on wall time, for live feeds.
    /// Needs a tokio runtime.
    pub fn start(config: Config) -> Self {
        let alerts = AlertSystem::start(config.alerts.clone());
        Self::with_alerts(config, alerts)
    }

    /// Pipeline with a running alert monitor whose clock follows the newest
    /// line timestamp fed in, for replayed or simulated history. Needs a
    /// tokio runtime.
    pub fn replay(config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(DateTime::<Utc>::UNIX_EPOCH));
        let alerts = AlertSystem::start_with_clock(config.alerts.clone(), clock.clone());
        let mut pipeline = Self::with_alerts(config, alerts);
        pipeline.feed_clock = Some(clock);
        pipeline
    }

    fn with_alerts(config: Config, alerts: AlertSystem) -> Self {
        Self {
            elo: EloRatingTracker::new(config.elo.clone()),
            arbitrage: ArbitrageDetector::new(config.arbitrage.clone()),
            alerts,
            feed_clock: None,
            config,
            games: Vec::new(),
            opportunities: Vec::new(),
            collected_alerts: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    pub fn ingest(&mut self, record: FeedRecord) -> IngestOutcome {
        match record {
            FeedRecord::Game(game) => {
                if let Err(e) = game.validate() {
                    self.summary.rejected_games += 1;
                    tracing::warn!(error = %e, "rejecting game");
                    return IngestOutcome::GameRejected(e.to_string());
                }
                self.elo.update_ratings(&game);
                self.games.push(game);
                self.summary.games += 1;
                IngestOutcome::GameRecorded
            }
            FeedRecord::Odds(snapshot) => {
                self.summary.snapshots += 1;
                match self.arbitrage.find_arbitrage(&snapshot) {
                    Some(opportunity) => {
                        self.summary.opportunities += 1;
                        self.opportunities.push(opportunity.clone());
                        IngestOutcome::Opportunity(Box::new(opportunity))
                    }
                    None => IngestOutcome::NoOpportunity,
                }
            }
            FeedRecord::Line(line) => {
                self.summary.lines += 1;
                if let Some(clock) = &self.feed_clock {
                    clock.advance_to(line.timestamp);
                }
                self.alerts.track_line_movement(
                    &line.sport,
                    &line.event,
                    &line.market,
                    line.line,
                    line.timestamp,
                    &line.book,
                );
                IngestOutcome::LineTracked
            }
            FeedRecord::Split(split) => {
                self.summary.splits += 1;
                self.alerts.track_betting_percentages(
                    &split.sport,
                    &split.event,
                    &split.market,
                    split.public_pct,
                    split.sharp_pct,
                    split.line,
                );
                IngestOutcome::SplitTracked
            }
        }
    }

    /// Drain the feed, collecting alerts after every batch.
    pub async fn run<F>(&mut self, feed: &mut F) -> Result<RunSummary>
    where
        F: MarketFeed + ?Sized,
    {
        while let Some(batch) = feed
            .next_batch()
            .await
            .with_context(|| format!("feed {} failed", feed.name()))?
        {
            self.summary.batches += 1;
            for record in batch {
                self.ingest(record);
            }
            self.collect_alerts();
        }
        tracing::info!(
            feed = feed.name(),
            games = self.summary.games,
            opportunities = self.summary.opportunities,
            alerts = self.summary.alerts,
            "feed drained"
        );
        Ok(self.summary.clone())
    }

    /// Move pending alerts from the alert queue into the pipeline's record.
    pub fn collect_alerts(&mut self) -> usize {
        let drained = self.alerts.get_alerts(None);
        let n = drained.len();
        self.summary.alerts += n;
        self.collected_alerts.extend(drained);
        n
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn games(&self) -> &[GameResult] {
        &self.games
    }

    pub fn elo(&self) -> &EloRatingTracker {
        &self.elo
    }

    pub fn alert_system(&self) -> &AlertSystem {
        &self.alerts
    }

    pub fn opportunities(&self) -> &[ArbitrageOpportunity] {
        &self.opportunities
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.collected_alerts
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn rating_engine(&self) -> RatingEngine {
        RatingEngine::new(self.config.ratings.clone())
    }

    pub fn ratings(&self) -> HashMap<String, f64> {
        self.rating_engine().calculate_ratings(&self.games)
    }

    pub fn statistics(&self) -> RatingStatistics {
        RatingStatistics::new(self.rating_engine(), self.config.analysis.clone())
    }

    pub fn team_stats(&self) -> BTreeMap<String, TeamStats> {
        self.statistics().complete_team_stats(&self.games)
    }

    pub fn analyze_team(&self, team: &str) -> Result<RatingAnalysis> {
        let ratings = self.statistics().base_ratings(&self.games);
        let analysis = RatingAnalyzer::new(self.config.analysis.clone())
            .analyze_team(team, &ratings, &self.games)?;
        Ok(analysis)
    }

    pub fn rankings(&self, top: Option<usize>) -> Vec<RankingRow> {
        report::rankings(&self.games, &self.ratings(), &self.elo, top)
    }

    /// Stop the alert monitor and pick up anything still queued.
    pub async fn shutdown(&mut self) {
        self.alerts.stop().await;
        self.collect_alerts();
    }
}
