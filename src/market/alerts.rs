//! Sharp-money alerts: steam moves and reverse line movement.
//!
//! Each `(sport, event, market)` key owns a [`LineHistory`] inside a sharded
//! map. An observation is appended, pruned and checked for steam while the
//! shard entry is held, so a concurrent caller or the monitor's sweep never
//! sees a half-pruned history. Alerts go onto an unbounded queue that
//! consumers drain with [`AlertSystem::get_alerts`].
//!
//! A key's window is measured from its own newest observation, so a far-off
//! timestamp on one market never ages out another. Idle keys and stale
//! money splits are swept against an injected [`Clock`]: wall time for live
//! feeds, a [`ManualClock`] following the feed for replays.

use super::clock::{Clock, WallClock};
use super::line_history::{LineHistory, LineObservation};
use crate::config::{AlertConfig, LineConvention};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Distinct books at which a steam move reaches full confidence.
const STEAM_FULL_BOOKS: f64 = 3.0;

/// Public share above which (or below `100 -` which) the public is lopsided.
const PUBLIC_LOPSIDED_PCT: f64 = 70.0;

/// Distance from 50% beyond which the public lean is "heavy".
const HEAVY_LEAN_PCT: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MarketKey {
    pub sport: String,
    pub event: String,
    pub market: String,
}

impl MarketKey {
    pub fn new(sport: &str, event: &str, market: &str) -> Self {
        Self {
            sport: sport.to_string(),
            event: event.to_string(),
            market: market.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Steam,
    Rlm,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AlertKind::Steam => "steam",
            AlertKind::Rlm => "rlm",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SteamDetails {
    pub movement: f64,
    pub time_span_secs: f64,
    pub books_involved: usize,
    pub movement_history: Vec<LineObservation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicLean {
    Heavy,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RlmDetails {
    pub public_pct: f64,
    pub sharp_pct: f64,
    pub line_movement: f64,
    pub public_lean: PublicLean,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlertDetails {
    Steam(SteamDetails),
    Rlm(RlmDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub sport: String,
    pub event: String,
    pub market: String,
    pub old_line: f64,
    pub new_line: f64,
    pub confidence: f64,
    pub details: AlertDetails,
    pub timestamp: DateTime<Utc>,
    pub source: &'static str,
}

/// Latest public/sharp split for a key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BettingSplit {
    pub public_pct: f64,
    pub sharp_pct: f64,
    pub line: f64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringStats {
    pub tracked_events: usize,
    pub monitoring_window_secs: u64,
    pub steam_threshold: f64,
    pub rlm_threshold: f64,
    pub pending_alerts: usize,
}

struct Shared {
    config: AlertConfig,
    clock: Arc<dyn Clock>,
    histories: DashMap<MarketKey, LineHistory>,
    splits: DashMap<MarketKey, BettingSplit>,
    queue: Mutex<VecDeque<Alert>>,
}

impl Shared {
    fn window(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.config.monitoring_window_secs as i64)
    }

    /// A panicking holder leaves the queue itself intact, so keep using it.
    fn queue(&self) -> MutexGuard<'_, VecDeque<Alert>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enqueue(&self, alert: Alert) {
        self.queue().push_back(alert);
    }

    fn prune_all(&self) -> usize {
        let now = self.clock.now();
        let window = self.window();
        let cutoff = now - window;
        let mut removed = 0;
        self.histories.retain(|_, history| {
            removed += history.prune(now, window);
            !history.is_empty()
        });
        self.splits.retain(|_, split| split.received_at >= cutoff);
        removed
    }
}

/// Drop observations older than the window behind the key's newest line.
fn prune_to_latest(history: &mut LineHistory, window: ChronoDuration) {
    if let Some(latest) = history.latest().map(|o| o.timestamp) {
        history.prune(latest, window);
    }
}

pub struct AlertSystem {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl AlertSystem {
    /// Detector without a background monitor, sweeping on wall time. Histories
    /// are still pruned on every observation; call
    /// [`AlertSystem::prune_expired`] to sweep idle keys.
    pub fn new(config: AlertConfig) -> Self {
        Self::with_clock(config, Arc::new(WallClock))
    }

    pub fn with_clock(config: AlertConfig, clock: Arc<dyn Clock>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                histories: DashMap::new(),
                splits: DashMap::new(),
                queue: Mutex::new(VecDeque::new()),
            }),
            shutdown,
            monitor: Mutex::new(None),
        }
    }

    /// Detector plus a monitor task sweeping expired state on wall time
    /// every `monitor_interval_ms`. Must be called inside a tokio runtime.
    pub fn start(config: AlertConfig) -> Self {
        Self::start_with_clock(config, Arc::new(WallClock))
    }

    pub fn start_with_clock(config: AlertConfig, clock: Arc<dyn Clock>) -> Self {
        let system = Self::with_clock(config, clock);
        let shared = system.shared.clone();
        let mut shutdown_rx = system.shutdown.subscribe();
        let every = Duration::from_millis(shared.config.monitor_interval_ms.max(1));

        let handle = tokio::spawn(async move {
            tracing::debug!(interval_ms = every.as_millis() as u64, "alert monitor started");
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = shared.prune_all();
                        if removed > 0 {
                            tracing::trace!(removed, "pruned expired line history");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("alert monitor stopped");
        });

        *system.monitor_slot() = Some(handle);
        system
    }

    fn monitor_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.monitor.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &AlertConfig {
        &self.shared.config
    }

    /// Record a line and check the key for a steam move.
    pub fn track_line_movement(
        &self,
        sport: &str,
        event: &str,
        market: &str,
        line: f64,
        timestamp: DateTime<Utc>,
        book: &str,
    ) {
        let key = MarketKey::new(sport, event, market);
        let alert = {
            let mut history = self.shared.histories.entry(key.clone()).or_default();
            history.push(LineObservation {
                book: book.to_string(),
                line,
                timestamp,
            });
            prune_to_latest(&mut history, self.shared.window());
            self.check_steam(&key, &history)
        };
        if let Some(alert) = alert {
            self.shared.enqueue(alert);
        }
    }

    /// Store the latest money split and check for reverse line movement
    /// against the earliest line still in the window.
    pub fn track_betting_percentages(
        &self,
        sport: &str,
        event: &str,
        market: &str,
        public_pct: f64,
        sharp_pct: f64,
        line: f64,
    ) {
        let key = MarketKey::new(sport, event, market);
        self.shared.splits.insert(
            key.clone(),
            BettingSplit {
                public_pct,
                sharp_pct,
                line,
                received_at: self.shared.clock.now(),
            },
        );

        let reference = self.shared.histories.get_mut(&key).and_then(|mut history| {
            prune_to_latest(&mut history, self.shared.window());
            history.earliest().map(|o| o.line)
        });
        let Some(previous) = reference else {
            return;
        };
        if let Some(alert) = self.check_rlm(&key, previous, line, public_pct, sharp_pct) {
            self.shared.enqueue(alert);
        }
    }

    pub fn latest_split(&self, sport: &str, event: &str, market: &str) -> Option<BettingSplit> {
        self.shared
            .splits
            .get(&MarketKey::new(sport, event, market))
            .map(|s| *s)
    }

    fn check_steam(&self, key: &MarketKey, history: &LineHistory) -> Option<Alert> {
        if history.len() < 2 {
            return None;
        }
        let first = history.earliest()?;
        let last = history.latest()?;
        let movement = (last.line - first.line).abs();
        let span = history.span_secs();
        let threshold = self.shared.config.min_steam_threshold;
        if movement < threshold || span > self.shared.config.monitoring_window_secs as f64 {
            return None;
        }

        let books_involved = history.distinct_books();
        let confidence = ((movement / threshold) * (books_involved as f64 / STEAM_FULL_BOOKS)).min(1.0);
        tracing::info!(
            sport = %key.sport,
            event = %key.event,
            market = %key.market,
            movement,
            span_secs = span,
            books = books_involved,
            "steam move detected"
        );
        Some(Alert {
            kind: AlertKind::Steam,
            sport: key.sport.clone(),
            event: key.event.clone(),
            market: key.market.clone(),
            old_line: first.line,
            new_line: last.line,
            confidence,
            details: AlertDetails::Steam(SteamDetails {
                movement,
                time_span_secs: span,
                books_involved,
                movement_history: history.iter().cloned().collect(),
            }),
            timestamp: Utc::now(),
            source: "line_monitoring",
        })
    }

    fn check_rlm(
        &self,
        key: &MarketKey,
        previous: f64,
        current: f64,
        public_pct: f64,
        sharp_pct: f64,
    ) -> Option<Alert> {
        let movement = current - previous;
        let public_heavy = public_pct > PUBLIC_LOPSIDED_PCT;
        let public_light = public_pct < 100.0 - PUBLIC_LOPSIDED_PCT;
        let against_public = match self.shared.config.line_convention {
            LineConvention::Spread => {
                (public_heavy && movement > 0.0) || (public_light && movement < 0.0)
            }
            LineConvention::Raw => (public_heavy && movement < 0.0) || (public_light && movement > 0.0),
        };
        if !against_public || movement.abs() < self.shared.config.min_rlm_threshold {
            return None;
        }

        let lean = (public_pct - 50.0).abs();
        let confidence = ((lean / 50.0 + sharp_pct / 100.0) / 2.0).clamp(0.0, 1.0);
        tracing::info!(
            sport = %key.sport,
            event = %key.event,
            market = %key.market,
            movement,
            public_pct,
            "reverse line movement detected"
        );
        Some(Alert {
            kind: AlertKind::Rlm,
            sport: key.sport.clone(),
            event: key.event.clone(),
            market: key.market.clone(),
            old_line: previous,
            new_line: current,
            confidence,
            details: AlertDetails::Rlm(RlmDetails {
                public_pct,
                sharp_pct,
                line_movement: movement,
                public_lean: if lean > HEAVY_LEAN_PCT {
                    PublicLean::Heavy
                } else {
                    PublicLean::Moderate
                },
            }),
            timestamp: Utc::now(),
            source: "money_tracking",
        })
    }

    /// Drain up to `max_alerts` pending alerts (all of them for `None`),
    /// oldest first. Never blocks on an empty queue.
    pub fn get_alerts(&self, max_alerts: Option<usize>) -> Vec<Alert> {
        let mut queue = self.shared.queue();
        let n = max_alerts.unwrap_or(usize::MAX).min(queue.len());
        queue.drain(..n).collect()
    }

    pub fn get_monitoring_stats(&self) -> MonitoringStats {
        let pending_alerts = self.shared.queue().len();
        MonitoringStats {
            tracked_events: self.shared.histories.len(),
            monitoring_window_secs: self.shared.config.monitoring_window_secs,
            steam_threshold: self.shared.config.min_steam_threshold,
            rlm_threshold: self.shared.config.min_rlm_threshold,
            pending_alerts,
        }
    }

    /// Sweep every key and split against the clock, dropping emptied keys.
    pub fn prune_expired(&self) -> usize {
        self.shared.prune_all()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor_slot().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the monitor to exit and wait up to `stop_timeout_ms` for it.
    /// A monitor that misses the deadline is aborted.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.monitor_slot().take();
        let Some(mut handle) = handle else {
            return;
        };
        let timeout = Duration::from_millis(self.shared.config.stop_timeout_ms);
        if tokio::time::timeout(timeout, &mut handle).await.is_err() {
            tracing::warn!(timeout_ms = self.shared.config.stop_timeout_ms, "alert monitor did not stop in time, aborting");
            handle.abort();
        }
    }
}

impl Drop for AlertSystem {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
