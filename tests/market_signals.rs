// Integration tests for arbitrage detection and sharp-money alerts

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use sports_edge::config::{AlertConfig, ArbitrageConfig};
    use sports_edge::market::alerts::AlertDetails;
    use sports_edge::market::{
        AlertKind, AlertSystem, ArbitrageDetector, ManualClock, OddsSnapshot,
    };
    use std::sync::Arc;

    fn alert_config() -> AlertConfig {
        AlertConfig {
            min_steam_threshold: 1.0,
            min_rlm_threshold: 0.5,
            monitoring_window_secs: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_two_way_arbitrage_equal_payouts() {
        let detector = ArbitrageDetector::new(ArbitrageConfig::default());
        let snapshot = OddsSnapshot::new("nba", "LAL@BOS", "h2h")
            .with_book("book_a", 1.0, &[("LAL", 2.10), ("BOS", 1.80)])
            .with_book("book_b", 0.9, &[("LAL", 1.85), ("BOS", 2.05)]);
        let opp = detector.find_arbitrage(&snapshot).expect("arbitrage");
        // 1/2.10 + 1/2.05 = 0.96399
        assert!((opp.profit_margin - 0.036).abs() < 1e-3);
        let payouts: Vec<f64> = opp.required_bets.iter().map(|b| b.payout()).collect();
        assert!((payouts[0] - payouts[1]).abs() < 1e-6);
        let staked: f64 = opp.required_bets.iter().map(|b| b.stake).sum();
        assert!((staked - opp.total_stake).abs() < 1e-6);
    }

    #[test]
    fn test_no_arbitrage_on_flat_market() {
        let detector = ArbitrageDetector::new(ArbitrageConfig::default());
        let snapshot = OddsSnapshot::new("nba", "e", "h2h")
            .with_book("book_a", 1.0, &[("X", 1.90), ("Y", 1.90)])
            .with_book("book_b", 1.0, &[("X", 1.90), ("Y", 1.90)]);
        assert!(detector.find_arbitrage(&snapshot).is_none());
    }

    #[test]
    fn test_steam_then_rlm_on_one_market() {
        let alerts = AlertSystem::new(alert_config());
        let t0 = Utc.with_ymd_and_hms(2024, 11, 3, 16, 0, 0).unwrap();
        alerts.track_line_movement("nfl", "KC@BUF", "spread", -3.0, t0, "A");
        alerts.track_line_movement("nfl", "KC@BUF", "spread", -4.5, t0 + Duration::seconds(60), "B");

        let steam = alerts.get_alerts(None);
        assert_eq!(steam.len(), 1);
        assert_eq!(steam[0].kind, AlertKind::Steam);
        assert!(steam[0].confidence <= 1.0);
        match &steam[0].details {
            AlertDetails::Steam(d) => assert_eq!(d.books_involved, 2),
            _ => panic!("expected steam details"),
        }

        alerts.track_betting_percentages("nfl", "KC@BUF", "spread", 80.0, 70.0, -4.0);
        assert!(alerts.get_alerts(None).is_empty());
        alerts.track_betting_percentages("nfl", "KC@BUF", "spread", 80.0, 70.0, -2.0);
        let rlm = alerts.get_alerts(None);
        assert_eq!(rlm.len(), 1);
        assert_eq!(rlm[0].kind, AlertKind::Rlm);
        assert_eq!(rlm[0].old_line, -3.0);
    }

    #[test]
    fn test_concurrent_tracking_is_consistent() {
        let alerts = Arc::new(AlertSystem::new(AlertConfig {
            min_steam_threshold: 100.0,
            ..alert_config()
        }));
        let t0 = Utc.with_ymd_and_hms(2024, 11, 3, 16, 0, 0).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let alerts = alerts.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let event = format!("event-{}", i % 4);
                        alerts.track_line_movement(
                            "nba",
                            &event,
                            "spread",
                            -3.0,
                            t0 + Duration::seconds(i),
                            &format!("book-{worker}"),
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let stats = alerts.get_monitoring_stats();
        assert_eq!(stats.tracked_events, 4);
        assert_eq!(stats.pending_alerts, 0);
    }

    #[tokio::test]
    async fn test_monitor_prunes_idle_markets() {
        let t0 = Utc.with_ymd_and_hms(2024, 11, 3, 16, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(t0));
        let alerts = AlertSystem::start_with_clock(
            AlertConfig {
                monitor_interval_ms: 10,
                monitoring_window_secs: 60,
                ..alert_config()
            },
            clock.clone(),
        );
        alerts.track_line_movement("nba", "old", "spread", -3.0, t0, "A");
        alerts.track_line_movement("nba", "new", "spread", -3.0, t0 + Duration::seconds(600), "A");
        clock.set(t0 + Duration::seconds(600));

        let mut pruned = false;
        for _ in 0..50 {
            if alerts.get_monitoring_stats().tracked_events == 1 {
                pruned = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(pruned);
        alerts.stop().await;
        assert!(!alerts.is_monitoring());
    }
}
