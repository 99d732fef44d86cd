// End-to-end: replay file -> pipeline -> rankings, opportunities, alerts

#[cfg(test)]
mod tests {
    use sports_edge::config::Config;
    use sports_edge::feed::{ReplayFeed, SimulatedSeason};
    use sports_edge::market::AlertKind;
    use sports_edge::SignalPipeline;
    use std::io::Write;

    const REPLAY: &str = r#"{"type":"game","team_a":"BOS","team_b":"NYK","score_a":112,"score_b":100,"date":"2024-01-02T00:00:00Z","is_home_a":true}
{"type":"game","team_a":"NYK","team_b":"MIA","score_a":105,"score_b":101,"date":"2024-01-04T00:00:00Z","is_home_a":true}
{"type":"game","team_a":"MIA","team_b":"BOS","score_a":95,"score_b":110,"date":"2024-01-06T00:00:00Z","is_home_a":true}
this line is garbage
{"type":"odds","sport":"nba","event":"NYK@BOS","market":"h2h","books":{"a":{"odds":{"NYK":2.10,"BOS":1.80}},"b":{"rating":0.9,"odds":{"NYK":1.85,"BOS":2.05}}}}
{"type":"odds","sport":"nba","event":"MIA@NYK","market":"h2h","format":"american","books":{"a":{"odds":{"MIA":-110,"NYK":-110}}}}
{"type":"line","sport":"nba","event":"NYK@BOS","market":"spread","line":-3.0,"timestamp":"2024-01-08T18:00:00Z","book":"A"}
{"type":"line","sport":"nba","event":"NYK@BOS","market":"spread","line":-4.5,"timestamp":"2024-01-08T18:01:00Z","book":"B"}
{"type":"split","sport":"nba","event":"NYK@BOS","market":"spread","public_pct":80,"sharp_pct":60,"line":-2.0}
"#;

    fn config() -> Config {
        Config::parse(
            r#"
            [alerts]
            min_steam_threshold = 1.0
            min_rlm_threshold = 0.5
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_replay_file_end_to_end() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REPLAY.as_bytes()).unwrap();

        let mut feed = ReplayFeed::open(file.path()).await.unwrap();
        let mut pipeline = SignalPipeline::replay(config());
        let summary = pipeline.run(&mut feed).await.unwrap();
        pipeline.shutdown().await;

        assert_eq!(feed.skipped(), 1);
        assert_eq!(summary.games, 3);
        assert_eq!(summary.snapshots, 2);
        assert_eq!(summary.opportunities, 1);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.splits, 1);

        let kinds: Vec<AlertKind> = pipeline.alerts().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Steam, AlertKind::Rlm]);

        let rankings = pipeline.rankings(None);
        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].team, "BOS");
        assert_eq!(rankings[0].games, 2);
    }

    #[tokio::test]
    async fn test_simulated_season_runs() {
        let mut season = SimulatedSeason::new(8, 4, Some(11));
        let mut pipeline = SignalPipeline::new(Config::default());
        let summary = pipeline.run(&mut season).await.unwrap();

        assert_eq!(summary.batches, 4);
        assert_eq!(summary.games, 16);
        assert_eq!(summary.snapshots, 16);
        let ratings = pipeline.ratings();
        assert_eq!(ratings.len(), 8);
        assert!(ratings.values().sum::<f64>().abs() < 1e-6);
        assert_eq!(pipeline.rankings(Some(3)).len(), 3);
    }

    #[test]
    fn test_config_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[elo]\nk = 250.0\n\n[logging]\nfilter = \"sports_edge=debug\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.elo.k, 250.0);
        assert_eq!(config.logging.filter, "sports_edge=debug");
        assert_eq!(config.arbitrage.min_book_rating, 0.7);
    }
}
