use approx::assert_relative_eq;
use aspiration_dynamics::analysis::{factorial_anova, group_mean_differences, Factor, Metric};
use aspiration_dynamics::output::{read_records_csv, write_records_csv, ExperimentSummary};
use aspiration_dynamics::{
    run_experiment, run_single, AspirationType, ExperimentConfig, ModelParams, PeerResolver,
    PeerStrategy, SimError, SimulationConfig, UncertaintyLevel, UncertaintyRegime,
};

/// Helper: a small sweep that still covers every cell of the design
fn small_experiment(strategy: PeerStrategy, threads: Option<usize>) -> ExperimentConfig {
    let mut config = ExperimentConfig::baseline();
    config.experiment.name = "integration".to_string();
    config.experiment.n_firms = 12;
    config.experiment.n_periods = 30;
    config.experiment.n_runs = 2;
    config.experiment.strategy = strategy.name().to_string();
    config.experiment.seed = 2024;
    config.experiment.threads = threads;
    config
}

fn regime(label: &str) -> UncertaintyRegime {
    UncertaintyRegime::defaults()
        .into_iter()
        .find(|r| r.label == label)
        .unwrap()
}

#[test]
fn test_single_run_is_reproducible() {
    let config = SimulationConfig::new(
        50,
        AspirationType::Switching,
        PeerStrategy::Stepwise,
        &regime("high_tech_high_market"),
        ModelParams::default(),
    );

    let a = run_single(config.clone(), 7, 100).unwrap();
    let b = run_single(config.clone(), 7, 100).unwrap();
    let c = run_single(config, 8, 100).unwrap();

    assert_eq!(a.shape(), (100, 50));
    assert_eq!(a, b, "same seed must give identical trajectories");
    assert_ne!(a, c, "different seeds should give different trajectories");
}

#[test]
fn test_historical_firms_ignore_peer_strategy() {
    let base = regime("low_tech_high_market");
    let trajectories: Vec<_> = PeerStrategy::ALL
        .iter()
        .map(|&strategy| {
            let config = SimulationConfig::new(
                40,
                AspirationType::Historical,
                strategy,
                &base,
                ModelParams::default(),
            );
            run_single(config, 11, 60).unwrap()
        })
        .collect();

    assert_eq!(trajectories[0], trajectories[1]);
    assert_eq!(trajectories[1], trajectories[2]);
}

#[test]
fn test_zero_periods_gives_empty_trajectory() {
    let config = SimulationConfig::new(
        20,
        AspirationType::Mixed,
        PeerStrategy::Conservative,
        &regime("low_tech_low_market"),
        ModelParams::default(),
    );
    let trajectory = run_single(config, 1, 0).unwrap();
    assert_eq!(trajectory.shape(), (0, 20));
    assert!(trajectory.is_empty());
}

#[test]
fn test_invalid_single_run_configs() {
    let base = regime("low_tech_low_market");

    let zero_firms = SimulationConfig::new(
        0,
        AspirationType::Social,
        PeerStrategy::Ambitious,
        &base,
        ModelParams::default(),
    );
    assert!(matches!(
        run_single(zero_firms, 1, 10),
        Err(SimError::InvalidConfiguration(_))
    ));

    let unknown = SimulationConfig::from_names(
        10,
        "social",
        "random",
        &base,
        ModelParams::default(),
    );
    assert!(matches!(unknown, Err(SimError::UnknownStrategy(_))));
}

#[test]
fn test_peer_reference_examples() {
    let params = ModelParams {
        percentile_stepwise: 0.5,
        ..ModelParams::default()
    };
    let performance = [0.0, 1.0, 10.0];

    let conservative = PeerResolver::new(PeerStrategy::Conservative, &params);
    for firm in 0..3 {
        assert_relative_eq!(conservative.resolve(firm, &performance), 11.0 / 3.0);
    }

    // k = round(0.5 × 3) = 2
    let stepwise = PeerResolver::new(PeerStrategy::Stepwise, &params);
    assert_relative_eq!(stepwise.resolve(0, &performance), 5.5);
    assert_relative_eq!(stepwise.resolve(1, &performance), 5.0);
    assert_relative_eq!(stepwise.resolve(2, &performance), 0.5);

    let ambitious = PeerResolver::new(PeerStrategy::Ambitious, &params);
    for firm in 0..3 {
        assert_relative_eq!(ambitious.resolve(firm, &performance), 5.5);
    }
}

#[test]
fn test_experiment_covers_full_design() {
    let config = small_experiment(PeerStrategy::Stepwise, None);
    let records = run_experiment(config.clone()).unwrap();

    let e = &config.experiment;
    assert_eq!(records.len(), 4 * 4 * e.n_runs * e.n_firms);

    for aspiration in AspirationType::ALL {
        for tech in [UncertaintyLevel::Low, UncertaintyLevel::High] {
            for market in [UncertaintyLevel::Low, UncertaintyLevel::High] {
                let cell = records
                    .iter()
                    .filter(|r| {
                        r.aspiration == aspiration
                            && r.tech_uncertainty == tech
                            && r.market_uncertainty == market
                    })
                    .count();
                assert_eq!(cell, e.n_runs * e.n_firms);
            }
        }
    }

    for record in &records {
        assert!(record.risk >= 0.0);
        assert!(record.performance.is_finite());
        assert_eq!(record.strategy, PeerStrategy::Stepwise);
        assert!(record.run_id < e.n_runs);
        assert!(record.org_id < e.n_firms);
    }
}

#[test]
fn test_experiment_independent_of_thread_count() {
    let parallel = run_experiment(small_experiment(PeerStrategy::Ambitious, None)).unwrap();
    let sequential = run_experiment(small_experiment(PeerStrategy::Ambitious, Some(1))).unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_historical_records_match_across_strategies() {
    let conservative = run_experiment(small_experiment(PeerStrategy::Conservative, None)).unwrap();
    let ambitious = run_experiment(small_experiment(PeerStrategy::Ambitious, None)).unwrap();

    let historical = |records: &[aspiration_dynamics::ExperimentRecord]| -> Vec<(f64, f64)> {
        records
            .iter()
            .filter(|r| r.aspiration == AspirationType::Historical)
            .map(|r| (r.performance, r.risk))
            .collect()
    };

    assert_eq!(historical(&conservative), historical(&ambitious));
}

#[test]
fn test_analysis_pipeline_on_experiment_output() {
    let config = small_experiment(PeerStrategy::Stepwise, Some(2));
    let records = run_experiment(config.clone()).unwrap();

    let anova = factorial_anova(&records, Metric::Performance).unwrap();
    assert_eq!(anova.len(), 7);
    for row in &anova {
        assert!(row.sum_sq >= -1e-9, "{} has negative SS", row.source);
        let expected_df = if row.source.contains("Aspiration") { 3 } else { 1 };
        assert_eq!(row.df, expected_df);
        assert!((0.0..=1.0).contains(&row.p_value));
    }

    let groups = group_mean_differences(&records, Factor::Aspiration);
    assert_eq!(groups.len(), 4);
    let total: f64 = groups.iter().map(|g| g.perf_diff).sum();
    assert_relative_eq!(total, 0.0, epsilon = 1e-9);

    let summary = ExperimentSummary::from_records(&records, &config);
    assert_eq!(summary.anova.len(), 14);
    assert_eq!(summary.metadata.num_records, records.len());

    let mut buffer = Vec::new();
    write_records_csv(&records, &mut buffer).unwrap();
    let reread = read_records_csv(buffer.as_slice()).unwrap();
    assert_eq!(reread.len(), records.len());
    assert_eq!(reread[0].aspiration, records[0].aspiration);
    assert_eq!(reread[0].org_id, records[0].org_id);
}

#[test]
fn test_one_record_per_cell_still_summarised() {
    let mut config = small_experiment(PeerStrategy::Conservative, Some(1));
    config.experiment.n_firms = 1;
    config.experiment.n_runs = 1;
    let records = run_experiment(config.clone()).unwrap();
    assert_eq!(records.len(), 16);

    assert!(matches!(
        factorial_anova(&records, Metric::Performance),
        Err(SimError::Analysis(_))
    ));

    let summary = ExperimentSummary::from_records(&records, &config);
    assert!(summary.anova.is_empty());
    assert_eq!(summary.metadata.num_records, 16);
    assert_eq!(summary.groups_for(Factor::Aspiration).len(), 4);
    assert_eq!(summary.run_trends.len(), 4);
}
