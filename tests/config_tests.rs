//! Tests for configuration defaults, validation and loading.

use mahm::config::{
    Config, DecisionMode, ExecutionMode, InitialSolution, LearningScope, RelinkTargetPolicy,
    ScoringPolicy, StrategyParams,
};
use mahm::error::Error;
use mahm::metaheuristics::StrategyKind;
use std::time::Duration;

#[test]
fn test_default_config_is_valid() {
    let config = Config::new();

    assert!(config.validate().is_ok());
    assert_eq!(config.max_iterations, 20);
    assert_eq!(config.agent_count, 5);
    assert_eq!(config.intensification_depth_limit, 3);
    assert_eq!(config.relink_target_policy, RelinkTargetPolicy::Adaptive);
    assert_eq!(config.decision_mode, DecisionMode::Roulette);
    assert_eq!(config.learning_scope, LearningScope::Agent);
    assert_eq!(
        config.strategies,
        vec![StrategyKind::Vnd, StrategyKind::Ils, StrategyKind::Vns]
    );
    assert_eq!(config.execution, ExecutionMode::Parallel);
    assert!(config.time_limit.is_none());
}

#[test]
fn test_builders_set_fields() {
    let config = Config::new()
        .with_max_iterations(7)
        .with_agent_count(2)
        .with_exploration_floor(0.2)
        .with_intensification_depth_limit(0)
        .with_relink_target_policy(RelinkTargetPolicy::Alternate)
        .with_random_seed(9)
        .with_learning_scope(LearningScope::Swarm)
        .with_strategies(vec![StrategyKind::Swap, StrategyKind::TwoOpt])
        .with_execution(ExecutionMode::Interleaved)
        .with_initial_solution(InitialSolution::Identity)
        .with_time_limit(Duration::from_secs(3));

    assert!(config.validate().is_ok());
    assert_eq!(config.max_iterations, 7);
    assert_eq!(config.agent_count, 2);
    assert_eq!(config.random_seed, 9);
    assert_eq!(config.strategies.len(), 2);
    assert_eq!(config.initial_solution, InitialSolution::Identity);
    assert_eq!(config.time_limit, Some(Duration::from_secs(3)));
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let invalid = [
        Config::new().with_max_iterations(0),
        Config::new().with_agent_count(0),
        Config::new().with_strategies(Vec::new()),
        Config::new().with_exploration_floor(-0.1),
        // Every strategy must keep some chance of being picked
        Config::new().with_exploration_floor(0.0),
        // Three strategies cannot each keep 40%
        Config::new().with_exploration_floor(0.4),
        Config::new().with_scoring(ScoringPolicy::Softmax { temperature: 0.0 }),
        Config::new().with_strategy_params(StrategyParams {
            perturbation_strength: 0,
            ..StrategyParams::default()
        }),
        Config::new().with_strategy_params(StrategyParams {
            shake_attempts: 0,
            ..StrategyParams::default()
        }),
    ];

    for config in invalid {
        assert!(
            matches!(config.validate(), Err(Error::InvalidConfig(_))),
            "{:?} should be rejected",
            config
        );
    }
}

#[test]
fn test_floor_at_one_over_k_is_allowed() {
    let config = Config::new()
        .with_strategies(vec![StrategyKind::Vnd, StrategyKind::Ils])
        .with_exploration_floor(0.5);

    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let json = r#"{
        "agent_count": 3,
        "relink_target_policy": "gbest",
        "scoring": {"softmax": {"temperature": 0.25}},
        "strategies": ["vnd", "two_opt"],
        "execution": "interleaved"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.agent_count, 3);
    assert_eq!(config.relink_target_policy, RelinkTargetPolicy::Gbest);
    assert_eq!(config.scoring, ScoringPolicy::Softmax { temperature: 0.25 });
    assert_eq!(config.strategies, vec![StrategyKind::Vnd, StrategyKind::TwoOpt]);
    assert_eq!(config.execution, ExecutionMode::Interleaved);
    assert_eq!(config.max_iterations, 20);
    assert_eq!(config.strategy_params, StrategyParams::default());
}

#[test]
fn test_missing_config_file() {
    assert!(matches!(
        Config::from_file("no/such/config.json"),
        Err(Error::Io(_))
    ));
}
