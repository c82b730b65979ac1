//! Integration tests for the agent state machine and the complete search.

use mahm::agent::{Agent, AgentSettings, AgentState, RelinkTarget, TargetProbability};
use mahm::config::{
    Config, DecisionMode, ExecutionMode, InitialSolution, LearningScope, RelinkTargetPolicy,
};
use mahm::decision::{Composite, DecisionMethod};
use mahm::error::{Error, Result};
use mahm::learning::{LearningHandle, LearningMethod};
use mahm::metaheuristics::{Metaheuristic, MetaheuristicPool, StrategyKind};
use mahm::problem::{Problem, Stop};
use mahm::solution::{Evaluator, RouteSolution};
use mahm::swarm::SwarmCoordinator;
use mahm::utils::{format_report, save_report};
use mahm::{MultiAgentSearch, SearchReport};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

fn example_matrix() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 5.0, 8.0, 10.0, 12.0],
        vec![5.0, 0.0, 6.0, 9.0, 11.0],
        vec![8.0, 6.0, 0.0, 4.0, 7.0],
        vec![10.0, 9.0, 4.0, 0.0, 5.0],
        vec![12.0, 11.0, 7.0, 5.0, 0.0],
    ]
}

/// Four stops with no passengers; the optimum costs 32.
fn create_test_problem() -> Problem {
    let stops = (0..5).map(|id| Stop::new(id, 0.0, 0.0)).collect();

    Problem::new("TestProblem".to_string(), stops, 0, 10.0, example_matrix()).unwrap()
}

/// Four stops with capacity 5; the cheapest feasible route costs 37.
fn create_loaded_problem() -> Problem {
    let stops = vec![
        Stop::new(0, 0.0, 0.0),
        Stop::new(1, 4.0, 0.0),
        Stop::new(2, 3.0, 0.0),
        Stop::new(3, 0.0, 4.0),
        Stop::new(4, 0.0, 3.0),
    ];

    Problem::new("LoadedProblem".to_string(), stops, 0, 5.0, example_matrix()).unwrap()
}

/// Twelve stops on a line with alternating boardings and alightings.
fn create_line_problem() -> Problem {
    let n = 13;
    let matrix = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| ((i as f64) - (j as f64)).abs() * 2.0 + if i == j { 0.0 } else { 1.0 })
                .collect()
        })
        .collect();

    let stops = (0..n)
        .map(|id| match id {
            0 => Stop::new(0, 0.0, 0.0),
            id if id % 2 == 1 => Stop::new(id, 3.0, 0.0),
            id => Stop::new(id, 0.0, 3.0),
        })
        .collect();

    Problem::new("LineProblem".to_string(), stops, 0, 9.0, matrix).unwrap()
}

fn settings(max_iterations: usize, depth: usize, policy: RelinkTargetPolicy) -> AgentSettings {
    AgentSettings {
        max_iterations,
        intensification_depth_limit: depth,
        relink_target_policy: policy,
        initial_solution: InitialSolution::RandomFeasible,
        deadline: None,
    }
}

fn default_pool() -> MetaheuristicPool {
    let config = Config::new();
    MetaheuristicPool::from_kinds(&config.strategies, &config.strategy_params)
}

fn default_decision() -> DecisionMethod {
    DecisionMethod::new(DecisionMode::Roulette, Box::new(Composite), 0.05)
}

/// Always returns the same, possibly infeasible, permutation.
struct Fixed(Vec<usize>);

impl Metaheuristic for Fixed {
    fn name(&self) -> &str {
        "FIXED"
    }

    fn apply(
        &self,
        _solution: &RouteSolution,
        _evaluator: &Evaluator,
        _seed: u64,
    ) -> Result<RouteSolution> {
        Ok(RouteSolution::new(self.0.clone()))
    }
}

#[test]
fn test_agent_terminates_and_never_worsens_pbest() {
    let problem = create_test_problem();
    let pool = default_pool();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();
    let learning = LearningHandle::Private(LearningMethod::new(&pool.names()));

    let start = RouteSolution::new(vec![1, 3, 4, 2]);
    let start_cost = problem.evaluate(&start).unwrap();
    assert_eq!(start_cost, 34.0);

    let mut agent = Agent::new(
        0,
        &problem,
        &pool,
        &decision,
        &coordinator,
        learning,
        settings(5, 3, RelinkTargetPolicy::Adaptive),
        42,
    )
    .with_initial_solution(start);

    let mut pbest_costs = Vec::new();
    let mut steps = 0;
    while !agent.is_terminated() {
        agent.step().unwrap();
        steps += 1;
        assert!(steps < 1000, "agent did not terminate");

        if agent.iteration() > 0 || matches!(agent.state(), AgentState::Decide) {
            pbest_costs.push(agent.belief().pbest_evaluation.cost);
        }
    }

    assert_eq!(agent.iteration(), 5);
    for pair in pbest_costs.windows(2) {
        assert!(pair[1] <= pair[0]);
    }

    let report = agent.report();
    assert!(report.pbest_cost <= start_cost);
    assert!(problem.is_feasible(&report.pbest));
    assert_eq!(report.pbest_cost, 32.0);
    assert_eq!(coordinator.best_cost(), report.pbest_cost);
    assert!(report.evaluations > 0);

    let attempts: u64 = report.strategies.iter().map(|record| record.attempts).sum();
    assert!(attempts >= 5);
}

#[test]
fn test_every_cycle_passes_through_every_phase() {
    let problem = create_loaded_problem();
    let pool = default_pool();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();

    let mut agent = Agent::new(
        1,
        &problem,
        &pool,
        &decision,
        &coordinator,
        LearningHandle::Private(LearningMethod::new(&pool.names())),
        settings(3, 2, RelinkTargetPolicy::Pbest),
        7,
    );
    assert_eq!(agent.state(), &AgentState::Init);

    agent.step().unwrap();
    assert_eq!(agent.state(), &AgentState::Decide);
    assert!(agent.belief().pbest_evaluation.feasible);

    for cycle in 1..=3 {
        let mut phases = Vec::new();
        loop {
            agent.step().unwrap();
            let phase = match agent.state() {
                AgentState::Init => "init",
                AgentState::Decide => "decide",
                AgentState::Execute { .. } => "execute",
                AgentState::Relink { .. } => "relink",
                AgentState::Intensify { .. } => "intensify",
                AgentState::BeliefUpdate { .. } => "belief_update",
                AgentState::Terminate => "terminate",
            };
            phases.push(phase);
            if matches!(phase, "decide" | "terminate") {
                break;
            }
        }

        assert_eq!(phases[0], "execute");
        assert_eq!(phases[1], "relink");
        assert_eq!(phases[phases.len() - 2], "belief_update");
        assert!(!phases.contains(&"init"));
        assert_eq!(agent.iteration(), cycle);
    }

    assert!(agent.is_terminated());
    // Pbest policy leaves the adaptive probability untouched
    assert_eq!(agent.report().pbest_relink_probability, 0.9);
}

#[test]
fn test_target_probability_follows_relink_outcomes() {
    let cases = [
        (RelinkTarget::Pbest, true, 0.95),
        (RelinkTarget::Pbest, false, 0.85),
        (RelinkTarget::Gbest, true, 0.85),
        (RelinkTarget::Gbest, false, 0.95),
    ];

    for (target, improved, expected) in cases {
        let mut probability = TargetProbability::new();
        assert_eq!(probability.pbest(), 0.9);

        probability.record(target, improved);
        assert!(
            (probability.pbest() - expected).abs() < 1e-9,
            "{:?} improved={} gave {}",
            target,
            improved,
            probability.pbest()
        );
        assert!(!probability.is_frozen());
    }
}

#[test]
fn test_target_probability_freezes_at_the_bounds() {
    let mut probability = TargetProbability::new();
    probability.record(RelinkTarget::Pbest, true);
    probability.record(RelinkTarget::Gbest, false);
    assert_eq!(probability.pbest(), 1.0);
    assert!(probability.is_frozen());

    // Outcomes that would lower it no longer count
    probability.record(RelinkTarget::Pbest, false);
    probability.record(RelinkTarget::Gbest, true);
    assert_eq!(probability.pbest(), 1.0);

    let mut rng = ChaCha8Rng::seed_from_u64(9);
    for _ in 0..50 {
        assert_eq!(probability.choose(&mut rng), RelinkTarget::Pbest);
    }

    let mut probability = TargetProbability::new();
    for _ in 0..18 {
        probability.record(RelinkTarget::Pbest, false);
    }
    assert_eq!(probability.pbest(), 0.0);
    assert!(probability.is_frozen());

    probability.record(RelinkTarget::Pbest, true);
    probability.record(RelinkTarget::Gbest, false);
    assert_eq!(probability.pbest(), 0.0);
    for _ in 0..50 {
        assert_eq!(probability.choose(&mut rng), RelinkTarget::Gbest);
    }
}

#[test]
fn test_adaptive_agent_moves_target_probability_each_cycle() {
    let problem = create_test_problem();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();

    // Starting at the optimum with a strategy that stays there, no walk can improve
    let optimum = vec![1, 2, 3, 4];
    let mut pool = MetaheuristicPool::new();
    pool.register(Box::new(Fixed(optimum.clone())));

    let mut agent = Agent::new(
        0,
        &problem,
        &pool,
        &decision,
        &coordinator,
        LearningHandle::Private(LearningMethod::new(&pool.names())),
        settings(1, 1, RelinkTargetPolicy::Adaptive),
        21,
    )
    .with_initial_solution(RouteSolution::new(optimum));

    let report = agent.run().unwrap();
    assert_eq!(report.pbest_cost, 32.0);
    assert_eq!(report.iterations, 1);

    // One non-improving walk: down for pbest, up for gbest
    let step = (report.pbest_relink_probability - 0.9).abs();
    assert!((step - 0.05).abs() < 1e-9, "probability {}", report.pbest_relink_probability);
}

#[test]
fn test_infeasible_initial_route_is_rejected() {
    let problem = create_loaded_problem();
    let pool = default_pool();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();

    let mut agent = Agent::new(
        0,
        &problem,
        &pool,
        &decision,
        &coordinator,
        LearningHandle::Private(LearningMethod::new(&pool.names())),
        settings(3, 1, RelinkTargetPolicy::Gbest),
        1,
    )
    .with_initial_solution(RouteSolution::new(vec![1, 2, 3, 4]));

    assert!(matches!(agent.run(), Err(Error::InvalidConfig(_))));
}

#[test]
fn test_infeasible_strategy_result_keeps_position() {
    let problem = create_loaded_problem();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();

    let mut pool = MetaheuristicPool::new();
    pool.register(Box::new(Fixed(vec![1, 2, 3, 4])));

    let start = RouteSolution::new(vec![1, 3, 2, 4]);
    let mut agent = Agent::new(
        0,
        &problem,
        &pool,
        &decision,
        &coordinator,
        LearningHandle::Private(LearningMethod::new(&pool.names())),
        settings(4, 3, RelinkTargetPolicy::Adaptive),
        5,
    )
    .with_initial_solution(start.clone());

    let report = agent.run().unwrap();

    assert_eq!(agent.belief().position, start);
    assert_eq!(report.pbest, start);
    assert_eq!(report.pbest_cost, 37.0);
    assert_eq!(report.strategies[0].attempts, 4);
    assert_eq!(report.strategies[0].successes, 0);
    // Init plus one proposal per cycle
    assert_eq!(coordinator.proposals(), 5);
    assert_eq!(coordinator.updates(), 1);
}

#[test]
fn test_zero_depth_limit_never_intensifies() {
    let problem = create_line_problem();
    let pool = default_pool();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();

    let mut agent = Agent::new(
        0,
        &problem,
        &pool,
        &decision,
        &coordinator,
        LearningHandle::Private(LearningMethod::new(&pool.names())),
        settings(4, 0, RelinkTargetPolicy::Alternate),
        13,
    );

    let report = agent.run().unwrap();
    assert_eq!(report.intensifications, 0);
    assert_eq!(report.iterations, 4);
}

#[test]
fn test_deadline_stops_agent_after_current_cycle() {
    let problem = create_test_problem();
    let pool = default_pool();
    let decision = default_decision();
    let coordinator = SwarmCoordinator::new();

    let mut agent_settings = settings(100, 1, RelinkTargetPolicy::Better);
    agent_settings.deadline = Some(Instant::now());

    let mut agent = Agent::new(
        0,
        &problem,
        &pool,
        &decision,
        &coordinator,
        LearningHandle::Private(LearningMethod::new(&pool.names())),
        agent_settings,
        3,
    );

    let report = agent.run().unwrap();
    assert_eq!(report.iterations, 1);
}

#[test]
fn test_search_finds_best_feasible_route() {
    let config = Config::new()
        .with_agent_count(4)
        .with_max_iterations(6)
        .with_random_seed(42);

    let mut search = MultiAgentSearch::new(create_loaded_problem(), config).unwrap();
    let report = search.run().unwrap();

    assert_eq!(report.best_cost, 37.0);
    assert!(search.problem.is_feasible(&report.best_route));
    assert_eq!(report.agents.len(), 4);
    assert_eq!(report.iterations, 24);
    assert!(report.gbest_updates >= 1);
    assert!(report.proposals >= 4 + 24);

    // gbest is at least as good as every pbest
    for agent in &report.agents {
        assert!(report.best_cost <= agent.pbest_cost);
        assert_eq!(agent.iterations, 6);
    }

    let best = search.best_solution.as_ref().unwrap();
    assert_eq!(best.cost, report.best_cost);
    assert_eq!(best.agent_id, report.best_agent);
}

#[test]
fn test_interleaved_search_is_reproducible() {
    let config = Config::new()
        .with_agent_count(3)
        .with_max_iterations(4)
        .with_random_seed(2024)
        .with_execution(ExecutionMode::Interleaved);

    let run = |config: Config| -> SearchReport {
        MultiAgentSearch::new(create_line_problem(), config)
            .unwrap()
            .run()
            .unwrap()
    };

    let first = run(config.clone());
    let second = run(config);

    assert_eq!(first.best_cost, second.best_cost);
    assert_eq!(first.best_route, second.best_route);
    assert_eq!(first.best_agent, second.best_agent);
    assert_eq!(first.proposals, second.proposals);
    for (a, b) in first.agents.iter().zip(&second.agents) {
        assert_eq!(a.pbest, b.pbest);
        assert_eq!(a.evaluations, b.evaluations);
        assert_eq!(a.strategies, b.strategies);
    }
}

#[test]
fn test_swarm_learning_is_shared() {
    let config = Config::new()
        .with_agent_count(3)
        .with_max_iterations(3)
        .with_learning_scope(LearningScope::Swarm)
        .with_execution(ExecutionMode::Interleaved);

    let report = MultiAgentSearch::new(create_test_problem(), config)
        .unwrap()
        .run()
        .unwrap();

    // Every agent reports the same pooled ledger, holding all nine executions at least
    let ledger = &report.agents[0].strategies;
    for agent in &report.agents {
        assert_eq!(&agent.strategies, ledger);
    }
    let attempts: u64 = ledger.iter().map(|record| record.attempts).sum();
    assert!(attempts >= 9);
}

#[test]
fn test_search_with_custom_pool_and_start() {
    let mut pool = MetaheuristicPool::new();
    pool.register(StrategyKind::TwoOpt.build(&Default::default()));

    let config = Config::new()
        .with_agent_count(2)
        .with_max_iterations(2)
        .with_initial_solution(InitialSolution::Identity);

    let start = RouteSolution::new(vec![1, 3, 4, 2]);
    let mut search = MultiAgentSearch::new(create_test_problem(), config)
        .unwrap()
        .with_pool(pool)
        .unwrap()
        .with_initial_solution(start);

    let report = search.run().unwrap();
    assert!(report.best_cost <= 34.0);
    for agent in &report.agents {
        assert_eq!(agent.strategies.len(), 1);
        assert_eq!(agent.strategies[0].name, "2OPT");
    }
}

#[test]
fn test_invalid_search_setup_is_rejected() {
    let result = MultiAgentSearch::new(create_test_problem(), Config::new().with_agent_count(0));
    assert!(matches!(result, Err(Error::InvalidConfig(_))));

    let search = MultiAgentSearch::new(create_test_problem(), Config::new()).unwrap();
    assert!(matches!(
        search.with_pool(MetaheuristicPool::new()),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_report_is_saved_and_formatted() {
    let problem = create_test_problem();
    let config = Config::new()
        .with_agent_count(2)
        .with_max_iterations(2)
        .with_time_limit(Duration::from_secs(60));

    let report = MultiAgentSearch::new(problem.clone(), config)
        .unwrap()
        .run()
        .unwrap();

    let path = std::env::temp_dir().join(format!("mahm_report_{}.json", std::process::id()));
    save_report(&report, &path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let loaded: SearchReport = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded.best_route, report.best_route);
    assert_eq!(loaded.best_cost, report.best_cost);
    std::fs::remove_file(&path).ok();

    let summary = format_report(&report, &problem);
    assert!(summary.contains("TestProblem"));
    assert!(summary.contains("0 -> "));
    assert!(summary.contains("VND"));
}
