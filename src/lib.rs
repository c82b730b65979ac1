//! # MAHM
//!
//! A multi-agent hybrid metaheuristic for capacitated single-vehicle transit
//! routing.
//!
//! A swarm of agents searches for the cheapest closed route through every stop
//! of a travel-time matrix while keeping the on-board load within the vehicle
//! capacity. Each agent learns which local-improvement strategy pays off,
//! moves through solution space by path-relinking towards its own best or the
//! swarm's best route, and interrupts a walk to intensify around any waypoint
//! that beats its current route.

pub mod agent;
pub mod config;
pub mod construction;
pub mod decision;
pub mod error;
pub mod learning;
pub mod metaheuristics;
pub mod problem;
pub mod relinking;
pub mod solution;
pub mod swarm;
pub mod utils;

use crate::agent::{Agent, AgentReport, AgentSettings};
use crate::config::{Config, ExecutionMode, LearningScope};
use crate::decision::DecisionMethod;
use crate::error::{Error, Result};
use crate::learning::{LearningHandle, LearningMethod};
use crate::metaheuristics::MetaheuristicPool;
use crate::problem::Problem;
use crate::solution::RouteSolution;
use crate::swarm::{GlobalBest, SwarmCoordinator};

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Outcome of a complete search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub instance: String,
    /// The swarm best route
    pub best_route: RouteSolution,
    pub best_cost: f64,
    /// Agent that found the best route
    pub best_agent: usize,
    pub run_time: Duration,
    /// Cycles completed by all agents together
    pub iterations: usize,
    /// gbest proposals received by the coordinator
    pub proposals: usize,
    /// Proposals that replaced gbest
    pub gbest_updates: usize,
    pub agents: Vec<AgentReport>,
}

/// The main structure that sets up and runs the swarm.
pub struct MultiAgentSearch {
    pub problem: Problem,
    pub config: Config,
    pub pool: MetaheuristicPool,
    pub decision: DecisionMethod,
    pub best_solution: Option<GlobalBest>,
    pub run_time: Duration,
    initial_solution: Option<RouteSolution>,
}

impl MultiAgentSearch {
    /// Create a search for the given problem, rejecting invalid configurations.
    pub fn new(problem: Problem, config: Config) -> Result<Self> {
        config.validate()?;

        let pool = MetaheuristicPool::from_kinds(&config.strategies, &config.strategy_params);
        let decision = DecisionMethod::from_config(&config);

        Ok(MultiAgentSearch {
            problem,
            config,
            pool,
            decision,
            best_solution: None,
            run_time: Duration::from_secs(0),
            initial_solution: None,
        })
    }

    /// Replace the strategy pool.
    pub fn with_pool(mut self, pool: MetaheuristicPool) -> Result<Self> {
        if pool.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one strategy must be registered".to_string(),
            ));
        }

        if self.config.exploration_floor <= 0.0
            || self.config.exploration_floor * pool.len() as f64 > 1.0 + 1e-12
        {
            return Err(Error::InvalidConfig(format!(
                "exploration_floor {} must lie in (0, 1/{}]",
                self.config.exploration_floor,
                pool.len()
            )));
        }

        self.pool = pool;
        Ok(self)
    }

    /// Replace the decision method.
    pub fn with_decision(mut self, decision: DecisionMethod) -> Self {
        self.decision = decision;
        self
    }

    /// Start every agent from `route` instead of a constructed route.
    pub fn with_initial_solution(mut self, route: RouteSolution) -> Self {
        self.initial_solution = Some(route);
        self
    }

    /// Run every agent to termination and report the swarm best.
    pub fn run(&mut self) -> Result<SearchReport> {
        let start_time = Instant::now();
        let coordinator = SwarmCoordinator::new();
        let settings = AgentSettings::from_config(&self.config, start_time);

        info!(
            "starting {} agents on '{}' ({} stops, capacity {}), {} cycles each, strategies {:?}",
            self.config.agent_count,
            self.problem.name,
            self.problem.active_stop_count(),
            self.problem.capacity,
            self.config.max_iterations,
            self.pool.names()
        );

        // Every agent gets its own stream derived from the run seed
        let mut seeds = ChaCha8Rng::seed_from_u64(self.config.random_seed);
        let names = self.pool.names();

        let shared = match self.config.learning_scope {
            LearningScope::Swarm => Some(Arc::new(Mutex::new(LearningMethod::new(&names)))),
            LearningScope::Agent => None,
        };

        let mut agents: Vec<Agent> = (0..self.config.agent_count)
            .map(|id| {
                let learning = match &shared {
                    Some(shared) => LearningHandle::Shared(Arc::clone(shared)),
                    None => LearningHandle::Private(LearningMethod::new(&names)),
                };

                let agent = Agent::new(
                    id,
                    &self.problem,
                    &self.pool,
                    &self.decision,
                    &coordinator,
                    learning,
                    settings.clone(),
                    seeds.gen(),
                );

                match &self.initial_solution {
                    Some(route) => agent.with_initial_solution(route.clone()),
                    None => agent,
                }
            })
            .collect();

        let agent_reports: Vec<AgentReport> = match self.config.execution {
            ExecutionMode::Parallel => agents
                .par_iter_mut()
                .map(|agent| agent.run())
                .collect::<Result<Vec<_>>>()?,
            ExecutionMode::Interleaved => {
                while agents.iter().any(|agent| !agent.is_terminated()) {
                    for agent in agents.iter_mut().filter(|agent| !agent.is_terminated()) {
                        agent.run_cycle()?;
                    }
                }
                agents.iter().map(Agent::report).collect()
            }
        };
        drop(agents);

        self.run_time = start_time.elapsed();
        self.best_solution = coordinator.snapshot();

        let best = self
            .best_solution
            .clone()
            .ok_or(Error::NoFeasibleStart {
                attempts: construction::MAX_CONSTRUCTION_ATTEMPTS,
            })?;

        info!(
            "search finished in {}: best cost {:.2} by agent {}",
            utils::format_duration(self.run_time),
            best.cost,
            best.agent_id
        );

        Ok(SearchReport {
            instance: self.problem.name.clone(),
            best_route: best.solution,
            best_cost: best.cost,
            best_agent: best.agent_id,
            run_time: self.run_time,
            iterations: agent_reports.iter().map(|report| report.iterations).sum(),
            proposals: coordinator.proposals(),
            gbest_updates: coordinator.updates(),
            agents: agent_reports,
        })
    }
}
