//! Search agent: a finite-state machine running decide, execute, relink and
//! belief-update cycles.
//!
//! ```text
//! Init -> Decide -> Execute -> Relink -> BeliefUpdate -> Decide ... -> Terminate
//!                                ^   |
//!                                |   v (interrupted)
//!                              Intensify
//! ```
//!
//! Every cycle passes through every phase, even when nothing improves.

use crate::config::{Config, InitialSolution, RelinkTargetPolicy};
use crate::construction;
use crate::decision::DecisionMethod;
use crate::error::{Error, Result};
use crate::learning::{LearningHandle, StrategyRecord};
use crate::metaheuristics::{MetaheuristicPool, StrategyId};
use crate::problem::Problem;
use crate::relinking::{Intensifier, PathRelinker, RelinkOutcome};
use crate::solution::{Evaluation, Evaluator, RouteSolution};
use crate::swarm::SwarmCoordinator;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Initial probability of relinking towards pbest under the adaptive policy.
pub const INITIAL_PBEST_PROBABILITY: f64 = 0.9;

/// Change of the adaptive pbest probability after each relink.
pub const TARGET_PROBABILITY_STEP: f64 = 0.05;

/// Destination of a relinking walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelinkTarget {
    Pbest,
    Gbest,
}

/// Probability of relinking towards pbest under the adaptive target policy.
///
/// A target that improved on the strategy's result gains one step, one that
/// did not loses one step. Once either target reaches probability one the
/// value is frozen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetProbability {
    pbest: f64,
}

impl TargetProbability {
    pub fn new() -> Self {
        TargetProbability {
            pbest: INITIAL_PBEST_PROBABILITY,
        }
    }

    /// Probability of choosing pbest.
    pub fn pbest(&self) -> f64 {
        self.pbest
    }

    pub fn is_frozen(&self) -> bool {
        self.pbest <= 0.0 || self.pbest >= 1.0
    }

    /// Draw the destination of the next walk.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> RelinkTarget {
        if rng.gen_bool(self.pbest.clamp(0.0, 1.0)) {
            RelinkTarget::Pbest
        } else {
            RelinkTarget::Gbest
        }
    }

    /// Shift the probability towards the target that paid off.
    pub fn record(&mut self, target: RelinkTarget, improved: bool) {
        if self.is_frozen() {
            return;
        }

        let towards_pbest = (target == RelinkTarget::Pbest) == improved;
        let delta = if towards_pbest {
            TARGET_PROBABILITY_STEP
        } else {
            -TARGET_PROBABILITY_STEP
        };

        let next = self.pbest + delta;
        // Snap accumulated rounding error onto the bounds
        self.pbest = if next >= 1.0 - 1e-9 {
            1.0
        } else if next <= 1e-9 {
            0.0
        } else {
            next
        };
    }
}

impl Default for TargetProbability {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase of the agent's cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    Init,
    Decide,
    Execute {
        strategy: StrategyId,
    },
    Relink {
        origin: RouteSolution,
        evaluation: Evaluation,
        depth: usize,
    },
    /// Re-entry point after an interrupted walk: the intensified waypoint
    /// becomes the origin of the next, deeper relink.
    Intensify {
        outcome: RelinkOutcome,
        depth: usize,
    },
    BeliefUpdate {
        solution: RouteSolution,
        evaluation: Evaluation,
    },
    Terminate,
}

/// Private knowledge of one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentBelief {
    /// Current working route
    pub position: RouteSolution,
    pub position_evaluation: Evaluation,
    /// Best feasible route this agent has held
    pub pbest: RouteSolution,
    pub pbest_evaluation: Evaluation,
}

impl AgentBelief {
    fn unset() -> Self {
        let none = Evaluation {
            cost: f64::INFINITY,
            feasible: false,
        };

        AgentBelief {
            position: RouteSolution::new(Vec::new()),
            position_evaluation: none,
            pbest: RouteSolution::new(Vec::new()),
            pbest_evaluation: none,
        }
    }
}

/// Per-agent limits derived from the configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub intensification_depth_limit: usize,
    pub relink_target_policy: RelinkTargetPolicy,
    pub initial_solution: InitialSolution,
    /// Wall-clock instant after which the agent stops early
    pub deadline: Option<Instant>,
}

impl AgentSettings {
    pub fn from_config(config: &Config, started: Instant) -> Self {
        AgentSettings {
            max_iterations: config.max_iterations,
            intensification_depth_limit: config.intensification_depth_limit,
            relink_target_policy: config.relink_target_policy,
            initial_solution: config.initial_solution,
            deadline: config.time_limit.map(|limit| started + limit),
        }
    }
}

/// Final state of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent_id: usize,
    pub pbest: RouteSolution,
    pub pbest_cost: f64,
    /// Completed cycles
    pub iterations: usize,
    /// Objective function evaluations
    pub evaluations: usize,
    /// Strategy runs triggered by relink interruptions
    pub intensifications: usize,
    pub pbest_updates: usize,
    /// Final probability of choosing pbest under the adaptive target policy
    pub pbest_relink_probability: f64,
    pub strategies: Vec<StrategyRecord>,
}

/// Relinking context of the cycle in progress.
#[derive(Debug, Clone)]
struct Cycle {
    target: RelinkTarget,
    destination: RouteSolution,
    candidate_cost: f64,
}

/// An autonomous search agent.
pub struct Agent<'a> {
    id: usize,
    pool: &'a MetaheuristicPool,
    decision: &'a DecisionMethod,
    coordinator: &'a SwarmCoordinator,
    relinker: PathRelinker,
    evaluator: Evaluator<'a>,
    learning: LearningHandle,
    rng: ChaCha8Rng,
    settings: AgentSettings,
    belief: AgentBelief,
    state: AgentState,
    iteration: usize,
    cycle: Option<Cycle>,
    initial: Option<RouteSolution>,
    target_probability: TargetProbability,
    intensifications: usize,
    pbest_updates: usize,
}

impl<'a> Agent<'a> {
    /// Create an agent in the `Init` state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        problem: &'a Problem,
        pool: &'a MetaheuristicPool,
        decision: &'a DecisionMethod,
        coordinator: &'a SwarmCoordinator,
        learning: LearningHandle,
        settings: AgentSettings,
        seed: u64,
    ) -> Self {
        Agent {
            id,
            pool,
            decision,
            coordinator,
            relinker: PathRelinker,
            evaluator: Evaluator::new(problem),
            learning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            settings,
            belief: AgentBelief::unset(),
            state: AgentState::Init,
            iteration: 0,
            cycle: None,
            initial: None,
            target_probability: TargetProbability::new(),
            intensifications: 0,
            pbest_updates: 0,
        }
    }

    /// Start from `route` instead of a constructed one.
    pub fn with_initial_solution(mut self, route: RouteSolution) -> Self {
        self.initial = Some(route);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn belief(&self) -> &AgentBelief {
        &self.belief
    }

    /// Completed cycles.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn is_terminated(&self) -> bool {
        self.state == AgentState::Terminate
    }

    /// Perform exactly one state transition.
    pub fn step(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, AgentState::Terminate);

        self.state = match state {
            AgentState::Init => self.init()?,
            AgentState::Decide => self.decide()?,
            AgentState::Execute { strategy } => self.execute(strategy)?,
            AgentState::Relink {
                origin,
                evaluation,
                depth,
            } => self.relink(origin, evaluation, depth)?,
            AgentState::Intensify { outcome, depth } => self.intensify(outcome, depth),
            AgentState::BeliefUpdate {
                solution,
                evaluation,
            } => self.update_beliefs(solution, evaluation),
            AgentState::Terminate => AgentState::Terminate,
        };

        Ok(())
    }

    /// Step until the current cycle is complete (or the agent terminates).
    pub fn run_cycle(&mut self) -> Result<()> {
        loop {
            self.step()?;
            if matches!(self.state, AgentState::Decide | AgentState::Terminate) {
                return Ok(());
            }
        }
    }

    /// Run every cycle and report the final beliefs.
    pub fn run(&mut self) -> Result<AgentReport> {
        while !self.is_terminated() {
            self.step()?;
        }

        Ok(self.report())
    }

    /// Snapshot of the agent's results so far.
    pub fn report(&self) -> AgentReport {
        AgentReport {
            agent_id: self.id,
            pbest: self.belief.pbest.clone(),
            pbest_cost: self.belief.pbest_evaluation.cost,
            iterations: self.iteration,
            evaluations: self.evaluator.evaluations(),
            intensifications: self.intensifications,
            pbest_updates: self.pbest_updates,
            pbest_relink_probability: self.target_probability.pbest(),
            strategies: self.learning.snapshot(),
        }
    }

    fn init(&mut self) -> Result<AgentState> {
        let problem = self.evaluator.problem();

        let route = match self.initial.take() {
            Some(route) => route,
            None => match self.settings.initial_solution {
                InitialSolution::RandomFeasible => {
                    construction::random_feasible(problem, &mut self.rng)?
                }
                InitialSolution::Identity => construction::identity(problem)?,
            },
        };

        let evaluation = self.evaluator.evaluate(&route)?;
        if !evaluation.feasible {
            return Err(Error::InvalidConfig(format!(
                "agent {} was given an infeasible initial route {:?}",
                self.id, route
            )));
        }

        info!(
            "agent {}: initial route cost {:.2} {:?}",
            self.id, evaluation.cost, route
        );

        self.belief = AgentBelief {
            position: route.clone(),
            position_evaluation: evaluation,
            pbest: route.clone(),
            pbest_evaluation: evaluation,
        };
        self.coordinator.propose(self.id, &route, evaluation);

        Ok(AgentState::Decide)
    }

    fn decide(&mut self) -> Result<AgentState> {
        let decision = self.decision;
        let rng = &mut self.rng;
        let strategy = self
            .learning
            .with_records(|learning| decision.select(learning.records_mut(), rng))?;

        debug!(
            "agent {} cycle {}: chose {}",
            self.id,
            self.iteration,
            self.pool.name(strategy).unwrap_or("?")
        );

        Ok(AgentState::Execute { strategy })
    }

    fn execute(&mut self, strategy: StrategyId) -> Result<AgentState> {
        let before = self.belief.position_evaluation;
        let seed = self.rng.gen();

        let candidate = self
            .pool
            .apply(strategy, &self.belief.position, &self.evaluator, seed)?;
        let after = self.evaluator.evaluate(&candidate)?;

        self.learning
            .update(strategy, before.cost, after.cost, after.feasible);

        let (origin, evaluation) = if after.feasible {
            debug!(
                "agent {} cycle {}: {} {:.2} -> {:.2}",
                self.id,
                self.iteration,
                self.pool.name(strategy).unwrap_or("?"),
                before.cost,
                after.cost
            );
            (candidate, after)
        } else {
            warn!(
                "agent {} cycle {}: {} returned an infeasible route, keeping the current position",
                self.id,
                self.iteration,
                self.pool.name(strategy).unwrap_or("?")
            );
            (self.belief.position.clone(), before)
        };

        let (target, destination) = self.choose_target();
        self.cycle = Some(Cycle {
            target,
            destination,
            candidate_cost: evaluation.cost,
        });

        Ok(AgentState::Relink {
            origin,
            evaluation,
            depth: 0,
        })
    }

    fn relink(
        &mut self,
        origin: RouteSolution,
        evaluation: Evaluation,
        depth: usize,
    ) -> Result<AgentState> {
        let Some(cycle) = self.cycle.as_ref() else {
            // No destination chosen: nothing to relink towards
            return Ok(AgentState::BeliefUpdate {
                solution: origin,
                evaluation,
            });
        };

        let outcome = if depth < self.settings.intensification_depth_limit {
            let mut intensifier = StrategyIntensifier {
                agent_id: self.id,
                pool: self.pool,
                decision: self.decision,
                learning: &mut self.learning,
                rng: &mut self.rng,
                runs: &mut self.intensifications,
            };

            self.relinker.relink(
                &origin,
                &cycle.destination,
                evaluation.cost,
                &self.evaluator,
                Some(&mut intensifier as &mut dyn Intensifier),
            )?
        } else {
            self.relinker.relink(
                &origin,
                &cycle.destination,
                evaluation.cost,
                &self.evaluator,
                None,
            )?
        };

        debug!(
            "agent {} cycle {}: relink towards {:?} took {} steps, cost {:.2}",
            self.id, self.iteration, cycle.target, outcome.steps, outcome.evaluation.cost
        );

        if outcome.interrupted_at_step.is_some() {
            Ok(AgentState::Intensify { outcome, depth })
        } else {
            Ok(AgentState::BeliefUpdate {
                solution: outcome.solution,
                evaluation: outcome.evaluation,
            })
        }
    }

    fn intensify(&mut self, outcome: RelinkOutcome, depth: usize) -> AgentState {
        debug!(
            "agent {} cycle {}: relink interrupted at step {:?}, intensified to {:.2} (depth {})",
            self.id,
            self.iteration,
            outcome.interrupted_at_step,
            outcome.evaluation.cost,
            depth + 1
        );

        AgentState::Relink {
            origin: outcome.solution,
            evaluation: outcome.evaluation,
            depth: depth + 1,
        }
    }

    fn update_beliefs(&mut self, solution: RouteSolution, evaluation: Evaluation) -> AgentState {
        if let Some(cycle) = self.cycle.take() {
            let improved = evaluation.feasible && evaluation.cost < cycle.candidate_cost;
            if self.settings.relink_target_policy == RelinkTargetPolicy::Adaptive {
                self.target_probability.record(cycle.target, improved);
            }
        }

        if evaluation.improves_on(&self.belief.pbest_evaluation) {
            info!(
                "agent {} cycle {}: pbest {:.2} -> {:.2}",
                self.id, self.iteration, self.belief.pbest_evaluation.cost, evaluation.cost
            );
            self.belief.pbest = solution.clone();
            self.belief.pbest_evaluation = evaluation;
            self.pbest_updates += 1;
        }

        self.coordinator.propose(self.id, &solution, evaluation);

        self.belief.position = solution;
        self.belief.position_evaluation = evaluation;
        self.iteration += 1;

        debug!(
            "agent {} cycle {} done: position {:.2}, pbest {:.2}, gbest {:.2}",
            self.id,
            self.iteration,
            self.belief.position_evaluation.cost,
            self.belief.pbest_evaluation.cost,
            self.coordinator.best_cost()
        );

        let out_of_time = self
            .settings
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline);

        if self.iteration >= self.settings.max_iterations || out_of_time {
            info!(
                "agent {}: terminated after {} cycles with pbest {:.2}",
                self.id, self.iteration, self.belief.pbest_evaluation.cost
            );
            AgentState::Terminate
        } else {
            AgentState::Decide
        }
    }

    /// Pick the relinking destination according to the target policy.
    fn choose_target(&mut self) -> (RelinkTarget, RouteSolution) {
        let gbest = self.coordinator.snapshot();

        let target = match self.settings.relink_target_policy {
            RelinkTargetPolicy::Pbest => RelinkTarget::Pbest,
            RelinkTargetPolicy::Gbest => RelinkTarget::Gbest,
            RelinkTargetPolicy::Alternate => {
                if self.iteration % 2 == 0 {
                    RelinkTarget::Pbest
                } else {
                    RelinkTarget::Gbest
                }
            }
            RelinkTargetPolicy::Better => match &gbest {
                Some(best) if best.cost < self.belief.pbest_evaluation.cost => RelinkTarget::Gbest,
                _ => RelinkTarget::Pbest,
            },
            RelinkTargetPolicy::Adaptive => self.target_probability.choose(&mut self.rng),
        };

        match (target, gbest) {
            (RelinkTarget::Gbest, Some(best)) => (RelinkTarget::Gbest, best.solution),
            _ => (RelinkTarget::Pbest, self.belief.pbest.clone()),
        }
    }
}

/// Runs a decision-selected strategy from an improving relink waypoint.
struct StrategyIntensifier<'s> {
    agent_id: usize,
    pool: &'s MetaheuristicPool,
    decision: &'s DecisionMethod,
    learning: &'s mut LearningHandle,
    rng: &'s mut ChaCha8Rng,
    runs: &'s mut usize,
}

impl Intensifier for StrategyIntensifier<'_> {
    fn intensify(
        &mut self,
        waypoint: &RouteSolution,
        evaluator: &Evaluator,
    ) -> Result<RouteSolution> {
        let decision = self.decision;
        let rng = &mut *self.rng;
        let strategy = self
            .learning
            .with_records(|learning| decision.select(learning.records_mut(), rng))?;

        let before = evaluator.evaluate(waypoint)?;
        let seed = self.rng.gen();
        let candidate = self.pool.apply(strategy, waypoint, evaluator, seed)?;
        let after = evaluator.evaluate(&candidate)?;

        self.learning
            .update(strategy, before.cost, after.cost, after.feasible);
        *self.runs += 1;

        debug!(
            "agent {}: intensification with {} {:.2} -> {:.2}",
            self.agent_id,
            self.pool.name(strategy).unwrap_or("?"),
            before.cost,
            after.cost
        );

        Ok(candidate)
    }
}
