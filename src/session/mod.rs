//! Closed-loop learning session
//!
//! Drives the select / partition / perform / update cycle until the learner
//! meets every target threshold or the session gets stuck. Each cycle solves
//! a fresh batch against the learner's current mastery, partitions it into
//! sprints, executes only the first sprint, and feeds the performance scores
//! back into the model, so later cycles re-plan around what actually
//! happened rather than what was predicted.

use ahash::{AHashMap, AHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{Activity, CourseCatalog};
use crate::core::config::PlannerConfig;
use crate::core::error::{PathError, Result};
use crate::core::types::{ActivityId, LessonId};
use crate::graph::PrerequisiteGraph;
use crate::learner::{ActivityPerformance, LearnerModel, SprintLog};
use crate::planner::PathModelBuilder;
use crate::solver::native::NativeSolver;
use crate::sprint::SprintBuilder;

/// Supplies a performance score in [0, 1] for each performed activity
pub trait PerformanceSource {
    fn performance(&mut self, activity: &Activity) -> f64;
}

/// Stand-in learner for simulation and testing: uniform scores in
/// [0.5, 1.0) from a seeded generator
#[derive(Debug)]
pub struct SimulatedLearner {
    rng: ChaCha8Rng,
}

impl SimulatedLearner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PerformanceSource for SimulatedLearner {
    fn performance(&mut self, _activity: &Activity) -> f64 {
        self.rng.gen_range(0.5..1.0)
    }
}

/// Why a session stopped short of meeting its targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StuckReason {
    /// The batch model is infeasible and these targets remain unmet
    MissingPrerequisites(Vec<LessonId>),
    /// The solver reported a fault; faults are never retried
    SolverFault(String),
    /// The solver exhausted its budget twice (the retry doubles it)
    SolverTimeout,
    ClusteringFailed(String),
    /// The defensive cycle cap fired before the targets were met
    CycleBudgetExhausted,
}

/// Terminal state of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Done,
    Stuck(StuckReason),
}

/// Result of one selection step
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Continue(Vec<ActivityId>),
    Done,
    Stuck(StuckReason),
}

/// Everything a caller needs after the loop stops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Full sprint history, preserved even when the session gets stuck
    pub sprint_history: Vec<SprintLog>,
}

/// One learner's closed planning loop over a validated catalog
pub struct LearningSession<'a, P: PerformanceSource> {
    catalog: &'a CourseCatalog,
    graph: PrerequisiteGraph,
    learner: LearnerModel,
    config: PlannerConfig,
    source: P,
    solver: NativeSolver,
    report: Option<SessionReport>,
}

impl<'a, P: PerformanceSource> LearningSession<'a, P> {
    /// Set up a session; fails on a cyclic prerequisite graph
    pub fn new(
        catalog: &'a CourseCatalog,
        targets: AHashSet<LessonId>,
        initial_mastery: AHashMap<LessonId, u32>,
        config: PlannerConfig,
        source: P,
    ) -> Result<Self> {
        let graph = PrerequisiteGraph::build(catalog.lessons())?;
        Ok(Self {
            catalog,
            graph,
            learner: LearnerModel::with_initial_mastery(targets, initial_mastery),
            config,
            source,
            solver: NativeSolver::new(),
            report: None,
        })
    }

    pub fn learner(&self) -> &LearnerModel {
        &self.learner
    }

    /// Run the loop to a terminal state. Idempotent: once terminal, the
    /// stored report is returned without further solving.
    pub fn run(&mut self) -> &SessionReport {
        if self.report.is_none() {
            let outcome = self.drive();
            info!(outcome = ?outcome, cycles = self.learner.sprint_history().len(), "session finished");
            self.report = Some(SessionReport {
                outcome,
                sprint_history: self.learner.sprint_history().to_vec(),
            });
        }
        match self.report.as_ref() {
            Some(report) => report,
            None => unreachable!("report populated above"),
        }
    }

    fn drive(&mut self) -> SessionOutcome {
        let catalog = self.catalog;
        for cycle in 0..self.config.max_cycles {
            let selected = match self.select() {
                SelectionOutcome::Done => return SessionOutcome::Done,
                SelectionOutcome::Stuck(reason) => return SessionOutcome::Stuck(reason),
                SelectionOutcome::Continue(ids) => ids,
            };

            let refs: Vec<&Activity> = selected
                .iter()
                .filter_map(|id| catalog.activity(id))
                .collect();
            let builder = SprintBuilder::new(catalog, &self.graph, &self.config);
            let first = match builder.build(&refs) {
                Ok(sprints) => match sprints.into_iter().next() {
                    Some(sprint) => sprint,
                    None => return SessionOutcome::Done,
                },
                Err(e) => return SessionOutcome::Stuck(StuckReason::ClusteringFailed(e.to_string())),
            };

            info!(
                cycle,
                sprint = self.learner.next_sprint_id(),
                size = first.len(),
                "performing sprint"
            );
            let mut performances = Vec::with_capacity(first.len());
            for id in &first.activities {
                if let Some(activity) = catalog.activity(id) {
                    let score = self.source.performance(activity).clamp(0.0, 1.0);
                    performances.push(ActivityPerformance {
                        activity_id: id.clone(),
                        performance: score,
                    });
                }
            }
            self.learner.record_sprint(&performances, catalog);
        }
        SessionOutcome::Stuck(StuckReason::CycleBudgetExhausted)
    }

    /// One selection step, with the classified solver failures folded into
    /// the outcome
    fn select(&self) -> SelectionOutcome {
        match self.solve_once(&self.config) {
            Err(PathError::SolverTimeout { budget }) => {
                let mut retry = self.config.clone();
                retry.solver_time_budget = budget * 2;
                info!(budget = ?retry.solver_time_budget, "solver timed out, retrying with doubled budget");
                self.classify(self.solve_once(&retry))
            }
            other => self.classify(other),
        }
    }

    fn classify(&self, solved: Result<Vec<ActivityId>>) -> SelectionOutcome {
        match solved {
            Ok(ids) if ids.is_empty() => SelectionOutcome::Done,
            Ok(ids) => SelectionOutcome::Continue(ids),
            Err(PathError::NoFeasiblePath { unmet_targets }) => {
                if unmet_targets.is_empty() {
                    SelectionOutcome::Done
                } else {
                    SelectionOutcome::Stuck(StuckReason::MissingPrerequisites(unmet_targets))
                }
            }
            Err(PathError::SolverTimeout { .. }) => {
                SelectionOutcome::Stuck(StuckReason::SolverTimeout)
            }
            Err(e) => SelectionOutcome::Stuck(StuckReason::SolverFault(e.to_string())),
        }
    }

    fn solve_once(&self, config: &PlannerConfig) -> Result<Vec<ActivityId>> {
        PathModelBuilder::new(self.catalog, &self.graph).select_batch(
            &self.learner,
            config,
            &self.solver,
        )
    }
}
