//! Path model builder: one facade over the two scheduling formulations.
//!
//! Batch-selection picks a subset of the remaining activities that carries
//! every in-scope lesson past its mastery threshold in a single planning
//! horizon. Timestep-sequencing lays activities out over an explicit discrete
//! schedule. Both share the prerequisite graph and the tight
//! variable-bounding logic, and both classify solver verdicts into the same
//! error taxonomy.

pub mod batch;
pub mod experiment;
pub mod timestep;

use crate::catalog::CourseCatalog;
use crate::core::config::PlannerConfig;
use crate::core::error::{PathError, Result};
use crate::core::types::ActivityId;
use crate::graph::PrerequisiteGraph;
use crate::learner::LearnerModel;
use crate::solver::{IntValueHint, SatSolver, SolveStatus, SolverParams, ValueHint};

pub use timestep::TimestepPlan;

/// What the batch objective minimizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Total minutes of selected activities
    Duration,
    /// Number of selected activities
    Count,
}

/// Which lessons the batch threshold constraint covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdScope {
    /// Every lesson in the catalog must reach its threshold in one solve
    EntireCurriculum,
    /// Only the learner's targets and their transitive prerequisites
    TargetClosure,
}

/// Branching preferences passed to the solver, validated at construction
/// time rather than dispatched by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionHints {
    /// First value tried for selection variables, in deepest-lesson order
    pub selection: ValueHint,
    /// Optional value direction for mastery variables, in topological order
    pub mastery: Option<IntValueHint>,
}

/// Facade over both formulations for one (catalog, graph) pair
pub struct PathModelBuilder<'a> {
    catalog: &'a CourseCatalog,
    graph: &'a PrerequisiteGraph,
}

impl<'a> PathModelBuilder<'a> {
    pub fn new(catalog: &'a CourseCatalog, graph: &'a PrerequisiteGraph) -> Self {
        Self { catalog, graph }
    }

    /// Batch-selection mode: solve for the activity subset that satisfies
    /// every in-scope mastery threshold, minimizing the configured objective.
    ///
    /// Returns the selected activity ids, or the classified failure:
    /// `NoFeasiblePath` (infeasible, with the unmet targets),
    /// `SolverTimeout` (unknown verdict within budget), or `SolverFailure`
    /// (backend fault).
    pub fn select_batch(
        &self,
        learner: &LearnerModel,
        config: &PlannerConfig,
        solver: &dyn SatSolver,
    ) -> Result<Vec<ActivityId>> {
        let instance = batch::build(self.catalog, self.graph, learner, config);
        let params = SolverParams {
            max_time: config.solver_time_budget,
            seed: config.solver_seed,
        };

        tracing::debug!(
            candidates = instance.selection.len(),
            constraints = instance.model.num_constraints(),
            solver = solver.name(),
            "solving batch selection"
        );
        let outcome = solver
            .solve(&instance.model, &params)
            .map_err(|e| PathError::SolverFailure(e.to_string()))?;
        tracing::debug!(
            status = ?outcome.status,
            objective = ?outcome.objective,
            nodes = outcome.stats.nodes,
            "batch solve finished"
        );

        match outcome.status {
            SolveStatus::Optimal | SolveStatus::Feasible => {
                let assignment = outcome.assignment.ok_or_else(|| {
                    PathError::SolverFailure("solution reported without assignment".into())
                })?;
                Ok(instance
                    .selection
                    .iter()
                    .filter(|(_, var)| assignment.bool_value(*var))
                    .map(|(id, _)| id.clone())
                    .collect())
            }
            SolveStatus::Infeasible => Err(PathError::NoFeasiblePath {
                unmet_targets: learner.unmet_targets(self.catalog),
            }),
            SolveStatus::Unknown => Err(PathError::SolverTimeout {
                budget: config.solver_time_budget,
            }),
        }
    }

    /// Timestep-sequencing mode: schedule at most one activity per step over
    /// a fixed horizon, minimizing the number of active steps.
    pub fn plan_timesteps(
        &self,
        horizon: usize,
        config: &PlannerConfig,
        solver: &dyn SatSolver,
    ) -> Result<TimestepPlan> {
        timestep::plan(self.catalog, horizon, config, solver)
    }
}
