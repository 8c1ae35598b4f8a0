//! Planner configuration with documented tunables
//!
//! All knobs that shape a planning session are collected here with
//! explanations of their purpose and how they interact with each other.

use std::time::Duration;

use crate::planner::{DecisionHints, Objective, ThresholdScope};
use crate::sprint::cluster::DistanceMetric;
use crate::sprint::SprintOrdering;

/// Configuration for a planning session
///
/// The defaults reproduce the behavior of the reference deployment; changing
/// them alters pacing (sprint sizes, re-plan frequency) and solve cost.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    // === SELECTION MODEL ===
    /// What the batch-selection objective minimizes
    ///
    /// `Duration` produces the shortest total study time, `Count` the fewest
    /// activities. Both are admissible; duration is the default because
    /// activity lengths vary by 2-6x across difficulty tiers.
    pub objective: Objective,

    /// Which lessons the batch threshold constraint covers
    ///
    /// `EntireCurriculum` requires every lesson's minimum to be reachable in
    /// one solve (plan-the-rest-of-the-curriculum semantics).
    /// `TargetClosure` restricts the requirement to the target lessons and
    /// their transitive prerequisites, which keeps sessions with partial
    /// curricula feasible.
    pub threshold_scope: ThresholdScope,

    /// Optional branching preference handed to the solver
    ///
    /// Hints order selection variables by the topological rank of their
    /// deepest covered lesson. They never affect correctness, only search
    /// order.
    pub decision_hints: Option<DecisionHints>,

    // === SPRINT BUILDING ===
    /// Upper bound on the number of activities per sprint
    ///
    /// Small sprints give the loop more feedback points; large sprints
    /// amortize solver calls. 5 matches the pacing the curriculum designers
    /// planned around.
    pub max_sprint_size: usize,

    /// Whether oversized depth groups are split by coverage similarity
    ///
    /// When off, groups are chunked sequentially in input order instead.
    pub use_clustering: bool,

    /// Distance metric for similarity clustering
    ///
    /// `Jaccard` groups activities by overlapping lesson coverage and is the
    /// better fit for binary coverage vectors; `Euclidean` standardizes
    /// features first and runs k-means.
    pub cluster_metric: DistanceMetric,

    /// How finished sprints are ordered
    pub sprint_ordering: SprintOrdering,

    // === SOLVER ===
    /// Wall-clock budget for one solve call
    ///
    /// On timeout the session retries once with a doubled budget before
    /// giving up on the cycle.
    pub solver_time_budget: Duration,

    /// Seed for solver tie-breaking and simulated components
    ///
    /// Fixing the seed makes whole sessions reproducible.
    pub solver_seed: u64,

    // === LOOP ===
    /// Hard cap on planning cycles
    ///
    /// Bounds runtime during testing and simulation; a healthy session
    /// terminates well below this via `Done` or `Stuck`.
    pub max_cycles: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            objective: Objective::Duration,
            threshold_scope: ThresholdScope::EntireCurriculum,
            decision_hints: None,
            max_sprint_size: 5,
            use_clustering: true,
            cluster_metric: DistanceMetric::Jaccard,
            sprint_ordering: SprintOrdering::DepthGroup,
            solver_time_budget: Duration::from_secs(600),
            solver_seed: 42,
            max_cycles: 50,
        }
    }
}
