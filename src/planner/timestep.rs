//! Timestep-sequencing formulation.
//!
//! An explicit discrete schedule over `T` steps: at most one activity per
//! step, usage front-loaded (no gaps), per-activity selection limits, a
//! mastery recurrence per lesson and step, minimum contact counts, and
//! one-step-back prerequisite gating. The objective minimizes the number of
//! active steps.

use crate::catalog::CourseCatalog;
use crate::core::config::PlannerConfig;
use crate::core::error::{PathError, Result};
use crate::core::types::ActivityId;
use crate::solver::{CmpOp, CpModel, LinExpr, SatSolver, SolveStatus, SolverParams};

/// A solved schedule: one optional activity per step
#[derive(Debug, Clone)]
pub struct TimestepPlan {
    /// `steps[t]` is the activity used at step t+1, if any
    pub steps: Vec<Option<ActivityId>>,
    /// Number of steps with an activity scheduled
    pub active_steps: usize,
}

pub(crate) fn plan(
    catalog: &CourseCatalog,
    horizon: usize,
    config: &PlannerConfig,
    solver: &dyn SatSolver,
) -> Result<TimestepPlan> {
    let mut model = CpModel::new();
    let activities = catalog.activities();
    let lesson_ids = catalog.sorted_lesson_ids();

    // used[a][t] for t in 1..=T, creation order keeps extraction simple
    let used: Vec<Vec<_>> = activities
        .iter()
        .map(|a| {
            (1..=horizon)
                .map(|t| model.new_bool(format!("used_{}_{t}", a.id)))
                .collect()
        })
        .collect();
    let active: Vec<_> = (1..=horizon)
        .map(|t| model.new_bool(format!("active_{t}")))
        .collect();

    // mastery[l][t] for t in 0..=T with tight upper bounds
    let mastery: Vec<Vec<_>> = lesson_ids
        .iter()
        .map(|lesson_id| {
            let potential: i64 = activities
                .iter()
                .map(|a| {
                    a.effectiveness.get(lesson_id).copied().unwrap_or(0) as i64
                        * a.max_selections as i64
                })
                .sum();
            (0..=horizon)
                .map(|t| model.new_int(0, potential, format!("mastery_{lesson_id}_{t}")))
                .collect()
        })
        .collect();

    // active[t] = max over used[a][t]
    for t in 0..horizon {
        let step_vars: Vec<_> = used.iter().map(|row| row[t]).collect();
        model.add_max_equality(active[t], &step_vars);
    }

    // At most one activity per step
    for t in 0..horizon {
        model.add(
            LinExpr::sum_bools(used.iter().map(|row| row[t])),
            CmpOp::Le,
            1,
        );
    }

    // Front-loading: steps cannot go idle and resume later
    for t in 0..horizon.saturating_sub(1) {
        let expr = used.iter().fold(LinExpr::new(), |expr, row| {
            expr.plus_bool(1, row[t]).plus_bool(-1, row[t + 1])
        });
        model.add(expr, CmpOp::Ge, 0);
    }

    // Per-activity selection limits
    for (activity, row) in activities.iter().zip(&used) {
        model.add(
            LinExpr::sum_bools(row.iter().copied()),
            CmpOp::Le,
            activity.max_selections as i64,
        );
    }

    // Mastery recurrence; step 0 starts at zero
    for (lesson_idx, lesson_id) in lesson_ids.iter().enumerate() {
        model.add(
            LinExpr::new().plus_int(1, mastery[lesson_idx][0]),
            CmpOp::Eq,
            0,
        );
        for t in 1..=horizon {
            let mut expr = LinExpr::new()
                .plus_int(1, mastery[lesson_idx][t])
                .plus_int(-1, mastery[lesson_idx][t - 1]);
            for (activity, row) in activities.iter().zip(&used) {
                if let Some(&effectiveness) = activity.effectiveness.get(lesson_id) {
                    expr = expr.plus_bool(-(effectiveness as i64), row[t - 1]);
                }
            }
            model.add(expr, CmpOp::Eq, 0);
        }
    }

    // Final mastery thresholds and minimum contact counts
    for (lesson_idx, lesson_id) in lesson_ids.iter().enumerate() {
        let lesson = catalog
            .lesson(lesson_id)
            .expect("sorted ids come from the catalog");
        model.add(
            LinExpr::new().plus_int(1, mastery[lesson_idx][horizon]),
            CmpOp::Ge,
            lesson.min_mastery as i64,
        );

        let touching: Vec<_> = activities
            .iter()
            .zip(&used)
            .filter(|(a, _)| a.effectiveness.contains_key(lesson_id))
            .flat_map(|(_, row)| row.iter().copied())
            .collect();
        model.add(
            LinExpr::sum_bools(touching),
            CmpOp::Ge,
            lesson.min_coverage as i64,
        );
    }

    // One-step-back prerequisite gating: an activity touching a lesson with
    // prerequisites may run at t only if every prerequisite already met its
    // threshold at t-1. Per-prerequisite satisfaction booleans are reified,
    // conjoined, and the conjunction's negation forces the usage off.
    for lesson_id in &lesson_ids {
        let lesson = catalog
            .lesson(lesson_id)
            .expect("sorted ids come from the catalog");
        if lesson.prerequisites.is_empty() {
            continue;
        }
        for t in 1..=horizon {
            let mut satisfied = Vec::new();
            for prereq in &lesson.prerequisites {
                let prereq_idx = lesson_ids
                    .iter()
                    .position(|id| id == prereq)
                    .expect("validated prerequisite");
                let threshold = catalog
                    .lesson(prereq)
                    .map(|l| l.min_mastery)
                    .unwrap_or(0) as i64;
                let flag = model.new_bool(format!("sat_{prereq}_before_{lesson_id}_{t}"));
                let constraint = model.add(
                    LinExpr::new().plus_int(1, mastery[prereq_idx][t - 1]),
                    CmpOp::Ge,
                    threshold,
                );
                model.reify(constraint, flag);
                satisfied.push(flag);
            }
            let all_satisfied = model.new_bool(format!("all_prereqs_{lesson_id}_{t}"));
            model.add_and_equality(all_satisfied, &satisfied);

            for (activity, row) in activities.iter().zip(&used) {
                if activity.effectiveness.get(lesson_id).copied().unwrap_or(0) > 0 {
                    let off = model.add(LinExpr::new().plus_bool(1, row[t - 1]), CmpOp::Le, 0);
                    model.only_enforce_if(off, all_satisfied.negated());
                }
            }
        }
    }

    // Fewest active steps
    model.minimize(LinExpr::sum_bools(active.iter().copied()));

    let params = SolverParams {
        max_time: config.solver_time_budget,
        seed: config.solver_seed,
    };
    tracing::debug!(
        horizon,
        bools = model.num_bool_vars(),
        constraints = model.num_constraints(),
        "solving timestep schedule"
    );
    let outcome = solver
        .solve(&model, &params)
        .map_err(|e| PathError::SolverFailure(e.to_string()))?;

    match outcome.status {
        SolveStatus::Optimal | SolveStatus::Feasible => {
            let assignment = outcome.assignment.ok_or_else(|| {
                PathError::SolverFailure("solution reported without assignment".into())
            })?;
            let mut steps = vec![None; horizon];
            for (activity, row) in activities.iter().zip(&used) {
                for (t, var) in row.iter().enumerate() {
                    if assignment.bool_value(*var) {
                        steps[t] = Some(activity.id.clone());
                    }
                }
            }
            let active_steps = steps.iter().filter(|s| s.is_some()).count();
            Ok(TimestepPlan {
                steps,
                active_steps,
            })
        }
        // The timestep instance starts from zero mastery, so every lesson is
        // still an open target when the horizon proves too tight
        SolveStatus::Infeasible => Err(PathError::NoFeasiblePath {
            unmet_targets: lesson_ids,
        }),
        SolveStatus::Unknown => Err(PathError::SolverTimeout {
            budget: config.solver_time_budget,
        }),
    }
}
