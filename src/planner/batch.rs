//! Batch-selection formulation.
//!
//! One boolean per candidate activity, one bounded mastery integer per
//! lesson. The mastery upper bound is the current value plus everything the
//! candidate pool could contribute, a tighter bound than a fixed 100.

use ahash::AHashSet;

use crate::catalog::CourseCatalog;
use crate::core::config::PlannerConfig;
use crate::core::types::{ActivityId, LessonId};
use crate::graph::PrerequisiteGraph;
use crate::learner::LearnerModel;
use crate::planner::{Objective, ThresholdScope};
use crate::solver::{BoolVar, CmpOp, CpModel, LinExpr, ValueHint};

/// A built batch instance, ready to hand to a solver
pub(crate) struct BatchInstance {
    pub(crate) model: CpModel,
    /// Candidate activity ids paired with their selection variables
    pub(crate) selection: Vec<(ActivityId, BoolVar)>,
}

/// Lessons whose threshold constraint applies under the configured scope
fn threshold_lessons(
    catalog: &CourseCatalog,
    graph: &PrerequisiteGraph,
    learner: &LearnerModel,
    scope: ThresholdScope,
) -> AHashSet<LessonId> {
    match scope {
        ThresholdScope::EntireCurriculum => catalog.lessons().keys().cloned().collect(),
        ThresholdScope::TargetClosure => {
            let mut closure = AHashSet::new();
            for target in &learner.target_lessons {
                closure.insert(target.clone());
                closure.extend(graph.ancestors(target));
            }
            closure
        }
    }
}

pub(crate) fn build(
    catalog: &CourseCatalog,
    graph: &PrerequisiteGraph,
    learner: &LearnerModel,
    config: &PlannerConfig,
) -> BatchInstance {
    let mut model = CpModel::new();
    let completed = learner.completed_activity_ids();
    let candidates: Vec<_> = catalog
        .activities()
        .iter()
        .filter(|a| !completed.contains(&a.id))
        .collect();

    let selection: Vec<(ActivityId, BoolVar)> = candidates
        .iter()
        .map(|a| (a.id.clone(), model.new_bool(format!("x_{}", a.id))))
        .collect();

    // Mastery variables with tight upper bounds
    let lesson_ids = catalog.sorted_lesson_ids();
    let mastery: Vec<_> = lesson_ids
        .iter()
        .map(|lesson_id| {
            let current = learner.mastery(lesson_id) as i64;
            let potential: i64 = candidates
                .iter()
                .map(|a| a.effectiveness.get(lesson_id).copied().unwrap_or(0) as i64)
                .sum();
            let var = model.new_int(current, current + potential, format!("mastery_{lesson_id}"));
            (lesson_id.clone(), var)
        })
        .collect();
    let mastery_of = |lesson_id: &LessonId| {
        mastery
            .iter()
            .find(|(id, _)| id == lesson_id)
            .map(|(_, var)| *var)
            .expect("mastery variable exists for every lesson")
    };

    // 1. Accumulation: mastery = current + sum(effectiveness * selected)
    for (lesson_id, var) in &mastery {
        let mut expr = LinExpr::new().plus_int(1, *var);
        for (activity, (_, selected)) in candidates.iter().zip(&selection) {
            if let Some(&effectiveness) = activity.effectiveness.get(lesson_id) {
                expr = expr.plus_bool(-(effectiveness as i64), *selected);
            }
        }
        model.add(expr, CmpOp::Eq, learner.mastery(lesson_id) as i64);
    }

    // 2. Threshold for every in-scope lesson
    let in_scope = threshold_lessons(catalog, graph, learner, config.threshold_scope);
    for (lesson_id, var) in &mastery {
        if !in_scope.contains(lesson_id) {
            continue;
        }
        let min_mastery = catalog.lesson(lesson_id).map(|l| l.min_mastery).unwrap_or(0);
        model.add(LinExpr::new().plus_int(1, *var), CmpOp::Ge, min_mastery as i64);
    }

    // 3. Prerequisite gating: selecting an activity requires every ancestor
    // of every covered lesson to sit at threshold in the same solution
    for (activity, (_, selected)) in candidates.iter().zip(&selection) {
        let mut gated: AHashSet<LessonId> = AHashSet::new();
        for lesson_id in activity.effectiveness.keys() {
            gated.extend(graph.ancestors(lesson_id));
        }
        for ancestor in gated {
            let min_mastery = catalog
                .lesson(&ancestor)
                .map(|l| l.min_mastery)
                .unwrap_or(0);
            let constraint = model.add(
                LinExpr::new().plus_int(1, mastery_of(&ancestor)),
                CmpOp::Ge,
                min_mastery as i64,
            );
            model.only_enforce_if(constraint, selected.lit());
        }
    }

    // Objective
    let objective = match config.objective {
        Objective::Duration => candidates.iter().zip(&selection).fold(
            LinExpr::new(),
            |expr, (activity, (_, selected))| {
                expr.plus_bool(activity.duration as i64, *selected)
            },
        ),
        Objective::Count => LinExpr::sum_bools(selection.iter().map(|(_, var)| *var)),
    };
    model.minimize(objective);

    // Optional branching preference: activities by the topological rank of
    // their deepest covered lesson, mastery variables in topological order
    if let Some(hints) = &config.decision_hints {
        let mut ranked: Vec<(usize, BoolVar)> = candidates
            .iter()
            .zip(&selection)
            .map(|(activity, (_, selected))| {
                let depth = activity
                    .effectiveness
                    .keys()
                    .filter_map(|l| graph.rank(l))
                    .max()
                    .unwrap_or(0);
                (depth, *selected)
            })
            .collect();
        ranked.sort_by_key(|(depth, _)| *depth);
        for (_, var) in ranked {
            model.add_decision_hint(var, hints.selection);
        }
        if let Some(mastery_hint) = hints.mastery {
            for lesson_id in graph.topo_order() {
                model.add_int_hint(mastery_of(lesson_id), mastery_hint);
            }
        }
    } else {
        // Selection variables still get a deterministic default direction
        for (_, var) in &selection {
            model.add_decision_hint(*var, ValueHint::PreferZero);
        }
    }

    BatchInstance { model, selection }
}
