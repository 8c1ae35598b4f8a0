//! Native reference backend: exact DFS branch-and-bound.
//!
//! The backend compiles the model into affine expressions over the boolean
//! variables: every integer variable must be pinned down by an unconditional
//! defining equality (directly or through a chain, as in the timestep
//! mastery recurrence), which both planner formulations guarantee. Search
//! then branches only on non-derived booleans, with interval propagation
//! over the compiled constraints, objective-bound pruning, and a wall-clock
//! cutoff.
//!
//! This is an exact solver for the modest instances the engine is tested
//! and simulated against; larger deployments swap a production backend in
//! behind the `SatSolver` trait.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use crate::core::error::{PathError, Result};

use super::{
    Assignment, CmpOp, CpModel, Derivation, Lit, SatSolver, SolveOutcome, SolveStats, SolveStatus,
    SolverParams, Term, ValueHint,
};

/// Exact DFS branch-and-bound solver
#[derive(Debug, Default)]
pub struct NativeSolver;

impl NativeSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SatSolver for NativeSolver {
    fn solve(&self, model: &CpModel, params: &SolverParams) -> Result<SolveOutcome> {
        let compiled = Compiled::build(model)?;
        Ok(compiled.search(params))
    }

    fn name(&self) -> &str {
        "native-dfs"
    }
}

/// Affine expression over boolean variables: constant + sum(coef * bool)
#[derive(Debug, Clone, Default)]
struct Affine {
    constant: i64,
    coefs: Vec<(i64, usize)>,
}

impl Affine {
    fn push(&mut self, coef: i64, idx: usize) {
        if coef == 0 {
            return;
        }
        if let Some(entry) = self.coefs.iter_mut().find(|(_, i)| *i == idx) {
            entry.0 += coef;
        } else {
            self.coefs.push((coef, idx));
        }
        self.coefs.retain(|(c, _)| *c != 0);
    }

    fn add_scaled(&mut self, scale: i64, other: &Affine) {
        self.constant += scale * other.constant;
        for &(coef, idx) in &other.coefs {
            self.push(scale * coef, idx);
        }
    }

    /// Reachable [min, max] under the partial assignment
    fn bounds(&self, values: &[Option<bool>]) -> (i64, i64) {
        let mut min = self.constant;
        let mut max = self.constant;
        for &(coef, idx) in &self.coefs {
            match values[idx] {
                Some(true) => {
                    min += coef;
                    max += coef;
                }
                Some(false) => {}
                None => {
                    if coef > 0 {
                        max += coef;
                    } else {
                        min += coef;
                    }
                }
            }
        }
        (min, max)
    }

    fn exact(&self, values: &[Option<bool>]) -> i64 {
        self.coefs.iter().fold(self.constant, |acc, &(coef, idx)| {
            acc + if values[idx] == Some(true) { coef } else { 0 }
        })
    }
}

#[derive(Debug)]
struct CompiledConstraint {
    affine: Affine,
    op: CmpOp,
    rhs: i64,
    enforce: Option<Lit>,
    reify: Option<usize>,
}

impl CompiledConstraint {
    /// Truth of the constraint given the affine bounds, when decidable
    fn truth(&self, values: &[Option<bool>]) -> Option<bool> {
        let (min, max) = self.affine.bounds(values);
        match self.op {
            CmpOp::Ge => {
                if min >= self.rhs {
                    Some(true)
                } else if max < self.rhs {
                    Some(false)
                } else {
                    None
                }
            }
            CmpOp::Le => {
                if max <= self.rhs {
                    Some(true)
                } else if min > self.rhs {
                    Some(false)
                } else {
                    None
                }
            }
            CmpOp::Eq => {
                if min == self.rhs && max == self.rhs {
                    Some(true)
                } else if self.rhs < min || self.rhs > max {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }
}

struct Compiled {
    num_bools: usize,
    constraints: Vec<CompiledConstraint>,
    derivations: Vec<Derivation>,
    /// Affine form of each integer variable, in declaration order
    int_defs: Vec<Affine>,
    objective: Affine,
    /// Branching order over non-derived booleans
    order: Vec<usize>,
    /// Preferred first value per boolean, from model hints
    prefs: Vec<Option<ValueHint>>,
}

impl Compiled {
    fn build(model: &CpModel) -> Result<Self> {
        // Resolve every integer variable into an affine over booleans by
        // chasing unconditional defining equalities to a fixpoint.
        let mut int_defs: Vec<Option<Affine>> = vec![None; model.int_bounds.len()];
        let mut consumed = vec![false; model.constraints.len()];
        loop {
            let mut progressed = false;
            'constraints: for (ci, constraint) in model.constraints.iter().enumerate() {
                if consumed[ci]
                    || constraint.op != CmpOp::Eq
                    || constraint.enforce.is_some()
                    || constraint.reify.is_some()
                {
                    continue;
                }
                let mut unresolved: Option<(i64, usize)> = None;
                for &(coef, term) in &constraint.expr.terms {
                    if let Term::Int(var) = term {
                        if int_defs[var.0].is_none() {
                            if unresolved.is_some() {
                                continue 'constraints;
                            }
                            unresolved = Some((coef, var.0));
                        }
                    }
                }
                let Some((coef, target)) = unresolved else {
                    continue;
                };
                if coef.abs() != 1 {
                    continue;
                }
                // target = (rhs - rest) / coef, rest = everything else
                let mut rest = Affine {
                    constant: constraint.expr.constant,
                    coefs: Vec::new(),
                };
                for &(c, term) in &constraint.expr.terms {
                    match term {
                        Term::Bool(var) => rest.push(c, var.0),
                        Term::Int(var) if var.0 != target => {
                            let def = int_defs[var.0].clone().unwrap();
                            rest.add_scaled(c, &def);
                        }
                        Term::Int(_) => {}
                    }
                }
                let mut def = Affine {
                    constant: coef * (constraint.rhs - rest.constant),
                    coefs: Vec::new(),
                };
                for &(c, idx) in &rest.coefs {
                    def.push(-coef * c, idx);
                }
                int_defs[target] = Some(def);
                consumed[ci] = true;
                progressed = true;
            }
            if !progressed {
                break;
            }
        }

        let int_defs: Vec<Affine> = int_defs
            .into_iter()
            .enumerate()
            .map(|(i, def)| {
                def.ok_or_else(|| {
                    PathError::SolverFailure(format!(
                        "integer variable {} has no defining equality",
                        model.int_bounds[i].2
                    ))
                })
            })
            .collect::<Result<_>>()?;

        let substitute = |expr: &super::LinExpr| -> Affine {
            let mut affine = Affine {
                constant: expr.constant,
                coefs: Vec::new(),
            };
            for &(coef, term) in &expr.terms {
                match term {
                    Term::Bool(var) => affine.push(coef, var.0),
                    Term::Int(var) => affine.add_scaled(coef, &int_defs[var.0]),
                }
            }
            affine
        };

        let mut constraints = Vec::new();
        for (ci, constraint) in model.constraints.iter().enumerate() {
            if consumed[ci] {
                // Defining equalities hold by construction after substitution
                continue;
            }
            constraints.push(CompiledConstraint {
                affine: substitute(&constraint.expr),
                op: constraint.op,
                rhs: constraint.rhs,
                enforce: constraint.enforce,
                reify: constraint.reify.map(|v| v.0),
            });
        }
        // Declared integer bounds become regular interval constraints
        for (idx, &(lb, ub, _)) in model.int_bounds.iter().enumerate() {
            constraints.push(CompiledConstraint {
                affine: int_defs[idx].clone(),
                op: CmpOp::Ge,
                rhs: lb,
                enforce: None,
                reify: None,
            });
            constraints.push(CompiledConstraint {
                affine: int_defs[idx].clone(),
                op: CmpOp::Le,
                rhs: ub,
                enforce: None,
                reify: None,
            });
        }

        // Derived booleans are assigned by propagation, never branched on
        let mut derived = vec![false; model.num_bools];
        for derivation in &model.derivations {
            let target = match derivation {
                Derivation::And { target, .. } | Derivation::Or { target, .. } => *target,
            };
            derived[target.0] = true;
        }
        for constraint in &model.constraints {
            if let Some(var) = constraint.reify {
                derived[var.0] = true;
            }
        }

        let mut prefs: Vec<Option<ValueHint>> = vec![None; model.num_bools];
        let mut order = Vec::with_capacity(model.num_bools);
        let mut queued = vec![false; model.num_bools];
        for &(var, hint) in &model.hints {
            if derived[var.0] || queued[var.0] {
                continue;
            }
            prefs[var.0] = Some(hint);
            queued[var.0] = true;
            order.push(var.0);
        }
        for idx in 0..model.num_bools {
            if !derived[idx] && !queued[idx] {
                order.push(idx);
            }
        }

        let objective = model
            .objective
            .as_ref()
            .map(&substitute)
            .unwrap_or_default();

        Ok(Self {
            num_bools: model.num_bools,
            constraints,
            derivations: model.derivations.clone(),
            int_defs,
            objective,
            order,
            prefs,
        })
    }

    /// Bounds-consistency propagation to a fixpoint.
    ///
    /// Returns false on conflict. Assigns derived booleans (and/or targets,
    /// reified literals) as soon as their support determines them, and
    /// disables enforcement literals whose constraint has become impossible.
    fn propagate(&self, values: &mut [Option<bool>]) -> bool {
        loop {
            let mut changed = false;

            for derivation in &self.derivations {
                let (target, determined) = match derivation {
                    Derivation::And { target, operands } => {
                        let mut value = Some(true);
                        for op in operands {
                            match values[op.0] {
                                Some(false) => {
                                    value = Some(false);
                                    break;
                                }
                                Some(true) => {}
                                None => value = None,
                            }
                        }
                        (*target, value)
                    }
                    Derivation::Or { target, operands } => {
                        let mut value = Some(false);
                        for op in operands {
                            match values[op.0] {
                                Some(true) => {
                                    value = Some(true);
                                    break;
                                }
                                Some(false) => {}
                                None => value = None,
                            }
                        }
                        (*target, value)
                    }
                };
                if let Some(v) = determined {
                    match values[target.0] {
                        None => {
                            values[target.0] = Some(v);
                            changed = true;
                        }
                        Some(existing) if existing != v => return false,
                        Some(_) => {}
                    }
                }
            }

            for constraint in &self.constraints {
                if let Some(reified) = constraint.reify {
                    if let Some(truth) = constraint.truth(values) {
                        match values[reified] {
                            None => {
                                values[reified] = Some(truth);
                                changed = true;
                            }
                            Some(existing) if existing != truth => return false,
                            Some(_) => {}
                        }
                    }
                    continue;
                }

                let active = match constraint.enforce {
                    None => Some(true),
                    Some(lit) => values[lit.var.0].map(|v| v != lit.negated),
                };
                match active {
                    Some(true) => {
                        if constraint.truth(values) == Some(false) {
                            return false;
                        }
                    }
                    Some(false) => {}
                    None => {
                        // Impossible constraint forces its enforcement
                        // literal off
                        let Some(lit) = constraint.enforce else {
                            continue;
                        };
                        if constraint.truth(values) == Some(false) {
                            match values[lit.var.0] {
                                None => {
                                    values[lit.var.0] = Some(lit.negated);
                                    changed = true;
                                }
                                Some(v) if v != lit.negated => return false,
                                Some(_) => {}
                            }
                        }
                    }
                }
            }

            if !changed {
                return true;
            }
        }
    }

    fn search(&self, params: &SolverParams) -> SolveOutcome {
        let started = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut best: Option<(i64, Vec<bool>)> = None;
        let mut stats = SolveStats::default();
        let values = vec![None; self.num_bools];

        let complete = self.dfs(values, params, started, &mut rng, &mut best, &mut stats);
        stats.wall_time = started.elapsed();

        let (status, solution) = match (complete, best) {
            (true, Some(solution)) => (SolveStatus::Optimal, Some(solution)),
            (true, None) => (SolveStatus::Infeasible, None),
            (false, Some(solution)) => (SolveStatus::Feasible, Some(solution)),
            (false, None) => (SolveStatus::Unknown, None),
        };

        match solution {
            Some((objective, bools)) => {
                let fixed: Vec<Option<bool>> = bools.iter().map(|&b| Some(b)).collect();
                let ints = self.int_defs.iter().map(|def| def.exact(&fixed)).collect();
                SolveOutcome {
                    status,
                    assignment: Some(Assignment { bools, ints }),
                    objective: Some(objective),
                    stats,
                }
            }
            None => SolveOutcome {
                status,
                assignment: None,
                objective: None,
                stats,
            },
        }
    }

    /// Returns true if the subtree was searched exhaustively (no timeout)
    fn dfs(
        &self,
        mut values: Vec<Option<bool>>,
        params: &SolverParams,
        started: Instant,
        rng: &mut ChaCha8Rng,
        best: &mut Option<(i64, Vec<bool>)>,
        stats: &mut SolveStats,
    ) -> bool {
        stats.nodes += 1;
        if started.elapsed() > params.max_time {
            return false;
        }

        if !self.propagate(&mut values) {
            return true;
        }

        // Objective bound: prune when even the optimistic completion cannot
        // beat the incumbent
        if let Some((incumbent, _)) = best {
            let (lower, _) = self.objective.bounds(&values);
            if lower >= *incumbent {
                return true;
            }
        }

        let Some(&next) = self.order.iter().find(|&&idx| values[idx].is_none()) else {
            // All decisions fixed; propagation has assigned every derived
            // boolean and verified every constraint
            if values.iter().any(Option::is_none) {
                // A derived boolean without support constraints; the model
                // leaves it free, so default it off
                for value in values.iter_mut() {
                    value.get_or_insert(false);
                }
                if !self.propagate(&mut values) {
                    return true;
                }
            }
            let objective = self.objective.exact(&values);
            if best.as_ref().map_or(true, |(obj, _)| objective < *obj) {
                let bools = values.iter().map(|v| v.unwrap_or(false)).collect();
                *best = Some((objective, bools));
            }
            return true;
        };

        let first = match self.prefs[next] {
            Some(ValueHint::PreferOne) => true,
            Some(ValueHint::PreferZero) => false,
            None => rng.gen_bool(0.5),
        };

        for value in [first, !first] {
            let mut child = values.clone();
            child[next] = Some(value);
            if !self.dfs(child, params, started, rng, best, stats) {
                return false;
            }
        }
        true
    }
}
