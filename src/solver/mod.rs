//! Constraint model surface and solver interface.
//!
//! The planner formulates its selection problems as a `CpModel`: boolean and
//! bounded integer variables, linear (in)equality constraints that may be
//! conditionally enforced or reified to a literal, derived and/or/max boolean
//! equalities, and a single linear minimization objective. A `SatSolver`
//! backend consumes the model and reports one of four statuses plus, on
//! success, a full value assignment.
//!
//! The model vocabulary deliberately mirrors the CP-SAT surface the
//! formulations were designed against, so a production backend can be slotted
//! in behind the trait without touching the planner.

pub mod native;

use std::time::Duration;

use crate::core::error::Result;

pub use native::NativeSolver;

/// Boolean decision variable handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoolVar(pub(crate) usize);

/// Bounded integer variable handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntVar(pub(crate) usize);

/// A possibly-negated boolean variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lit {
    pub(crate) var: BoolVar,
    pub(crate) negated: bool,
}

impl BoolVar {
    pub fn lit(self) -> Lit {
        Lit {
            var: self,
            negated: false,
        }
    }

    pub fn negated(self) -> Lit {
        Lit {
            var: self,
            negated: true,
        }
    }
}

impl Lit {
    pub fn not(self) -> Lit {
        Lit {
            var: self.var,
            negated: !self.negated,
        }
    }
}

/// One term of a linear expression
#[derive(Debug, Clone, Copy)]
pub(crate) enum Term {
    Bool(BoolVar),
    Int(IntVar),
}

/// Linear expression over boolean and integer variables
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    pub(crate) terms: Vec<(i64, Term)>,
    pub(crate) constant: i64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plus_bool(mut self, coef: i64, var: BoolVar) -> Self {
        self.terms.push((coef, Term::Bool(var)));
        self
    }

    pub fn plus_int(mut self, coef: i64, var: IntVar) -> Self {
        self.terms.push((coef, Term::Int(var)));
        self
    }

    pub fn plus_const(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    /// Unweighted sum of boolean variables
    pub fn sum_bools(vars: impl IntoIterator<Item = BoolVar>) -> Self {
        let mut expr = Self::new();
        for var in vars {
            expr = expr.plus_bool(1, var);
        }
        expr
    }
}

/// Comparison operator of a linear constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Le,
    Ge,
}

/// Handle to a posted constraint, used to attach enforcement or reification
#[derive(Debug, Clone, Copy)]
pub struct ConstraintId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub(crate) expr: LinExpr,
    pub(crate) op: CmpOp,
    pub(crate) rhs: i64,
    /// Constraint only active when the literal is true
    pub(crate) enforce: Option<Lit>,
    /// Literal equivalent to the constraint's truth value
    pub(crate) reify: Option<BoolVar>,
}

/// Structural boolean definitions (targets are derived, never branched on)
#[derive(Debug, Clone)]
pub(crate) enum Derivation {
    /// target = AND(operands); AND of nothing is true
    And {
        target: BoolVar,
        operands: Vec<BoolVar>,
    },
    /// target = OR(operands), i.e. max over booleans
    Or {
        target: BoolVar,
        operands: Vec<BoolVar>,
    },
}

/// Preferred first value when branching on a hinted variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHint {
    PreferOne,
    PreferZero,
}

/// Preferred value direction for hinted integer variables
///
/// Advisory only: a backend that never branches on integers (the native one
/// derives them from their defining equalities) is free to ignore these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntValueHint {
    PreferLow,
    PreferHigh,
}

/// A constraint-satisfaction/optimization instance
#[derive(Debug, Default)]
pub struct CpModel {
    pub(crate) num_bools: usize,
    pub(crate) bool_names: Vec<String>,
    /// (lower bound, upper bound, name) per integer variable
    pub(crate) int_bounds: Vec<(i64, i64, String)>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) derivations: Vec<Derivation>,
    pub(crate) objective: Option<LinExpr>,
    /// Branching preference: vars listed first are decided first
    pub(crate) hints: Vec<(BoolVar, ValueHint)>,
    /// Advisory ordering/value preference for integer variables
    pub(crate) int_hints: Vec<(IntVar, IntValueHint)>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool(&mut self, name: impl Into<String>) -> BoolVar {
        let var = BoolVar(self.num_bools);
        self.num_bools += 1;
        self.bool_names.push(name.into());
        var
    }

    pub fn new_int(&mut self, lb: i64, ub: i64, name: impl Into<String>) -> IntVar {
        let var = IntVar(self.int_bounds.len());
        self.int_bounds.push((lb, ub, name.into()));
        var
    }

    /// Post `expr op rhs`
    pub fn add(&mut self, expr: LinExpr, op: CmpOp, rhs: i64) -> ConstraintId {
        let id = ConstraintId(self.constraints.len());
        self.constraints.push(Constraint {
            expr,
            op,
            rhs,
            enforce: None,
            reify: None,
        });
        id
    }

    /// Make a constraint conditional: only enforced when `lit` is true
    pub fn only_enforce_if(&mut self, id: ConstraintId, lit: Lit) {
        self.constraints[id.0].enforce = Some(lit);
    }

    /// Bind `var` to the truth value of the constraint (both directions)
    pub fn reify(&mut self, id: ConstraintId, var: BoolVar) {
        self.constraints[id.0].reify = Some(var);
    }

    /// target = max(operands) over booleans
    pub fn add_max_equality(&mut self, target: BoolVar, operands: &[BoolVar]) {
        self.derivations.push(Derivation::Or {
            target,
            operands: operands.to_vec(),
        });
    }

    /// target = AND(operands)
    pub fn add_and_equality(&mut self, target: BoolVar, operands: &[BoolVar]) {
        self.derivations.push(Derivation::And {
            target,
            operands: operands.to_vec(),
        });
    }

    /// Set the (single) linear minimization objective
    pub fn minimize(&mut self, expr: LinExpr) {
        self.objective = Some(expr);
    }

    /// Append a branching hint; hinted variables are decided first, in the
    /// order the hints were added
    pub fn add_decision_hint(&mut self, var: BoolVar, value: ValueHint) {
        self.hints.push((var, value));
    }

    /// Append an advisory integer hint; backends may ignore it
    pub fn add_int_hint(&mut self, var: IntVar, value: IntValueHint) {
        self.int_hints.push((var, value));
    }

    pub fn num_bool_vars(&self) -> usize {
        self.num_bools
    }

    pub fn num_int_vars(&self) -> usize {
        self.int_bounds.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

/// Solver verdicts, mirroring the usual CP status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Proved optimal
    Optimal,
    /// A solution was found but the search was cut short
    Feasible,
    /// Proved that no assignment satisfies the model
    Infeasible,
    /// Budget exhausted before any verdict
    Unknown,
}

/// Complete variable assignment extracted from a solution
#[derive(Debug, Clone)]
pub struct Assignment {
    pub(crate) bools: Vec<bool>,
    pub(crate) ints: Vec<i64>,
}

impl Assignment {
    pub fn bool_value(&self, var: BoolVar) -> bool {
        self.bools[var.0]
    }

    pub fn int_value(&self, var: IntVar) -> i64 {
        self.ints[var.0]
    }
}

/// Search statistics for diagnostics and experiment reports
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveStats {
    pub nodes: u64,
    pub wall_time: Duration,
}

/// Result of one solve call
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub assignment: Option<Assignment>,
    pub objective: Option<i64>,
    pub stats: SolveStats,
}

/// Solve-call parameters: wall-clock budget and reproducibility seed
#[derive(Debug, Clone, Copy)]
pub struct SolverParams {
    pub max_time: Duration,
    pub seed: u64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(600),
            seed: 42,
        }
    }
}

/// Backend interface: accepts a model, returns a classified outcome.
///
/// An `Err` return signals an internal backend fault (as opposed to a clean
/// `Infeasible`/`Unknown` verdict) and is treated as fatal by callers.
pub trait SatSolver {
    fn solve(&self, model: &CpModel, params: &SolverParams) -> Result<SolveOutcome>;

    fn name(&self) -> &str {
        "unknown"
    }
}
