mod tactics;

use crate::TocsinError;
use tracing::warn;
use z3::ast::{Ast, Bool, Int, exists_const};
use z3::{Goal, Model, SatResult, Solver};

/// Answer from the decision procedure. `Unknown` is surfaced so callers can
/// apply the conservative reading the engine requires: an undecided blocking
/// or inductiveness query counts as satisfiable.
#[derive(Debug)]
pub enum Outcome {
    Sat(Model),
    Unsat,
    Unknown,
}

impl Outcome {
    pub fn is_unsat(&self) -> bool {
        matches!(self, Outcome::Unsat)
    }

    /// The conservative reading: everything that is not provably unsat.
    pub fn sat_or_unknown(&self) -> bool {
        !self.is_unsat()
    }
}

/// Decide the conjunction of `parts` over quantifier-free LIA.
pub fn check(parts: &[&Bool]) -> Outcome {
    let solver = Solver::new();
    for part in parts {
        solver.assert(*part);
    }
    match solver.check() {
        SatResult::Sat => match solver.get_model() {
            Some(model) => Outcome::Sat(model),
            None => {
                warn!("sat answer came back without a model");
                Outcome::Unknown
            }
        },
        SatResult::Unsat => Outcome::Unsat,
        SatResult::Unknown => {
            warn!(parts = parts.len(), "solver could not decide a query");
            Outcome::Unknown
        }
    }
}

/// Eliminate `bound` from `∃ bound. body`. The disjunction of the returned
/// subgoals is logically equivalent to the input; each subgoal is a
/// conjunction with no clause left unsplit.
pub fn qe(bound: &[Int], body: &Bool) -> Result<Vec<Bool>, TocsinError> {
    let bounds: Vec<&dyn Ast> = bound.iter().map(|v| v as &dyn Ast).collect();
    let goal = Goal::new(false, false, false);
    goal.assert(&exists_const(&bounds, &[], body));
    let applied = tactics::qe_split()
        .apply(&goal, None)
        .map_err(|_| TocsinError::Tactic("qe".to_string()))?;
    Ok(applied
        .list_subgoals()
        .map(|subgoal| conjoin(&subgoal.get_formulas()))
        .collect())
}

/// CNF clauses of `fml` via `tseitin-cnf`. Callers hand in only negations of
/// single clauses or cubes and conjunctions of clauses, shapes for which the
/// conversion needs no auxiliary variables and yields one subgoal.
pub(crate) fn tseitin(fml: &Bool) -> Result<Vec<Bool>, TocsinError> {
    let goal = Goal::new(false, false, false);
    goal.assert(fml);
    let applied = tactics::tseitin()
        .apply(&goal, None)
        .map_err(|_| TocsinError::Tactic("tseitin-cnf".to_string()))?;
    let subgoals: Vec<Goal> = applied.list_subgoals().collect();
    match subgoals.len() {
        // a trivially true goal may come back with no subgoal at all
        0 => Ok(Vec::new()),
        1 => Ok(subgoals[0].get_formulas()),
        n => Err(TocsinError::CnfSplit(n)),
    }
}

/// Iterated inequality and value propagation; normalizes a cube's bounds.
pub fn propagate_bounds(fml: &Bool) -> Result<Bool, TocsinError> {
    let goal = Goal::new(false, false, false);
    goal.assert(fml);
    let applied = tactics::bounds()
        .apply(&goal, None)
        .map_err(|_| TocsinError::Tactic("propagate-bounds".to_string()))?;
    let subgoals: Vec<Goal> = applied.list_subgoals().collect();
    match subgoals.len() {
        0 => Ok(Bool::from_bool(true)),
        1 => Ok(conjoin(&subgoals[0].get_formulas())),
        _ => Err(TocsinError::Tactic("propagate-bounds".to_string())),
    }
}

/// Canonical form of a literal: z3's arithmetic rewriter leaves only `=`,
/// `≤` and single negations of them.
pub fn canonical(fml: &Bool) -> Bool {
    fml.simplify()
}

fn conjoin(parts: &[Bool]) -> Bool {
    match parts.len() {
        0 => Bool::from_bool(true),
        1 => parts[0].clone(),
        _ => Bool::and(parts),
    }
}
