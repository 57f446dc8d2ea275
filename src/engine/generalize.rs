use crate::TocsinError;
use crate::fml::{ConjFml, to_nnf};
use crate::solver;
use itertools::Itertools;
use tracing::trace;
use z3::ast::Bool;

/// Result of a generalization attempt: an enlarged cube, or the discovery
/// that the cube cannot be separated from the initial states. The latter
/// refutes the property; strengthening with `¬I` instead would be unsound.
#[derive(Debug)]
pub(crate) enum Generalized {
    Cube(ConjFml),
    TouchesInit,
}

/// Minimum literal-subset of `cube` that is still inductive relative to
/// `frame` and disjoint from `init`. Blocking `¬g` for the smaller `g`
/// strengthens the trace more than blocking the cube itself.
///
/// Precondition: `frame ∧ trans ∧ ¬cube ∧ cube'` is unsatisfiable, i.e. the
/// cube is relatively inductive. Candidates are enumerated in increasing
/// cardinality; satisfiability of a subset's query implies satisfiability
/// for all of its supersets, so a bisecting search would also meet the
/// contract.
pub(crate) fn generalize_unsat(
    init: &ConjFml,
    frame: &ConjFml,
    trans: &Bool,
    cube: &ConjFml,
) -> Result<Generalized, TocsinError> {
    let frame_expr = frame.as_expr();
    let init_expr = init.as_expr();
    for literals in cube.clauses().iter().powerset().skip(1) {
        if literals.len() == cube.len() {
            break;
        }
        let mut candidate = ConjFml::new();
        candidate.add(literals.into_iter().cloned());
        candidate.update_vars();
        if !relatively_inductive(&frame_expr, trans, &candidate)? {
            continue;
        }
        if !disjoint(&init_expr, &candidate) {
            continue;
        }
        trace!(from = cube.len(), to = candidate.len(), "cube generalized");
        return Ok(Generalized::Cube(candidate));
    }
    // no proper subset works; fall back to the cube itself
    if !disjoint(&init_expr, cube) {
        return Ok(Generalized::TouchesInit);
    }
    Ok(Generalized::Cube(cube.clone()))
}

/// Analogue for a satisfiable disjunction: the minimum sub-cube of `cube`
/// (one disjunct of `disj`) that still implies the disjunction and stays
/// disjoint from `init`.
pub(crate) fn generalize_sat(
    init: &ConjFml,
    disj: &[ConjFml],
    cube: &ConjFml,
) -> Result<Generalized, TocsinError> {
    let init_expr = init.as_expr();
    let parts: Vec<Bool> = disj.iter().map(|c| c.as_expr()).collect();
    let not_disj = Bool::or(&parts).not();
    for literals in cube.clauses().iter().powerset().skip(1) {
        if literals.len() == cube.len() {
            break;
        }
        let mut candidate = ConjFml::new();
        candidate.add(literals.into_iter().cloned());
        candidate.update_vars();
        // candidate ⇒ disj iff candidate ∧ ¬disj is unsat
        if !solver::check(&[&candidate.as_expr(), &not_disj]).is_unsat() {
            continue;
        }
        if !disjoint(&init_expr, &candidate) {
            continue;
        }
        trace!(from = cube.len(), to = candidate.len(), "bad cube widened");
        return Ok(Generalized::Cube(candidate));
    }
    if !disjoint(&init_expr, cube) {
        return Ok(Generalized::TouchesInit);
    }
    Ok(Generalized::Cube(cube.clone()))
}

fn relatively_inductive(
    frame: &Bool,
    trans: &Bool,
    candidate: &ConjFml,
) -> Result<bool, TocsinError> {
    let not_candidate = to_nnf(&candidate.as_expr().not())?;
    let primed = candidate.as_primed().as_expr();
    // an undecided query reads as sat, keeping undecidable candidates out
    Ok(solver::check(&[frame, &not_candidate, trans, &primed]).is_unsat())
}

fn disjoint(init: &Bool, candidate: &ConjFml) -> bool {
    solver::check(&[init, &candidate.as_expr()]).is_unsat()
}
