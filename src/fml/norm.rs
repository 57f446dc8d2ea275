use crate::TocsinError;
use crate::fml::ConjFml;
use crate::solver;
use z3::ast::{Ast, Bool};
use z3::{AstKind, DeclKind};

fn app_kind(fml: &Bool) -> Option<DeclKind> {
    (fml.kind() == AstKind::App).then(|| fml.decl().kind())
}

fn bool_children(fml: &Bool) -> Result<Vec<Bool>, TocsinError> {
    fml.children()
        .iter()
        .map(|c| {
            c.as_bool()
                .ok_or_else(|| TocsinError::UnexpectedFormulaShape(c.to_string()))
        })
        .collect()
}

fn only_child(fml: &Bool) -> Result<Bool, TocsinError> {
    bool_children(fml)?
        .into_iter()
        .next()
        .ok_or_else(|| TocsinError::UnexpectedFormulaShape(fml.to_string()))
}

/// True iff `fml` is an atomic LIA constraint or a boolean constant.
pub fn is_atomic(fml: &Bool) -> bool {
    matches!(
        app_kind(fml),
        Some(
            DeclKind::EQ
                | DeclKind::LE
                | DeclKind::LT
                | DeclKind::GE
                | DeclKind::GT
                | DeclKind::TRUE
                | DeclKind::FALSE
        )
    )
}

/// A leaf of the DNF distributor: an atom or a negated atom.
pub fn is_leaf(fml: &Bool) -> bool {
    if is_atomic(fml) {
        return true;
    }
    if app_kind(fml) == Some(DeclKind::NOT) {
        if let Some(child) = fml.children().first().and_then(|c| c.as_bool()) {
            return is_atomic(&child);
        }
    }
    false
}

/// Negation normal form: negations pushed to the atoms, double negation
/// eliminated, De Morgan applied to conjunctions and disjunctions. Atoms
/// come back canonically simplified.
pub fn to_nnf(fml: &Bool) -> Result<Bool, TocsinError> {
    if is_atomic(fml) {
        return Ok(solver::canonical(fml));
    }
    match app_kind(fml) {
        Some(DeclKind::NOT) => {
            let child = only_child(fml)?;
            if is_atomic(&child) {
                return Ok(solver::canonical(fml));
            }
            match app_kind(&child) {
                Some(DeclKind::NOT) => to_nnf(&only_child(&child)?),
                Some(DeclKind::AND) => {
                    let parts = bool_children(&child)?
                        .iter()
                        .map(|c| to_nnf(&c.not()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Bool::or(&parts))
                }
                Some(DeclKind::OR) => {
                    let parts = bool_children(&child)?
                        .iter()
                        .map(|c| to_nnf(&c.not()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Bool::and(&parts))
                }
                _ => Err(TocsinError::UnexpectedFormulaShape(child.to_string())),
            }
        }
        Some(DeclKind::AND) => {
            let parts = bool_children(fml)?
                .iter()
                .map(to_nnf)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Bool::and(&parts))
        }
        Some(DeclKind::OR) => {
            let parts = bool_children(fml)?
                .iter()
                .map(to_nnf)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Bool::or(&parts))
        }
        _ => Err(TocsinError::UnexpectedFormulaShape(fml.to_string())),
    }
}

/// Left-associate every conjunction and disjunction so each internal node
/// has exactly two children. Precondition of [`to_dnf`]'s distributor.
pub fn to_binary(fml: &Bool) -> Result<Bool, TocsinError> {
    let pair = match app_kind(fml) {
        Some(kind @ (DeclKind::AND | DeclKind::OR)) => kind,
        _ => return Ok(fml.clone()),
    };
    let mut parts = bool_children(fml)?.into_iter();
    let first = parts
        .next()
        .ok_or_else(|| TocsinError::UnexpectedFormulaShape(fml.to_string()))?;
    let mut acc = to_binary(&first)?;
    for part in parts {
        let part = to_binary(&part)?;
        acc = match pair {
            DeclKind::AND => Bool::and(&[acc, part]),
            _ => Bool::or(&[acc, part]),
        };
    }
    Ok(acc)
}

/// Disjunctive normal form of `fml` as a list of cubes. The bottom cube
/// (constant false) is filtered out, so the DNF of false is the empty list
/// and the DNF of true is a single empty cube.
pub fn to_dnf(fml: &Bool) -> Result<Vec<ConjFml>, TocsinError> {
    let binary = to_binary(&to_nnf(fml)?)?;
    let mut cubes = Vec::new();
    for cube in distribute(&binary)? {
        let cube = cube.simplify();
        if cube.as_bool() == Some(false) {
            continue;
        }
        cubes.push(to_conj_fml(&cube)?);
    }
    Ok(cubes)
}

/// Distribute conjunction over disjunction on a binary NNF tree:
/// `distr(a ∨ b, c) = distr(a, c) ∨ distr(b, c)` and symmetrically.
fn distribute(fml: &Bool) -> Result<Vec<Bool>, TocsinError> {
    match app_kind(fml) {
        Some(DeclKind::OR) => {
            let mut cubes = Vec::new();
            for child in bool_children(fml)? {
                cubes.extend(distribute(&child)?);
            }
            Ok(cubes)
        }
        Some(DeclKind::AND) => {
            let children = bool_children(fml)?;
            let mut cubes = vec![Bool::from_bool(true)];
            for child in &children {
                let parts = distribute(child)?;
                let mut next = Vec::with_capacity(cubes.len() * parts.len());
                for cube in &cubes {
                    for part in &parts {
                        next.push(Bool::and(&[cube.clone(), part.clone()]));
                    }
                }
                cubes = next;
            }
            Ok(cubes)
        }
        _ => Ok(vec![fml.clone()]),
    }
}

/// Wrap a literal, clause, cube or conjunction of clauses into a
/// [`ConjFml`] via Tseitin CNF. Restricted to shapes where the conversion
/// introduces no auxiliary variables and yields exactly one subgoal.
pub fn to_conj_fml(fml: &Bool) -> Result<ConjFml, TocsinError> {
    let clauses = solver::tseitin(fml)?;
    let mut out = ConjFml::new();
    out.add(clauses);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{self, Outcome};
    use z3::ast::Int;

    fn xy() -> (Int, Int) {
        (Int::new_const("x"), Int::new_const("y"))
    }

    fn assert_equiv(a: &Bool, b: &Bool) {
        let distinct = a.iff(b).not();
        assert!(
            matches!(solver::check(&[&distinct]), Outcome::Unsat),
            "{a} is not equivalent to {b}"
        );
    }

    /// No negation sits above a conjunction or disjunction.
    fn negations_pushed(fml: &Bool) -> bool {
        match app_kind(fml) {
            Some(DeclKind::NOT) => is_leaf(fml),
            Some(DeclKind::AND | DeclKind::OR) => fml
                .children()
                .iter()
                .filter_map(|c| c.as_bool())
                .all(|c| negations_pushed(&c)),
            _ => true,
        }
    }

    fn sample(x: &Int, y: &Int) -> Bool {
        Bool::and(&[
            x._eq(&Int::from_i64(1)),
            Bool::or(&[y.lt(&Int::from_i64(2)), x.le(y).not()])
                .not()
                .not(),
            Bool::and(&[x.ge(&Int::from_i64(0)), y._eq(x)]).not(),
        ])
    }

    #[test]
    fn nnf_is_idempotent_and_pushes_negations() {
        let (x, y) = xy();
        let fml = sample(&x, &y);
        let once = to_nnf(&fml).unwrap();
        let twice = to_nnf(&once).unwrap();
        assert_eq!(once, twice);
        assert!(negations_pushed(&once));
        assert_equiv(&fml, &once);
    }

    #[test]
    fn binary_is_idempotent_on_binary_input() {
        let (x, y) = xy();
        let fml = Bool::and(&[
            x._eq(&Int::from_i64(1)),
            y._eq(&Int::from_i64(2)),
            Bool::or(&[
                x.le(&y),
                y.le(&Int::from_i64(0)),
                x._eq(&Int::from_i64(3)),
            ]),
        ]);
        let binary = to_binary(&to_nnf(&fml).unwrap()).unwrap();
        assert_eq!(to_binary(&binary).unwrap(), binary);
        assert_equiv(&fml, &binary);
    }

    #[test]
    fn dnf_cubes_disjoin_to_the_input() {
        let (x, y) = xy();
        let fml = sample(&x, &y);
        let cubes = to_dnf(&fml).unwrap();
        assert!(!cubes.is_empty());
        let parts: Vec<Bool> = cubes.iter().map(|c| c.as_expr()).collect();
        assert_equiv(&fml, &Bool::or(&parts));
        for cube in &cubes {
            assert!(cube.iter().all(is_leaf));
        }
    }

    #[test]
    fn dnf_of_false_is_empty() {
        let (x, _) = xy();
        let fml = Bool::and(&[x._eq(&Int::from_i64(0)), Bool::from_bool(false)]);
        assert!(to_dnf(&Bool::from_bool(false)).unwrap().is_empty());
        assert!(to_dnf(&fml).unwrap().is_empty());
    }

    #[test]
    fn dnf_of_true_is_one_empty_cube() {
        let cubes = to_dnf(&Bool::from_bool(true)).unwrap();
        assert_eq!(cubes.len(), 1);
        assert!(cubes[0].is_empty());
    }

    #[test]
    fn conj_fml_of_a_cube_has_literal_clauses() {
        let (x, y) = xy();
        let cube = Bool::and(&[x._eq(&Int::from_i64(4)), y._eq(&Int::from_i64(4))]);
        let g = to_conj_fml(&cube).unwrap();
        assert_eq!(g.len(), 2);
        assert!(g.iter().all(is_leaf));
    }

    #[test]
    fn foreign_connectives_are_rejected() {
        let (x, y) = xy();
        let ite = Bool::new_const("b").ite(&x.le(&y), &x.ge(&y));
        assert!(matches!(
            to_nnf(&ite),
            Err(TocsinError::UnexpectedFormulaShape(_))
        ));
    }
}
