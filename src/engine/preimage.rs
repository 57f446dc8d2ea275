use crate::TocsinError;
use crate::fml::{self, ConjFml, to_conj_fml, to_dnf};
use crate::solver;
use crate::sys;
use std::collections::HashSet;
use tracing::trace;
use z3::ast::{Ast, Bool, Int};

/// Symbolic backward image of `cube` through `trans` in the context of
/// `frame`: a list of cubes whose disjunction is
/// `∃V'. frame ∧ trans ∧ cube'`, where `cube'` is `cube` with every
/// variable primed and `V'` collects the primed variables of both `cube'`
/// and `trans`.
///
/// `trans` stays a raw boolean expression; handing it to the solver in CNF
/// makes quantifier elimination blow up. Only the frame, which is
/// conjunctive by construction, is passed conjunctively.
///
/// An empty result means the cube has no predecessor in the frame. A single
/// empty cube means the whole frame reaches the cube; that is not an error,
/// the caller schedules obligations accordingly.
pub fn preimage(frame: &ConjFml, cube: &ConjFml, trans: &Bool) -> Result<Vec<ConjFml>, TocsinError> {
    let primed_cube = cube.as_primed();

    let mut names = HashSet::new();
    let mut bound: Vec<Int> = Vec::new();
    for var in cube.primed_vars() {
        if names.insert(var.decl().name()) {
            bound.push(var);
        }
    }
    for var in fml::int_vars(trans) {
        let name = var.decl().name();
        if sys::is_next_name(&name) && names.insert(name) {
            bound.push(var);
        }
    }

    let body = Bool::and(&[frame.as_expr(), trans.clone(), primed_cube.as_expr()]);
    let mut cubes = Vec::new();
    for subgoal in solver::qe(&bound, &body)? {
        for flat in to_dnf(&subgoal)? {
            let tightened = solver::propagate_bounds(&flat.as_expr())?;
            if tightened.simplify().as_bool() == Some(false) {
                continue;
            }
            let mut pre = to_conj_fml(&tightened)?;
            if pre.is_trivially_false() {
                continue;
            }
            pre.update_vars();
            cubes.push(pre);
        }
    }
    trace!(count = cubes.len(), "preimage computed");
    Ok(cubes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Outcome;
    use z3::ast::Int;

    fn assert_equiv(a: &Bool, b: &Bool) {
        assert!(
            solver::check(&[&a.iff(b).not()]).is_unsat(),
            "{a} is not equivalent to {b}"
        );
    }

    #[test]
    fn preimage_of_a_step_relation() {
        let x = Int::new_const("x");
        let xp = Int::new_const("_p_x");
        let trans = xp._eq(&(&x + &Int::from_i64(1)));
        let frame = ConjFml::from_clauses([x.ge(&Int::from_i64(0)), x.le(&Int::from_i64(10))]);
        let cube = ConjFml::from_clauses([x._eq(&Int::from_i64(5))]);

        let pre = preimage(&frame, &cube, &trans).unwrap();
        let parts: Vec<Bool> = pre.iter().map(|c| c.as_expr()).collect();
        assert_equiv(&Bool::or(&parts), &x._eq(&Int::from_i64(4)));
    }

    #[test]
    fn disjunctive_transitions_yield_one_cube_per_branch() {
        let x = Int::new_const("x");
        let y = Int::new_const("y");
        let xp = Int::new_const("_p_x");
        let yp = Int::new_const("_p_y");
        let trans = Bool::or(&[
            Bool::and(&[xp._eq(&(&x + &Int::from_i64(2))), x.lt(&Int::from_i64(8))]),
            Bool::and(&[yp._eq(&(&y - &Int::from_i64(2))), y.gt(&Int::from_i64(0))]),
            Bool::and(&[x._eq(&Int::from_i64(8)), xp._eq(&Int::from_i64(0))]),
            Bool::and(&[y._eq(&Int::from_i64(0)), yp._eq(&Int::from_i64(8))]),
        ]);
        let frame = ConjFml::from_clauses([
            x.ge(&Int::from_i64(0)),
            x.le(&Int::from_i64(20)),
            y.ge(&Int::from_i64(0)),
            y.le(&Int::from_i64(20)),
        ]);
        let cube = ConjFml::from_clauses([x._eq(&Int::from_i64(4)), y._eq(&Int::from_i64(4))]);

        let pre = preimage(&frame, &cube, &trans).unwrap();
        let parts: Vec<Bool> = pre.iter().map(|c| c.as_expr()).collect();

        // the stepping branches contribute x=2 and y=6 respectively; the
        // wrap-around branches cannot reach (4, 4)
        let expected = Bool::or(&[
            Bool::and(&[
                x._eq(&Int::from_i64(2)),
                y.ge(&Int::from_i64(0)),
                y.le(&Int::from_i64(20)),
            ]),
            Bool::and(&[
                y._eq(&Int::from_i64(6)),
                x.ge(&Int::from_i64(0)),
                x.le(&Int::from_i64(20)),
            ]),
        ]);
        assert_equiv(&Bool::or(&parts), &expected);
        assert!(matches!(solver::check(&[&Bool::or(&parts)]), Outcome::Sat(_)));
    }

    #[test]
    fn unreachable_cube_has_empty_preimage() {
        let x = Int::new_const("x");
        let xp = Int::new_const("_p_x");
        let trans = xp._eq(&(&x + &Int::from_i64(1)));
        let frame = ConjFml::from_clauses([x._eq(&Int::from_i64(0))]);
        let cube = ConjFml::from_clauses([x._eq(&Int::from_i64(7))]);
        assert!(preimage(&frame, &cube, &trans).unwrap().is_empty());
    }
}
