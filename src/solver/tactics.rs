use z3::Tactic;

/// Splits subgoals until each one is a conjunction of atomic constraints:
/// `Repeat(OrElse(split-clause, skip))`.
///
/// Applying a tactic to a goal yields subgoals whose disjunction is
/// equivalent to the goal; `split-clause` fails on a goal with nothing left
/// to split, hence the `skip` alternative.
pub(crate) fn split_all() -> Tactic {
    Tactic::repeat(
        &Tactic::new("split-clause").or_else(&Tactic::new("skip")),
        u32::MAX,
    )
}

/// Quantifier elimination followed by clause splitting. The `qe` tactic
/// preserves equivalence (not merely equisatisfiability), so the disjunction
/// of the resulting subgoals equals the quantified input.
pub(crate) fn qe_split() -> Tactic {
    Tactic::new("qe").and_then(&split_all())
}

pub(crate) fn tseitin() -> Tactic {
    Tactic::new("tseitin-cnf")
}

/// Iterated inequality and value propagation, used to tighten the cubes
/// coming back from quantifier elimination.
pub(crate) fn bounds() -> Tactic {
    let step = Tactic::new("propagate-ineqs").and_then(&Tactic::new("propagate-values"));
    Tactic::repeat(&step, u32::MAX).and_then(&Tactic::new("simplify"))
}
