mod generalize;
mod obligation;
mod preimage;

pub use obligation::{Obligation, ObligationQueue};
pub use preimage::preimage;

use crate::TocsinError;
use crate::fml::{ConjFml, to_conj_fml, to_dnf, to_nnf};
use crate::solver::{self, Outcome};
use crate::sys::TransitionSystem;
use generalize::Generalized;
use tracing::{Level, debug, span, trace, warn};
use z3::ast::Bool;
use z3::{SatResult, Solver};

/// Verdict of a PDR run.
#[derive(Debug)]
pub enum PdrOutcome {
    /// Every state reachable from the initial states satisfies the
    /// property. The invariant is inductive and implies the property.
    Proved { invariant: ConjFml },
    /// A chain of proof obligations reached level 0: the witness cube
    /// contains initial states from which the property is violated within
    /// finitely many transitions.
    Refuted { witness: ConjFml },
    /// The trace outgrew the configured depth limit before converging.
    Inconclusive { depth: usize },
}

/// Decide whether `sys.prop()` holds in every state reachable from
/// `sys.init()` under `sys.trans()`.
pub fn pdr(sys: &TransitionSystem) -> Result<PdrOutcome, TocsinError> {
    Pdr::new(sys)?.run()
}

/**
The IC3/PDR engine: a trace of frames `[F_0, F_1, …, F_n, F_{n+1}]` where
each `F_k` over-approximates the states reachable in at most `k` steps,
refined through a min-priority queue of proof obligations.

The engine maintains, after every outer iteration:
1. `F_0 ≡ I`;
2. `F_k ⇒ F_{k+1}` by clause subset (higher frames hold fewer clauses);
3. `F_k ⇒ P` for all `k ≤ n`;
4. `F_k ∧ T ⇒ F_{k+1}'` for all `k < n`.

`propagate` pushes clauses forward along the trace and reports success when
two adjacent frames coincide: that frame is closed under the transition
relation and implies the property, i.e. it is an inductive invariant.

The engine is single-threaded and synchronous; every solver call blocks.
Frames and the obligation queue are owned by the engine instance, and the
input system is immutable throughout the run.
*/
pub struct Pdr<'a> {
    sys: &'a TransitionSystem,
    frames: Vec<ConjFml>,
    queue: ObligationQueue,
    init: ConjFml,
    depth_limit: Option<usize>,
}

impl<'a> Pdr<'a> {
    pub fn new(sys: &'a TransitionSystem) -> Result<Self, TocsinError> {
        let mut init = to_conj_fml(sys.init())?;
        init.update_vars();
        let mut first = to_conj_fml(sys.prop())?;
        first.update_vars();
        Ok(Self {
            sys,
            frames: vec![init.clone(), first],
            queue: ObligationQueue::new(),
            init,
            depth_limit: None,
        })
    }

    /// Give up with [`PdrOutcome::Inconclusive`] once the trace grows past
    /// `limit` frames. PDR over unbounded integers need not terminate.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = Some(limit);
        self
    }

    pub fn run(&mut self) -> Result<PdrOutcome, TocsinError> {
        let not_prop = to_nnf(&self.sys.prop().not())?;

        // the property must hold in the initial states themselves
        if solver::check(&[self.sys.init(), &not_prop]).sat_or_unknown() {
            let bad = to_dnf(&Bool::and(&[self.sys.init().clone(), not_prop.clone()]))?;
            let witness = bad.into_iter().next().unwrap_or_else(|| self.init.clone());
            debug!(%witness, "property violated in the initial states");
            return Ok(PdrOutcome::Refuted { witness });
        }

        let mut n = 1;
        loop {
            if let Some(limit) = self.depth_limit {
                if n > limit {
                    debug!(depth = n, "depth limit reached");
                    return Ok(PdrOutcome::Inconclusive { depth: n });
                }
            }
            let outer = span!(Level::DEBUG, "frontier", n);
            let _enter = outer.enter();

            let outcome = solver::check(&[&self.frames[n].as_expr(), &not_prop]);
            if outcome.is_unsat() {
                debug!("frontier satisfies the property; propagating");
                if let Some(invariant) = self.propagate(n)? {
                    return Ok(PdrOutcome::Proved { invariant });
                }
                n += 1;
                continue;
            }

            let target = if self.frames[n].is_empty() {
                not_prop.clone()
            } else {
                Bool::and(&[self.frames[n].as_expr(), not_prop.clone()])
            };
            let bad_cubes = to_dnf(&target)?;
            if bad_cubes.is_empty() {
                // a genuinely sat frontier query must yield bad cubes
                assert!(
                    matches!(outcome, Outcome::Unknown),
                    "sat frontier query produced no bad cubes"
                );
                warn!("undecided frontier query had no bad cubes; propagating");
                if let Some(invariant) = self.propagate(n)? {
                    return Ok(PdrOutcome::Proved { invariant });
                }
                n += 1;
                continue;
            }

            debug!(count = bad_cubes.len(), "bad cubes at the frontier");
            for bad in &bad_cubes {
                let mut cube = bad.clone();
                cube.update_vars();
                let cube = match generalize::generalize_sat(&self.init, &bad_cubes, &cube)? {
                    Generalized::Cube(cube) => cube,
                    Generalized::TouchesInit => {
                        return Ok(PdrOutcome::Refuted { witness: cube });
                    }
                };
                if let Some(witness) = self.block(cube, n)? {
                    return Ok(PdrOutcome::Refuted { witness });
                }
            }
        }
    }

    /// Drain the obligation queue, starting from `(level, cube)`, until
    /// every scheduled cube is blocked at its level. Returns the witness
    /// cube if an obligation reaches level 0.
    fn block(&mut self, cube: ConjFml, level: usize) -> Result<Option<ConjFml>, TocsinError> {
        self.queue.push(level, cube);

        while let Some(Obligation { level, cube }) = self.queue.pop() {
            let inner = span!(Level::TRACE, "obligation", level, size = cube.len());
            let _enter = inner.enter();
            trace!(pending = self.queue.len(), %cube, "popped obligation");

            if level == 0 {
                debug!(%cube, "obligation reached level 0");
                return Ok(Some(cube));
            }
            if solver::check(&[&self.frames[level].as_expr(), &cube.as_expr()]).is_unsat() {
                trace!("cube already blocked at this level");
                continue;
            }

            let not_cube = to_nnf(&cube.as_expr().not())?;
            let primed_cube = cube.as_primed().as_expr();
            let prior = self.frames[level - 1].as_expr();
            let outcome =
                solver::check(&[&prior, &not_cube, self.sys.trans(), &primed_cube]);
            if outcome.sat_or_unknown() {
                // a predecessor exists below; block it first, then revisit
                let predecessors =
                    preimage::preimage(&self.frames[level - 1], &cube, self.sys.trans())?;
                trace!(count = predecessors.len(), "predecessors found");
                if predecessors.is_empty() {
                    continue;
                }
                for predecessor in predecessors {
                    self.queue.push(level - 1, predecessor);
                }
                self.queue.push(level, cube);
            } else {
                let generalized = match generalize::generalize_unsat(
                    &self.init,
                    &self.frames[level - 1],
                    self.sys.trans(),
                    &cube,
                )? {
                    Generalized::Cube(generalized) => generalized,
                    Generalized::TouchesInit => return Ok(Some(cube)),
                };
                debug!(%cube, %generalized, "blocking generalized cube");
                let blocking = solver::canonical(&to_nnf(&generalized.as_expr().not())?);
                // presence is downward-closed across the trace, so the
                // clause only ever needs appending to a suffix of [1, level]
                for k in 1..=level {
                    if self.frames[k].contains(&blocking) {
                        continue;
                    }
                    self.frames[k].add([blocking.clone()]);
                }
            }
        }
        Ok(None)
    }

    /// Extend the trace with a fresh frontier, push forward every clause
    /// that stays inductive one frame up, prune subsumed clauses, and
    /// detect the fixpoint `F_k == F_{k+1}`.
    fn propagate(&mut self, n: usize) -> Result<Option<ConjFml>, TocsinError> {
        if self.frames.len() <= n + 1 {
            self.frames.push(ConjFml::new());
        }
        debug!(frames = self.frames.len(), "propagating along the trace");

        for k in 1..n {
            // frame solver: the assertion stack holds the frame and the
            // transition, plus exactly one pushed context per query
            let solver = Solver::new();
            solver.assert(&self.frames[k].as_expr());
            solver.assert(self.sys.trans());
            solver.push();

            let mut pushed: Vec<Bool> = Vec::new();
            let candidates = self.frames[k].difference(&self.frames[k + 1]);
            for clause in candidates.clauses() {
                let primed = self.frames[k].get_primed(clause);
                solver.pop(1);
                solver.push();
                solver.assert(&primed.not());
                match solver.check() {
                    SatResult::Unsat => pushed.push(clause.clone()),
                    SatResult::Sat => {}
                    SatResult::Unknown => {
                        warn!(k, "undecided propagation query; clause stays behind");
                    }
                }
            }

            if !pushed.is_empty() {
                trace!(k, count = pushed.len(), "clauses pushed forward");
                self.frames[k + 1].add(pushed.iter().cloned());
                self.subsume(k + 1, &pushed)?;
            }
            self.frames[k + 1] = self.frames[k + 1].simplified()?;
            self.frames[k + 1].update_vars();

            if self.frames[k] == self.frames[k + 1] {
                debug!(k, "fixpoint: adjacent frames coincide");
                return Ok(Some(self.frames[k].clone()));
            }
        }
        Ok(None)
    }

    /// Remove from frame `idx` every clause implied by one of the newly
    /// pushed clauses. The subsumer implies whatever it displaces, so the
    /// frame keeps implying the property; asserted in debug builds.
    fn subsume(&mut self, idx: usize, new_clauses: &[Bool]) -> Result<(), TocsinError> {
        let mut doomed = ConjFml::new();
        for new_clause in new_clauses {
            for weak in self.frames[idx].clauses() {
                // two equivalent pushed clauses must not subsume each other
                if new_clauses.contains(weak) {
                    continue;
                }
                // new ⇒ weak is valid iff new ∧ ¬weak is unsat
                let not_weak = to_nnf(&weak.not())?;
                if solver::check(&[new_clause, &not_weak]).is_unsat() {
                    doomed.add([weak.clone()]);
                }
            }
        }
        if doomed.is_empty() {
            return Ok(());
        }
        let pruned = self.frames[idx].difference(&doomed);
        if cfg!(debug_assertions) {
            let not_prop = to_nnf(&self.sys.prop().not())?;
            assert!(
                solver::check(&[&pruned.as_expr(), &not_prop]).is_unsat(),
                "subsumption broke the property invariant of frame {idx}"
            );
        }
        trace!(idx, removed = doomed.len(), "clauses subsumed");
        self.frames[idx] = pruned;
        Ok(())
    }

    /// The current trace; exposed for inspection and tests.
    pub fn frames(&self) -> &[ConjFml] {
        &self.frames
    }
}
