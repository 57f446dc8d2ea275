use crate::TocsinError;
use crate::fml::{self, to_conj_fml};
use crate::sys;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use z3::ast::{Ast, Bool, Int};

/// A conjunction of CNF clauses with current/next-state variable tracking.
///
/// Frames, properties and cubes are all `ConjFml`s; a cube is simply one
/// whose every clause is a literal. The store is set-backed: clauses are
/// held in insertion order for deterministic variable collection and
/// display, duplicates are never stored, and a hash index gives O(1)
/// membership and genuine deletion.
///
/// Invariants:
/// - every clause is in strict CNF form (no boolean connective nested below
///   the outermost disjunction or a negation over an atom);
/// - every clause is canonically simplified, so syntactic equality of
///   clauses is z3 ast identity;
/// - when `varlist_fresh` holds, `unprimed` lists the clause variables in
///   first-seen order and `primed[i]` is the next-state image of
///   `unprimed[i]`.
///
/// Clauses only enter through [`ConjFml::add`], which canonicalizes them.
#[derive(Debug, Clone)]
pub struct ConjFml {
    clauses: Vec<Bool>,
    index: HashSet<Bool>,
    unprimed: Vec<Int>,
    primed: Vec<Int>,
    varlist_fresh: bool,
}

impl ConjFml {
    /// The empty conjunction, i.e. logical true.
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            index: HashSet::new(),
            unprimed: Vec::new(),
            primed: Vec::new(),
            varlist_fresh: true,
        }
    }

    pub fn from_clauses<I>(clauses: I) -> Self
    where
        I: IntoIterator<Item = Bool>,
    {
        let mut out = Self::new();
        out.add(clauses);
        out.update_vars();
        out
    }

    /// Append clauses, simplifying each into canonical atomic form. The
    /// variable lists go stale; callers that need them fresh immediately
    /// use [`ConjFml::add_update`] instead.
    pub fn add<I>(&mut self, clauses: I)
    where
        I: IntoIterator<Item = Bool>,
    {
        for clause in clauses {
            let clause = clause.simplify();
            // the empty conjunction already encodes true
            if clause.as_bool() == Some(true) {
                continue;
            }
            if self.index.insert(clause.clone()) {
                self.clauses.push(clause);
            }
        }
        self.varlist_fresh = false;
    }

    pub fn add_update<I>(&mut self, clauses: I)
    where
        I: IntoIterator<Item = Bool>,
    {
        self.add(clauses);
        self.update_vars();
    }

    /// Recollect the variable lists from the clauses: first-seen order,
    /// de-duplicated, next-state images derived pairwise.
    pub fn update_vars(&mut self) {
        let vars = self.collected_vars();
        self.primed = vars.iter().map(sys::prime).collect();
        self.unprimed = vars;
        self.varlist_fresh = true;
    }

    fn collected_vars(&self) -> Vec<Int> {
        let mut seen = HashSet::new();
        let mut vars = Vec::new();
        for clause in &self.clauses {
            for var in fml::int_vars(clause) {
                if seen.insert(var.decl().name()) {
                    vars.push(var);
                }
            }
        }
        vars
    }

    fn current_vars(&self) -> Vec<Int> {
        if self.varlist_fresh {
            self.unprimed.clone()
        } else {
            self.collected_vars()
        }
    }

    /// Current-state variables. Only meaningful when the lists are fresh.
    pub fn unprimed(&self) -> &[Int] {
        &self.unprimed
    }

    /// Next-state images of [`ConjFml::unprimed`], index-aligned.
    pub fn primed(&self) -> &[Int] {
        &self.primed
    }

    pub fn varlist_fresh(&self) -> bool {
        self.varlist_fresh
    }

    /// Next-state images of the formula's variables, recollected if stale.
    pub fn primed_vars(&self) -> Vec<Int> {
        self.current_vars().iter().map(sys::prime).collect()
    }

    /// The whole formula with every variable replaced by its next-state
    /// image. Must not be called on a formula that already contains
    /// next-state variables; the caller upholds this.
    pub fn as_primed(&self) -> ConjFml {
        let current = self.current_vars();
        let next: Vec<Int> = current.iter().map(sys::prime).collect();
        let pairs: Vec<(&Int, &Int)> = current.iter().zip(next.iter()).collect();
        let mut out = ConjFml::new();
        out.add(self.clauses.iter().map(|c| c.substitute(&pairs)));
        out
    }

    /// Inverse of [`ConjFml::as_primed`]: every next-state variable is
    /// replaced by its current-state original.
    pub fn as_unprimed(&self) -> ConjFml {
        let next: Vec<Int> = self
            .collected_vars()
            .into_iter()
            .filter(|v| sys::is_next_name(&v.decl().name()))
            .collect();
        let current: Vec<Int> = next.iter().map(sys::unprime).collect();
        let pairs: Vec<(&Int, &Int)> = next.iter().zip(current.iter()).collect();
        let mut out = ConjFml::new();
        out.add(self.clauses.iter().map(|c| c.substitute(&pairs)));
        out
    }

    /// One clause of `self` with its variables replaced by their next-state
    /// images.
    pub fn get_primed(&self, clause: &Bool) -> Bool {
        let current = self.current_vars();
        let next: Vec<Int> = current.iter().map(sys::prime).collect();
        let pairs: Vec<(&Int, &Int)> = current.iter().zip(next.iter()).collect();
        clause.substitute(&pairs)
    }

    /// A new formula holding the clauses of `self` that do not occur in
    /// `other`, with fresh variable lists.
    pub fn difference(&self, other: &ConjFml) -> ConjFml {
        let mut out = ConjFml::new();
        out.add(
            self.clauses
                .iter()
                .filter(|c| !other.index.contains(*c))
                .cloned(),
        );
        out.update_vars();
        out
    }

    /// Drop every clause the predicate rejects.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Bool) -> bool,
    {
        let index = &mut self.index;
        self.clauses.retain(|clause| {
            let kept = keep(clause);
            if !kept {
                index.remove(clause);
            }
            kept
        });
        self.varlist_fresh = false;
    }

    /// Syntactic membership, up to canonical simplification of `clause`.
    pub fn contains(&self, clause: &Bool) -> bool {
        self.index.contains(&clause.simplify())
    }

    /// The conjunction of all clauses as one expression.
    pub fn as_expr(&self) -> Bool {
        match self.clauses.len() {
            0 => Bool::from_bool(true),
            1 => self.clauses[0].clone(),
            _ => Bool::and(&self.clauses),
        }
    }

    /// Re-canonicalize the whole conjunction: simplify it as one formula
    /// and split it back into strict CNF clauses.
    pub fn simplified(&self) -> Result<ConjFml, TocsinError> {
        to_conj_fml(&self.as_expr().simplify())
    }

    /// True iff some clause is the constant false.
    pub fn is_trivially_false(&self) -> bool {
        self.clauses.iter().any(|c| c.as_bool() == Some(false))
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// An immutable snapshot of the clauses; the single iteration protocol.
    pub fn clauses(&self) -> &[Bool] {
        &self.clauses
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bool> {
        self.clauses.iter()
    }
}

impl Default for ConjFml {
    fn default() -> Self {
        Self::new()
    }
}

/// Equal iff the clause sets coincide; order and variable caches are
/// irrelevant.
impl PartialEq for ConjFml {
    fn eq(&self, other: &Self) -> bool {
        self.clauses.len() == other.clauses.len() && self.index == other.index
    }
}

impl Eq for ConjFml {}

impl<'a> IntoIterator for &'a ConjFml {
    type Item = &'a Bool;
    type IntoIter = std::slice::Iter<'a, Bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}

impl Display for ConjFml {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.clauses.iter().join(", "))
    }
}
