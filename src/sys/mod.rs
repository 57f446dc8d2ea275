use crate::TocsinError;
use crate::fml;
use z3::ast::{Ast, Bool, Int};

/// Name prefix marking the next-state image of a state variable. Reserved:
/// user-declared names carrying it are rejected.
pub const NEXT_PREFIX: &str = "_p_";

/// A state variable paired with its next-state image.
///
/// The pairing is total and bijective: the image of `v` is the integer
/// constant named `_p_<v>`, and substitution between the two worlds is a
/// table lookup over these pairs rather than string surgery at use sites.
#[derive(Debug, Clone)]
pub struct StateVar {
    name: String,
    current: Int,
    next: Int,
}

impl StateVar {
    fn new(name: &str) -> Result<Self, TocsinError> {
        if name.starts_with(NEXT_PREFIX) {
            return Err(TocsinError::ReservedVariableName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            current: Int::new_const(name),
            next: Int::new_const(format!("{NEXT_PREFIX}{name}")),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> &Int {
        &self.current
    }

    pub fn next(&self) -> &Int {
        &self.next
    }
}

/// The declared state alphabet, in declaration order.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    vars: Vec<StateVar>,
}

impl Vocabulary {
    pub fn new<'a, I>(names: I) -> Result<Self, TocsinError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vars: Vec<StateVar> = Vec::new();
        for name in names {
            if vars.iter().any(|v| v.name == name) {
                continue;
            }
            vars.push(StateVar::new(name)?);
        }
        if vars.is_empty() {
            return Err(TocsinError::EmptyAlphabet);
        }
        Ok(Self { vars })
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateVar> {
        self.vars.iter()
    }

    pub fn get(&self, name: &str) -> Option<&StateVar> {
        self.vars.iter().find(|v| v.name == name)
    }
}

/// True iff `name` denotes a next-state constant.
pub fn is_next_name(name: &str) -> bool {
    name.starts_with(NEXT_PREFIX)
}

/// The next-state image of an unprimed integer constant.
pub(crate) fn prime(var: &Int) -> Int {
    Int::new_const(format!("{NEXT_PREFIX}{}", var.decl().name()))
}

/// Inverse of [`prime`]. Identity on constants without the prefix.
pub(crate) fn unprime(var: &Int) -> Int {
    let name = var.decl().name();
    Int::new_const(name.strip_prefix(NEXT_PREFIX).unwrap_or(&name).to_string())
}

/// An immutable `(I, T, P)` triple over a declared alphabet.
///
/// `init` and `prop` range over current-state variables only; `trans` may
/// additionally mention the next-state image of any declared variable. The
/// constructor enforces both, so downstream code never revalidates.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    vocab: Vocabulary,
    init: Bool,
    trans: Bool,
    prop: Bool,
}

impl TransitionSystem {
    pub fn new(
        vocab: Vocabulary,
        init: Bool,
        trans: Bool,
        prop: Bool,
    ) -> Result<Self, TocsinError> {
        for fml in [&init, &prop] {
            for var in fml::int_vars(fml) {
                let name = var.decl().name();
                if is_next_name(&name) {
                    return Err(TocsinError::StrayNextState(name));
                }
            }
        }
        for var in fml::int_vars(&trans) {
            let name = var.decl().name();
            if let Some(base) = name.strip_prefix(NEXT_PREFIX) {
                if vocab.get(base).is_none() {
                    return Err(TocsinError::StrayNextState(name));
                }
            }
        }
        Ok(Self {
            vocab,
            init,
            trans,
            prop,
        })
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn init(&self) -> &Bool {
        &self.init
    }

    pub fn trans(&self) -> &Bool {
        &self.trans
    }

    pub fn prop(&self) -> &Bool {
        &self.prop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_rejected() {
        let err = Vocabulary::new(["x", "_p_y"]);
        assert!(matches!(err, Err(TocsinError::ReservedVariableName(_))));
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        assert!(matches!(
            Vocabulary::new([]),
            Err(TocsinError::EmptyAlphabet)
        ));
    }

    #[test]
    fn duplicate_names_collapse() {
        let vocab = Vocabulary::new(["x", "y", "x"]).unwrap();
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn next_state_images_pair_up() {
        let vocab = Vocabulary::new(["x"]).unwrap();
        let x = vocab.get("x").unwrap();
        assert_eq!(x.next().decl().name(), "_p_x");
        assert_eq!(prime(x.current()), *x.next());
        assert_eq!(unprime(x.next()), *x.current());
    }

    #[test]
    fn primed_variables_in_init_are_rejected() {
        let vocab = Vocabulary::new(["x"]).unwrap();
        let x = Int::new_const("x");
        let xp = Int::new_const("_p_x");
        let init = xp._eq(&Int::from_i64(0));
        let trans = xp._eq(&(&x + &Int::from_i64(1)));
        let prop = x.ge(&Int::from_i64(0));
        let sys = TransitionSystem::new(vocab, init, trans, prop);
        assert!(matches!(sys, Err(TocsinError::StrayNextState(_))));
    }

    #[test]
    fn undeclared_next_state_in_trans_is_rejected() {
        let vocab = Vocabulary::new(["x"]).unwrap();
        let x = Int::new_const("x");
        let yp = Int::new_const("_p_y");
        let init = x._eq(&Int::from_i64(0));
        let trans = yp._eq(&(&x + &Int::from_i64(1)));
        let prop = x.ge(&Int::from_i64(0));
        let sys = TransitionSystem::new(vocab, init, trans, prop);
        assert!(matches!(sys, Err(TocsinError::StrayNextState(_))));
    }
}
