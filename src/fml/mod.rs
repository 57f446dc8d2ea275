mod conj;
mod norm;

pub use conj::ConjFml;
pub use norm::{is_atomic, is_leaf, to_binary, to_conj_fml, to_dnf, to_nnf};

use std::collections::HashSet;
use z3::ast::{Ast, Bool, Dynamic, Int};
use z3::{AstKind, DeclKind};

/// Integer constants occurring in `fml`, in first-seen order, de-duplicated
/// by name.
pub(crate) fn int_vars(fml: &Bool) -> Vec<Int> {
    let mut seen = HashSet::new();
    let mut vars = Vec::new();
    walk(&Dynamic::from_ast(fml), &mut seen, &mut vars);
    vars
}

fn walk(ast: &Dynamic, seen: &mut HashSet<String>, vars: &mut Vec<Int>) {
    if ast.kind() != AstKind::App {
        return;
    }
    let children = ast.children();
    if children.is_empty() && ast.decl().kind() == DeclKind::UNINTERPRETED {
        if let Some(var) = ast.as_int() {
            if seen.insert(var.decl().name()) {
                vars.push(var);
            }
        }
        return;
    }
    for child in &children {
        walk(child, seen, vars);
    }
}
