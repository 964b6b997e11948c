//! Substitution environment: a chain of scopes mapping parameter
//! identities to the expressions that replace them.

use std::collections::HashMap;

use crate::ast::{Expr, Variable};
use crate::error::InliningError;

/// One scope of parameter substitutions.
///
/// A child scope sees every binding of its parents. Replacement
/// expressions are already rewritten when they are bound, so a lookup hit
/// is final and must not be visited again.
#[derive(Debug, Default)]
pub struct Env<'p> {
    parent: Option<&'p Env<'p>>,
    bindings: HashMap<Variable, Expr>,
}

impl Env<'static> {
    /// The empty top-level scope.
    pub fn root() -> Self {
        Env::default()
    }
}

impl<'p> Env<'p> {
    /// Open a child scope binding each `(parameter, replacement)` pair.
    ///
    /// Fails if a parameter is already bound in this chain or appears twice
    /// in `pairs`; such an inlining would substitute into its own body.
    pub fn extend<I>(&'p self, pairs: I) -> Result<Env<'p>, InliningError>
    where
        I: IntoIterator<Item = (Variable, Expr)>,
    {
        let mut bindings = HashMap::new();
        for (param, replacement) in pairs {
            if self.is_bound(&param) || bindings.contains_key(&param) {
                return Err(InliningError::RecursiveBinding {
                    parameter: param.name().to_string(),
                });
            }
            bindings.insert(param, replacement);
        }
        Ok(Env {
            parent: Some(self),
            bindings,
        })
    }

    pub fn lookup(&self, var: &Variable) -> Option<&Expr> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(replacement) = env.bindings.get(var) {
                return Some(replacement);
            }
            scope = env.parent;
        }
        None
    }

    pub fn is_bound(&self, var: &Variable) -> bool {
        self.lookup(var).is_some()
    }

    /// Number of scopes from this one up to the root, inclusive.
    pub fn depth(&self) -> usize {
        1 + self.parent.map_or(0, |p| p.depth())
    }

    /// Bindings visible from this scope.
    pub fn len(&self) -> usize {
        self.bindings.len() + self.parent.map_or(0, |p| p.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
