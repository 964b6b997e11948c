//! Expansion of invocations, captured trees and marker calls.
//!
//! The [`Inliner`] walks a tree and replaces every invocation of a lambda
//! by the lambda body with its parameters substituted, every read of a
//! captured expression-tree field by the tree itself, and every marker
//! call by its payload. The result is a single self-contained tree a
//! tree-only backend can translate.

mod capture;
pub mod env;
#[cfg(test)]
mod tests;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::ast::*;
use crate::config::RewriteOptions;
use crate::error::{Result, RewriteError};
use crate::walk::{walk_call, walk_member_access, DepthGuard, Walker};

pub use env::Env;

/// Counters collected during one rewrite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub invocations_inlined: usize,
    pub captures_resolved: usize,
    pub sentinels_unwrapped: usize,
}

impl RewriteStats {
    pub fn is_empty(&self) -> bool {
        *self == RewriteStats::default()
    }
}

/// A rewritten tree plus what it took to produce it.
#[derive(Clone, Debug)]
pub struct Rewritten {
    pub tree: Expr,
    pub stats: RewriteStats,
}

/// Walk state shared by an inliner and every nested inliner it spawns.
struct State {
    guard: DepthGuard,
    stats: RewriteStats,
}

/// Expand `expr` with default options.
pub fn rewrite(expr: &Expr) -> Result<Expr> {
    rewrite_with(expr, &RewriteOptions::default()).map(|r| r.tree)
}

/// Stack reserved per level of `max_depth` on the rewrite thread.
const STACK_PER_LEVEL: usize = 16 * 1024;
const STACK_BASE: usize = 1024 * 1024;
const STACK_MAX: usize = 1024 * 1024 * 1024;

fn stack_size(options: &RewriteOptions) -> usize {
    (options.max_depth as usize)
        .saturating_mul(STACK_PER_LEVEL)
        .saturating_add(STACK_BASE)
        .min(STACK_MAX)
}

/// Expand `expr`, returning the tree and its counters.
///
/// The walk runs on a dedicated thread whose stack is sized for
/// `options.max_depth`, so deep trees hit the depth guard and never the
/// end of the native stack.
pub fn rewrite_with(expr: &Expr, options: &RewriteOptions) -> Result<Rewritten> {
    std::thread::scope(|scope| {
        let worker = std::thread::Builder::new()
            .name("treexpand-rewrite".to_string())
            .stack_size(stack_size(options))
            .spawn_scoped(scope, || expand(expr, options));
        match worker {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
            Err(err) => {
                warn!(%err, "cannot spawn rewrite thread, expanding on the caller's stack");
                expand(expr, options)
            }
        }
    })
}

/// Rewrite independent trees in parallel. Results keep the input order.
pub fn rewrite_all(exprs: &[Expr], options: &RewriteOptions) -> Vec<Result<Rewritten>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("treexpand-rewrite-{i}"))
        .stack_size(stack_size(options))
        .build();
    match pool {
        Ok(pool) => pool.install(|| {
            exprs
                .par_iter()
                .map(|expr| expand(expr, options))
                .collect()
        }),
        Err(err) => {
            warn!(%err, "cannot build rewrite pool, expanding one tree at a time");
            exprs.iter().map(|expr| rewrite_with(expr, options)).collect()
        }
    }
}

/// Expand on the current thread's stack.
fn expand(expr: &Expr, options: &RewriteOptions) -> Result<Rewritten> {
    let mut state = State {
        guard: DepthGuard::new(options.max_depth),
        stats: RewriteStats::default(),
    };
    let root = Env::root();
    let tree = Inliner::new(&root, &mut state).visit(expr)?;
    debug!(
        inlined = state.stats.invocations_inlined,
        captures = state.stats.captures_resolved,
        sentinels = state.stats.sentinels_unwrapped,
        unchanged = std::sync::Arc::ptr_eq(&tree, expr),
        "rewrite finished"
    );
    Ok(Rewritten {
        tree,
        stats: state.stats,
    })
}

/// Walker that substitutes the bindings of `env` and expands invocations.
struct Inliner<'e, 's> {
    env: &'e Env<'e>,
    state: &'s mut State,
}

impl<'e, 's> Inliner<'e, 's> {
    fn new(env: &'e Env<'e>, state: &'s mut State) -> Self {
        Self { env, state }
    }

    /// Replace `target(args..)` by the target's body in a child scope.
    fn inline(&mut self, target: &Expr, args: &[Expr]) -> Result<Expr> {
        let resolved = self.resolve_target(target)?;
        let Node::Lambda(lambda) = &*resolved else {
            return Err(RewriteError::UnresolvedTarget {
                found: resolved.kind(),
            });
        };
        if lambda.params.len() != args.len() {
            return Err(RewriteError::ArityMismatch {
                expected: lambda.params.len(),
                found: args.len(),
            });
        }

        let mut bound = Vec::with_capacity(args.len());
        for (param, arg) in lambda.params.iter().zip(args) {
            bound.push((param.clone(), self.visit(arg)?));
        }
        let scope = self.env.extend(bound)?;
        self.state.stats.invocations_inlined += 1;
        debug!(
            params = lambda.params.len(),
            scope_depth = scope.depth(),
            "inlining invocation"
        );
        Inliner::new(&scope, &mut *self.state).visit(&lambda.body)
    }

    /// Peel an invocation target down to the lambda it denotes.
    ///
    /// The lambda is returned as written; its body is rewritten by the
    /// caller once the parameters are bound. Each peeled layer counts
    /// against the depth guard.
    fn resolve_target(&mut self, target: &Expr) -> Result<Expr> {
        self.state.guard.enter()?;
        let resolved = self.peel_target(target);
        self.state.guard.exit();
        resolved
    }

    fn peel_target(&mut self, target: &Expr) -> Result<Expr> {
        match &**target {
            Node::Lambda(_) => Ok(target.clone()),
            Node::Variable(var) => match self.env.lookup(var) {
                // Replacements are already rewritten: a variable left in
                // one was free in its own scope.
                Some(replacement) if matches!(&**replacement, Node::Variable(_)) => {
                    Err(RewriteError::UnresolvedTarget { found: "unbound variable" })
                }
                Some(replacement) => {
                    let replacement = replacement.clone();
                    self.resolve_target(&replacement)
                }
                None => Err(RewriteError::UnresolvedTarget { found: "unbound variable" }),
            },
            Node::MemberAccess(access) => match capture::captured_tree(access) {
                Some(tree) => {
                    self.state.stats.captures_resolved += 1;
                    debug!(member = %access.member, "resolved captured invocation target");
                    self.resolve_target(tree)
                }
                None => Err(RewriteError::UnresolvedTarget {
                    found: "member access",
                }),
            },
            Node::Call(call) if call.is_intrinsic(Intrinsic::Compile) => match &call.object {
                Some(object) => {
                    self.state.stats.sentinels_unwrapped += 1;
                    self.resolve_target(object)
                }
                None => Err(RewriteError::MalformedSentinel {
                    method: Intrinsic::Compile.as_str(),
                    expected: "an expression tree object",
                    found: call.args.len(),
                }),
            },
            Node::Constant(Constant {
                value: Value::Tree(tree),
                ..
            }) => self.resolve_target(tree),
            Node::Unary(Unary {
                op: UnaryOp::Quote,
                operand,
                ..
            }) => self.resolve_target(operand),
            other => Err(RewriteError::UnresolvedTarget { found: other.kind() }),
        }
    }

    /// Rewrite the tree held by a captured field in the current scope.
    fn resolve_capture(&mut self, access: &MemberAccess, tree: &Expr) -> Result<Expr> {
        self.state.stats.captures_resolved += 1;
        debug!(member = %access.member, "resolved captured tree");
        self.visit(tree)
    }
}

impl Walker for Inliner<'_, '_> {
    fn depth_guard(&mut self) -> Option<&mut DepthGuard> {
        Some(&mut self.state.guard)
    }

    fn visit_variable(&mut self, expr: &Expr, var: &Variable) -> Result<Expr> {
        Ok(self.env.lookup(var).unwrap_or(expr).clone())
    }

    fn visit_invocation(&mut self, _expr: &Expr, node: &Invocation) -> Result<Expr> {
        self.inline(&node.target, &node.args)
    }

    fn visit_member_access(&mut self, expr: &Expr, node: &MemberAccess) -> Result<Expr> {
        match capture::captured_tree(node) {
            Some(tree) => self.resolve_capture(node, tree),
            None => walk_member_access(self, expr, node),
        }
    }

    fn visit_call(&mut self, expr: &Expr, node: &Call) -> Result<Expr> {
        match node.method.intrinsic {
            Some(Intrinsic::Invoke) => {
                let Some((target, args)) = node.args.split_first() else {
                    return Err(RewriteError::MalformedSentinel {
                        method: Intrinsic::Invoke.as_str(),
                        expected: "a target followed by its arguments",
                        found: 0,
                    });
                };
                self.inline(target, args)
            }
            Some(Intrinsic::AsExpandable) => {
                let [query] = node.args.as_slice() else {
                    return Err(RewriteError::MalformedSentinel {
                        method: Intrinsic::AsExpandable.as_str(),
                        expected: "exactly one argument",
                        found: node.args.len(),
                    });
                };
                self.state.stats.sentinels_unwrapped += 1;
                trace!("unwrapping expandable marker");
                self.visit(query)
            }
            Some(Intrinsic::Compile) => {
                if let Some(object) = &node.object {
                    if let Node::MemberAccess(access) = &**object {
                        if let Some(tree) = capture::captured_tree(access) {
                            self.state.stats.sentinels_unwrapped += 1;
                            trace!(member = %access.member, "unwrapping compiled capture");
                            return self.resolve_capture(access, tree);
                        }
                    }
                }
                walk_call(self, expr, node)
            }
            None => walk_call(self, expr, node),
        }
    }
}
