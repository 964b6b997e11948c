//! Read-only tree queries: child enumeration, node counts, and the
//! residue check used to confirm a rewritten tree is fully expanded.

use serde::Serialize;

use super::{Binding, ElementInit, Expr, Intrinsic, Node, Value};

/// Direct sub-expressions of `node`, in evaluation order.
pub fn children(node: &Node) -> Vec<&Expr> {
    let mut out = Vec::new();
    match node {
        Node::Unary(n) => out.push(&n.operand),
        Node::Binary(n) => {
            out.push(&n.left);
            out.push(&n.right);
            out.extend(n.conversion.as_ref());
        }
        Node::TypeIs(n) => out.push(&n.expr),
        Node::Conditional(n) => {
            out.push(&n.test);
            out.push(&n.if_true);
            out.push(&n.if_false);
        }
        Node::Constant(_) | Node::Variable(_) | Node::Extension(_) => {}
        Node::MemberAccess(n) => out.extend(n.object.as_ref()),
        Node::Call(n) => {
            out.extend(n.object.as_ref());
            out.extend(n.args.iter());
        }
        Node::Lambda(n) => out.push(&n.body),
        Node::New(c) => out.extend(c.args.iter()),
        Node::NewArray(n) => out.extend(n.exprs.iter()),
        Node::Invocation(n) => {
            out.push(&n.target);
            out.extend(n.args.iter());
        }
        Node::MemberInit(n) => {
            out.extend(n.construct.args.iter());
            for binding in &n.bindings {
                binding_children(binding, &mut out);
            }
        }
        Node::ListInit(n) => {
            out.extend(n.construct.args.iter());
            for init in &n.initializers {
                out.extend(init.args.iter());
            }
        }
    }
    out
}

fn binding_children<'a>(binding: &'a Binding, out: &mut Vec<&'a Expr>) {
    match binding {
        Binding::Assign { expr, .. } => out.push(expr),
        Binding::Member { bindings, .. } => {
            for nested in bindings {
                binding_children(nested, out);
            }
        }
        Binding::List { initializers, .. } => {
            for init in initializers {
                element_children(init, out);
            }
        }
    }
}

fn element_children<'a>(init: &'a ElementInit, out: &mut Vec<&'a Expr>) {
    out.extend(init.args.iter());
}

/// Total number of nodes reachable from `expr` (constants count once,
/// trees carried inside constants are not entered).
pub fn count_nodes(expr: &Expr) -> usize {
    1 + children(expr).into_iter().map(count_nodes).sum::<usize>()
}

/// Constructs left in a tree that a tree-only backend cannot interpret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Residue {
    pub invocations: usize,
    pub invoke_calls: usize,
    pub expandable_calls: usize,
    pub captured_trees: usize,
}

impl Residue {
    pub fn is_empty(&self) -> bool {
        *self == Residue::default()
    }
}

/// Count the expansion targets still present in `expr`.
pub fn residue(expr: &Expr) -> Residue {
    let mut acc = Residue::default();
    collect_residue(expr, &mut acc);
    acc
}

fn collect_residue(expr: &Expr, acc: &mut Residue) {
    match &**expr {
        Node::Invocation(_) => acc.invocations += 1,
        Node::Call(call) if call.is_intrinsic(Intrinsic::Invoke) => acc.invoke_calls += 1,
        Node::Call(call) if call.is_intrinsic(Intrinsic::AsExpandable) => {
            acc.expandable_calls += 1
        }
        Node::MemberAccess(access) if access.member.is_captured_field() => {
            if let Some(object) = &access.object {
                if let Node::Constant(constant) = &**object {
                    if let Value::Closure(closure) = &constant.value {
                        if let Some(Value::Tree(_)) = closure.field(&access.member.name) {
                            acc.captured_trees += 1;
                        }
                    }
                }
            }
        }
        _ => {}
    }
    for child in children(expr) {
        collect_residue(child, acc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Closure, Member, Type, Variable};

    #[test]
    fn test_children_of_binary() {
        let e = Node::binary(BinaryOp::Add, Node::int(1), Node::int(2));
        assert_eq!(children(&e).len(), 2);
        assert_eq!(count_nodes(&e), 3);
    }

    #[test]
    fn test_residue_counts_invocations() {
        let x = Variable::new("x", Type::Int);
        let lam = Node::lambda(vec![x.clone()], Node::var(&x));
        let e = Node::binary(
            BinaryOp::Add,
            Node::invoke(lam.clone(), vec![Node::int(1)]),
            Node::invoke_expr(Node::tree(lam), vec![Node::int(2)]),
        );
        let r = residue(&e);
        assert_eq!(r.invocations, 1);
        assert_eq!(r.invoke_calls, 1);
        assert!(!r.is_empty());
    }

    #[test]
    fn test_residue_ignores_plain_captures() {
        let env = Closure::new("Env0", vec![("limit".to_string(), Value::Int(3))]);
        let access = Node::member(
            Some(Node::closure(&env)),
            Member::captured("Env0", "limit", Type::Int),
        );
        assert!(residue(&access).is_empty());
    }
}
