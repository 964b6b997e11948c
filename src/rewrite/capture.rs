//! Captured-closure member reads.
//!
//! A lambda that refers to a variable of an enclosing scope reads it as a
//! field of a closure container held in a constant. When that field holds
//! an expression tree, the read can be replaced by the tree itself.

use crate::ast::{Expr, MemberAccess, Node, Value};

/// The tree stored in the captured field `access` reads, if any.
pub(crate) fn captured_tree(access: &MemberAccess) -> Option<&Expr> {
    if !access.member.is_captured_field() {
        return None;
    }
    let Node::Constant(constant) = &**access.object.as_ref()? else {
        return None;
    };
    let Value::Closure(closure) = &constant.value else {
        return None;
    };
    if closure.name() != access.member.owner.name() {
        return None;
    }
    match closure.field(&access.member.name)? {
        Value::Tree(tree) => Some(tree),
        _ => None,
    }
}
