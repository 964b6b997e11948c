use std::sync::Arc;

use super::*;
use crate::ast::navigate::residue;
use crate::error::InliningError;

fn int_var(name: &str) -> Variable {
    Variable::new(name, Type::Int)
}

fn add(a: Expr, b: Expr) -> Expr {
    Node::binary(BinaryOp::Add, a, b)
}

fn gt(a: Expr, b: Expr) -> Expr {
    Node::binary(BinaryOp::GreaterThan, a, b)
}

fn pred_type() -> Type {
    Type::expr_of(Type::func(vec![Type::Int], Type::Bool))
}

/// `closure Env0 { pred: Expr<Fn(Int) -> Bool> = tree (lambda ((u Int)) (gt u 3)) }`
fn captured_pred() -> (Arc<Closure>, Expr) {
    let u = int_var("u");
    let pred = Node::lambda(vec![u.clone()], gt(Node::var(&u), Node::int(3)));
    let env = Closure::new(
        "Env0",
        vec![
            ("pred".to_string(), Value::Tree(pred.clone())),
            ("limit".to_string(), Value::Int(10)),
        ],
    );
    (env, pred)
}

fn pred_member(env: &Arc<Closure>) -> Expr {
    Node::member(
        Some(Node::closure(env)),
        Member::captured("Env0", "pred", pred_type()),
    )
}

#[test]
fn test_beta_reduction() {
    let x = int_var("x");
    let lam = Node::lambda(vec![x.clone()], add(Node::var(&x), Node::int(1)));
    let out = rewrite(&Node::invoke(lam, vec![Node::int(5)])).unwrap();
    assert_eq!(out, add(Node::int(5), Node::int(1)));
}

#[test]
fn test_positional_binding() {
    let a = int_var("a");
    let b = int_var("b");
    let lam = Node::lambda(
        vec![a.clone(), b.clone()],
        Node::binary(BinaryOp::Subtract, Node::var(&a), Node::var(&b)),
    );
    let out = rewrite(&Node::invoke(lam, vec![Node::int(1), Node::int(2)])).unwrap();
    assert_eq!(
        out,
        Node::binary(BinaryOp::Subtract, Node::int(1), Node::int(2))
    );
}

#[test]
fn test_argument_is_shared_at_every_use() {
    let x = int_var("x");
    let y = int_var("y");
    let lam = Node::lambda(
        vec![x.clone()],
        Node::binary(BinaryOp::Multiply, Node::var(&x), Node::var(&x)),
    );
    let arg = add(Node::var(&y), Node::int(1));
    let out = rewrite(&Node::invoke(lam, vec![arg.clone()])).unwrap();
    let Node::Binary(product) = &*out else {
        panic!("expected a product, got {:?}", out);
    };
    assert!(Arc::ptr_eq(&product.left, &arg));
    assert!(Arc::ptr_eq(&product.right, &arg));
}

#[test]
fn test_sentinel_invoke_of_quoted_tree() {
    let x = int_var("x");
    let lam = Node::lambda(vec![x.clone()], add(Node::var(&x), Node::var(&x)));
    let out = rewrite(&Node::invoke_expr(Node::tree(lam), vec![Node::int(4)])).unwrap();
    assert_eq!(out, add(Node::int(4), Node::int(4)));
}

#[test]
fn test_nested_scope_sees_outer_binding() {
    let x = int_var("x");
    let y = int_var("y");
    let inner = Node::lambda(vec![y.clone()], add(Node::var(&x), Node::var(&y)));
    let outer = Node::lambda(
        vec![x.clone()],
        Node::invoke(inner, vec![Node::int(2)]),
    );
    let out = rewrite(&Node::invoke(outer, vec![Node::int(1)])).unwrap();
    assert_eq!(out, add(Node::int(1), Node::int(2)));
}

#[test]
fn test_higher_order_inlining() {
    let f = Variable::new("f", Type::func(vec![Type::Int], Type::Int));
    let y = int_var("y");
    let apply = Node::lambda(
        vec![f.clone()],
        Node::invoke(Node::var(&f), vec![Node::int(2)]),
    );
    let succ = Node::lambda(vec![y.clone()], add(Node::var(&y), Node::int(1)));
    let rewritten = rewrite_with(
        &Node::invoke(apply, vec![succ]),
        &RewriteOptions::default(),
    )
    .unwrap();
    assert_eq!(rewritten.tree, add(Node::int(2), Node::int(1)));
    assert_eq!(rewritten.stats.invocations_inlined, 2);
}

#[test]
fn test_recursive_binding_is_rejected() {
    let x = int_var("x");
    let inner = Node::lambda(vec![x.clone()], Node::var(&x));
    let outer = Node::lambda(
        vec![x.clone()],
        Node::invoke(inner, vec![Node::var(&x)]),
    );
    let err = rewrite(&Node::invoke(outer, vec![Node::int(5)])).unwrap_err();
    assert_eq!(
        err,
        RewriteError::Inlining(InliningError::RecursiveBinding {
            parameter: "x".to_string()
        })
    );
    assert!(!err.is_fatal());
}

#[test]
fn test_same_name_parameters_do_not_collide() {
    let outer_x = int_var("x");
    let inner_x = int_var("x");
    let inner = Node::lambda(vec![inner_x.clone()], Node::var(&inner_x));
    let outer = Node::lambda(
        vec![outer_x.clone()],
        Node::invoke(inner, vec![Node::var(&outer_x)]),
    );
    let out = rewrite(&Node::invoke(outer, vec![Node::int(5)])).unwrap();
    assert_eq!(out, Node::int(5));
}

#[test]
fn test_captured_tree_is_inlined() {
    let (env, _) = captured_pred();
    let v = int_var("v");
    let query = Node::lambda(
        vec![v.clone()],
        Node::invoke_expr(pred_member(&env), vec![Node::var(&v)]),
    );
    let rewritten = rewrite_with(&query, &RewriteOptions::default()).unwrap();
    assert_eq!(
        rewritten.tree,
        Node::lambda(vec![v.clone()], gt(Node::var(&v), Node::int(3)))
    );
    assert_eq!(rewritten.stats.captures_resolved, 1);
    assert_eq!(rewritten.stats.invocations_inlined, 1);
    assert!(residue(&rewritten.tree).is_empty());
}

#[test]
fn test_captured_scalar_is_left_alone() {
    let (env, _) = captured_pred();
    let v = int_var("v");
    let limit = Node::member(
        Some(Node::closure(&env)),
        Member::captured("Env0", "limit", Type::Int),
    );
    let query = Node::lambda(vec![v.clone()], Node::binary(BinaryOp::LessThan, Node::var(&v), limit));
    let out = rewrite(&query).unwrap();
    assert!(Arc::ptr_eq(&out, &query));
}

#[test]
fn test_bare_captured_tree_is_substituted() {
    let (env, pred) = captured_pred();
    let out = rewrite(&pred_member(&env)).unwrap();
    assert!(Arc::ptr_eq(&out, &pred));
}

#[test]
fn test_compiled_capture_unwraps() {
    let (env, pred) = captured_pred();
    let v = int_var("v");

    let invoked = Node::invoke(Node::compile(pred_member(&env)), vec![Node::var(&v)]);
    assert_eq!(rewrite(&invoked).unwrap(), gt(Node::var(&v), Node::int(3)));

    let bare = Node::compile(pred_member(&env));
    let out = rewrite(&bare).unwrap();
    assert!(Arc::ptr_eq(&out, &pred));
}

#[test]
fn test_compile_of_plain_member_walks() {
    let source = Variable::new("s", Type::named("Rules"));
    let member = Node::member(
        Some(Node::var(&source)),
        Member::property("Rules", "check", pred_type()),
    );
    let call = Node::compile(member);
    let out = rewrite(&call).unwrap();
    assert!(Arc::ptr_eq(&out, &call));
}

#[test]
fn test_expandable_marker_unwraps() {
    let q = Variable::new("q", Type::named("Query"));
    let marked = Node::as_expandable(Node::as_expandable(Node::var(&q)));
    let rewritten = rewrite_with(&marked, &RewriteOptions::default()).unwrap();
    assert_eq!(rewritten.tree, Node::var(&q));
    assert_eq!(rewritten.stats.sentinels_unwrapped, 2);
}

#[test]
fn test_malformed_markers() {
    let bare_invoke = Node::call(
        None,
        Method::intrinsic(Intrinsic::Invoke, Type::Int),
        Vec::new(),
    );
    assert!(matches!(
        rewrite(&bare_invoke),
        Err(RewriteError::MalformedSentinel { method: "Invoke", found: 0, .. })
    ));

    let two = Node::call(
        None,
        Method::intrinsic(Intrinsic::AsExpandable, Type::Int),
        vec![Node::int(1), Node::int(2)],
    );
    assert!(matches!(
        rewrite(&two),
        Err(RewriteError::MalformedSentinel { method: "AsExpandable", found: 2, .. })
    ));
}

#[test]
fn test_arity_mismatch() {
    let x = int_var("x");
    let lam = Node::lambda(vec![x.clone()], Node::var(&x));
    let err = rewrite(&Node::invoke(lam, vec![Node::int(1), Node::int(2)])).unwrap_err();
    assert_eq!(
        err,
        RewriteError::ArityMismatch {
            expected: 1,
            found: 2
        }
    );
}

#[test]
fn test_unresolved_targets() {
    let err = rewrite(&Node::invoke(Node::int(3), Vec::new())).unwrap_err();
    assert_eq!(err, RewriteError::UnresolvedTarget { found: "constant" });

    let f = Variable::new("f", Type::func(vec![], Type::Int));
    let err = rewrite(&Node::invoke(Node::var(&f), Vec::new())).unwrap_err();
    assert_eq!(
        err,
        RewriteError::UnresolvedTarget {
            found: "unbound variable"
        }
    );
}

#[test]
fn test_untouched_tree_is_returned_as_is() {
    let x = int_var("x");
    let e = Node::lambda(
        vec![x.clone()],
        Node::conditional(
            gt(Node::var(&x), Node::int(0)),
            Node::str("pos"),
            Node::str("neg"),
        ),
    );
    let out = rewrite(&e).unwrap();
    assert!(Arc::ptr_eq(&out, &e));
}

#[test]
fn test_unchanged_siblings_are_shared() {
    let x = int_var("x");
    let y = int_var("y");
    let untouched = gt(Node::var(&y), Node::int(7));
    let id = Node::lambda(vec![x.clone()], Node::var(&x));
    let e = Node::binary(
        BinaryOp::AndAlso,
        untouched.clone(),
        Node::invoke(id, vec![Node::bool(true)]),
    );
    let out = rewrite(&e).unwrap();
    let Node::Binary(and) = &*out else {
        panic!("expected a binary node");
    };
    assert!(Arc::ptr_eq(&and.left, &untouched));
    assert_eq!(and.right, Node::bool(true));
}

#[test]
fn test_rewrite_is_idempotent() {
    let (env, _) = captured_pred();
    let v = int_var("v");
    let query = Node::as_expandable(Node::lambda(
        vec![v.clone()],
        Node::invoke_expr(pred_member(&env), vec![Node::var(&v)]),
    ));
    let once = rewrite(&query).unwrap();
    let twice = rewrite(&once).unwrap();
    assert!(Arc::ptr_eq(&once, &twice));
}

#[test]
fn test_extension_kind_is_fatal() {
    let e = add(Node::int(1), Node::extension("loop", Type::Int));
    let err = rewrite(&e).unwrap_err();
    assert_eq!(
        err,
        RewriteError::UnhandledKind {
            kind: "loop".to_string()
        }
    );
    assert!(err.is_fatal());
}

#[test]
fn test_depth_limit() {
    let mut e = Node::bool(true);
    for _ in 0..300 {
        e = Node::unary(UnaryOp::Not, e);
    }
    let tight = RewriteOptions { max_depth: 256 };
    assert_eq!(
        rewrite_with(&e, &tight).unwrap_err(),
        RewriteError::DepthExceeded { limit: 256 }
    );
    let roomy = RewriteOptions { max_depth: 512 };
    assert!(rewrite_with(&e, &roomy).is_ok());
}

#[test]
fn test_long_or_chain_expands_with_defaults() {
    // `x => pred(x) || pred(x) || ...`, left-nested the way predicate
    // builders combine "any of" clauses.
    let (env, _) = captured_pred();
    let x = int_var("x");
    let mut body = Node::invoke(pred_member(&env), vec![Node::var(&x)]);
    for _ in 1..400 {
        let term = Node::invoke(pred_member(&env), vec![Node::var(&x)]);
        body = Node::binary(BinaryOp::OrElse, body, term);
    }
    let chain = Node::lambda(vec![x.clone()], body);

    let expanded = rewrite_with(&chain, &RewriteOptions::default()).unwrap();
    assert_eq!(expanded.stats.invocations_inlined, 400);
    let left = residue(&expanded.tree);
    assert!(left.is_empty(), "left over: {:?}", left);
}

#[test]
fn test_variable_bound_to_a_free_variable_is_unresolved() {
    // (invoke (lambda ((f F)) (invoke f 1)) f): `f` ends up bound to itself.
    let f = Variable::new("f", Type::func(vec![Type::Int], Type::Int));
    let apply = Node::lambda(
        vec![f.clone()],
        Node::invoke(Node::var(&f), vec![Node::int(1)]),
    );
    let err = rewrite(&Node::invoke(apply, vec![Node::var(&f)])).unwrap_err();
    assert_eq!(
        err,
        RewriteError::UnresolvedTarget {
            found: "unbound variable"
        }
    );
    assert!(err.is_fatal());
}

#[test]
fn test_rewrite_all_keeps_order() {
    let x = int_var("x");
    let id = Node::lambda(vec![x.clone()], Node::var(&x));
    let trees = vec![
        Node::invoke(id.clone(), vec![Node::int(1)]),
        Node::invoke(Node::int(0), Vec::new()),
        Node::invoke(id, vec![Node::int(3)]),
    ];
    let results = rewrite_all(&trees, &RewriteOptions::default());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().tree, Node::int(1));
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().tree, Node::int(3));
}
