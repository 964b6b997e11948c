//! Rewrite throughput on synthetic trees.
//!
//! `deep_invocations` chains lambdas whose bodies invoke the next one, so
//! each level costs an environment scope. `wide_captures` reads the same
//! captured predicate from many sibling branches.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use treexpand::ast::{BinaryOp, Closure, Member, Node, Type, Value, Variable};
use treexpand::config::RewriteOptions;
use treexpand::{rewrite_all, rewrite_with, Expr};

/// `(invoke (lambda (x0) (invoke (lambda (x1) ... (add xN 1)) x0)) 0)`
fn deep_invocations(levels: usize) -> Expr {
    let vars: Vec<Variable> = (0..levels)
        .map(|i| Variable::new(format!("x{}", i), Type::Int))
        .collect();
    let mut body = Node::binary(BinaryOp::Add, Node::var(&vars[levels - 1]), Node::int(1));
    for i in (0..levels).rev() {
        let lambda = Node::lambda(vec![vars[i].clone()], body);
        let arg = if i == 0 { Node::int(0) } else { Node::var(&vars[i - 1]) };
        body = Node::invoke(lambda, vec![arg]);
    }
    body
}

/// `(and_also (invoke! env.pred 0) (and_also (invoke! env.pred 1) ...))`
fn wide_captures(width: usize) -> Expr {
    let u = Variable::new("u", Type::Int);
    let pred = Node::lambda(
        vec![u.clone()],
        Node::binary(BinaryOp::GreaterThan, Node::var(&u), Node::int(3)),
    );
    let env = Closure::new("Env0", vec![("pred".to_string(), Value::Tree(pred.clone()))]);
    let access = Node::member(
        Some(Node::closure(&env)),
        Member::captured("Env0", "pred", Type::expr_of(pred.ty())),
    );
    (0..width)
        .map(|i| Node::invoke_expr(access.clone(), vec![Node::int(i as i64)]))
        .reduce(|acc, branch| Node::binary(BinaryOp::AndAlso, branch, acc))
        .unwrap_or_else(|| Node::bool(true))
}

fn bench_deep(c: &mut Criterion) {
    let options = RewriteOptions { max_depth: 4096 };
    let mut group = c.benchmark_group("deep_invocations");
    for levels in [8, 64, 256] {
        let tree = deep_invocations(levels);
        group.bench_with_input(BenchmarkId::from_parameter(levels), &tree, |b, tree| {
            b.iter(|| rewrite_with(black_box(tree), &options))
        });
    }
    group.finish();
}

fn bench_wide(c: &mut Criterion) {
    let options = RewriteOptions { max_depth: 4096 };
    let mut group = c.benchmark_group("wide_captures");
    for width in [16, 256] {
        let tree = wide_captures(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &tree, |b, tree| {
            b.iter(|| rewrite_with(black_box(tree), &options))
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let options = RewriteOptions::default();
    let trees: Vec<Expr> = (0..64).map(|_| wide_captures(32)).collect();
    c.bench_function("rewrite_all_64x32", |b| {
        b.iter(|| rewrite_all(black_box(&trees), &options))
    });
}

criterion_group!(benches, bench_deep, bench_wide, bench_batch);
criterion_main!(benches);
