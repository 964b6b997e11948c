use super::*;
use crate::hash::fingerprint;
use crate::parse_tree;

fn parse(source: &str) -> Expr {
    match parse_tree(source) {
        Ok(expr) => expr,
        Err(errors) => panic!("parse errors: {:?}", errors),
    }
}

/// Parse, print, and check the printed text is a fixed point.
fn fmt(source: &str) -> String {
    let first = format_tree(&parse(source));
    let second = format_tree(&parse(&first));
    assert_eq!(first, second, "printing is not stable");
    first
}

#[test]
fn test_flat_lambda_round_trips() {
    let src = "(lambda ((x Int)) (add x 1))\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_declarations_come_first() {
    let src = "free n: Int\nclosure Env0 { limit = 10 }\n\n(lambda ((x Int)) (and_also (gt x (field Env0 Env0::limit Int)) (lt x n)))\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_long_forms_break() {
    let out = fmt(
        "(lambda ((person Person)) (and_also (gt (prop person Person::age Int) 18) \
         (eq (prop person Person::name Str) \"ada\")))",
    );
    insta::assert_snapshot!(out.trim_end(), @r###"
    (lambda ((person Person))
      (and_also
        (gt (prop person Person::age Int) 18)
        (eq (prop person Person::name Str) "ada")))
    "###);
}

#[test]
fn test_captured_tree_layout() {
    let out = fmt(
        "closure Env0 { pred = (tree (lambda ((u Int)) (gt u 3))), limit = 10 }
         (lambda ((x Int)) (and_also (invoke! (field Env0 Env0::pred Expr<Fn(Int) -> Bool>) x)
           (lt x (field Env0 Env0::limit Int))))",
    );
    insta::assert_snapshot!(out.trim_end(), @r###"
    closure Env0 { pred = (tree (lambda ((u Int)) (gt u 3))), limit = 10 }

    (lambda ((x Int))
      (and_also
        (invoke! (field Env0 Env0::pred Expr<Fn(Int) -> Bool>) x)
        (lt x (field Env0 Env0::limit Int))))
    "###);
}

#[test]
fn test_annotation_only_when_type_differs() {
    assert_eq!(fmt("(add 1 2 : Float)"), "(add 1 2 : Float)\n");
    assert_eq!(fmt("(add 1 2 : Int)"), "(add 1 2)\n");
}

#[test]
fn test_shadowed_names_are_made_unique() {
    let outer = Variable::new("x", Type::Int);
    let inner = Variable::new("x", Type::Int);
    let body = Node::binary(BinaryOp::Add, Node::var(&inner), Node::var(&outer));
    let expr = Node::lambda(
        vec![outer.clone()],
        Node::invoke(Node::lambda(vec![inner], body), vec![Node::var(&outer)]),
    );
    let out = format_tree(&expr);
    assert_eq!(
        out,
        "(lambda ((x Int)) (invoke (lambda ((x_1 Int)) (add x_1 x)) x))\n"
    );
    assert_eq!(fingerprint(&parse(&out)), fingerprint(&expr));
}

#[test]
fn test_unprintable_names_are_replaced() {
    let odd = Variable::new("<>h__TransparentIdentifier0", Type::Int);
    let null = Variable::new("null", Type::Int);
    let expr = Node::lambda(
        vec![odd.clone(), null.clone()],
        Node::binary(BinaryOp::Multiply, Node::var(&odd), Node::var(&null)),
    );
    assert_eq!(
        format_tree(&expr),
        "(lambda ((v Int) (v_1 Int)) (mul v v_1))\n"
    );
}

#[test]
fn test_constants_and_strings() {
    let src = "(if (eq (const 1 Float) 1.5) \"tab\\there \\\"q\\\"\" (const null Str))\n";
    assert_eq!(fmt(src), src);
    assert_eq!(fmt("(add -4 (neg 2))"), "(add -4 (neg 2))\n");
}

#[test]
fn test_initializers_round_trip() {
    let src = "\
(init (new Person () (prop Person::name Str))
  (= (prop Person::name Str) \"ada\")
  (bind (prop Person::home Address) (= (field Address::zip Int) 90210))
  (list (prop Person::tags [Str]) (add List::Add \"a\") (add List::Add \"b\")))";
    let out = fmt(src);
    assert_eq!(fingerprint(&parse(&out)), fingerprint(&parse(src)));
}

#[test]
fn test_sentinels_and_members_round_trip() {
    let src = "\
free q: [Int]
(expandable (call static Seq::filter (q (lambda ((n Int)) (invoke! (compile (tree (lambda ((m Int)) (gt m 0)))) n))) [Int]))";
    let out = fmt(src);
    assert!(out.starts_with("free q: [Int]\n\n"));
    assert_eq!(fingerprint(&parse(&out)), fingerprint(&parse(src)));
}

#[test]
fn test_arrays_and_extensions() {
    assert_eq!(
        fmt("(array_bounds Int 3 4)"),
        "(array_bounds Int 3 4)\n"
    );
    assert_eq!(fmt("(len (array Str \"a\"))"), "(len (array Str \"a\"))\n");
    assert_eq!(fmt("(ext block Unit)"), "(ext block Unit)\n");
}
