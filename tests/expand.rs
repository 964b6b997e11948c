use std::path::Path;
use std::process::Command;

use treexpand::ast::navigate::residue;
use treexpand::{fingerprint, format_tree, parse_tree, rewrite, Expr, RewriteError};

fn parse(source: &str) -> Expr {
    parse_tree(source).unwrap_or_else(|errs| {
        panic!(
            "should parse, got {} errors: {:?}",
            errs.len(),
            errs.iter().map(|e| &e.message).collect::<Vec<_>>()
        )
    })
}

/// Expand `source` and return the canonical text of the result.
fn expand(source: &str) -> String {
    let expanded = rewrite(&parse(source)).unwrap_or_else(|e| panic!("should expand: {}", e));
    assert!(residue(&expanded).is_empty(), "targets left in {:?}", expanded);
    format_tree(&expanded)
}

fn treexpand(args: &[&str], dir: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_treexpand"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("run treexpand")
}

// ── Library ──

#[test]
fn test_beta_reduction() {
    assert_eq!(expand("(invoke (lambda ((x Int)) (add x 1)) 5)"), "(add 5 1)\n");
}

#[test]
fn test_reusable_predicate_through_closure() {
    let source = "\
closure Env0 { is_adult = (tree (lambda ((p Person)) (ge (prop p Person::age Int) 18))) }
(lambda ((c Customer))
  (and_also
    (invoke! (field Env0 Env0::is_adult Expr<Fn(Person) -> Bool>) (prop c Customer::owner Person))
    (gt (prop c Customer::balance Int) 0)))";
    assert_eq!(
        expand(source),
        "(lambda ((c Customer))\n  (and_also\n    (ge (prop (prop c Customer::owner Person) Person::age Int) 18)\n    (gt (prop c Customer::balance Int) 0)))\n"
    );
}

#[test]
fn test_compiled_capture_inside_nested_query() {
    let source = "\
closure Env0 { positive = (tree (lambda ((n Int)) (gt n 0))) }
free orders: [Int]
(expandable
  (call static Seq::any (orders (lambda ((o Int)) (invoke (compile (field Env0 Env0::positive Expr<Fn(Int) -> Bool>)) o))) Bool))";
    assert_eq!(
        expand(source),
        "free orders: [Int]\n\n(call static Seq::any (orders (lambda ((o Int)) (gt o 0))) Bool)\n"
    );
}

#[test]
fn test_expansion_is_idempotent() {
    let source = "\
closure Env1 { limit = 10 }
closure Env0 { pred = (tree (lambda ((u Int)) (lt u (field Env1 Env1::limit Int)))) }
(lambda ((x Int)) (invoke! (field Env0 Env0::pred Expr<Fn(Int) -> Bool>) x))";
    let once = rewrite(&parse(source)).expect("first pass");
    let twice = rewrite(&once).expect("second pass");
    assert!(std::sync::Arc::ptr_eq(&once, &twice));
    assert_eq!(fingerprint(&once), fingerprint(&twice));
}

#[test]
fn test_same_named_parameters_do_not_collide() {
    let source = "\
(invoke
  (lambda ((f Fn(Int) -> Int)) (invoke (lambda ((f Fn(Int) -> Int)) (invoke f 1)) f))
  (lambda ((n Int)) (mul n 2)))";
    assert_eq!(expand(source), "(mul 1 2)\n");
}

#[test]
fn test_unresolvable_target_is_fatal() {
    let err = rewrite(&parse("free g: Fn(Int) -> Int\n(invoke g 1)")).expect_err("g has no body");
    assert!(err.is_fatal());
    assert_eq!(
        err,
        RewriteError::UnresolvedTarget {
            found: "unbound variable"
        }
    );
}

// ── CLI ──

#[test]
fn test_cli_rewrite_writes_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("query.tx");
    std::fs::write(&input, "(invoke (lambda ((x Int) (y Int)) (sub x y)) 7 2)\n").expect("write");

    let out = treexpand(&["rewrite", "query.tx", "-o", "expanded.tx", "--stats"], dir.path());
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("1 invocation(s) inlined"), "stderr: {}", stderr);
    let expanded = std::fs::read_to_string(dir.path().join("expanded.tx")).expect("read output");
    assert_eq!(expanded, "(sub 7 2)\n");
}

#[test]
fn test_cli_rewrite_json_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("q.tx"), "(invoke (lambda ((x Int)) x) 3)\n").expect("write");

    let out = treexpand(&["rewrite", "q.tx", "--json"], dir.path());
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["stats"]["invocations_inlined"], 1);
    assert_eq!(report["tree"], "3\n");
    assert_ne!(report["source_hash"], report["expanded_hash"]);
}

#[test]
fn test_cli_reports_errors_and_exits() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("bad.tx"), "(invoke (lambda ((x Int)) x) 1 2)\n").expect("write");
    std::fs::write(dir.path().join("broken.tx"), "(add x 1)\n").expect("write");

    let out = treexpand(&["check", "bad.tx"], dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("takes 1 argument(s) but is invoked with 2"));

    let out = treexpand(&["check", "broken.tx"], dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown variable 'x'"));
}

#[test]
fn test_cli_honors_config_depth() {
    let dir = tempfile::tempdir().expect("tempdir");
    let deep = format!("{}true{}", "(not ".repeat(20), ")".repeat(20));
    std::fs::write(dir.path().join("deep.tx"), deep).expect("write");
    std::fs::write(dir.path().join("treexpand.toml"), "[rewrite]\nmax_depth = 8\n").expect("write");

    let out = treexpand(&["check", "deep.tx"], dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("exceeds the limit of 8 levels"));

    let out = treexpand(&["check", "deep.tx", "--config", "missing.toml"], dir.path());
    assert!(!out.status.success());

    let out = treexpand(&["rewrite", "deep.tx", "--max-depth", "64"], dir.path());
    assert!(out.status.success());
}

#[test]
fn test_cli_fmt_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.tx"), "(add   1\n  2)").expect("write");

    let out = treexpand(&["fmt", "--check", "a.tx"], dir.path());
    assert!(!out.status.success());

    let out = treexpand(&["fmt", "a.tx"], dir.path());
    assert!(out.status.success());
    assert_eq!(std::fs::read_to_string(dir.path().join("a.tx")).expect("read"), "(add 1 2)\n");

    let out = treexpand(&["fmt", "--check", "a.tx"], dir.path());
    assert!(out.status.success());
}

#[test]
fn test_cli_hash_is_alpha_invariant() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.tx"), "(lambda ((x Int)) (add x 1))").expect("write");
    std::fs::write(dir.path().join("b.tx"), "(lambda ((y Int)) (add y 1))").expect("write");

    let a = treexpand(&["hash", "--full", "a.tx"], dir.path());
    let b = treexpand(&["hash", "--full", "b.tx"], dir.path());
    assert!(a.status.success() && b.status.success());
    assert_eq!(a.stdout, b.stdout);
}
