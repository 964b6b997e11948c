//! Canonical printer for the tree notation.
//!
//! Output parses back to a tree with the same fingerprint: variables get
//! unique names, free variables and closures are declared up front, and a
//! `: Type` suffix is written only where a node's type differs from the
//! one its children imply.

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ast::navigate::children;
use crate::ast::*;

const MAX_WIDTH: usize = 80;
const INDENT: usize = 2;
const FIELD_INDENT: &str = "    ";

/// Words the lexer reserves; a variable printed as one would not parse back.
const RESERVED: [&str; 6] = ["closure", "free", "static", "true", "false", "null"];

/// Print `expr` as a notation file.
pub(crate) fn format_tree(expr: &Expr) -> String {
    let mut closures = Vec::new();
    collect_closures(expr, &mut closures, &mut HashSet::new());

    let mut namer = Namer::new(&closures);
    for closure in &closures {
        namer.closure_fields(closure);
    }
    namer.expr(expr);

    let printer = Printer { names: &namer.names };
    let mut out = String::new();
    for var in &namer.free {
        out.push_str(&format!("free {}: {}\n", printer.name(var), var.ty()));
    }
    for closure in &closures {
        printer.emit_closure(closure, &mut out);
    }
    if !out.is_empty() {
        out.push('\n');
    }
    printer.render(&printer.expr(expr), 0, &mut out);
    out.push('\n');
    out
}

// --- Declarations ---

/// Closures reachable from `expr`, each after the closures its fields use.
fn collect_closures(expr: &Expr, out: &mut Vec<Arc<Closure>>, seen: &mut HashSet<usize>) {
    if let Node::Constant(constant) = &**expr {
        collect_value(&constant.value, out, seen);
    }
    for child in children(expr) {
        collect_closures(child, out, seen);
    }
}

fn collect_value(value: &Value, out: &mut Vec<Arc<Closure>>, seen: &mut HashSet<usize>) {
    match value {
        Value::Tree(tree) => collect_closures(tree, out, seen),
        Value::Closure(closure) => {
            if !seen.insert(Arc::as_ptr(closure) as usize) {
                return;
            }
            for (_, field) in closure.fields() {
                collect_value(field, out, seen);
            }
            out.push(closure.clone());
        }
        _ => {}
    }
}

/// Assigns every variable a printable name unique across the file.
struct Namer {
    names: HashMap<Variable, String>,
    taken: HashSet<String>,
    bound: Vec<Variable>,
    free: Vec<Variable>,
}

impl Namer {
    fn new(closures: &[Arc<Closure>]) -> Self {
        Self {
            names: HashMap::new(),
            taken: closures.iter().map(|c| c.name().to_string()).collect(),
            bound: Vec::new(),
            free: Vec::new(),
        }
    }

    fn closure_fields(&mut self, closure: &Closure) {
        // Closure declarations sit outside every lambda.
        let outer = std::mem::take(&mut self.bound);
        for (_, value) in closure.fields() {
            if let Value::Tree(tree) = value {
                self.expr(tree);
            }
        }
        self.bound = outer;
    }

    fn expr(&mut self, expr: &Expr) {
        match &**expr {
            Node::Variable(var) => {
                if !self.names.contains_key(var) {
                    self.assign(var);
                    if !self.bound.contains(var) {
                        self.free.push(var.clone());
                    }
                }
            }
            Node::Lambda(lambda) => {
                let mark = self.bound.len();
                for param in &lambda.params {
                    self.assign(param);
                    self.bound.push(param.clone());
                }
                self.expr(&lambda.body);
                self.bound.truncate(mark);
                return;
            }
            Node::Constant(Constant {
                value: Value::Tree(tree),
                ..
            }) => self.expr(tree),
            _ => {}
        }
        for child in children(expr) {
            self.expr(child);
        }
    }

    fn assign(&mut self, var: &Variable) {
        if self.names.contains_key(var) {
            return;
        }
        let base = if is_plain_name(var.name()) {
            var.name().to_string()
        } else {
            "v".to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.taken.insert(candidate.clone());
        self.names.insert(var.clone(), candidate);
    }
}

fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&name)
}

// --- Layout ---

enum Doc {
    Text(String),
    /// `(item item ..)`; the first `inline` items stay on the opening line
    /// when the form is broken.
    Form {
        items: Vec<Doc>,
        inline: usize,
        annotation: Option<Type>,
    },
}

fn text(s: impl Into<String>) -> Doc {
    Doc::Text(s.into())
}

fn form(head: &str, rest: Vec<Doc>) -> Doc {
    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push(text(head));
    items.extend(rest);
    Doc::Form {
        items,
        inline: 1,
        annotation: None,
    }
}

/// A parenthesized list with no head, such as call arguments.
fn list(items: Vec<Doc>) -> Doc {
    Doc::Form {
        items,
        inline: 1,
        annotation: None,
    }
}

impl Doc {
    fn inline(mut self, n: usize) -> Self {
        if let Doc::Form { inline, .. } = &mut self {
            *inline = n;
        }
        self
    }

    /// Attach `: actual` unless it equals the type the notation derives.
    fn annotate(mut self, actual: &Type, derived: &Type) -> Self {
        if actual != derived {
            if let Doc::Form { annotation, .. } = &mut self {
                *annotation = Some(actual.clone());
            }
        }
        self
    }

    fn flat(&self) -> String {
        match self {
            Doc::Text(s) => s.clone(),
            Doc::Form {
                items, annotation, ..
            } => {
                let parts: Vec<String> = items.iter().map(Doc::flat).collect();
                match annotation {
                    Some(ty) => format!("({} : {})", parts.join(" "), ty),
                    None => format!("({})", parts.join(" ")),
                }
            }
        }
    }
}

struct Printer<'n> {
    names: &'n HashMap<Variable, String>,
}

impl Printer<'_> {
    fn name<'a>(&'a self, var: &'a Variable) -> &'a str {
        self.names.get(var).map_or(var.name(), String::as_str)
    }

    fn render(&self, doc: &Doc, column: usize, out: &mut String) {
        let flat = doc.flat();
        if column + flat.len() <= MAX_WIDTH {
            out.push_str(&flat);
            return;
        }
        let Doc::Form {
            items,
            inline,
            annotation,
        } = doc
        else {
            out.push_str(&flat);
            return;
        };
        out.push('(');
        let nested = column + INDENT;
        for (i, item) in items.iter().enumerate() {
            if i == 0 {
                self.render(item, column + 1, out);
            } else if i < *inline {
                out.push(' ');
                self.render(item, nested, out);
            } else {
                out.push('\n');
                out.push_str(&" ".repeat(nested));
                self.render(item, nested, out);
            }
        }
        if let Some(ty) = annotation {
            out.push_str(&format!(" : {}", ty));
        }
        out.push(')');
    }

    fn emit_closure(&self, closure: &Closure, out: &mut String) {
        let fields: Vec<(String, Doc)> = closure
            .fields()
            .iter()
            .map(|(name, value)| (name.clone(), self.value(value)))
            .collect();
        if fields.is_empty() {
            out.push_str(&format!("closure {} {{ }}\n", closure.name()));
            return;
        }
        let flat: Vec<String> = fields
            .iter()
            .map(|(name, doc)| format!("{} = {}", name, doc.flat()))
            .collect();
        let line = format!("closure {} {{ {} }}", closure.name(), flat.join(", "));
        if line.len() <= MAX_WIDTH {
            out.push_str(&line);
            out.push('\n');
            return;
        }
        out.push_str(&format!("closure {} {{\n", closure.name()));
        for (name, doc) in &fields {
            let prefix = format!("{}{} = ", FIELD_INDENT, name);
            out.push_str(&prefix);
            self.render(doc, prefix.len(), out);
            out.push_str(",\n");
        }
        out.push_str("}\n");
    }

    // --- Nodes ---

    fn expr(&self, expr: &Expr) -> Doc {
        match &**expr {
            Node::Constant(constant) => self.constant(constant),
            Node::Variable(var) => text(self.name(var)),
            Node::Unary(n) => {
                let operand = self.expr(&n.operand);
                if n.op.takes_type() {
                    return form(n.op.as_str(), vec![operand, text(n.ty.to_string())]);
                }
                let derived = match n.op {
                    UnaryOp::ArrayLength => Type::Int,
                    UnaryOp::Quote => Type::expr_of(n.operand.ty()),
                    _ => n.operand.ty(),
                };
                form(n.op.as_str(), vec![operand]).annotate(&n.ty, &derived)
            }
            Node::Binary(n) => {
                let derived = n.op.result_type(&n.left.ty(), &n.right.ty());
                form(n.op.as_str(), vec![self.expr(&n.left), self.expr(&n.right)])
                    .annotate(&n.ty, &derived)
            }
            Node::TypeIs(n) => form("is", vec![self.expr(&n.expr), text(n.type_operand.to_string())]),
            Node::Conditional(n) => form(
                "if",
                vec![self.expr(&n.test), self.expr(&n.if_true), self.expr(&n.if_false)],
            )
            .annotate(&n.ty, &n.if_true.ty()),
            Node::MemberAccess(n) => form(
                n.member.kind.keyword(),
                vec![
                    self.object(n.object.as_ref()),
                    text(n.member.to_string()),
                    text(n.member.ty.to_string()),
                ],
            ),
            Node::Call(call) => self.call(call),
            Node::Lambda(n) => {
                let params: Vec<String> = n
                    .params
                    .iter()
                    .map(|p| format!("({} {})", self.name(p), p.ty()))
                    .collect();
                let derived = Type::func(
                    n.params.iter().map(|p| p.ty().clone()).collect(),
                    n.body.ty(),
                );
                form(
                    "lambda",
                    vec![text(format!("({})", params.join(" "))), self.expr(&n.body)],
                )
                .inline(2)
                .annotate(&n.ty, &derived)
            }
            Node::New(construct) => self.construct(construct),
            Node::NewArray(n) => {
                let head = match n.kind {
                    ArrayKind::Init => "array",
                    ArrayKind::Bounds => "array_bounds",
                };
                let mut rest = vec![text(n.elem_ty.to_string())];
                rest.extend(n.exprs.iter().map(|e| self.expr(e)));
                form(head, rest).inline(2)
            }
            Node::Invocation(n) => {
                let derived = n.target.ty().return_type().cloned().unwrap_or(Type::Object);
                let mut rest = vec![self.expr(&n.target)];
                rest.extend(n.args.iter().map(|a| self.expr(a)));
                form("invoke", rest).annotate(&n.ty, &derived)
            }
            Node::MemberInit(n) => {
                let mut rest = vec![self.construct(&n.construct)];
                rest.extend(n.bindings.iter().map(|b| self.binding(b)));
                form("init", rest)
            }
            Node::ListInit(n) => {
                let mut rest = vec![self.construct(&n.construct)];
                rest.extend(n.initializers.iter().map(|e| self.element(e)));
                form("list_init", rest)
            }
            Node::Extension(n) => form("ext", vec![text(n.kind.clone()), text(n.ty.to_string())]),
        }
    }

    fn object(&self, object: Option<&Expr>) -> Doc {
        match object {
            Some(object) => self.expr(object),
            None => text("static"),
        }
    }

    fn call(&self, call: &Call) -> Doc {
        let ret = &call.method.ret;
        match (call.method.intrinsic, &call.object, call.args.as_slice()) {
            (Some(Intrinsic::Invoke), None, [target, ..]) => {
                let derived = target.ty().return_type().cloned().unwrap_or(Type::Object);
                form("invoke!", call.args.iter().map(|a| self.expr(a)).collect())
                    .annotate(ret, &derived)
            }
            (Some(Intrinsic::AsExpandable), None, [query]) => {
                form("expandable", vec![self.expr(query)]).annotate(ret, &query.ty())
            }
            (Some(Intrinsic::Compile), Some(tree), []) => {
                form("compile", vec![self.expr(tree)]).annotate(ret, tree.ty().delegate())
            }
            _ => form(
                "call",
                vec![
                    self.object(call.object.as_ref()),
                    text(call.method.to_string()),
                    list(call.args.iter().map(|a| self.expr(a)).collect()),
                    text(ret.to_string()),
                ],
            ),
        }
    }

    fn construct(&self, construct: &Construct) -> Doc {
        let mut rest = vec![
            text(construct.ty.to_string()),
            list(construct.args.iter().map(|a| self.expr(a)).collect()),
        ];
        if let Some(members) = &construct.members {
            rest.extend(members.iter().map(member_ref));
        }
        form("new", rest).inline(2)
    }

    fn binding(&self, binding: &Binding) -> Doc {
        match binding {
            Binding::Assign { member, expr } => form("=", vec![member_ref(member), self.expr(expr)]),
            Binding::Member { member, bindings } => {
                let mut rest = vec![member_ref(member)];
                rest.extend(bindings.iter().map(|b| self.binding(b)));
                form("bind", rest).inline(2)
            }
            Binding::List {
                member,
                initializers,
            } => {
                let mut rest = vec![member_ref(member)];
                rest.extend(initializers.iter().map(|e| self.element(e)));
                form("list", rest).inline(2)
            }
        }
    }

    fn element(&self, init: &ElementInit) -> Doc {
        let mut rest = vec![text(init.add_method.to_string())];
        rest.extend(init.args.iter().map(|a| self.expr(a)));
        form("add", rest).inline(2)
    }

    // --- Constants ---

    fn constant(&self, constant: &Constant) -> Doc {
        let bare = match (&constant.value, &constant.ty) {
            (Value::Null, Type::Object)
            | (Value::Bool(_), Type::Bool)
            | (Value::Int(_), Type::Int)
            | (Value::Float(_), Type::Float)
            | (Value::Str(_), Type::Str) => true,
            (Value::Closure(closure), Type::Named(name)) => closure.name() == name,
            (Value::Tree(tree), Type::Expr(inner)) => **inner == tree.ty(),
            _ => false,
        };
        let value = self.value(&constant.value);
        if bare {
            value
        } else {
            form("const", vec![value, text(constant.ty.to_string())])
        }
    }

    fn value(&self, value: &Value) -> Doc {
        match value {
            Value::Null => text("null"),
            Value::Bool(b) => text(b.to_string()),
            Value::Int(n) => text(n.to_string()),
            Value::Float(x) => text(format!("{:?}", x)),
            Value::Str(s) => text(quote(s)),
            Value::Tree(tree) => form("tree", vec![self.expr(tree)]),
            Value::Closure(closure) => text(closure.name()),
        }
    }
}

fn member_ref(member: &Member) -> Doc {
    text(format!("({} {} {})", member.kind.keyword(), member, member.ty))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
