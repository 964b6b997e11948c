use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};


const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
    /// Lexically visible variables, innermost last.
    scopes: Vec<(String, Variable)>,
    closures: HashMap<String, Arc<Closure>>,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
            scopes: Vec::new(),
            closures: HashMap::new(),
        }
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_with_help(
                "nesting depth exceeded (maximum 256 levels)",
                "split the tree into smaller lambdas invoked from each other",
            );
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn parse_file(mut self) -> Result<Expr, Vec<Diagnostic>> {
        loop {
            if self.at(&Lexeme::Closure) {
                self.parse_closure_decl();
            } else if self.at(&Lexeme::Free) {
                self.parse_free_decl();
            } else {
                break;
            }
        }
        let expr = self.parse_expr();
        if !self.at(&Lexeme::Eof) {
            self.error_with_help(
                &format!("expected end of file, found {}", self.peek().description()),
                "a file holds declarations followed by exactly one expression",
            );
        }
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(expr)
    }

    // --- Declarations ---

    /// `free x: Int`
    fn parse_free_decl(&mut self) {
        self.expect(&Lexeme::Free);
        let name = self.expect_ident();
        self.expect(&Lexeme::Colon);
        let ty = self.parse_type();
        if self.scopes.iter().any(|(n, _)| *n == name.node) {
            self.diagnostics.push(Diagnostic::error(
                format!("free variable '{}' declared twice", name.node),
                name.span,
            ));
            return;
        }
        let var = Variable::new(name.node.clone(), ty);
        self.scopes.push((name.node, var));
    }

    /// `closure Env0 { pred = (tree ...), limit = 3 }`
    fn parse_closure_decl(&mut self) {
        self.expect(&Lexeme::Closure);
        let name = self.expect_ident();
        self.expect(&Lexeme::LBrace);
        let mut fields: Vec<(String, Value)> = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            let field = self.expect_ident();
            self.expect(&Lexeme::Eq);
            let (value, _) = self.parse_value();
            if fields.iter().any(|(f, _)| *f == field.node) {
                self.diagnostics.push(Diagnostic::error(
                    format!("field '{}' declared twice in closure '{}'", field.node, name.node),
                    field.span,
                ));
            } else {
                fields.push((field.node, value));
            }
            if !self.eat(&Lexeme::Comma) && !self.at(&Lexeme::RBrace) {
                self.error_at_current(&format!(
                    "expected ',' or '}}' after closure field, found {}",
                    self.peek().description()
                ));
                self.advance();
            }
        }
        self.expect(&Lexeme::RBrace);

        if self.closures.contains_key(&name.node) {
            self.diagnostics.push(
                Diagnostic::error(format!("closure '{}' declared twice", name.node), name.span)
                    .with_help("closure names identify capture types and must be unique".to_string()),
            );
            return;
        }
        let closure = Closure::new(name.node.clone(), fields);
        self.closures.insert(name.node, closure);
    }

    /// A constant payload and the type it has when written bare.
    fn parse_value(&mut self) -> (Value, Type) {
        match self.peek().clone() {
            Lexeme::Integer(n) => {
                self.advance();
                (Value::Int(n), Type::Int)
            }
            Lexeme::Float(x) => {
                self.advance();
                (Value::Float(x), Type::Float)
            }
            Lexeme::Str(s) => {
                self.advance();
                (Value::Str(s), Type::Str)
            }
            Lexeme::True => {
                self.advance();
                (Value::Bool(true), Type::Bool)
            }
            Lexeme::False => {
                self.advance();
                (Value::Bool(false), Type::Bool)
            }
            Lexeme::Null => {
                self.advance();
                (Value::Null, Type::Object)
            }
            Lexeme::Ident(name) => {
                let span = self.current_span();
                self.advance();
                match self.closures.get(&name) {
                    Some(closure) => (Value::Closure(closure.clone()), Type::named(name)),
                    None => {
                        self.diagnostics.push(
                            Diagnostic::error(format!("unknown closure '{}'", name), span)
                                .with_help("declare closures before the values that use them".to_string()),
                        );
                        (Value::Null, Type::Object)
                    }
                }
            }
            Lexeme::LParen if self.head_is("tree") => {
                self.advance();
                self.advance();
                let tree = self.parse_expr();
                self.expect(&Lexeme::RParen);
                let ty = Type::expr_of(tree.ty());
                (Value::Tree(tree), ty)
            }
            other => {
                self.error_with_help(
                    &format!("expected constant value, found {}", other.description()),
                    "values are literals, `null`, a closure name, or `(tree <expr>)`",
                );
                self.skip_form();
                (Value::Null, Type::Object)
            }
        }
    }

    // --- Expressions ---

    fn parse_expr(&mut self) -> Expr {
        if !self.enter_nesting() {
            self.skip_form();
            self.exit_nesting();
            return error_node();
        }
        let expr = self.parse_expr_inner();
        self.exit_nesting();
        expr
    }

    fn parse_expr_inner(&mut self) -> Expr {
        match self.peek().clone() {
            Lexeme::Integer(n) => {
                self.advance();
                Node::int(n)
            }
            Lexeme::Float(x) => {
                self.advance();
                Node::constant(Value::Float(x), Type::Float)
            }
            Lexeme::Str(s) => {
                self.advance();
                Node::str(s)
            }
            Lexeme::True => {
                self.advance();
                Node::bool(true)
            }
            Lexeme::False => {
                self.advance();
                Node::bool(false)
            }
            Lexeme::Null => {
                self.advance();
                Node::constant(Value::Null, Type::Object)
            }
            Lexeme::Ident(name) => {
                let span = self.current_span();
                self.advance();
                self.resolve_name(&name, span)
            }
            Lexeme::LParen => self.parse_form(),
            Lexeme::RParen | Lexeme::Eof => {
                self.error_at_current(&format!(
                    "expected expression, found {}",
                    self.peek().description()
                ));
                error_node()
            }
            other => {
                self.error_at_current(&format!("expected expression, found {}", other.description()));
                self.advance();
                error_node()
            }
        }
    }

    fn resolve_name(&mut self, name: &str, span: Span) -> Expr {
        if let Some((_, var)) = self.scopes.iter().rev().find(|(n, _)| n == name) {
            return Node::var(var);
        }
        if let Some(closure) = self.closures.get(name) {
            return Node::closure(closure);
        }
        self.diagnostics.push(
            Diagnostic::error(format!("unknown variable '{}'", name), span)
                .with_help(format!("bind it in a lambda or declare it with `free {}: <type>`", name)),
        );
        error_node()
    }

    /// `( head ... [: Type] )`
    fn parse_form(&mut self) -> Expr {
        let open = self.expect(&Lexeme::LParen);
        let head = match self.peek().clone() {
            Lexeme::Ident(head) => {
                self.advance();
                head
            }
            other => {
                self.error_with_help(
                    &format!("expected form name, found {}", other.description()),
                    "forms start with a name, e.g. `(add a b)` or `(lambda ((x Int)) x)`",
                );
                self.skip_to_close();
                self.eat(&Lexeme::RParen);
                return error_node();
            }
        };

        let expr = self.parse_form_body(&head, open);

        let expr = if self.eat(&Lexeme::Colon) {
            let span = self.current_span();
            let ty = self.parse_type();
            match with_type(&expr, ty) {
                Some(retyped) => retyped,
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        format!("a {} cannot carry a type annotation", expr.kind()),
                        span,
                    ));
                    expr
                }
            }
        } else {
            expr
        };

        if !self.at(&Lexeme::RParen) {
            self.error_at_current(&format!(
                "expected ')' to close '{}', found {}",
                head,
                self.peek().description()
            ));
            self.skip_to_close();
        }
        self.eat(&Lexeme::RParen);
        expr
    }

    fn parse_form_body(&mut self, head: &str, open: Span) -> Expr {
        if let Some(op) = UnaryOp::from_keyword(head) {
            let operand = self.parse_expr();
            if op.takes_type() {
                let ty = self.parse_type();
                return Node::unary_typed(op, operand, ty);
            }
            return Node::unary(op, operand);
        }
        if let Some(op) = BinaryOp::from_keyword(head) {
            let left = self.parse_expr();
            let right = self.parse_expr();
            return Node::binary(op, left, right);
        }

        match head {
            "is" => {
                let expr = self.parse_expr();
                let ty = self.parse_type();
                Node::type_is(expr, ty)
            }
            "if" => {
                let test = self.parse_expr();
                let if_true = self.parse_expr();
                let if_false = self.parse_expr();
                Node::conditional(test, if_true, if_false)
            }
            "const" => {
                let (value, _) = self.parse_value();
                let ty = self.parse_type();
                Node::constant(value, ty)
            }
            "tree" => Node::tree(self.parse_expr()),
            "lambda" => self.parse_lambda(),
            "invoke" => {
                let target = self.parse_expr();
                let args = self.parse_exprs_until_close();
                Node::invoke(target, args)
            }
            "invoke!" => {
                let target = self.parse_expr();
                let args = self.parse_exprs_until_close();
                Node::invoke_expr(target, args)
            }
            "expandable" => Node::as_expandable(self.parse_expr()),
            "compile" => Node::compile(self.parse_expr()),
            "field" | "prop" => {
                let object = self.parse_object();
                let member = self.parse_member_tail(head == "field");
                Node::member(object, member)
            }
            "call" => {
                let object = self.parse_object();
                let (owner, name) = self.parse_path();
                self.expect(&Lexeme::LParen);
                let args = self.parse_exprs_until_close();
                self.expect(&Lexeme::RParen);
                let ret = self.parse_type();
                let method = match object {
                    Some(_) => Method::instance(owner.node, name.node, ret),
                    None => Method::new_static(owner.node, name.node, ret),
                };
                Node::call(object, method, args)
            }
            "new" => Arc::new(Node::New(self.parse_construct_tail())),
            "array" | "array_bounds" => {
                let kind = if head == "array" {
                    ArrayKind::Init
                } else {
                    ArrayKind::Bounds
                };
                let elem_ty = self.parse_type();
                let exprs = self.parse_exprs_until_close();
                Node::new_array(kind, elem_ty, exprs)
            }
            "init" | "list_init" => {
                let construct = self.parse_construct_form();
                if head == "init" {
                    let mut bindings = Vec::new();
                    while self.at(&Lexeme::LParen) {
                        bindings.push(Arc::new(self.parse_binding()));
                    }
                    Node::member_init(construct, bindings)
                } else {
                    let mut initializers = Vec::new();
                    while self.at(&Lexeme::LParen) {
                        initializers.push(Arc::new(self.parse_element()));
                    }
                    Node::list_init(construct, initializers)
                }
            }
            "ext" => {
                let kind = self.expect_ident();
                let ty = self.parse_type();
                Node::extension(kind.node, ty)
            }
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("unknown form '{}'", head),
                        open.to(self.prev_span()),
                    )
                    .with_help(
                        "operators are words such as `add`, `gt`, `and_also`; see `treexpand --help`"
                            .to_string(),
                    ),
                );
                self.skip_to_close();
                error_node()
            }
        }
    }

    /// `((x Int) (y Str)) body`
    fn parse_lambda(&mut self) -> Expr {
        self.expect(&Lexeme::LParen);
        let mut params = Vec::new();
        while self.at(&Lexeme::LParen) {
            self.advance();
            let name = self.expect_ident();
            let ty = self.parse_type();
            self.expect(&Lexeme::RParen);
            if params.iter().any(|p: &Variable| p.name() == name.node) {
                self.diagnostics.push(Diagnostic::error(
                    format!("parameter '{}' declared twice", name.node),
                    name.span,
                ));
            }
            params.push(Variable::new(name.node, ty));
        }
        self.expect(&Lexeme::RParen);

        let mark = self.scopes.len();
        for param in &params {
            self.scopes.push((param.name().to_string(), param.clone()));
        }
        let body = self.parse_expr();
        self.scopes.truncate(mark);
        Node::lambda(params, body)
    }

    /// `static` or an object expression.
    fn parse_object(&mut self) -> Option<Expr> {
        if self.eat(&Lexeme::Static) {
            None
        } else {
            Some(self.parse_expr())
        }
    }

    /// `Owner::name Type`, after the member kind.
    fn parse_member_tail(&mut self, is_field: bool) -> Member {
        let (owner, name) = self.parse_path();
        let ty = self.parse_type();
        let owner = if self.closures.contains_key(&owner.node) {
            MemberOwner::Closure(owner.node)
        } else {
            MemberOwner::Type(owner.node)
        };
        Member {
            owner,
            name: name.node,
            kind: if is_field {
                MemberKind::Field
            } else {
                MemberKind::Property
            },
            ty,
        }
    }

    /// `(field Owner::name Type)` or `(prop Owner::name Type)`
    fn parse_member_ref(&mut self) -> Member {
        self.expect(&Lexeme::LParen);
        let kind = self.expect_ident();
        let is_field = match kind.node.as_str() {
            "field" => true,
            "prop" => false,
            other => {
                self.diagnostics.push(Diagnostic::error(
                    format!("expected 'field' or 'prop', found '{}'", other),
                    kind.span,
                ));
                false
            }
        };
        let member = self.parse_member_tail(is_field);
        self.expect(&Lexeme::RParen);
        member
    }

    /// `Type (args..) member-ref*`, after `new`.
    fn parse_construct_tail(&mut self) -> Arc<Construct> {
        let ty = self.parse_type();
        self.expect(&Lexeme::LParen);
        let args = self.parse_exprs_until_close();
        self.expect(&Lexeme::RParen);
        let mut members = Vec::new();
        while self.at(&Lexeme::LParen) {
            members.push(self.parse_member_ref());
        }
        Arc::new(Construct {
            ty,
            args,
            members: (!members.is_empty()).then_some(members),
        })
    }

    /// `(new Type (args..) member-ref*)`
    fn parse_construct_form(&mut self) -> Arc<Construct> {
        self.expect(&Lexeme::LParen);
        let head = self.expect_ident();
        if head.node != "new" {
            self.diagnostics.push(Diagnostic::error(
                format!("expected a `(new ...)` form, found '{}'", head.node),
                head.span,
            ));
        }
        let construct = self.parse_construct_tail();
        self.expect(&Lexeme::RParen);
        construct
    }

    fn parse_binding(&mut self) -> Binding {
        let open = self.expect(&Lexeme::LParen);
        if self.eat(&Lexeme::Eq) {
            let member = self.parse_member_ref();
            let expr = self.parse_expr();
            self.expect(&Lexeme::RParen);
            return Binding::Assign { member, expr };
        }
        let head = self.expect_ident();
        let member = self.parse_member_ref();
        let binding = match head.node.as_str() {
            "bind" => {
                let mut bindings = Vec::new();
                while self.at(&Lexeme::LParen) {
                    bindings.push(Arc::new(self.parse_binding()));
                }
                Binding::Member { member, bindings }
            }
            "list" => {
                let mut initializers = Vec::new();
                while self.at(&Lexeme::LParen) {
                    initializers.push(Arc::new(self.parse_element()));
                }
                Binding::List {
                    member,
                    initializers,
                }
            }
            other => {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("unknown binding '{}'", other),
                        open.to(head.span),
                    )
                    .with_help("bindings are `(= member expr)`, `(bind member ..)` or `(list member ..)`".to_string()),
                );
                Binding::Member {
                    member,
                    bindings: Vec::new(),
                }
            }
        };
        self.expect(&Lexeme::RParen);
        binding
    }

    /// `(add Owner::name args..)`
    fn parse_element(&mut self) -> ElementInit {
        self.expect(&Lexeme::LParen);
        let head = self.expect_ident();
        if head.node != "add" {
            self.diagnostics.push(Diagnostic::error(
                format!("expected element initializer `(add ...)`, found '{}'", head.node),
                head.span,
            ));
        }
        let (owner, name) = self.parse_path();
        let args = self.parse_exprs_until_close();
        self.expect(&Lexeme::RParen);
        ElementInit {
            add_method: Method::instance(owner.node, name.node, Type::Unit),
            args,
        }
    }

    fn parse_exprs_until_close(&mut self) -> Vec<Expr> {
        let mut exprs = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Colon) && !self.at(&Lexeme::Eof) {
            exprs.push(self.parse_expr());
        }
        exprs
    }

    // --- Types and paths ---

    fn parse_type(&mut self) -> Type {
        match self.peek().clone() {
            Lexeme::LBracket => {
                self.advance();
                let elem = self.parse_type();
                self.expect(&Lexeme::RBracket);
                Type::Array(Box::new(elem))
            }
            Lexeme::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "Unit" => Type::Unit,
                    "Bool" => Type::Bool,
                    "Int" => Type::Int,
                    "Float" => Type::Float,
                    "Str" => Type::Str,
                    "Object" => Type::Object,
                    "Fn" if self.at(&Lexeme::LParen) => {
                        self.advance();
                        let mut params = Vec::new();
                        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
                            params.push(self.parse_type());
                            if !self.eat(&Lexeme::Comma) {
                                break;
                            }
                        }
                        self.expect(&Lexeme::RParen);
                        self.expect(&Lexeme::Arrow);
                        let ret = self.parse_type();
                        Type::func(params, ret)
                    }
                    "Expr" if self.at(&Lexeme::Lt) => {
                        self.advance();
                        let inner = self.parse_type();
                        self.expect(&Lexeme::Gt);
                        Type::expr_of(inner)
                    }
                    _ => Type::Named(name),
                }
            }
            other => {
                self.error_with_help(
                    &format!("expected type, found {}", other.description()),
                    "types are Int, Float, Bool, Str, Unit, Object, a name, [T], Fn(..) -> T or Expr<T>",
                );
                if !matches!(other, Lexeme::RParen | Lexeme::Eof) {
                    self.advance();
                }
                Type::Object
            }
        }
    }

    /// `Owner::name`
    fn parse_path(&mut self) -> (Spanned<String>, Spanned<String>) {
        let owner = self.expect_ident();
        self.expect(&Lexeme::ColonColon);
        let name = self.expect_ident();
        (owner, name)
    }

    // --- Recovery ---

    /// Skip one expression-sized chunk: a balanced form or a single token.
    fn skip_form(&mut self) {
        if !self.at(&Lexeme::LParen) {
            if !matches!(self.peek(), Lexeme::RParen | Lexeme::Eof) {
                self.advance();
            }
            return;
        }
        self.advance();
        self.skip_to_close();
        self.eat(&Lexeme::RParen);
    }

    /// Skip to the paren closing the current form, leaving it unconsumed.
    fn skip_to_close(&mut self) {
        let mut depth = 0u32;
        while !self.at(&Lexeme::Eof) {
            match self.peek() {
                Lexeme::LParen => depth += 1,
                Lexeme::RParen if depth == 0 => return,
                Lexeme::RParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    /// True when the current `(` opens a form named `name`.
    fn head_is(&self, name: &str) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.node),
            Some(Lexeme::Ident(head)) if head == name
        )
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            ));
            Spanned::new("_error_".to_string(), self.current_span())
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        self.diagnostics.push(
            Diagnostic::error(msg.to_string(), self.current_span()).with_help(help.to_string()),
        );
    }
}

/// Placeholder returned after an error; never escapes a failed parse.
fn error_node() -> Expr {
    Node::constant(Value::Null, Type::Object)
}

/// `expr` with its declared type replaced, for kinds whose type the
/// notation otherwise derives from the children.
fn with_type(expr: &Expr, ty: Type) -> Option<Expr> {
    let node = match &**expr {
        Node::Unary(n) => Node::Unary(Unary { ty, ..n.clone() }),
        Node::Binary(n) => Node::Binary(Binary { ty, ..n.clone() }),
        Node::Conditional(n) => Node::Conditional(Conditional { ty, ..n.clone() }),
        Node::Lambda(n) => Node::Lambda(Lambda { ty, ..n.clone() }),
        Node::Invocation(n) => Node::Invocation(Invocation { ty, ..n.clone() }),
        Node::Call(n) if n.method.intrinsic.is_some() => {
            let mut call = n.clone();
            call.method.ret = ty;
            Node::Call(call)
        }
        _ => return None,
    };
    Some(Arc::new(node))
}
