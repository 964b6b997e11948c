//! Generic copy-on-write tree walker.
//!
//! [`Walker::visit`] dispatches on the node kind to a `visit_*` method.
//! Every default `visit_*` calls the matching `walk_*` function, which
//! visits the children and rebuilds the node only when at least one child
//! came back as a different `Arc`. Unchanged subtrees are returned as the
//! original allocation, so a walker that changes nothing returns its input.
//!
//! Override individual `visit_*` methods to change behavior for one kind;
//! call the `walk_*` function from the override to keep the default
//! traversal for the rest of the node.


use std::sync::Arc;

use crate::ast::*;
use crate::error::{Result, RewriteError};

/// Nesting limit shared across a walk.
#[derive(Clone, Debug)]
pub struct DepthGuard {
    depth: u32,
    limit: u32,
}

impl DepthGuard {
    pub fn new(limit: u32) -> Self {
        Self { depth: 0, limit }
    }

    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.limit {
            self.depth -= 1;
            return Err(RewriteError::DepthExceeded { limit: self.limit });
        }
        Ok(())
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

pub trait Walker {
    /// Guard consulted on every [`Walker::visit`]; `None` walks unbounded.
    fn depth_guard(&mut self) -> Option<&mut DepthGuard> {
        None
    }

    fn visit(&mut self, expr: &Expr) -> Result<Expr> {
        if let Some(guard) = self.depth_guard() {
            guard.enter()?;
        }
        let out = dispatch(self, expr);
        if let Some(guard) = self.depth_guard() {
            guard.exit();
        }
        out
    }

    /// Absent children stay absent.
    fn visit_opt(&mut self, expr: Option<&Expr>) -> Result<Option<Expr>> {
        expr.map(|e| self.visit(e)).transpose()
    }

    /// Visit a list; `None` means every element came back unchanged.
    fn visit_list(&mut self, exprs: &[Expr]) -> Result<Option<Vec<Expr>>> {
        walk_list(exprs, |e| self.visit(e))
    }

    fn visit_unary(&mut self, expr: &Expr, node: &Unary) -> Result<Expr> {
        walk_unary(self, expr, node)
    }

    fn visit_binary(&mut self, expr: &Expr, node: &Binary) -> Result<Expr> {
        walk_binary(self, expr, node)
    }

    fn visit_type_is(&mut self, expr: &Expr, node: &TypeIs) -> Result<Expr> {
        walk_type_is(self, expr, node)
    }

    fn visit_conditional(&mut self, expr: &Expr, node: &Conditional) -> Result<Expr> {
        walk_conditional(self, expr, node)
    }

    fn visit_constant(&mut self, expr: &Expr, _node: &Constant) -> Result<Expr> {
        Ok(expr.clone())
    }

    fn visit_variable(&mut self, expr: &Expr, _var: &Variable) -> Result<Expr> {
        Ok(expr.clone())
    }

    fn visit_member_access(&mut self, expr: &Expr, node: &MemberAccess) -> Result<Expr> {
        walk_member_access(self, expr, node)
    }

    fn visit_call(&mut self, expr: &Expr, node: &Call) -> Result<Expr> {
        walk_call(self, expr, node)
    }

    fn visit_lambda(&mut self, expr: &Expr, node: &Lambda) -> Result<Expr> {
        walk_lambda(self, expr, node)
    }

    fn visit_new(&mut self, expr: &Expr, construct: &Arc<Construct>) -> Result<Expr> {
        let rebuilt = self.visit_construct(construct)?;
        if Arc::ptr_eq(&rebuilt, construct) {
            return Ok(expr.clone());
        }
        Ok(Arc::new(Node::New(rebuilt)))
    }

    fn visit_new_array(&mut self, expr: &Expr, node: &NewArray) -> Result<Expr> {
        walk_new_array(self, expr, node)
    }

    fn visit_invocation(&mut self, expr: &Expr, node: &Invocation) -> Result<Expr> {
        walk_invocation(self, expr, node)
    }

    fn visit_member_init(&mut self, expr: &Expr, node: &MemberInit) -> Result<Expr> {
        walk_member_init(self, expr, node)
    }

    fn visit_list_init(&mut self, expr: &Expr, node: &ListInit) -> Result<Expr> {
        walk_list_init(self, expr, node)
    }

    /// Kinds outside the query dialect cannot be traversed safely.
    fn visit_extension(&mut self, _expr: &Expr, node: &Extension) -> Result<Expr> {
        Err(RewriteError::UnhandledKind {
            kind: node.kind.clone(),
        })
    }

    fn visit_construct(&mut self, construct: &Arc<Construct>) -> Result<Arc<Construct>> {
        walk_construct(self, construct)
    }

    fn visit_binding(&mut self, binding: &Arc<Binding>) -> Result<Arc<Binding>> {
        walk_binding(self, binding)
    }

    fn visit_element_init(&mut self, init: &Arc<ElementInit>) -> Result<Arc<ElementInit>> {
        walk_element_init(self, init)
    }
}

/// Route `expr` to the `visit_*` method for its kind.
pub fn dispatch<W: Walker + ?Sized>(w: &mut W, expr: &Expr) -> Result<Expr> {
    match &**expr {
        Node::Unary(n) => w.visit_unary(expr, n),
        Node::Binary(n) => w.visit_binary(expr, n),
        Node::TypeIs(n) => w.visit_type_is(expr, n),
        Node::Conditional(n) => w.visit_conditional(expr, n),
        Node::Constant(n) => w.visit_constant(expr, n),
        Node::Variable(var) => w.visit_variable(expr, var),
        Node::MemberAccess(n) => w.visit_member_access(expr, n),
        Node::Call(n) => w.visit_call(expr, n),
        Node::Lambda(n) => w.visit_lambda(expr, n),
        Node::New(c) => w.visit_new(expr, c),
        Node::NewArray(n) => w.visit_new_array(expr, n),
        Node::Invocation(n) => w.visit_invocation(expr, n),
        Node::MemberInit(n) => w.visit_member_init(expr, n),
        Node::ListInit(n) => w.visit_list_init(expr, n),
        Node::Extension(n) => w.visit_extension(expr, n),
    }
}

/// Copy-on-write map over a list of shared items.
///
/// Returns `None` when every item came back as the same `Arc`. Otherwise
/// the new list reuses the original items up to the first divergence.
pub fn walk_list<T, F>(items: &[Arc<T>], mut visit: F) -> Result<Option<Vec<Arc<T>>>>
where
    F: FnMut(&Arc<T>) -> Result<Arc<T>>,
{
    let mut out: Option<Vec<Arc<T>>> = None;
    for (i, item) in items.iter().enumerate() {
        let visited = visit(item)?;
        if let Some(list) = out.as_mut() {
            list.push(visited);
            continue;
        }
        if !Arc::ptr_eq(&visited, item) {
            let mut list = Vec::with_capacity(items.len());
            list.extend(items[..i].iter().cloned());
            list.push(visited);
            out = Some(list);
        }
    }
    Ok(out)
}

fn same(a: &Expr, b: &Expr) -> bool {
    Arc::ptr_eq(a, b)
}

fn same_opt(a: &Option<Expr>, b: &Option<Expr>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

pub fn walk_unary<W: Walker + ?Sized>(w: &mut W, expr: &Expr, node: &Unary) -> Result<Expr> {
    let operand = w.visit(&node.operand)?;
    if same(&operand, &node.operand) {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::Unary(Unary {
        op: node.op,
        operand,
        ty: node.ty.clone(),
        method: node.method.clone(),
    })))
}

pub fn walk_binary<W: Walker + ?Sized>(w: &mut W, expr: &Expr, node: &Binary) -> Result<Expr> {
    let left = w.visit(&node.left)?;
    let right = w.visit(&node.right)?;
    let conversion = w.visit_opt(node.conversion.as_ref())?;
    if same(&left, &node.left) && same(&right, &node.right) && same_opt(&conversion, &node.conversion)
    {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::Binary(Binary {
        op: node.op,
        left,
        right,
        conversion,
        lifted_to_null: node.lifted_to_null,
        method: node.method.clone(),
        ty: node.ty.clone(),
    })))
}

pub fn walk_type_is<W: Walker + ?Sized>(w: &mut W, expr: &Expr, node: &TypeIs) -> Result<Expr> {
    let inner = w.visit(&node.expr)?;
    if same(&inner, &node.expr) {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::TypeIs(TypeIs {
        expr: inner,
        type_operand: node.type_operand.clone(),
    })))
}

pub fn walk_conditional<W: Walker + ?Sized>(
    w: &mut W,
    expr: &Expr,
    node: &Conditional,
) -> Result<Expr> {
    let test = w.visit(&node.test)?;
    let if_true = w.visit(&node.if_true)?;
    let if_false = w.visit(&node.if_false)?;
    if same(&test, &node.test) && same(&if_true, &node.if_true) && same(&if_false, &node.if_false)
    {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::Conditional(Conditional {
        test,
        if_true,
        if_false,
        ty: node.ty.clone(),
    })))
}

pub fn walk_member_access<W: Walker + ?Sized>(
    w: &mut W,
    expr: &Expr,
    node: &MemberAccess,
) -> Result<Expr> {
    let object = w.visit_opt(node.object.as_ref())?;
    if same_opt(&object, &node.object) {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::MemberAccess(MemberAccess {
        object,
        member: node.member.clone(),
    })))
}

pub fn walk_call<W: Walker + ?Sized>(w: &mut W, expr: &Expr, node: &Call) -> Result<Expr> {
    let object = w.visit_opt(node.object.as_ref())?;
    let args = w.visit_list(&node.args)?;
    if same_opt(&object, &node.object) && args.is_none() {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::Call(Call {
        object,
        method: node.method.clone(),
        args: args.unwrap_or_else(|| node.args.clone()),
    })))
}

pub fn walk_lambda<W: Walker + ?Sized>(w: &mut W, expr: &Expr, node: &Lambda) -> Result<Expr> {
    let body = w.visit(&node.body)?;
    if same(&body, &node.body) {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::Lambda(Lambda {
        params: node.params.clone(),
        body,
        ty: node.ty.clone(),
    })))
}

pub fn walk_construct<W: Walker + ?Sized>(
    w: &mut W,
    construct: &Arc<Construct>,
) -> Result<Arc<Construct>> {
    match w.visit_list(&construct.args)? {
        None => Ok(construct.clone()),
        Some(args) => Ok(Arc::new(Construct {
            ty: construct.ty.clone(),
            args,
            members: construct.members.clone(),
        })),
    }
}

pub fn walk_new_array<W: Walker + ?Sized>(
    w: &mut W,
    expr: &Expr,
    node: &NewArray,
) -> Result<Expr> {
    match w.visit_list(&node.exprs)? {
        None => Ok(expr.clone()),
        Some(exprs) => Ok(Arc::new(Node::NewArray(NewArray {
            kind: node.kind,
            elem_ty: node.elem_ty.clone(),
            exprs,
        }))),
    }
}

pub fn walk_invocation<W: Walker + ?Sized>(
    w: &mut W,
    expr: &Expr,
    node: &Invocation,
) -> Result<Expr> {
    let args = w.visit_list(&node.args)?;
    let target = w.visit(&node.target)?;
    if args.is_none() && same(&target, &node.target) {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::Invocation(Invocation {
        target,
        args: args.unwrap_or_else(|| node.args.clone()),
        ty: node.ty.clone(),
    })))
}

pub fn walk_member_init<W: Walker + ?Sized>(
    w: &mut W,
    expr: &Expr,
    node: &MemberInit,
) -> Result<Expr> {
    let construct = w.visit_construct(&node.construct)?;
    let bindings = walk_list(&node.bindings, |b| w.visit_binding(b))?;
    if Arc::ptr_eq(&construct, &node.construct) && bindings.is_none() {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::MemberInit(MemberInit {
        construct,
        bindings: bindings.unwrap_or_else(|| node.bindings.clone()),
    })))
}

pub fn walk_list_init<W: Walker + ?Sized>(
    w: &mut W,
    expr: &Expr,
    node: &ListInit,
) -> Result<Expr> {
    let construct = w.visit_construct(&node.construct)?;
    let initializers = walk_list(&node.initializers, |i| w.visit_element_init(i))?;
    if Arc::ptr_eq(&construct, &node.construct) && initializers.is_none() {
        return Ok(expr.clone());
    }
    Ok(Arc::new(Node::ListInit(ListInit {
        construct,
        initializers: initializers.unwrap_or_else(|| node.initializers.clone()),
    })))
}

pub fn walk_binding<W: Walker + ?Sized>(w: &mut W, binding: &Arc<Binding>) -> Result<Arc<Binding>> {
    let rebuilt = match &**binding {
        Binding::Assign { member, expr } => {
            let visited = w.visit(expr)?;
            if same(&visited, expr) {
                return Ok(binding.clone());
            }
            Binding::Assign {
                member: member.clone(),
                expr: visited,
            }
        }
        Binding::Member { member, bindings } => {
            match walk_list(bindings, |b| w.visit_binding(b))? {
                None => return Ok(binding.clone()),
                Some(bindings) => Binding::Member {
                    member: member.clone(),
                    bindings,
                },
            }
        }
        Binding::List {
            member,
            initializers,
        } => match walk_list(initializers, |i| w.visit_element_init(i))? {
            None => return Ok(binding.clone()),
            Some(initializers) => Binding::List {
                member: member.clone(),
                initializers,
            },
        },
    };
    Ok(Arc::new(rebuilt))
}

pub fn walk_element_init<W: Walker + ?Sized>(
    w: &mut W,
    init: &Arc<ElementInit>,
) -> Result<Arc<ElementInit>> {
    match w.visit_list(&init.args)? {
        None => Ok(init.clone()),
        Some(args) => Ok(Arc::new(ElementInit {
            add_method: init.add_method.clone(),
            args,
        })),
    }
}
