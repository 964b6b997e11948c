//! Expression-tree model.
//!
//! Nodes are immutable and shared through [`Expr`] (`Arc<Node>`). A rewrite
//! never mutates a node; it either returns the original `Arc` or builds a
//! new node around the children that changed. Variables compare by
//! allocation, so two parameters that happen to share a display name are
//! still distinct bindings.

pub mod display;
pub mod navigate;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared handle to an immutable node.
pub type Expr = Arc<Node>;

/// Declared static type of a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    Object,
    Named(String),
    Array(Box<Type>),
    /// Delegate type: `Fn(params) -> ret`.
    Fn(Vec<Type>, Box<Type>),
    /// Expression-tree type wrapping a delegate, e.g. `Expr<Fn(Int) -> Bool>`.
    Expr(Box<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Self {
        Type::Fn(params, Box::new(ret))
    }

    pub fn expr_of(inner: Type) -> Self {
        Type::Expr(Box::new(inner))
    }

    /// The delegate type behind an expression-tree type, or the type itself.
    pub fn delegate(&self) -> &Type {
        match self {
            Type::Expr(inner) => inner,
            other => other,
        }
    }

    /// Result type of invoking a value of this type.
    ///
    /// Both `Fn(..) -> R` and `Expr<Fn(..) -> R>` yield `R`.
    pub fn return_type(&self) -> Option<&Type> {
        match self.delegate() {
            Type::Fn(_, ret) => Some(ret),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

// ─── Variables ─────────────────────────────────────────────────────

#[derive(Debug)]
struct VariableData {
    name: String,
    ty: Type,
}

/// A bound parameter. Equality and hashing use the allocation, not the name.
#[derive(Clone)]
pub struct Variable(Arc<VariableData>);

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self(Arc::new(VariableData {
            name: name.into(),
            ty,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl std::fmt::Debug for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:x}: {}", self.0.name, self.addr() & 0xffff, self.0.ty)
    }
}

// ─── Constant values ───────────────────────────────────────────────

/// Payload of a [`Constant`] node.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An expression tree carried as data (a quoted lambda).
    Tree(Expr),
    /// A closure capture container.
    Closure(Arc<Closure>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tree(a), Value::Tree(b)) => Arc::ptr_eq(a, b) || a == b,
            // Closures are runtime objects: same instance or not equal.
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Container for variables captured from an enclosing scope.
///
/// Produced by the frontend for each closure scope; members reading its
/// fields carry [`MemberOwner::Closure`] with the same name.
#[derive(Debug)]
pub struct Closure {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Closure {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Value)>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

// ─── Member and method references ──────────────────────────────────

/// Declaring type of a member.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberOwner {
    Type(String),
    /// A compiler-synthesized closure capture type.
    Closure(String),
}

impl MemberOwner {
    pub fn name(&self) -> &str {
        match self {
            MemberOwner::Type(name) | MemberOwner::Closure(name) => name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Member {
    pub owner: MemberOwner,
    pub name: String,
    pub kind: MemberKind,
    pub ty: Type,
}

impl Member {
    pub fn field(owner: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            owner: MemberOwner::Type(owner.into()),
            name: name.into(),
            kind: MemberKind::Field,
            ty,
        }
    }

    pub fn property(owner: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            owner: MemberOwner::Type(owner.into()),
            name: name.into(),
            kind: MemberKind::Property,
            ty,
        }
    }

    /// A field of the closure capture type `closure`.
    pub fn captured(closure: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            owner: MemberOwner::Closure(closure.into()),
            name: name.into(),
            kind: MemberKind::Field,
            ty,
        }
    }

    /// True for fields declared on a closure capture type.
    pub fn is_captured_field(&self) -> bool {
        matches!(self.owner, MemberOwner::Closure(_)) && self.kind == MemberKind::Field
    }
}

/// Marker calls of the public expansion API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `Expandable::Invoke(lambda, args..)`: invoke an expression-valued lambda.
    Invoke,
    /// `Expandable::AsExpandable(query)`: mark a nested query as expandable.
    AsExpandable,
    /// `expr.Compile()`: turn an expression tree into a runtime delegate.
    Compile,
}

impl Intrinsic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intrinsic::Invoke => "Invoke",
            Intrinsic::AsExpandable => "AsExpandable",
            Intrinsic::Compile => "Compile",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub owner: String,
    pub name: String,
    pub is_static: bool,
    pub ret: Type,
    pub intrinsic: Option<Intrinsic>,
}

/// Declaring type of the `Invoke` and `AsExpandable` intrinsics.
pub const EXPANDABLE_OWNER: &str = "Expandable";

impl Method {
    pub fn new_static(owner: impl Into<String>, name: impl Into<String>, ret: Type) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            is_static: true,
            ret,
            intrinsic: None,
        }
    }

    pub fn instance(owner: impl Into<String>, name: impl Into<String>, ret: Type) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            is_static: false,
            ret,
            intrinsic: None,
        }
    }

    pub fn intrinsic(kind: Intrinsic, ret: Type) -> Self {
        let (owner, is_static) = match kind {
            Intrinsic::Invoke | Intrinsic::AsExpandable => (EXPANDABLE_OWNER, true),
            Intrinsic::Compile => ("Expr", false),
        };
        Self {
            owner: owner.to_string(),
            name: kind.as_str().to_string(),
            is_static,
            ret,
            intrinsic: Some(kind),
        }
    }
}

// ─── Operators ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    NegateChecked,
    Not,
    Convert,
    ConvertChecked,
    ArrayLength,
    Quote,
    TypeAs,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 8] = [
        UnaryOp::Negate,
        UnaryOp::NegateChecked,
        UnaryOp::Not,
        UnaryOp::Convert,
        UnaryOp::ConvertChecked,
        UnaryOp::ArrayLength,
        UnaryOp::Quote,
        UnaryOp::TypeAs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "neg",
            UnaryOp::NegateChecked => "neg_checked",
            UnaryOp::Not => "not",
            UnaryOp::Convert => "convert",
            UnaryOp::ConvertChecked => "convert_checked",
            UnaryOp::ArrayLength => "len",
            UnaryOp::Quote => "quote",
            UnaryOp::TypeAs => "as",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// Conversions carry an explicit target type.
    pub fn takes_type(&self) -> bool {
        matches!(
            self,
            UnaryOp::Convert | UnaryOp::ConvertChecked | UnaryOp::TypeAs
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    AddChecked,
    Subtract,
    SubtractChecked,
    Multiply,
    MultiplyChecked,
    Divide,
    Modulo,
    And,
    AndAlso,
    Or,
    OrElse,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    Coalesce,
    ArrayIndex,
    RightShift,
    LeftShift,
    ExclusiveOr,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 23] = [
        BinaryOp::Add,
        BinaryOp::AddChecked,
        BinaryOp::Subtract,
        BinaryOp::SubtractChecked,
        BinaryOp::Multiply,
        BinaryOp::MultiplyChecked,
        BinaryOp::Divide,
        BinaryOp::Modulo,
        BinaryOp::And,
        BinaryOp::AndAlso,
        BinaryOp::Or,
        BinaryOp::OrElse,
        BinaryOp::LessThan,
        BinaryOp::LessThanOrEqual,
        BinaryOp::GreaterThan,
        BinaryOp::GreaterThanOrEqual,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
        BinaryOp::Coalesce,
        BinaryOp::ArrayIndex,
        BinaryOp::RightShift,
        BinaryOp::LeftShift,
        BinaryOp::ExclusiveOr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::AddChecked => "add_checked",
            BinaryOp::Subtract => "sub",
            BinaryOp::SubtractChecked => "sub_checked",
            BinaryOp::Multiply => "mul",
            BinaryOp::MultiplyChecked => "mul_checked",
            BinaryOp::Divide => "div",
            BinaryOp::Modulo => "rem",
            BinaryOp::And => "and",
            BinaryOp::AndAlso => "and_also",
            BinaryOp::Or => "or",
            BinaryOp::OrElse => "or_else",
            BinaryOp::LessThan => "lt",
            BinaryOp::LessThanOrEqual => "le",
            BinaryOp::GreaterThan => "gt",
            BinaryOp::GreaterThanOrEqual => "ge",
            BinaryOp::Equal => "eq",
            BinaryOp::NotEqual => "ne",
            BinaryOp::Coalesce => "coalesce",
            BinaryOp::ArrayIndex => "index",
            BinaryOp::RightShift => "shr",
            BinaryOp::LeftShift => "shl",
            BinaryOp::ExclusiveOr => "xor",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// Static result type for operands `left` and `right`.
    pub fn result_type(&self, left: &Type, right: &Type) -> Type {
        match self {
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual
            | BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::AndAlso
            | BinaryOp::OrElse => Type::Bool,
            BinaryOp::ArrayIndex => left.element_type().cloned().unwrap_or(Type::Object),
            BinaryOp::Coalesce => right.clone(),
            _ => left.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// `new T[] { a, b, c }`
    Init,
    /// `new T[n, m]`
    Bounds,
}

// ─── Nodes ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Expr,
    pub ty: Type,
    /// User-defined operator implementation, if any.
    pub method: Option<Method>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
    /// Conversion lambda applied by `Coalesce`.
    pub conversion: Option<Expr>,
    pub lifted_to_null: bool,
    pub method: Option<Method>,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeIs {
    pub expr: Expr,
    pub type_operand: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Conditional {
    pub test: Expr,
    pub if_true: Expr,
    pub if_false: Expr,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub value: Value,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberAccess {
    /// `None` for static members.
    pub object: Option<Expr>,
    pub member: Member,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// `None` for static methods.
    pub object: Option<Expr>,
    pub method: Method,
    pub args: Vec<Expr>,
}

impl Call {
    pub fn is_intrinsic(&self, kind: Intrinsic) -> bool {
        self.method.intrinsic == Some(kind)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lambda {
    pub params: Vec<Variable>,
    pub body: Expr,
    /// Delegate type, `Fn(params) -> body`.
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Construct {
    pub ty: Type,
    pub args: Vec<Expr>,
    /// Members initialized by the arguments (anonymous types).
    pub members: Option<Vec<Member>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewArray {
    pub kind: ArrayKind,
    pub elem_ty: Type,
    pub exprs: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub target: Expr,
    pub args: Vec<Expr>,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberInit {
    pub construct: Arc<Construct>,
    pub bindings: Vec<Arc<Binding>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListInit {
    pub construct: Arc<Construct>,
    pub initializers: Vec<Arc<ElementInit>>,
}

/// A node kind outside the query dialect (block, loop, assign, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct Extension {
    pub kind: String,
    pub ty: Type,
}

/// Member binding inside an object initializer.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    /// `member = expr`
    Assign { member: Member, expr: Expr },
    /// `member = { nested bindings }`
    Member {
        member: Member,
        bindings: Vec<Arc<Binding>>,
    },
    /// `member = { element initializers }`
    List {
        member: Member,
        initializers: Vec<Arc<ElementInit>>,
    },
}

impl Binding {
    pub fn member(&self) -> &Member {
        match self {
            Binding::Assign { member, .. }
            | Binding::Member { member, .. }
            | Binding::List { member, .. } => member,
        }
    }
}

/// One `Add(args..)` call of a collection initializer.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementInit {
    pub add_method: Method,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Unary(Unary),
    Binary(Binary),
    TypeIs(TypeIs),
    Conditional(Conditional),
    Constant(Constant),
    Variable(Variable),
    MemberAccess(MemberAccess),
    Call(Call),
    Lambda(Lambda),
    New(Arc<Construct>),
    NewArray(NewArray),
    Invocation(Invocation),
    MemberInit(MemberInit),
    ListInit(ListInit),
    Extension(Extension),
}

impl Node {
    /// Short kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Unary(_) => "unary",
            Node::Binary(_) => "binary",
            Node::TypeIs(_) => "type test",
            Node::Conditional(_) => "conditional",
            Node::Constant(_) => "constant",
            Node::Variable(_) => "variable",
            Node::MemberAccess(_) => "member access",
            Node::Call(_) => "call",
            Node::Lambda(_) => "lambda",
            Node::New(_) => "construct",
            Node::NewArray(_) => "array construct",
            Node::Invocation(_) => "invocation",
            Node::MemberInit(_) => "object initializer",
            Node::ListInit(_) => "list initializer",
            Node::Extension(_) => "extension",
        }
    }

    /// Declared static type.
    pub fn ty(&self) -> Type {
        match self {
            Node::Unary(n) => n.ty.clone(),
            Node::Binary(n) => n.ty.clone(),
            Node::TypeIs(_) => Type::Bool,
            Node::Conditional(n) => n.ty.clone(),
            Node::Constant(n) => n.ty.clone(),
            Node::Variable(var) => var.ty().clone(),
            Node::MemberAccess(n) => n.member.ty.clone(),
            Node::Call(n) => n.method.ret.clone(),
            Node::Lambda(n) => n.ty.clone(),
            Node::New(c) => c.ty.clone(),
            Node::NewArray(n) => Type::Array(Box::new(n.elem_ty.clone())),
            Node::Invocation(n) => n.ty.clone(),
            Node::MemberInit(n) => n.construct.ty.clone(),
            Node::ListInit(n) => n.construct.ty.clone(),
            Node::Extension(n) => n.ty.clone(),
        }
    }

    // ── Constructors ──

    pub fn constant(value: Value, ty: Type) -> Expr {
        Arc::new(Node::Constant(Constant { value, ty }))
    }

    pub fn int(n: i64) -> Expr {
        Self::constant(Value::Int(n), Type::Int)
    }

    pub fn bool(b: bool) -> Expr {
        Self::constant(Value::Bool(b), Type::Bool)
    }

    pub fn str(s: impl Into<String>) -> Expr {
        Self::constant(Value::Str(s.into()), Type::Str)
    }

    /// A constant carrying `tree` as data, typed `Expr<tree type>`.
    pub fn tree(tree: Expr) -> Expr {
        let ty = Type::expr_of(tree.ty());
        Self::constant(Value::Tree(tree), ty)
    }

    /// A constant referencing a closure capture container.
    pub fn closure(closure: &Arc<Closure>) -> Expr {
        Self::constant(
            Value::Closure(closure.clone()),
            Type::named(closure.name()),
        )
    }

    pub fn var(var: &Variable) -> Expr {
        Arc::new(Node::Variable(var.clone()))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        let ty = match op {
            UnaryOp::ArrayLength => Type::Int,
            UnaryOp::Quote => Type::expr_of(operand.ty()),
            _ => operand.ty(),
        };
        Self::unary_typed(op, operand, ty)
    }

    pub fn unary_typed(op: UnaryOp, operand: Expr, ty: Type) -> Expr {
        Arc::new(Node::Unary(Unary {
            op,
            operand,
            ty,
            method: None,
        }))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let ty = op.result_type(&left.ty(), &right.ty());
        Arc::new(Node::Binary(Binary {
            op,
            left,
            right,
            conversion: None,
            lifted_to_null: false,
            method: None,
            ty,
        }))
    }

    pub fn type_is(expr: Expr, type_operand: Type) -> Expr {
        Arc::new(Node::TypeIs(TypeIs { expr, type_operand }))
    }

    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Expr {
        let ty = if_true.ty();
        Arc::new(Node::Conditional(Conditional {
            test,
            if_true,
            if_false,
            ty,
        }))
    }

    pub fn member(object: Option<Expr>, member: Member) -> Expr {
        Arc::new(Node::MemberAccess(MemberAccess { object, member }))
    }

    pub fn call(object: Option<Expr>, method: Method, args: Vec<Expr>) -> Expr {
        Arc::new(Node::Call(Call {
            object,
            method,
            args,
        }))
    }

    pub fn lambda(params: Vec<Variable>, body: Expr) -> Expr {
        let ty = Type::func(params.iter().map(|p| p.ty().clone()).collect(), body.ty());
        Arc::new(Node::Lambda(Lambda { params, body, ty }))
    }

    /// Invocation of a delegate-typed `target`.
    pub fn invoke(target: Expr, args: Vec<Expr>) -> Expr {
        let ty = target.ty().return_type().cloned().unwrap_or(Type::Object);
        Arc::new(Node::Invocation(Invocation { target, args, ty }))
    }

    /// The `Expandable::Invoke(target, args..)` marker call.
    pub fn invoke_expr(target: Expr, args: Vec<Expr>) -> Expr {
        let ret = target.ty().return_type().cloned().unwrap_or(Type::Object);
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(target);
        call_args.extend(args);
        Self::call(None, Method::intrinsic(Intrinsic::Invoke, ret), call_args)
    }

    /// The `Expandable::AsExpandable(query)` marker call.
    pub fn as_expandable(query: Expr) -> Expr {
        let ty = query.ty();
        Self::call(
            None,
            Method::intrinsic(Intrinsic::AsExpandable, ty),
            vec![query],
        )
    }

    /// `tree.Compile()`, typed as the delegate behind `tree`.
    pub fn compile(tree: Expr) -> Expr {
        let ty = tree.ty().delegate().clone();
        Self::call(Some(tree), Method::intrinsic(Intrinsic::Compile, ty), Vec::new())
    }

    pub fn new_object(ty: Type, args: Vec<Expr>) -> Expr {
        Arc::new(Node::New(Arc::new(Construct {
            ty,
            args,
            members: None,
        })))
    }

    pub fn new_array(kind: ArrayKind, elem_ty: Type, exprs: Vec<Expr>) -> Expr {
        Arc::new(Node::NewArray(NewArray {
            kind,
            elem_ty,
            exprs,
        }))
    }

    pub fn member_init(construct: Arc<Construct>, bindings: Vec<Arc<Binding>>) -> Expr {
        Arc::new(Node::MemberInit(MemberInit {
            construct,
            bindings,
        }))
    }

    pub fn list_init(construct: Arc<Construct>, initializers: Vec<Arc<ElementInit>>) -> Expr {
        Arc::new(Node::ListInit(ListInit {
            construct,
            initializers,
        }))
    }

    pub fn extension(kind: impl Into<String>, ty: Type) -> Expr {
        Arc::new(Node::Extension(Extension {
            kind: kind.into(),
            ty,
        }))
    }
}
