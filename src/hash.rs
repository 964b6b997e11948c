//! Content fingerprints for expression trees.
//!
//! A tree is normalized and serialized to bytes, then hashed with BLAKE3.
//! Bound variables are replaced with de Bruijn indices, so two trees that
//! differ only in parameter names (or in which `Variable` allocations they
//! use) produce the same fingerprint.
//!
//! Properties:
//! - Alpha-equivalent trees produce the same hash.
//! - Free variables hash by name and type.
//! - Captured closures hash by name and field values; a captured tree
//!   contributes its own normalized form.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::ast::*;

// ─── Serialization Format Tags ─────────────────────────────────────

const TAG_UNARY: u8 = 0x01;
const TAG_BINARY: u8 = 0x02;
const TAG_TYPE_IS: u8 = 0x03;
const TAG_CONDITIONAL: u8 = 0x04;
const TAG_CONSTANT: u8 = 0x05;
const TAG_BOUND_VAR: u8 = 0x06;
const TAG_FREE_VAR: u8 = 0x07;
const TAG_MEMBER: u8 = 0x08;
const TAG_CALL: u8 = 0x09;
const TAG_LAMBDA: u8 = 0x0A;
const TAG_NEW: u8 = 0x0B;
const TAG_NEW_ARRAY: u8 = 0x0C;
const TAG_INVOCATION: u8 = 0x0D;
const TAG_MEMBER_INIT: u8 = 0x0E;
const TAG_LIST_INIT: u8 = 0x0F;
const TAG_EXTENSION: u8 = 0x10;

const TAG_BIND_ASSIGN: u8 = 0x20;
const TAG_BIND_MEMBER: u8 = 0x21;
const TAG_BIND_LIST: u8 = 0x22;
const TAG_ELEMENT: u8 = 0x23;

const TAG_VAL_NULL: u8 = 0x40;
const TAG_VAL_BOOL: u8 = 0x41;
const TAG_VAL_INT: u8 = 0x42;
const TAG_VAL_FLOAT: u8 = 0x43;
const TAG_VAL_STR: u8 = 0x44;
const TAG_VAL_TREE: u8 = 0x45;
const TAG_VAL_CLOSURE: u8 = 0x46;

const TAG_TY_UNIT: u8 = 0x80;
const TAG_TY_BOOL: u8 = 0x81;
const TAG_TY_INT: u8 = 0x82;
const TAG_TY_FLOAT: u8 = 0x83;
const TAG_TY_STR: u8 = 0x84;
const TAG_TY_OBJECT: u8 = 0x85;
const TAG_TY_NAMED: u8 = 0x86;
const TAG_TY_ARRAY: u8 = 0x87;
const TAG_TY_FN: u8 = 0x88;
const TAG_TY_EXPR: u8 = 0x89;

// Version byte for hash stability
const HASH_VERSION: u8 = 1;

// ─── Content Hash ──────────────────────────────────────────────────

/// A 256-bit BLAKE3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Display as short base-32 (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        let mut result = String::with_capacity(8);
        for i in (0..8).rev() {
            let idx = ((val >> (i * 5)) & 0x1F) as usize;
            result.push(ALPHABET[idx] as char);
        }
        result
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// ─── De Bruijn Environment ─────────────────────────────────────────

/// Maps bound variables to the position of their binder.
struct DeBruijnEnv {
    /// Stack of binders (most recent at end).
    bindings: Vec<Variable>,
}

impl DeBruijnEnv {
    fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    fn push(&mut self, var: &Variable) {
        self.bindings.push(var.clone());
    }

    /// Distance from the innermost binder, if `var` is bound.
    fn lookup(&self, var: &Variable) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .position(|binding| binding == var)
            .map(|i| i as u32)
    }

    fn save(&self) -> usize {
        self.bindings.len()
    }

    fn restore(&mut self, len: usize) {
        self.bindings.truncate(len);
    }
}

// ─── Normalizer + Serializer ───────────────────────────────────────

/// Normalize and serialize a tree to bytes.
///
/// The bytes are deterministic: alpha-equivalent trees serialize the same
/// way regardless of variable names or allocations.
pub struct Normalizer {
    buf: Vec<u8>,
    env: DeBruijnEnv,
    /// Closures already serialized, by allocation. A repeated closure is
    /// written as a back-reference to its first occurrence.
    closures: HashMap<usize, u32>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            env: DeBruijnEnv::new(),
            closures: HashMap::new(),
        }
    }

    pub fn normalize(&mut self, expr: &Expr) -> Vec<u8> {
        self.buf.clear();
        self.env = DeBruijnEnv::new();
        self.closures.clear();
        self.buf.push(HASH_VERSION);
        self.serialize_expr(expr);
        std::mem::take(&mut self.buf)
    }

    // ─── Serialization Helpers ─────────────────────────────────

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_bool(&mut self, b: bool) {
        self.buf.push(b as u8);
    }

    // ─── Type Serialization ────────────────────────────────────

    fn serialize_type(&mut self, ty: &Type) {
        match ty {
            Type::Unit => self.write_u8(TAG_TY_UNIT),
            Type::Bool => self.write_u8(TAG_TY_BOOL),
            Type::Int => self.write_u8(TAG_TY_INT),
            Type::Float => self.write_u8(TAG_TY_FLOAT),
            Type::Str => self.write_u8(TAG_TY_STR),
            Type::Object => self.write_u8(TAG_TY_OBJECT),
            Type::Named(name) => {
                self.write_u8(TAG_TY_NAMED);
                self.write_str(name);
            }
            Type::Array(elem) => {
                self.write_u8(TAG_TY_ARRAY);
                self.serialize_type(elem);
            }
            Type::Fn(params, ret) => {
                self.write_u8(TAG_TY_FN);
                self.write_u32(params.len() as u32);
                for param in params {
                    self.serialize_type(param);
                }
                self.serialize_type(ret);
            }
            Type::Expr(inner) => {
                self.write_u8(TAG_TY_EXPR);
                self.serialize_type(inner);
            }
        }
    }

    fn serialize_member(&mut self, member: &Member) {
        self.write_bool(matches!(member.owner, MemberOwner::Closure(_)));
        self.write_str(member.owner.name());
        self.write_str(&member.name);
        self.write_bool(member.kind == MemberKind::Field);
        self.serialize_type(&member.ty);
    }

    fn serialize_method(&mut self, method: &Method) {
        self.write_str(&method.owner);
        self.write_str(&method.name);
        self.write_bool(method.is_static);
        self.serialize_type(&method.ret);
    }

    fn serialize_opt_method(&mut self, method: &Option<Method>) {
        match method {
            Some(m) => {
                self.write_u8(1);
                self.serialize_method(m);
            }
            None => self.write_u8(0),
        }
    }

    // ─── Value Serialization ───────────────────────────────────

    fn serialize_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.write_u8(TAG_VAL_NULL),
            Value::Bool(b) => {
                self.write_u8(TAG_VAL_BOOL);
                self.write_bool(*b);
            }
            Value::Int(n) => {
                self.write_u8(TAG_VAL_INT);
                self.write_u64(*n as u64);
            }
            Value::Float(x) => {
                self.write_u8(TAG_VAL_FLOAT);
                self.write_u64(x.to_bits());
            }
            Value::Str(s) => {
                self.write_u8(TAG_VAL_STR);
                self.write_str(s);
            }
            Value::Tree(tree) => {
                self.write_u8(TAG_VAL_TREE);
                // A quoted tree is closed over its own binders.
                let saved = std::mem::replace(&mut self.env, DeBruijnEnv::new());
                self.serialize_expr(tree);
                self.env = saved;
            }
            Value::Closure(closure) => {
                self.write_u8(TAG_VAL_CLOSURE);
                let addr = std::sync::Arc::as_ptr(closure) as usize;
                if let Some(&index) = self.closures.get(&addr) {
                    self.write_u8(0);
                    self.write_u32(index);
                    return;
                }
                let index = self.closures.len() as u32;
                self.closures.insert(addr, index);
                self.write_u8(1);
                self.write_str(closure.name());
                self.write_u32(closure.fields().len() as u32);
                for (name, field) in closure.fields() {
                    self.write_str(name);
                    self.serialize_value(field);
                }
            }
        }
    }

    // ─── Expression Serialization ──────────────────────────────

    fn serialize_list(&mut self, exprs: &[Expr]) {
        self.write_u32(exprs.len() as u32);
        for e in exprs {
            self.serialize_expr(e);
        }
    }

    fn serialize_opt(&mut self, expr: &Option<Expr>) {
        match expr {
            Some(e) => {
                self.write_u8(1);
                self.serialize_expr(e);
            }
            None => self.write_u8(0),
        }
    }

    fn serialize_construct(&mut self, construct: &Construct) {
        self.serialize_type(&construct.ty);
        self.serialize_list(&construct.args);
        match &construct.members {
            Some(members) => {
                self.write_u32(members.len() as u32 + 1);
                for member in members {
                    self.serialize_member(member);
                }
            }
            None => self.write_u32(0),
        }
    }

    fn serialize_binding(&mut self, binding: &Binding) {
        match binding {
            Binding::Assign { member, expr } => {
                self.write_u8(TAG_BIND_ASSIGN);
                self.serialize_member(member);
                self.serialize_expr(expr);
            }
            Binding::Member { member, bindings } => {
                self.write_u8(TAG_BIND_MEMBER);
                self.serialize_member(member);
                self.write_u32(bindings.len() as u32);
                for nested in bindings {
                    self.serialize_binding(nested);
                }
            }
            Binding::List {
                member,
                initializers,
            } => {
                self.write_u8(TAG_BIND_LIST);
                self.serialize_member(member);
                self.write_u32(initializers.len() as u32);
                for init in initializers {
                    self.serialize_element(init);
                }
            }
        }
    }

    fn serialize_element(&mut self, init: &ElementInit) {
        self.write_u8(TAG_ELEMENT);
        self.serialize_method(&init.add_method);
        self.serialize_list(&init.args);
    }

    fn serialize_expr(&mut self, expr: &Expr) {
        match &**expr {
            Node::Unary(n) => {
                self.write_u8(TAG_UNARY);
                self.write_str(n.op.as_str());
                self.serialize_type(&n.ty);
                self.serialize_opt_method(&n.method);
                self.serialize_expr(&n.operand);
            }
            Node::Binary(n) => {
                self.write_u8(TAG_BINARY);
                self.write_str(n.op.as_str());
                self.serialize_type(&n.ty);
                self.write_bool(n.lifted_to_null);
                self.serialize_opt_method(&n.method);
                self.serialize_expr(&n.left);
                self.serialize_expr(&n.right);
                self.serialize_opt(&n.conversion);
            }
            Node::TypeIs(n) => {
                self.write_u8(TAG_TYPE_IS);
                self.serialize_type(&n.type_operand);
                self.serialize_expr(&n.expr);
            }
            Node::Conditional(n) => {
                self.write_u8(TAG_CONDITIONAL);
                self.serialize_type(&n.ty);
                self.serialize_expr(&n.test);
                self.serialize_expr(&n.if_true);
                self.serialize_expr(&n.if_false);
            }
            Node::Constant(n) => {
                self.write_u8(TAG_CONSTANT);
                self.serialize_type(&n.ty);
                self.serialize_value(&n.value);
            }
            Node::Variable(var) => match self.env.lookup(var) {
                Some(index) => {
                    self.write_u8(TAG_BOUND_VAR);
                    self.write_u32(index);
                }
                None => {
                    self.write_u8(TAG_FREE_VAR);
                    self.write_str(var.name());
                    self.serialize_type(var.ty());
                }
            },
            Node::MemberAccess(n) => {
                self.write_u8(TAG_MEMBER);
                self.serialize_member(&n.member);
                self.serialize_opt(&n.object);
            }
            Node::Call(n) => {
                self.write_u8(TAG_CALL);
                self.serialize_method(&n.method);
                self.serialize_opt(&n.object);
                self.serialize_list(&n.args);
            }
            Node::Lambda(n) => {
                self.write_u8(TAG_LAMBDA);
                self.write_u32(n.params.len() as u32);
                let saved = self.env.save();
                for param in &n.params {
                    self.serialize_type(param.ty());
                    self.env.push(param);
                }
                self.serialize_type(&n.ty);
                self.serialize_expr(&n.body);
                self.env.restore(saved);
            }
            Node::New(c) => {
                self.write_u8(TAG_NEW);
                self.serialize_construct(c);
            }
            Node::NewArray(n) => {
                self.write_u8(TAG_NEW_ARRAY);
                self.write_bool(n.kind == ArrayKind::Bounds);
                self.serialize_type(&n.elem_ty);
                self.serialize_list(&n.exprs);
            }
            Node::Invocation(n) => {
                self.write_u8(TAG_INVOCATION);
                self.serialize_type(&n.ty);
                self.serialize_expr(&n.target);
                self.serialize_list(&n.args);
            }
            Node::MemberInit(n) => {
                self.write_u8(TAG_MEMBER_INIT);
                self.serialize_construct(&n.construct);
                self.write_u32(n.bindings.len() as u32);
                for binding in &n.bindings {
                    self.serialize_binding(binding);
                }
            }
            Node::ListInit(n) => {
                self.write_u8(TAG_LIST_INIT);
                self.serialize_construct(&n.construct);
                self.write_u32(n.initializers.len() as u32);
                for init in &n.initializers {
                    self.serialize_element(init);
                }
            }
            Node::Extension(n) => {
                self.write_u8(TAG_EXTENSION);
                self.write_str(&n.kind);
                self.serialize_type(&n.ty);
            }
        }
    }
}

// ─── Public API ────────────────────────────────────────────────────

/// Fingerprint of a tree, invariant under renaming of bound variables.
pub fn fingerprint(expr: &Expr) -> ContentHash {
    let bytes = Normalizer::new().normalize(expr);
    ContentHash(*blake3::hash(&bytes).as_bytes())
}
