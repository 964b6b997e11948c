//! Display impls for types, operators and member references.
//!
//! The strings produced here are the spellings the tree notation parser
//! accepts, so diagnostics and the canonical printer share one source.

use std::fmt;

use super::{BinaryOp, Member, MemberKind, Method, Type, UnaryOp, Value};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unit => write!(f, "Unit"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Str => write!(f, "Str"),
            Type::Object => write!(f, "Object"),
            Type::Named(name) => write!(f, "{}", name),
            Type::Array(elem) => write!(f, "[{}]", elem),
            Type::Fn(params, ret) => {
                let parts: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "Fn({}) -> {}", parts.join(", "), ret)
            }
            Type::Expr(inner) => write!(f, "Expr<{}>", inner),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Owner::name`
impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner.name(), self.name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

impl MemberKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Property => "prop",
        }
    }
}

/// Short description of a value for logs and diagnostics.
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => format!("{:?}", x),
        Value::Str(s) => format!("{:?}", s),
        Value::Tree(tree) => format!("tree of {}", tree.ty()),
        Value::Closure(closure) => format!("closure {}", closure.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    #[test]
    fn test_format_types() {
        assert_eq!(Type::Int.to_string(), "Int");
        assert_eq!(Type::Array(Box::new(Type::Str)).to_string(), "[Str]");
        let pred = Type::func(vec![Type::named("User"), Type::Int], Type::Bool);
        assert_eq!(pred.to_string(), "Fn(User, Int) -> Bool");
        assert_eq!(
            Type::expr_of(pred).to_string(),
            "Expr<Fn(User, Int) -> Bool>"
        );
    }

    #[test]
    fn test_operator_keywords_round_trip() {
        for op in BinaryOp::ALL {
            assert_eq!(BinaryOp::from_keyword(op.as_str()), Some(op));
        }
        for op in UnaryOp::ALL {
            assert_eq!(UnaryOp::from_keyword(op.as_str()), Some(op));
        }
        assert_eq!(BinaryOp::from_keyword("plus"), None);
    }

    #[test]
    fn test_member_path() {
        let m = Member::captured("Env0", "pred", Type::Bool);
        assert_eq!(m.to_string(), "Env0::pred");
        assert_eq!(m.kind.keyword(), "field");
    }

    #[test]
    fn test_describe_tree_value() {
        let tree = Node::int(3);
        assert_eq!(describe_value(&Value::Tree(tree)), "tree of Int");
        assert_eq!(describe_value(&Value::Str("a".into())), "\"a\"");
    }
}
