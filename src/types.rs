//! Structural type expressions
//!
//! Supported types:
//! - primitives: bool, int, float, str, bytes, datetime, map (any map), list (any list)
//! - `optional[T]`, `list[T]`, `map[K, V]`, `tuple[T, ...]`, `union[T, ...]`
//! - references to other declared schemas, by name
//! - `any`

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Primitive runtime kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    DateTime,
    /// Any mapping, contents unchecked
    AnyMap,
    /// Any list, contents unchecked
    AnyList,
}

impl Primitive {
    /// Returns the type name used in messages and definitions
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Str => "str",
            Primitive::Bytes => "bytes",
            Primitive::DateTime => "datetime",
            Primitive::AnyMap => "map",
            Primitive::AnyList => "list",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Primitive::Bool,
            "int" => Primitive::Int,
            "float" => Primitive::Float,
            "str" | "string" => Primitive::Str,
            "bytes" => Primitive::Bytes,
            "datetime" => Primitive::DateTime,
            "map" | "dict" => Primitive::AnyMap,
            "list" => Primitive::AnyList,
            _ => return None,
        })
    }
}

/// A field's structural type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Any,
    Primitive(Primitive),
    Optional(Box<TypeExpr>),
    ListOf(Box<TypeExpr>),
    MapOf(Box<TypeExpr>, Box<TypeExpr>),
    TupleOf(Vec<TypeExpr>),
    UnionOf(Vec<TypeExpr>),
    /// Another declared schema, resolved by name at validation time
    SchemaRef(String),
}

impl TypeExpr {
    pub fn bool() -> Self {
        TypeExpr::Primitive(Primitive::Bool)
    }

    pub fn int() -> Self {
        TypeExpr::Primitive(Primitive::Int)
    }

    pub fn float() -> Self {
        TypeExpr::Primitive(Primitive::Float)
    }

    pub fn string() -> Self {
        TypeExpr::Primitive(Primitive::Str)
    }

    pub fn bytes() -> Self {
        TypeExpr::Primitive(Primitive::Bytes)
    }

    pub fn datetime() -> Self {
        TypeExpr::Primitive(Primitive::DateTime)
    }

    pub fn any_map() -> Self {
        TypeExpr::Primitive(Primitive::AnyMap)
    }

    pub fn any_list() -> Self {
        TypeExpr::Primitive(Primitive::AnyList)
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn list_of(inner: TypeExpr) -> Self {
        TypeExpr::ListOf(Box::new(inner))
    }

    pub fn map_of(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::MapOf(Box::new(key), Box::new(value))
    }

    pub fn tuple_of(elements: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::TupleOf(elements.into_iter().collect())
    }

    pub fn union_of(alternatives: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::UnionOf(alternatives.into_iter().collect())
    }

    pub fn schema(name: impl Into<String>) -> Self {
        TypeExpr::SchemaRef(name.into())
    }

    /// Whether null is an acceptable value of this type
    pub fn accepts_null(&self) -> bool {
        match self {
            TypeExpr::Any | TypeExpr::Optional(_) => true,
            TypeExpr::UnionOf(alternatives) => alternatives.iter().any(TypeExpr::accepts_null),
            _ => false,
        }
    }

    pub fn is_union(&self) -> bool {
        match self {
            TypeExpr::UnionOf(_) => true,
            TypeExpr::Optional(inner) => inner.is_union(),
            _ => false,
        }
    }

    /// Whether any part of this type refers to another schema
    pub fn contains_schema_ref(&self) -> bool {
        match self {
            TypeExpr::SchemaRef(_) => true,
            TypeExpr::Optional(inner) | TypeExpr::ListOf(inner) => inner.contains_schema_ref(),
            TypeExpr::MapOf(key, value) => key.contains_schema_ref() || value.contains_schema_ref(),
            TypeExpr::TupleOf(items) | TypeExpr::UnionOf(items) => items.iter().any(TypeExpr::contains_schema_ref),
            TypeExpr::Any | TypeExpr::Primitive(_) => false,
        }
    }

    /// Names of all schemas this type refers to, in order of appearance
    pub fn schema_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::SchemaRef(name) => out.push(name),
            TypeExpr::Optional(inner) | TypeExpr::ListOf(inner) => inner.collect_refs(out),
            TypeExpr::MapOf(key, value) => {
                key.collect_refs(out);
                value.collect_refs(out);
            }
            TypeExpr::TupleOf(items) | TypeExpr::UnionOf(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            TypeExpr::Any | TypeExpr::Primitive(_) => {}
        }
    }

    /// Check the expression is well formed (no empty unions or tuples)
    pub fn check_definition(&self) -> Result<(), SchemaError> {
        match self {
            TypeExpr::UnionOf(alternatives) if alternatives.is_empty() => {
                Err(SchemaError::definition("union alternatives must not be empty"))
            }
            TypeExpr::TupleOf(elements) if elements.is_empty() => {
                Err(SchemaError::definition("tuple elements must not be empty"))
            }
            TypeExpr::SchemaRef(name) if name.is_empty() => Err(SchemaError::definition("schema reference without a name")),
            TypeExpr::Optional(inner) | TypeExpr::ListOf(inner) => inner.check_definition(),
            TypeExpr::MapOf(key, value) => {
                key.check_definition()?;
                if !key.is_key_type() {
                    return Err(SchemaError::definition(format!(
                        "map keys are text; `{}` cannot be read from a key",
                        key
                    )));
                }
                value.check_definition()
            }
            TypeExpr::TupleOf(items) | TypeExpr::UnionOf(items) => items.iter().try_for_each(TypeExpr::check_definition),
            _ => Ok(()),
        }
    }

    /// Whether map keys, which are always text, can be read as this type
    pub fn is_key_type(&self) -> bool {
        match self {
            TypeExpr::Any => true,
            TypeExpr::Primitive(p) => matches!(
                p,
                Primitive::Bool | Primitive::Int | Primitive::Float | Primitive::Str | Primitive::DateTime
            ),
            TypeExpr::Optional(inner) => inner.is_key_type(),
            TypeExpr::UnionOf(items) => items.iter().all(TypeExpr::is_key_type),
            TypeExpr::ListOf(_) | TypeExpr::MapOf(..) | TypeExpr::TupleOf(_) | TypeExpr::SchemaRef(_) => false,
        }
    }
}

impl From<Primitive> for TypeExpr {
    fn from(p: Primitive) -> Self {
        TypeExpr::Primitive(p)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => write!(f, "any"),
            TypeExpr::Primitive(p) => write!(f, "{}", p.type_name()),
            TypeExpr::Optional(inner) => write!(f, "optional[{}]", inner),
            TypeExpr::ListOf(inner) => write!(f, "list[{}]", inner),
            TypeExpr::MapOf(key, value) => write!(f, "map[{}, {}]", key, value),
            TypeExpr::TupleOf(items) => write!(f, "tuple[{}]", join(items)),
            TypeExpr::UnionOf(items) => write!(f, "union[{}]", join(items)),
            TypeExpr::SchemaRef(name) => write!(f, "{}", name),
        }
    }
}

fn join(items: &[TypeExpr]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl FromStr for TypeExpr {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { src: s, pos: 0 };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        expr.check_definition()?;
        Ok(expr)
    }
}

/// Recursive-descent parser for the type grammar
struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> SchemaError {
        SchemaError::definition(format!("type `{}` at offset {}: {}", self.src, self.pos, message))
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<&'a str, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_' || c == '.' || c == '-') {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected a type name"));
        }
        let src = self.src;
        Ok(&src[start..self.pos])
    }

    fn args(&mut self) -> Result<Vec<TypeExpr>, SchemaError> {
        let mut args = vec![self.expr()?];
        while self.eat(',') {
            args.push(self.expr()?);
        }
        if !self.eat(']') {
            return Err(self.error("expected `]`"));
        }
        Ok(args)
    }

    fn expr(&mut self) -> Result<TypeExpr, SchemaError> {
        let name = self.ident()?;
        if !self.eat('[') {
            if name == "any" {
                return Ok(TypeExpr::Any);
            }
            return Ok(match Primitive::from_name(name) {
                Some(p) => TypeExpr::Primitive(p),
                None => TypeExpr::SchemaRef(name.to_string()),
            });
        }

        let mut args = self.args()?;
        let arity = |n: usize, args: &[TypeExpr]| {
            if args.len() == n {
                Ok(())
            } else {
                Err(SchemaError::definition(format!(
                    "type `{}`: `{}` takes {} argument(s), got {}",
                    self.src,
                    name,
                    n,
                    args.len()
                )))
            }
        };

        match name {
            "optional" => {
                arity(1, &args)?;
                Ok(TypeExpr::optional(args.remove(0)))
            }
            "list" => {
                arity(1, &args)?;
                Ok(TypeExpr::list_of(args.remove(0)))
            }
            "map" | "dict" => {
                arity(2, &args)?;
                let value = args.remove(1);
                Ok(TypeExpr::map_of(args.remove(0), value))
            }
            "tuple" => Ok(TypeExpr::TupleOf(args)),
            "union" => Ok(TypeExpr::UnionOf(args)),
            other => Err(SchemaError::definition(format!(
                "type `{}`: `{}` does not take arguments",
                self.src, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives_and_refs() {
        assert_eq!("int".parse::<TypeExpr>().unwrap(), TypeExpr::int());
        assert_eq!("any".parse::<TypeExpr>().unwrap(), TypeExpr::Any);
        assert_eq!("Item".parse::<TypeExpr>().unwrap(), TypeExpr::schema("Item"));
    }

    #[test]
    fn test_parse_nested() {
        let parsed: TypeExpr = "optional[map[str, list[union[Item, int]]]]".parse().unwrap();
        let expected = TypeExpr::optional(TypeExpr::map_of(
            TypeExpr::string(),
            TypeExpr::list_of(TypeExpr::union_of([TypeExpr::schema("Item"), TypeExpr::int()])),
        ));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_display_round_trips() {
        let source = "tuple[int, float, optional[Item]]";
        let parsed: TypeExpr = source.parse().unwrap();
        assert_eq!(parsed.to_string(), source);
    }

    #[test]
    fn test_parse_errors() {
        assert!("list[int".parse::<TypeExpr>().is_err());
        assert!("map[int]".parse::<TypeExpr>().is_err());
        assert!("int[str]".parse::<TypeExpr>().is_err());
        assert!("list[int] x".parse::<TypeExpr>().is_err());
        assert!("".parse::<TypeExpr>().is_err());
    }

    #[test]
    fn test_map_key_types() {
        assert!("map[int, float]".parse::<TypeExpr>().is_ok());
        assert!("map[union[int, str], Item]".parse::<TypeExpr>().is_ok());
        assert!("map[Item, int]".parse::<TypeExpr>().is_err());
        assert!("map[list[int], int]".parse::<TypeExpr>().is_err());
        assert!(TypeExpr::map_of(TypeExpr::bytes(), TypeExpr::int()).check_definition().is_err());
    }

    #[test]
    fn test_empty_union_rejected() {
        assert!(TypeExpr::UnionOf(vec![]).check_definition().is_err());
    }

    #[test]
    fn test_accepts_null() {
        assert!(TypeExpr::optional(TypeExpr::int()).accepts_null());
        assert!(TypeExpr::Any.accepts_null());
        assert!(!TypeExpr::int().accepts_null());
    }

    #[test]
    fn test_schema_refs() {
        let ty: TypeExpr = "union[A, list[B], map[str, A]]".parse().unwrap();
        assert_eq!(ty.schema_refs(), vec!["A", "B", "A"]);
        assert!(ty.contains_schema_ref());
    }
}
