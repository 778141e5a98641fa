//! Structural type compatibility

use crate::registry::SchemaRegistry;
use crate::types::{Primitive, TypeExpr};
use crate::value::Value;

/// Decides whether runtime values match type expressions.
///
/// With a registry, a plain map matches a schema reference when a record of
/// that schema could be constructed from it. Without one, only records of
/// the referenced schema match.
#[derive(Debug, Clone, Copy)]
pub struct TypeChecker<'r> {
    registry: Option<&'r SchemaRegistry>,
}

impl<'r> TypeChecker<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Checker for values already in domain form
    pub fn domain() -> Self {
        Self { registry: None }
    }

    /// Never fails; unknown schemas simply do not match
    pub fn is_compatible(&self, value: &Value, ty: &TypeExpr) -> bool {
        match ty {
            TypeExpr::Any => true,
            TypeExpr::Optional(inner) => value.is_null() || self.is_compatible(value, inner),
            TypeExpr::UnionOf(alternatives) => alternatives.iter().any(|alt| self.is_compatible(value, alt)),
            TypeExpr::ListOf(inner) => match value {
                Value::List(items) => items.iter().all(|item| self.is_compatible(item, inner)),
                _ => false,
            },
            TypeExpr::MapOf(key_ty, value_ty) => match value {
                Value::Map(map) => map.iter().all(|(k, v)| key_matches(k, key_ty) && self.is_compatible(v, value_ty)),
                _ => false,
            },
            TypeExpr::TupleOf(elements) => match value {
                Value::List(items) => {
                    items.len() == elements.len()
                        && items.iter().zip(elements).all(|(item, ty)| self.is_compatible(item, ty))
                }
                _ => false,
            },
            TypeExpr::SchemaRef(name) => match value {
                Value::Record(record) => record.schema_name() == name,
                Value::Map(map) => match self.registry {
                    Some(registry) => registry.construct(name, map.clone()).is_ok(),
                    None => false,
                },
                _ => false,
            },
            TypeExpr::Primitive(kind) => matches!(
                (kind, value),
                (Primitive::Bool, Value::Bool(_))
                    | (Primitive::Int, Value::Int(_))
                    | (Primitive::Float, Value::Float(_))
                    | (Primitive::Str, Value::Str(_))
                    | (Primitive::Bytes, Value::Bytes(_))
                    | (Primitive::DateTime, Value::DateTime(_))
                    | (Primitive::AnyMap, Value::Map(_))
                    | (Primitive::AnyList, Value::List(_))
            ),
        }
    }
}

/// Map keys are text; a key matches when it reads as a value of `ty`
fn key_matches(key: &str, ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Any => true,
        TypeExpr::Optional(inner) => key_matches(key, inner),
        TypeExpr::UnionOf(alternatives) => alternatives.iter().any(|alt| key_matches(key, alt)),
        TypeExpr::Primitive(Primitive::Str) => true,
        TypeExpr::Primitive(Primitive::Int) => key.parse::<i64>().is_ok(),
        TypeExpr::Primitive(Primitive::Float) => key.parse::<f64>().is_ok(),
        TypeExpr::Primitive(Primitive::Bool) => key.parse::<bool>().is_ok(),
        TypeExpr::Primitive(Primitive::DateTime) => chrono::DateTime::parse_from_rfc3339(key).is_ok(),
        _ => false,
    }
}
