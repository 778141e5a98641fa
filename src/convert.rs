//! Conversion between wire values (plain maps and lists) and domain values
//! (validated records), driven by type expressions.
//!
//! Unions commit to the first alternative that accepts the value. Each
//! alternative is packed at most once: a nested validation failure moves on
//! to the next alternative, while errors raised by user hooks abort.

use crate::check::TypeChecker;
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::types::TypeExpr;
use crate::value::{Map, Value};

/// Packs wire values into domain values
pub struct Packer<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> Packer<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Convert maps to records wherever `ty` refers to a schema.
    ///
    /// Values whose shape does not fit `ty` are returned unchanged for the
    /// type check to reject. With `auto_pack`, records that already match
    /// are rebuilt from their serialized form.
    pub fn pack(&self, value: Value, ty: &TypeExpr, auto_pack: bool) -> Result<Value> {
        self.pack_at(value, ty, auto_pack, "")
    }

    fn pack_at(&self, value: Value, ty: &TypeExpr, auto_pack: bool, loc: &str) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }

        match ty {
            TypeExpr::Any | TypeExpr::Primitive(_) => Ok(value),
            TypeExpr::Optional(inner) => self.pack_at(value, inner, auto_pack, loc),
            TypeExpr::UnionOf(alternatives) => {
                for alt in alternatives {
                    if let Some(packed) = self.try_alternative(&value, alt, auto_pack, loc)? {
                        tracing::trace!(alternative = %alt, "union alternative selected");
                        return Ok(packed);
                    }
                }
                Ok(value)
            }
            TypeExpr::ListOf(inner) => match value {
                Value::List(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.pack_at(item, inner, auto_pack, &format!("{}[{}]", loc, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List),
                other => Ok(other),
            },
            TypeExpr::MapOf(_, value_ty) => match value {
                Value::Map(map) => map
                    .into_iter()
                    .map(|(k, v)| {
                        let packed = self.pack_at(v, value_ty, auto_pack, &format!("{}[{}]", loc, k))?;
                        Ok((k, packed))
                    })
                    .collect::<Result<Map>>()
                    .map(Value::Map),
                other => Ok(other),
            },
            TypeExpr::TupleOf(elements) => match value {
                Value::List(items) if items.len() == elements.len() => items
                    .into_iter()
                    .zip(elements)
                    .enumerate()
                    .map(|(i, (item, ty))| self.pack_at(item, ty, auto_pack, &format!("{}[{}]", loc, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List),
                other => Ok(other),
            },
            TypeExpr::SchemaRef(name) => match value {
                Value::Map(map) => self
                    .registry
                    .construct(name, map)
                    .map(Value::Record)
                    .map_err(|e| e.nested_under(loc)),
                Value::Record(record) if auto_pack && record.schema_name() == name => self
                    .registry
                    .construct(name, record.serialize())
                    .map(Value::Record)
                    .map_err(|e| e.nested_under(loc)),
                other => Ok(other),
            },
        }
    }

    /// Pack `value` as one union alternative.
    ///
    /// `None` means the alternative does not accept the value. Only engine
    /// validation failures and unknown schemas count as a mismatch.
    fn try_alternative(&self, value: &Value, alt: &TypeExpr, auto_pack: bool, loc: &str) -> Result<Option<Value>> {
        let checker = TypeChecker::domain();
        if !alt.contains_schema_ref() {
            return Ok(checker.is_compatible(value, alt).then(|| value.clone()));
        }
        match self.pack_at(value.clone(), alt, auto_pack, loc) {
            Ok(packed) => Ok(checker.is_compatible(&packed, alt).then_some(packed)),
            Err(SchemaError::Validation(_) | SchemaError::UnknownSchema { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

/// Convert a domain value to its wire form.
///
/// Records are serialized through their own schema, which applies nested
/// renames and serializers.
pub fn unpack(value: &Value, ty: &TypeExpr) -> Value {
    let checker = TypeChecker::domain();
    match (ty, value) {
        (_, Value::Null) => Value::Null,
        (TypeExpr::Optional(inner), _) => unpack(value, inner),
        (TypeExpr::UnionOf(alternatives), _) => match alternatives.iter().find(|alt| checker.is_compatible(value, alt)) {
            Some(alt) => unpack(value, alt),
            None => to_wire(value),
        },
        (TypeExpr::ListOf(inner), Value::List(items)) => Value::List(items.iter().map(|item| unpack(item, inner)).collect()),
        (TypeExpr::MapOf(_, value_ty), Value::Map(map)) => {
            Value::Map(map.iter().map(|(k, v)| (k.clone(), unpack(v, value_ty))).collect())
        }
        (TypeExpr::TupleOf(elements), Value::List(items)) if items.len() == elements.len() => {
            Value::List(items.iter().zip(elements).map(|(item, ty)| unpack(item, ty)).collect())
        }
        (TypeExpr::SchemaRef(_), Value::Record(record)) => Value::Map(record.serialize()),
        _ => to_wire(value),
    }
}

/// Type-agnostic wire conversion
fn to_wire(value: &Value) -> Value {
    match value {
        Value::Record(record) => Value::Map(record.serialize()),
        Value::List(items) => Value::List(items.iter().map(to_wire).collect()),
        Value::Map(map) => Value::Map(map.iter().map(|(k, v)| (k.clone(), to_wire(v))).collect()),
        other => other.clone(),
    }
}
