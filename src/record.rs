//! Validated schema instances
//!
//! A record only exists once every field has passed validation. Mutation
//! validates the new value before it replaces the old one.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{Result, SchemaError, ValidationError, ValidationErrorKind};
use crate::field::FieldContext;
use crate::pipeline::Pipeline;
use crate::registry::SchemaRegistry;
use crate::schema::Schema;
use crate::value::{Map, Value};

/// An instance of a schema holding validated values for every field
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Map,
}

impl Record {
    /// Validate `input` against `schema`, all or nothing
    pub(crate) fn construct(registry: &SchemaRegistry, schema: &Arc<Schema>, input: Map) -> Result<Record> {
        let mut remaining = input;
        let mut effective = Map::new();

        for (name, spec) in schema.fields() {
            if let Some(value) = remaining.remove(name) {
                effective.insert(name.to_string(), value);
            } else if let Some(value) = spec.alias.as_ref().and_then(|alias| remaining.remove(alias)) {
                effective.insert(name.to_string(), value);
            }
        }

        if !remaining.is_empty() {
            let unexpected: Vec<String> = remaining.into_keys().collect();
            if !schema.strip_unknown() {
                return Err(ValidationError::new(schema.name(), ValidationErrorKind::UnknownFields(unexpected)).into());
            }
            tracing::warn!(schema = schema.name(), keys = ?unexpected, "stripped unknown keys");
        }

        let pipeline = Pipeline::new(registry);
        let mut values = Map::new();
        for (name, spec) in schema.fields() {
            let ctx = FieldContext {
                schema: schema.name(),
                field: name,
                root: &effective,
            };
            let raw = effective.get(name).cloned().unwrap_or(Value::Null);
            let value = pipeline.validate(&ctx, spec, raw)?;
            values.insert(name.to_string(), value);
        }

        let record = Record {
            schema: Arc::clone(schema),
            values,
        };

        if let Some(hook) = schema.post_init() {
            hook(&record).map_err(SchemaError::Validator)?;
        }

        tracing::trace!(schema = schema.name(), "record constructed");
        Ok(record)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn schema_name(&self) -> &str {
        self.schema.name()
    }

    /// Stored value of a field; optional fields that were absent hold `Null`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// All stored values, in domain form
    pub fn values(&self) -> &Map {
        &self.values
    }

    /// Replace one field's value after validating it.
    ///
    /// On failure the previous value is kept.
    pub fn set(&mut self, registry: &SchemaRegistry, field: &str, value: impl Into<Value>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let spec = schema.field(field).ok_or_else(|| {
            SchemaError::from(ValidationError::new(
                schema.name(),
                ValidationErrorKind::UnknownFields(vec![field.to_string()]),
            ))
        })?;

        let siblings = self.wire_fields();
        let ctx = FieldContext {
            schema: schema.name(),
            field,
            root: &siblings,
        };
        let validated = Pipeline::new(registry).validate(&ctx, spec, value.into())?;
        self.values.insert(field.to_string(), validated);
        Ok(())
    }

    /// Stored values in wire form under their canonical names, nulls left out
    fn wire_fields(&self) -> Map {
        self.schema
            .fields()
            .filter_map(|(name, spec)| {
                let wire = crate::convert::unpack(self.values.get(name)?, &spec.ty);
                (!wire.is_null()).then(|| (name.to_string(), wire))
            })
            .collect()
    }

    /// Wire mapping of this record.
    ///
    /// Keys follow each field's rename; fields whose unpacked value is null
    /// are left out.
    pub fn serialize(&self) -> Map {
        let mut out = Map::new();
        for (name, spec) in self.schema.fields() {
            let Some(value) = self.values.get(name) else {
                continue;
            };
            let mut wire = crate::convert::unpack(value, &spec.ty);
            if wire.is_null() {
                continue;
            }
            if let Some(serializer) = &spec.serializer {
                wire = serializer(&wire);
                if wire.is_null() {
                    continue;
                }
            }
            out.insert(spec.output_key(name).to_string(), wire);
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        Value::Map(self.serialize()).to_json()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("schema", &self.schema.name())
            .field("values", &self.values)
            .finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Value::Map(Record::serialize(self)).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::map;
    use crate::types::TypeExpr;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::builder("Person")
                    .field("name", FieldSpec::builder(TypeExpr::string()).alias("_name").build().unwrap())
                    .field("age", FieldSpec::builder(TypeExpr::int()).min_value(0).rename("years").build().unwrap())
                    .field_of("nickname", TypeExpr::optional(TypeExpr::string()))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_construct_and_serialize() {
        let registry = registry();
        let record = registry.construct("Person", map! { "name" => "John", "age" => 30 }).unwrap();

        assert_eq!(record.get("name"), Some(&Value::from("John")));
        assert_eq!(record.get("nickname"), Some(&Value::Null));
        assert_eq!(record.serialize(), map! { "name" => "John", "years" => 30 });
    }

    #[test]
    fn test_alias_used_when_canonical_absent() {
        let registry = registry();
        let by_alias = registry.construct("Person", map! { "_name" => "John", "age" => 1 }).unwrap();
        let by_name = registry.construct("Person", map! { "name" => "John", "age" => 1 }).unwrap();
        assert_eq!(by_alias, by_name);
    }

    #[test]
    fn test_alias_and_canonical_both_present_is_unknown_key() {
        let registry = registry();
        let err = registry
            .construct("Person", map! { "name" => "John", "_name" => "Jack", "age" => 1 })
            .unwrap_err();
        assert_eq!(
            err.validation().unwrap().kind,
            ValidationErrorKind::UnknownFields(vec!["_name".to_string()])
        );
    }

    #[test]
    fn test_set_is_atomic() {
        let registry = registry();
        let mut record = registry.construct("Person", map! { "name" => "John", "age" => 30 }).unwrap();

        assert!(record.set(&registry, "age", -1).is_err());
        assert_eq!(record.get("age"), Some(&Value::Int(30)));

        record.set(&registry, "age", 31).unwrap();
        assert_eq!(record.get("age"), Some(&Value::Int(31)));

        assert!(record.set(&registry, "height", 2).is_err());
    }

    #[test]
    fn test_set_validators_see_wire_siblings() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::builder("Tag").field_of("label", TypeExpr::string()).build().unwrap())
            .unwrap();
        registry
            .register(
                Schema::builder("Post")
                    .field_of("tag", TypeExpr::schema("Tag"))
                    .field(
                        "title",
                        FieldSpec::builder(TypeExpr::string())
                            .validator(|ctx, v| match ctx.root.get("tag") {
                                Some(Value::Map(tag)) if tag.contains_key("label") => Ok(v),
                                other => Err(format!("tag seen as {:?}", other).into()),
                            })
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let mut post = registry
            .construct("Post", map! { "tag" => map! { "label" => "rust" }, "title" => "a" })
            .unwrap();
        post.set(&registry, "title", "b").unwrap();
        assert_eq!(post.get("title"), Some(&Value::from("b")));
    }

    #[test]
    fn test_serialize_is_idempotent() {
        let registry = registry();
        let record = registry
            .construct("Person", map! { "name" => "John", "age" => 30, "nickname" => "J" })
            .unwrap();
        assert_eq!(record.serialize(), record.serialize());
    }

    #[test]
    fn test_serde_serialize() {
        let registry = registry();
        let record = registry.construct("Person", map! { "name" => "John", "age" => 30 }).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), serde_json::json!({"name": "John", "years": 30}));
    }
}
