//! Schema Registry
//!
//! Holds every declared schema by name. Registration is append-only: a name,
//! once registered, always resolves to the same immutable schema. Schema
//! references inside type expressions are resolved here at validation time,
//! so schemas may refer to each other (or themselves) in any order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::check::TypeChecker;
use crate::convert::{self, Packer};
use crate::error::{Result, SchemaError, ValidationError, ValidationErrorKind};
use crate::field::FieldContext;
use crate::pipeline::Pipeline;
use crate::record::Record;
use crate::representation;
use crate::schema::{CloneSpec, Schema};
use crate::types::TypeExpr;
use crate::value::{Map, Value};

/// A field whose type refers to a schema that is not registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    pub schema: String,
    pub field: String,
    pub target: String,
}

/// The schema registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Existing names cannot be replaced.
    pub fn register(&mut self, schema: Schema) -> Result<Arc<Schema>> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::AlreadyExists {
                name: schema.name().to_string(),
            });
        }

        let schema = Arc::new(schema);
        tracing::debug!(schema = schema.name(), fields = schema.len(), "registered schema");
        self.schemas.insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Get a schema or fail with [`SchemaError::UnknownSchema`]
    pub fn schema(&self, name: &str) -> Result<&Arc<Schema>> {
        self.schemas.get(name).ok_or_else(|| SchemaError::UnknownSchema {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schema names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Fields referring to schemas that are not (yet) registered
    pub fn dangling_refs(&self) -> Vec<DanglingRef> {
        let mut out = Vec::new();
        for name in self.names() {
            let schema = &self.schemas[name];
            for (field, spec) in schema.fields() {
                for target in spec.ty.schema_refs() {
                    if !self.contains(target) {
                        out.push(DanglingRef {
                            schema: name.to_string(),
                            field: field.to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }
        out
    }

    /// Construct a record of the named schema from a wire mapping
    pub fn construct(&self, name: &str, input: Map) -> Result<Record> {
        let schema = self.schema(name)?;
        Record::construct(self, schema, input)
    }

    /// Construct a record from a JSON document, which must be an object
    pub fn construct_json(&self, name: &str, document: serde_json::Value) -> Result<Record> {
        match Value::from(document) {
            Value::Map(input) => self.construct(name, input),
            other => Err(ValidationError::new(
                name,
                ValidationErrorKind::TypeMismatch {
                    expected: "map".to_string(),
                    actual: other.kind(),
                },
            )
            .into()),
        }
    }

    /// Run the validation pipeline for one field of a schema in isolation
    pub fn validate(&self, schema_name: &str, field: &str, raw: Value) -> Result<Value> {
        let schema = self.schema(schema_name)?;
        let spec = schema.field(field).ok_or_else(|| {
            SchemaError::from(ValidationError::new(
                schema_name,
                ValidationErrorKind::UnknownFields(vec![field.to_string()]),
            ))
        })?;
        let root = Map::new();
        let ctx = FieldContext {
            schema: schema_name,
            field,
            root: &root,
        };
        Pipeline::new(self).validate(&ctx, spec, raw)
    }

    pub fn is_compatible(&self, value: &Value, ty: &TypeExpr) -> bool {
        TypeChecker::new(self).is_compatible(value, ty)
    }

    /// Convert a wire value into domain form for `ty`
    pub fn pack(&self, value: Value, ty: &TypeExpr) -> Result<Value> {
        Packer::new(self).pack(value, ty, false)
    }

    /// Convert a domain value into wire form for `ty`
    pub fn unpack(&self, value: &Value, ty: &TypeExpr) -> Value {
        convert::unpack(value, ty)
    }

    /// Derive and register a new schema from an existing one
    pub fn clone_schema(&mut self, source: &str, name: &str, spec: CloneSpec) -> Result<Arc<Schema>> {
        let derived = self.schema(source)?.clone_with(name, spec)?;
        self.register(derived)
    }

    /// Descriptive mapping of a schema's fields, for documentation and export
    pub fn representation(&self, name: &str) -> Result<serde_json::Value> {
        let schema = self.schema(name)?;
        Ok(representation::describe_schema(self, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map;

    fn node() -> Schema {
        Schema::builder("Node")
            .field_of("value", TypeExpr::int())
            .field_of("children", TypeExpr::optional(TypeExpr::list_of(TypeExpr::schema("Node"))))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_is_append_only() {
        let mut registry = SchemaRegistry::new();
        registry.register(node()).unwrap();
        let err = registry.register(node()).unwrap_err();
        assert!(matches!(err, SchemaError::AlreadyExists { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_schema() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.construct("Missing", Map::new()),
            Err(SchemaError::UnknownSchema { .. })
        ));
    }

    #[test]
    fn test_self_reference() {
        let mut registry = SchemaRegistry::new();
        registry.register(node()).unwrap();

        let doc = serde_json::json!({
            "value": 1,
            "children": [{"value": 2}, {"value": 3, "children": [{"value": 4}]}]
        });
        let record = registry.construct_json("Node", doc.clone()).unwrap();
        assert_eq!(record.to_json(), doc);

        let err = registry
            .construct_json("Node", serde_json::json!({"value": 1, "children": [{"value": "x"}]}))
            .unwrap_err();
        assert_eq!(err.validation().unwrap().path, "Node#children[0].Node#value");
    }

    #[test]
    fn test_dangling_refs() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::builder("A").field_of("b", TypeExpr::schema("B")).build().unwrap())
            .unwrap();
        assert_eq!(
            registry.dangling_refs(),
            vec![DanglingRef {
                schema: "A".into(),
                field: "b".into(),
                target: "B".into()
            }]
        );
    }

    #[test]
    fn test_construct_json_requires_object() {
        let mut registry = SchemaRegistry::new();
        registry.register(node()).unwrap();
        assert!(registry.construct_json("Node", serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_single_field() {
        let mut registry = SchemaRegistry::new();
        registry.register(node()).unwrap();
        assert_eq!(registry.validate("Node", "value", Value::Int(3)).unwrap(), Value::Int(3));
        assert!(registry.validate("Node", "value", Value::from("3")).is_err());
        assert!(registry.validate("Node", "nope", Value::Int(3)).is_err());
    }

    #[test]
    fn test_clone_schema_registers() {
        let mut registry = SchemaRegistry::new();
        registry.register(node()).unwrap();
        registry.clone_schema("Node", "Leaf", CloneSpec::exclude(["children"])).unwrap();

        assert!(registry.construct("Leaf", map! { "value" => 1 }).is_ok());
        assert!(registry.construct("Leaf", map! { "value" => 1, "children" => Vec::<Value>::new() }).is_err());
        assert_eq!(registry.names(), vec!["Leaf", "Node"]);
    }
}
