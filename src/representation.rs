//! Descriptive rendering of schemas for documentation and export tooling

use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::field::{FieldSpec, Setting};
use crate::registry::SchemaRegistry;
use crate::schema::Schema;
use crate::types::TypeExpr;
use crate::value::Value;

const DYNAMIC: &str = "dynamic";

/// Describe a whole schema: its name, policy and every field
pub fn describe_schema(registry: &SchemaRegistry, schema: &Schema) -> JsonValue {
    let mut visiting = vec![schema.name().to_string()];
    json!({
        "name": schema.name(),
        "strip_unknown": schema.strip_unknown(),
        "schema": describe_fields(registry, schema, &mut visiting),
    })
}

fn describe_fields(registry: &SchemaRegistry, schema: &Schema, visiting: &mut Vec<String>) -> JsonValue {
    let mut fields = JsonMap::new();
    for (name, spec) in schema.fields() {
        fields.insert(name.to_string(), JsonValue::Object(describe_field(registry, spec, visiting)));
    }
    JsonValue::Object(fields)
}

fn describe_field(registry: &SchemaRegistry, spec: &FieldSpec, visiting: &mut Vec<String>) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert("required".into(), JsonValue::Bool(spec.required));

    if let Some(default) = &spec.default {
        out.insert("default".into(), value_setting(default));
    }
    if let Some(min) = &spec.min_length {
        out.insert("min length".into(), length_setting(min));
    }
    if let Some(max) = &spec.max_length {
        out.insert("max length".into(), length_setting(max));
    }
    if let Some(min) = &spec.min_value {
        out.insert("min value".into(), value_setting(min));
    }
    if let Some(max) = &spec.max_value {
        out.insert("max value".into(), value_setting(max));
    }
    if let Some(size) = &spec.size {
        out.insert("size".into(), length_setting(size));
    }
    if let Some(allowed) = &spec.allowed {
        let rendered = match allowed {
            Setting::Fixed(values) => JsonValue::Array(values.iter().map(Value::to_json).collect()),
            Setting::Dynamic(_) => JsonValue::from(DYNAMIC),
        };
        out.insert("allowed values".into(), rendered);
    }
    if let Some(alias) = &spec.alias {
        out.insert("search alias".into(), JsonValue::from(alias.as_str()));
    }
    if let Some(rename) = &spec.rename {
        out.insert("rename to".into(), JsonValue::from(rename.as_str()));
    }
    if spec.auto_pack {
        out.insert("auto pack".into(), JsonValue::Bool(true));
    }
    if spec.parser.is_some() {
        out.insert("parser".into(), JsonValue::Bool(true));
    }
    if !spec.validators.is_empty() {
        out.insert("validators".into(), JsonValue::from(spec.validators.len()));
    }

    out.extend(describe_type(registry, &spec.ty, visiting));
    out
}

fn describe_type(registry: &SchemaRegistry, ty: &TypeExpr, visiting: &mut Vec<String>) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    match ty {
        TypeExpr::Any => {
            out.insert("type".into(), JsonValue::from("any"));
        }
        TypeExpr::Primitive(primitive) => {
            out.insert("type".into(), JsonValue::from(primitive.type_name()));
        }
        TypeExpr::Optional(inner) => {
            out.insert("type".into(), JsonValue::from("optional"));
            out.insert("nested_type".into(), nested(registry, inner, visiting));
        }
        TypeExpr::ListOf(inner) => {
            out.insert("type".into(), JsonValue::from("list"));
            out.insert("nested_type".into(), nested(registry, inner, visiting));
        }
        TypeExpr::MapOf(key, value) => {
            out.insert("type".into(), JsonValue::from("dict"));
            out.insert("key_type".into(), nested(registry, key, visiting));
            out.insert("value_type".into(), nested(registry, value, visiting));
        }
        TypeExpr::TupleOf(elements) => {
            out.insert("type".into(), JsonValue::from("tuple"));
            out.insert(
                "nested_types".into(),
                JsonValue::Array(elements.iter().map(|t| nested(registry, t, visiting)).collect()),
            );
        }
        TypeExpr::UnionOf(alternatives) => {
            out.insert("type".into(), JsonValue::from("union"));
            out.insert(
                "nested_types".into(),
                JsonValue::Array(alternatives.iter().map(|t| nested(registry, t, visiting)).collect()),
            );
        }
        TypeExpr::SchemaRef(name) => {
            out.insert("type".into(), JsonValue::from("schema"));
            out.insert("name".into(), JsonValue::from(name.as_str()));
            if visiting.iter().any(|seen| seen == name) {
                out.insert("recursive".into(), JsonValue::Bool(true));
            } else if let Some(schema) = registry.get(name) {
                visiting.push(name.clone());
                out.insert("schema".into(), describe_fields(registry, schema, visiting));
                visiting.pop();
            } else {
                out.insert("unresolved".into(), JsonValue::Bool(true));
            }
        }
    }
    out
}

fn nested(registry: &SchemaRegistry, ty: &TypeExpr, visiting: &mut Vec<String>) -> JsonValue {
    JsonValue::Object(describe_type(registry, ty, visiting))
}

fn value_setting(setting: &Setting<Value>) -> JsonValue {
    match setting {
        Setting::Fixed(value) => value.to_json(),
        Setting::Dynamic(_) => JsonValue::from(DYNAMIC),
    }
}

fn length_setting(setting: &Setting<usize>) -> JsonValue {
    match setting {
        Setting::Fixed(n) => JsonValue::from(*n),
        Setting::Dynamic(_) => JsonValue::from(DYNAMIC),
    }
}
