//! Schema descriptors
//!
//! A schema is an ordered, immutable set of named field specifications plus
//! record-level policy (unknown-key stripping, post-construction hook).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, Result, SchemaError};
use crate::field::FieldSpec;
use crate::record::Record;
use crate::types::TypeExpr;

/// Hook run after a record is fully constructed; an error vetoes construction
pub type PostInit = Arc<dyn Fn(&Record) -> std::result::Result<(), BoxError> + Send + Sync>;

/// A declared schema
#[derive(Clone)]
pub struct Schema {
    name: String,
    fields: Vec<(String, Arc<FieldSpec>)>,
    /// Field name to position in `fields`
    index: HashMap<String, usize>,
    strip_unknown: bool,
    post_init: Option<PostInit>,
}

impl Schema {
    /// Start declaring a schema
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec.as_ref()))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| self.fields[i].1.as_ref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn strip_unknown(&self) -> bool {
        self.strip_unknown
    }

    pub fn post_init(&self) -> Option<&PostInit> {
        self.post_init.as_ref()
    }

    /// Derive a new schema by including, excluding and adding fields.
    ///
    /// The original is left untouched; unmodified field specifications are
    /// shared with the clone.
    pub fn clone_with(&self, name: impl Into<String>, spec: CloneSpec) -> Result<Schema> {
        if spec.include.is_some() && spec.exclude.is_some() {
            return Err(SchemaError::definition("cannot specify both include and exclude"));
        }

        let keep = |field: &str| match (&spec.include, &spec.exclude) {
            (Some(include), _) => include.contains(field),
            (_, Some(exclude)) => !exclude.contains(field),
            _ => true,
        };

        for listed in spec.include.iter().chain(spec.exclude.iter()).flatten() {
            if !self.index.contains_key(listed) {
                return Err(SchemaError::definition(format!(
                    "schema {} has no field `{}`",
                    self.name, listed
                )));
            }
        }

        let mut builder = SchemaBuilder::new(name).strip_unknown(self.strip_unknown);
        builder.post_init = self.post_init.clone();
        for (field, spec) in &self.fields {
            if keep(field) {
                builder.fields.push((field.clone(), spec.clone()));
            }
        }
        for (field, added) in spec.add {
            builder = builder.replace(field, added);
        }

        let schema = builder.build()?;
        tracing::debug!(source = %self.name, clone = %schema.name, fields = schema.len(), "cloned schema");
        Ok(schema)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("strip_unknown", &self.strip_unknown)
            .field("post_init", &self.post_init.is_some())
            .finish()
    }
}

/// Field selection for [`Schema::clone_with`]
#[derive(Debug, Default, Clone)]
pub struct CloneSpec {
    pub include: Option<HashSet<String>>,
    pub exclude: Option<HashSet<String>>,
    /// Fields added (or replaced) after filtering
    pub add: Vec<(String, FieldSpec)>,
}

impl CloneSpec {
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            include: Some(fields.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            exclude: Some(fields.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn add(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.add.push((name.into(), spec));
        self
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, Arc<FieldSpec>)>,
    strip_unknown: bool,
    post_init: Option<PostInit>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            strip_unknown: false,
            post_init: None,
        }
    }

    /// Declare a field. Declaring the same name twice is a definition error.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), Arc::new(spec)));
        self
    }

    /// Declare a field with no options beyond its type
    pub fn field_of(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.field(name, FieldSpec::of(ty))
    }

    /// Declare a field, replacing any earlier declaration with the same name
    fn replace(mut self, name: String, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = Arc::new(spec),
            None => self.fields.push((name, Arc::new(spec))),
        }
        self
    }

    pub fn strip_unknown(mut self, strip_unknown: bool) -> Self {
        self.strip_unknown = strip_unknown;
        self
    }

    pub fn post_init(mut self, hook: impl Fn(&Record) -> std::result::Result<(), BoxError> + Send + Sync + 'static) -> Self {
        self.post_init = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<Schema> {
        if self.name.is_empty() {
            return Err(SchemaError::definition("schema name must not be empty"));
        }

        let mut index = HashMap::with_capacity(self.fields.len());
        for (i, (field, spec)) in self.fields.iter().enumerate() {
            if field.is_empty() {
                return Err(SchemaError::definition(format!("schema {} has a field without a name", self.name)));
            }
            if index.insert(field.clone(), i).is_some() {
                return Err(SchemaError::definition(format!(
                    "schema {} declares field `{}` twice",
                    self.name, field
                )));
            }
            spec.ty.check_definition().map_err(|e| match e {
                SchemaError::Definition(msg) => SchemaError::definition(format!("{}#{}: {}", self.name, field, msg)),
                other => other,
            })?;
        }

        Ok(Schema {
            name: self.name,
            fields: self.fields,
            index,
            strip_unknown: self.strip_unknown,
            post_init: self.post_init,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> Schema {
        Schema::builder("Original")
            .field_of("a", TypeExpr::int())
            .field_of("b", TypeExpr::int())
            .field_of("c", TypeExpr::string())
            .field_of("d", TypeExpr::optional(TypeExpr::float()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let result = Schema::builder("Dup")
            .field_of("a", TypeExpr::int())
            .field_of("a", TypeExpr::string())
            .build();
        assert!(result.unwrap_err().is_definition());
    }

    #[test]
    fn test_clone_include() {
        let clone = original().clone_with("OnlyA", CloneSpec::include(["a"])).unwrap();
        assert_eq!(clone.field_names(), vec!["a"]);
        assert_eq!(clone.name(), "OnlyA");
    }

    #[test]
    fn test_clone_exclude_is_complement_of_include() {
        let schema = original();
        let excluded = schema.clone_with("NoB", CloneSpec::exclude(["b"])).unwrap();
        assert_eq!(excluded.field_names(), vec!["a", "c", "d"]);

        let mut names: Vec<&str> = excluded.field_names();
        names.push("b");
        names.sort_unstable();
        let mut all = schema.field_names();
        all.sort_unstable();
        assert_eq!(names, all);
    }

    #[test]
    fn test_clone_rejects_include_and_exclude() {
        let spec = CloneSpec {
            include: Some(["a".to_string()].into_iter().collect()),
            exclude: Some(["b".to_string()].into_iter().collect()),
            add: Vec::new(),
        };
        assert!(original().clone_with("Bad", spec).unwrap_err().is_definition());
    }

    #[test]
    fn test_clone_rejects_unknown_field() {
        assert!(original().clone_with("Bad", CloneSpec::include(["zzz"])).is_err());
    }

    #[test]
    fn test_clone_add_and_replace() {
        let schema = original();
        let clone = schema
            .clone_with(
                "Extended",
                CloneSpec::exclude(["d"])
                    .add("e", FieldSpec::of(TypeExpr::bool()))
                    .add("a", FieldSpec::of(TypeExpr::string())),
            )
            .unwrap();

        assert_eq!(clone.field_names(), vec!["a", "b", "c", "e"]);
        assert_eq!(clone.field("a").unwrap().ty, TypeExpr::string());
        // original untouched
        assert_eq!(schema.field("a").unwrap().ty, TypeExpr::int());
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn test_clone_keeps_strip_unknown() {
        let schema = Schema::builder("Loose")
            .field_of("a", TypeExpr::int())
            .strip_unknown(true)
            .build()
            .unwrap();
        assert!(schema.clone_with("Loose2", CloneSpec::default()).unwrap().strip_unknown());
    }
}
