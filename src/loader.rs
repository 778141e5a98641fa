//! Declarative schema definitions
//!
//! Schemas can be declared in TOML or JSON files instead of through the
//! builder API:
//!
//! ```toml
//! [[schemas]]
//! name = "Player"
//!
//! [[schemas.fields]]
//! name = "nick"
//! type = "str"
//! min_length = 3
//! pattern = "^[a-z0-9_]+$"
//!
//! [[schemas.fields]]
//! name = "items"
//! type = "list[Item]"
//! default = []
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::builtins;
use crate::config::EngineConfig;
use crate::error::{Result, SchemaError};
use crate::field::FieldSpec;
use crate::registry::SchemaRegistry;
use crate::schema::Schema;
use crate::types::TypeExpr;
use crate::value::Value;

/// Contents of one definition file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub schemas: Vec<SchemaDefinition>,
}

/// One declared schema
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    pub name: String,
    /// Falls back to the loader's default when absent
    #[serde(default)]
    pub strip_unknown: Option<bool>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// One declared field
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    /// Type expression, e.g. `optional[list[Item]]`
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub min_value: Option<serde_json::Value>,
    #[serde(default)]
    pub max_value: Option<serde_json::Value>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub auto_pack: bool,
    /// Name of a built-in parser (`to_int`, `to_float`, `to_str`, `to_datetime`)
    #[serde(default)]
    pub parser: Option<String>,
    /// Regex the value must match
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub non_empty: bool,
}

/// Definition file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Toml,
    Json,
}

impl DefinitionFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(DefinitionFormat::Toml),
            "json" => Some(DefinitionFormat::Json),
            _ => None,
        }
    }
}

/// Reads definition files and registers their schemas
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    extensions: Vec<String>,
    strip_unknown: bool,
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self {
            extensions: vec!["toml".to_string(), "json".to_string()],
            strip_unknown: false,
        }
    }
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            extensions: config.definitions.extensions.clone(),
            strip_unknown: config.validation.strip_unknown,
        }
    }

    /// Default strip-unknown policy for schemas that do not set one
    pub fn strip_unknown(mut self, strip_unknown: bool) -> Self {
        self.strip_unknown = strip_unknown;
        self
    }

    pub fn parse(&self, content: &str, format: DefinitionFormat) -> Result<DefinitionFile> {
        Ok(match format {
            DefinitionFormat::Toml => toml::from_str(content)?,
            DefinitionFormat::Json => serde_json::from_str(content)?,
        })
    }

    /// Build a schema from its declaration without registering it
    pub fn build(&self, definition: &SchemaDefinition) -> Result<Schema> {
        let mut builder = Schema::builder(&definition.name)
            .strip_unknown(definition.strip_unknown.unwrap_or(self.strip_unknown));

        for field in &definition.fields {
            let spec = build_field(field).map_err(|e| match e {
                SchemaError::Definition(msg) => {
                    SchemaError::definition(format!("{}#{}: {}", definition.name, field.name, msg))
                }
                other => other,
            })?;
            builder = builder.field(&field.name, spec);
        }

        builder.build()
    }

    /// Register every schema declared in `content`; returns their names.
    ///
    /// Nothing is registered unless every declaration builds and no name is
    /// already taken.
    pub fn load_str(&self, registry: &mut SchemaRegistry, content: &str, format: DefinitionFormat) -> Result<Vec<String>> {
        let file = self.parse(content, format)?;
        let schemas = file
            .schemas
            .iter()
            .map(|definition| self.build(definition))
            .collect::<Result<Vec<_>>>()?;

        let mut names: Vec<String> = Vec::with_capacity(schemas.len());
        for schema in &schemas {
            let name = schema.name();
            if registry.contains(name) || names.iter().any(|seen| seen == name) {
                return Err(SchemaError::AlreadyExists { name: name.to_string() });
            }
            names.push(name.to_string());
        }

        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(names)
    }

    /// Register every schema declared in one file
    pub fn load_file(&self, registry: &mut SchemaRegistry, path: &Path) -> Result<Vec<String>> {
        let format = DefinitionFormat::from_path(path).ok_or_else(|| {
            SchemaError::definition(format!("{}: unsupported definition format", path.display()))
        })?;
        let content = fs::read_to_string(path)?;
        let names = self
            .load_str(registry, &content, format)
            .map_err(|e| in_file(path, e))?;
        tracing::debug!(file = %path.display(), schemas = names.len(), "loaded definitions");
        Ok(names)
    }

    /// Load a file, or every definition file below a directory
    pub fn load_path(&self, registry: &mut SchemaRegistry, path: &Path) -> Result<Vec<String>> {
        if !path.is_dir() {
            return self.load_file(registry, path);
        }

        let mut names = Vec::new();
        for file in self.definition_files(path) {
            names.extend(self.load_file(registry, &file)?);
        }

        for dangling in registry.dangling_refs() {
            tracing::warn!(
                schema = %dangling.schema,
                field = %dangling.field,
                target = %dangling.target,
                "reference to unregistered schema"
            );
        }
        Ok(names)
    }

    /// Definition files below `dir`, in file-name order
    pub fn definition_files(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect()
    }
}

fn build_field(field: &FieldDefinition) -> Result<FieldSpec> {
    let ty: TypeExpr = field.ty.parse()?;
    let mut builder = FieldSpec::builder(ty);

    if let Some(required) = field.required {
        builder = builder.required(required);
    }
    if let Some(default) = &field.default {
        builder = builder.default(Value::from(default.clone()));
    }
    if let Some(allowed) = &field.allowed {
        builder = builder.allowed(allowed.iter().cloned().map(Value::from));
    }
    if let Some(min) = &field.min_value {
        builder = builder.min_value(Value::from(min.clone()));
    }
    if let Some(max) = &field.max_value {
        builder = builder.max_value(Value::from(max.clone()));
    }
    if let Some(min) = field.min_length {
        builder = builder.min_length(min);
    }
    if let Some(max) = field.max_length {
        builder = builder.max_length(max);
    }
    if let Some(size) = field.size {
        builder = builder.size(size);
    }
    if let Some(alias) = &field.alias {
        builder = builder.alias(alias);
    }
    if let Some(rename) = &field.rename {
        builder = builder.rename(rename);
    }
    if let Some(name) = &field.parser {
        let parser = builtins::parser(name)
            .ok_or_else(|| SchemaError::definition(format!("unknown parser `{}`", name)))?;
        builder = builder.parser_arc(parser);
    }
    if let Some(pattern) = &field.pattern {
        builder = builder.validator_arc(builtins::matches(pattern)?);
    }
    if field.non_empty {
        builder = builder.validator_arc(builtins::non_empty());
    }

    builder.auto_pack(field.auto_pack).build()
}

/// Attach the file name to errors raised while reading it
fn in_file(path: &Path, err: SchemaError) -> SchemaError {
    match err {
        SchemaError::Definition(msg) => SchemaError::definition(format!("{}: {}", path.display(), msg)),
        SchemaError::Toml(e) => SchemaError::definition(format!("{}: {}", path.display(), e)),
        SchemaError::Json(e) => SchemaError::definition(format!("{}: {}", path.display(), e)),
        other => other,
    }
}
