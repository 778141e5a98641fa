//! Record Schemas
//!
//! Runtime structural-type validation and coercion for declared record
//! schemas. A schema is an ordered set of named fields, each carrying a type
//! expression and behavioural options (defaults, parsers, bounds, aliases,
//! custom validators). Records are built from plain nested maps, validated
//! field by field, and serialized back to plain maps.
//!
//! ## Features
//!
//! - **Structural types**: primitives, optional, list, map, tuple, union and
//!   references to other schemas (including recursive ones)
//! - **Validation pipeline**: default, parse, pack, type check, allowed
//!   values, bounds, lengths, custom validators
//! - **Pack/unpack**: nested maps become nested records and back, honouring
//!   aliases on input and renames on output
//! - **Declarative definitions**: schemas loaded from TOML or JSON files
//!
//! ## Example
//!
//! ```
//! use record_schemas::{map, FieldSpec, Schema, SchemaRegistry, TypeExpr, Value};
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     Schema::builder("Item")
//!         .field("title", FieldSpec::builder(TypeExpr::string()).min_length(1).build()?)
//!         .build()?,
//! )?;
//! registry.register(
//!     Schema::builder("Player")
//!         .field_of("nick", TypeExpr::string())
//!         .field("items", FieldSpec::builder(TypeExpr::list_of(TypeExpr::schema("Item"))).rename("bag").build()?)
//!         .build()?,
//! )?;
//!
//! let player = registry.construct(
//!     "Player",
//!     map! { "nick" => "ann", "items" => vec![Value::from(map! { "title" => "Rose" })] },
//! )?;
//! assert_eq!(player.to_json(), serde_json::json!({"nick": "ann", "bag": [{"title": "Rose"}]}));
//! # Ok::<(), record_schemas::SchemaError>(())
//! ```

pub mod builtins;
pub mod check;
pub mod config;
pub mod convert;
pub mod error;
pub mod field;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod representation;
pub mod schema;
pub mod types;
pub mod value;

pub use check::TypeChecker;
pub use config::{EngineConfig, OutputFormat};
pub use convert::{unpack, Packer};
pub use error::{BoxError, Result, SchemaError, ValidationError, ValidationErrorKind};
pub use field::{FieldContext, FieldSpec, FieldSpecBuilder, Setting};
pub use loader::{DefinitionFile, DefinitionFormat, SchemaLoader};
pub use pipeline::Pipeline;
pub use record::Record;
pub use registry::{DanglingRef, SchemaRegistry};
pub use schema::{CloneSpec, Schema, SchemaBuilder};
pub use types::{Primitive, TypeExpr};
pub use value::{Map, Value};
