//! Field specifications: a field's type plus its behavioural options

use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, Result, SchemaError};
use crate::types::TypeExpr;
use crate::value::{Map, Value};

/// Best-effort conversion of a raw value; `None` abandons the conversion
pub type Parser = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Outbound conversion applied after unpacking
pub type Serializer = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Custom validation step; may transform the value or fail with its own error
pub type Validator = Arc<dyn Fn(&FieldContext<'_>, Value) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Zero-argument provider evaluated on every use
pub type Provider<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Where a value is being validated
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub schema: &'a str,
    pub field: &'a str,
    /// Sibling values in wire form, keyed by canonical field name.
    ///
    /// On construction this is the input after alias resolution. On `set`
    /// it is the record's current values, unpacked.
    pub root: &'a Map,
}

/// An option that is either a literal or computed on every validation
#[derive(Clone)]
pub enum Setting<T> {
    Fixed(T),
    Dynamic(Provider<T>),
}

impl<T: Clone> Setting<T> {
    /// Current value; dynamic settings are evaluated fresh each call
    pub fn resolve(&self) -> T {
        match self {
            Setting::Fixed(value) => value.clone(),
            Setting::Dynamic(provider) => provider(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Fixed(value) => value.fmt(f),
            Setting::Dynamic(_) => write!(f, "<dynamic>"),
        }
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Setting::Fixed(value)
    }
}

/// Immutable configuration of one field
#[derive(Clone)]
pub struct FieldSpec {
    pub ty: TypeExpr,
    pub required: bool,
    pub default: Option<Setting<Value>>,
    pub parser: Option<Parser>,
    pub serializer: Option<Serializer>,
    pub validators: Vec<Validator>,
    pub allowed: Option<Setting<Vec<Value>>>,
    pub min_value: Option<Setting<Value>>,
    pub max_value: Option<Setting<Value>>,
    pub min_length: Option<Setting<usize>>,
    pub max_length: Option<Setting<usize>>,
    pub size: Option<Setting<usize>>,
    /// Input key read when the canonical name is absent
    pub alias: Option<String>,
    /// Output key written on serialization
    pub rename: Option<String>,
    pub auto_pack: bool,
}

impl FieldSpec {
    /// Start building a field of the given type
    pub fn builder(ty: TypeExpr) -> FieldSpecBuilder {
        FieldSpecBuilder::new(ty)
    }

    /// A field with no options beyond its type
    pub fn of(ty: TypeExpr) -> Self {
        let required = !ty.accepts_null();
        Self {
            ty,
            required,
            default: None,
            parser: None,
            serializer: None,
            validators: Vec::new(),
            allowed: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            size: None,
            alias: None,
            rename: None,
            auto_pack: false,
        }
    }

    /// Whether a null value survives the type check
    pub fn accepts_null(&self) -> bool {
        !self.required || self.ty.accepts_null()
    }

    /// Key used for this field in serialized output
    pub fn output_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.rename.as_deref().unwrap_or(name)
    }

    /// Materialize the default, if any. Providers run on every call.
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(Setting::resolve)
    }

    fn check(&self) -> Result<()> {
        self.ty.check_definition()?;

        if let (Some(Setting::Fixed(allowed)), Some(Setting::Fixed(default))) = (&self.allowed, &self.default) {
            if !default.is_null() && !allowed.contains(default) {
                return Err(SchemaError::definition(format!(
                    "default {} is not one of the allowed values",
                    default
                )));
            }
        }

        if let (Some(Setting::Fixed(min)), Some(Setting::Fixed(max))) = (&self.min_length, &self.max_length) {
            if min > max {
                return Err(SchemaError::definition(format!(
                    "min_length {} is greater than max_length {}",
                    min, max
                )));
            }
        }

        if let (Some(Setting::Fixed(min)), Some(Setting::Fixed(max))) = (&self.min_value, &self.max_value) {
            match min.compare(max) {
                Some(std::cmp::Ordering::Greater) => {
                    return Err(SchemaError::definition(format!(
                        "min_value {} is greater than max_value {}",
                        min, max
                    )));
                }
                None => {
                    return Err(SchemaError::definition(format!(
                        "min_value {} and max_value {} are not comparable",
                        min, max
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("ty", &self.ty)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("parser", &self.parser.is_some())
            .field("serializer", &self.serializer.is_some())
            .field("validators", &self.validators.len())
            .field("allowed", &self.allowed)
            .field("min_value", &self.min_value)
            .field("max_value", &self.max_value)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("size", &self.size)
            .field("alias", &self.alias)
            .field("rename", &self.rename)
            .field("auto_pack", &self.auto_pack)
            .finish()
    }
}

/// Builder for [`FieldSpec`]; contradictions are reported by [`build`](Self::build)
pub struct FieldSpecBuilder {
    spec: FieldSpec,
}

impl FieldSpecBuilder {
    pub fn new(ty: TypeExpr) -> Self {
        Self { spec: FieldSpec::of(ty) }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.spec.required = required;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.spec.default = Some(Setting::Fixed(value.into()));
        self
    }

    /// Default computed fresh for every missing value
    pub fn default_with(mut self, provider: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.spec.default = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn parser(mut self, parser: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.spec.parser = Some(Arc::new(parser));
        self
    }

    pub fn parser_arc(mut self, parser: Parser) -> Self {
        self.spec.parser = Some(parser);
        self
    }

    pub fn serializer(mut self, serializer: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.spec.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&FieldContext<'_>, Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.spec.validators.push(Arc::new(validator));
        self
    }

    pub fn validator_arc(mut self, validator: Validator) -> Self {
        self.spec.validators.push(validator);
        self
    }

    pub fn allowed<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.spec.allowed = Some(Setting::Fixed(values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn allowed_with(mut self, provider: impl Fn() -> Vec<Value> + Send + Sync + 'static) -> Self {
        self.spec.allowed = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn min_value(mut self, value: impl Into<Value>) -> Self {
        self.spec.min_value = Some(Setting::Fixed(value.into()));
        self
    }

    pub fn min_value_with(mut self, provider: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.spec.min_value = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn max_value(mut self, value: impl Into<Value>) -> Self {
        self.spec.max_value = Some(Setting::Fixed(value.into()));
        self
    }

    pub fn max_value_with(mut self, provider: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.spec.max_value = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.spec.min_length = Some(Setting::Fixed(length));
        self
    }

    pub fn min_length_with(mut self, provider: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.spec.min_length = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.spec.max_length = Some(Setting::Fixed(length));
        self
    }

    pub fn max_length_with(mut self, provider: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.spec.max_length = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.spec.size = Some(Setting::Fixed(size));
        self
    }

    pub fn size_with(mut self, provider: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.spec.size = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.spec.alias = Some(alias.into());
        self
    }

    pub fn rename(mut self, rename: impl Into<String>) -> Self {
        self.spec.rename = Some(rename.into());
        self
    }

    pub fn auto_pack(mut self, auto_pack: bool) -> Self {
        self.spec.auto_pack = auto_pack;
        self
    }

    /// Finish the field, rejecting self-contradictory options
    pub fn build(self) -> Result<FieldSpec> {
        self.spec.check()?;
        Ok(self.spec)
    }
}
