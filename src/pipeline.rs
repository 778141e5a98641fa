//! Per-field validation pipeline
//!
//! Steps, in order: default substitution, conversion (parser), packing of
//! nested schemas, type check, allowed values, value bounds, length bounds,
//! exact size, custom validators. The first failing step aborts.

use std::cmp::Ordering;

use crate::check::TypeChecker;
use crate::convert::Packer;
use crate::error::{field_path, Result, SchemaError, ValidationError, ValidationErrorKind};
use crate::field::{FieldContext, FieldSpec};
use crate::registry::SchemaRegistry;
use crate::types::TypeExpr;
use crate::value::Value;

/// Runs the validation steps for single fields
pub struct Pipeline<'r> {
    checker: TypeChecker<'r>,
    packer: Packer<'r>,
}

impl<'r> Pipeline<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            checker: TypeChecker::new(registry),
            packer: Packer::new(registry),
        }
    }

    /// Validate one raw value for the field described by `ctx` and `spec`
    pub fn validate(&self, ctx: &FieldContext<'_>, spec: &FieldSpec, raw: Value) -> Result<Value> {
        let fail = |kind| SchemaError::Validation(ValidationError::at_field(ctx.schema, ctx.field, kind));

        let mut value = raw;

        if value.is_null() {
            if let Some(default) = spec.default_value() {
                tracing::trace!(schema = ctx.schema, field = ctx.field, "default substituted");
                value = default;
            }
        }

        if let Some(parser) = &spec.parser {
            if !self.checker.is_compatible(&value, &spec.ty) {
                if let Some(converted) = parser(&value) {
                    tracing::trace!(schema = ctx.schema, field = ctx.field, "value converted by parser");
                    value = converted;
                }
            }
        }

        if spec.ty.contains_schema_ref() {
            value = self
                .packer
                .pack(value, &spec.ty, spec.auto_pack)
                .map_err(|e| e.nested_under(&field_path(ctx.schema, ctx.field)))?;
        }

        if value.is_null() {
            return if spec.accepts_null() {
                Ok(value)
            } else {
                Err(fail(ValidationErrorKind::Missing))
            };
        }

        // packing has already turned every acceptable map into a record
        if !TypeChecker::domain().is_compatible(&value, &spec.ty) {
            return Err(fail(mismatch(&spec.ty, &value)));
        }

        if let Some(allowed) = &spec.allowed {
            let allowed = allowed.resolve();
            if !allowed.contains(&value) {
                return Err(fail(ValidationErrorKind::NotAllowed {
                    value: value.to_string(),
                    allowed: allowed.iter().map(ToString::to_string).collect(),
                }));
            }
        }

        if let Some(min) = &spec.min_value {
            let min = min.resolve();
            match value.compare(&min) {
                Some(Ordering::Less) => {
                    return Err(fail(ValidationErrorKind::BelowMinimum {
                        value: value.to_string(),
                        minimum: min.to_string(),
                    }))
                }
                None => return Err(fail(incomparable(&value, &min))),
                _ => {}
            }
        }

        if let Some(max) = &spec.max_value {
            let max = max.resolve();
            match value.compare(&max) {
                Some(Ordering::Greater) => {
                    return Err(fail(ValidationErrorKind::AboveMaximum {
                        value: value.to_string(),
                        maximum: max.to_string(),
                    }))
                }
                None => return Err(fail(incomparable(&value, &max))),
                _ => {}
            }
        }

        if spec.min_length.is_some() || spec.max_length.is_some() || spec.size.is_some() {
            let length = value
                .length()
                .ok_or_else(|| fail(ValidationErrorKind::NoLength { actual: value.kind() }))?;

            if let Some(minimum) = spec.min_length.as_ref().map(|s| s.resolve()) {
                if length < minimum {
                    return Err(fail(ValidationErrorKind::TooShort { length, minimum }));
                }
            }
            if let Some(maximum) = spec.max_length.as_ref().map(|s| s.resolve()) {
                if length > maximum {
                    return Err(fail(ValidationErrorKind::TooLong { length, maximum }));
                }
            }
            if let Some(size) = spec.size.as_ref().map(|s| s.resolve()) {
                if length != size {
                    return Err(fail(ValidationErrorKind::WrongSize { length, size }));
                }
            }
        }

        for validator in &spec.validators {
            value = validator(ctx, value).map_err(SchemaError::Validator)?;
        }

        Ok(value)
    }
}

fn mismatch(ty: &TypeExpr, value: &Value) -> ValidationErrorKind {
    let expected = ty.to_string();
    let actual = value.kind();
    if ty.is_union() {
        ValidationErrorKind::NoUnionMatch { expected, actual }
    } else {
        ValidationErrorKind::TypeMismatch { expected, actual }
    }
}

fn incomparable(value: &Value, bound: &Value) -> ValidationErrorKind {
    ValidationErrorKind::Incomparable {
        value: value.to_string(),
        bound: bound.to_string(),
    }
}
