//! Error types for schema definition and record validation

use std::fmt;

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Boxed error raised by user hooks (validators, post-init)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Schema engine errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid definition: {0}")]
    Definition(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// Raised by a custom validator or post-init hook, passed through as-is
    #[error(transparent)]
    Validator(BoxError),

    #[error("Schema not found: {name}")]
    UnknownSchema { name: String },

    #[error("Schema already exists: {name}")]
    AlreadyExists { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub fn definition(message: impl Into<String>) -> Self {
        SchemaError::Definition(message.into())
    }

    /// Get the validation failure, if this is one
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            SchemaError::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Get the error raised by a user hook, if this is one
    pub fn user_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            SchemaError::Validator(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Downcast the error raised by a user hook to its concrete type
    pub fn downcast_user<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            SchemaError::Validator(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SchemaError::Validation(_))
    }

    pub fn is_definition(&self) -> bool {
        matches!(self, SchemaError::Definition(_))
    }

    /// Extend the path of a nested validation failure with the outer location.
    ///
    /// Errors from user hooks are left untouched.
    pub(crate) fn nested_under(self, outer: &str) -> Self {
        match self {
            SchemaError::Validation(err) => SchemaError::Validation(err.nested_under(outer)),
            other => other,
        }
    }
}

impl From<ValidationError> for SchemaError {
    fn from(err: ValidationError) -> Self {
        SchemaError::Validation(err)
    }
}

/// What went wrong with a single value
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// Required value absent (or null) after default substitution
    Missing,
    TypeMismatch { expected: String, actual: String },
    /// No union alternative accepted the value
    NoUnionMatch { expected: String, actual: String },
    NotAllowed { value: String, allowed: Vec<String> },
    BelowMinimum { value: String, minimum: String },
    AboveMaximum { value: String, maximum: String },
    TooShort { length: usize, minimum: usize },
    TooLong { length: usize, maximum: usize },
    WrongSize { length: usize, size: usize },
    /// A length bound is configured but the value has no length
    NoLength { actual: String },
    /// A value bound is configured but the value cannot be ordered against it
    Incomparable { value: String, bound: String },
    UnknownFields(Vec<String>),
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::Missing => write!(f, "required value is missing"),
            ValidationErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            ValidationErrorKind::NoUnionMatch { expected, actual } => {
                write!(f, "no alternative of {} accepts {}", expected, actual)
            }
            ValidationErrorKind::NotAllowed { value, allowed } => {
                write!(f, "value {} is not allowed (allowed: {})", value, allowed.join(", "))
            }
            ValidationErrorKind::BelowMinimum { value, minimum } => {
                write!(f, "value {} is less than minimum {}", value, minimum)
            }
            ValidationErrorKind::AboveMaximum { value, maximum } => {
                write!(f, "value {} is greater than maximum {}", value, maximum)
            }
            ValidationErrorKind::TooShort { length, minimum } => {
                write!(f, "length {} is less than minimum {}", length, minimum)
            }
            ValidationErrorKind::TooLong { length, maximum } => {
                write!(f, "length {} is greater than maximum {}", length, maximum)
            }
            ValidationErrorKind::WrongSize { length, size } => {
                write!(f, "length {} is not equal to {}", length, size)
            }
            ValidationErrorKind::NoLength { actual } => {
                write!(f, "value of kind {} has no length", actual)
            }
            ValidationErrorKind::Incomparable { value, bound } => {
                write!(f, "value {} cannot be compared with bound {}", value, bound)
            }
            ValidationErrorKind::UnknownFields(keys) => {
                write!(f, "unexpected fields: {}", keys.join(", "))
            }
        }
    }
}

/// Validation failure with the fully-qualified path to the offending value
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Path such as `Player#items[0].Item#title`
    pub path: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Error for a field of a schema, addressed as `Schema#field`
    pub fn at_field(schema: &str, field: &str, kind: ValidationErrorKind) -> Self {
        Self::new(field_path(schema, field), kind)
    }

    pub(crate) fn nested_under(mut self, outer: &str) -> Self {
        if outer.is_empty() {
            return self;
        }
        self.path = if self.path.is_empty() {
            outer.to_string()
        } else if self.path.starts_with('[') {
            format!("{}{}", outer, self.path)
        } else {
            format!("{}.{}", outer, self.path)
        };
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn field_path(schema: &str, field: &str) -> String {
    format!("{}#{}", schema, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths() {
        let err = ValidationError::at_field("Item", "title", ValidationErrorKind::Missing)
            .nested_under("[0]")
            .nested_under("Player#items");
        assert_eq!(err.path, "Player#items[0].Item#title");

        let err = ValidationError::at_field("A", "a", ValidationErrorKind::Missing).nested_under("B#inner");
        assert_eq!(err.path, "B#inner.A#a");
    }

    #[test]
    fn test_display_includes_expected_and_actual() {
        let err = ValidationError::at_field(
            "User",
            "age",
            ValidationErrorKind::TypeMismatch {
                expected: "int".into(),
                actual: "str".into(),
            },
        );
        let display = err.to_string();
        assert!(display.contains("User#age"));
        assert!(display.contains("int"));
        assert!(display.contains("str"));
    }

    #[derive(Debug)]
    struct NotAnEmail;

    impl fmt::Display for NotAnEmail {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "not an email")
        }
    }

    impl std::error::Error for NotAnEmail {}

    #[test]
    fn test_user_errors_pass_through() {
        let err = SchemaError::Validator(Box::new(NotAnEmail));
        assert_eq!(err.to_string(), "not an email");
        assert!(err.downcast_user::<NotAnEmail>().is_some());
        assert!(!err.is_validation());

        let nested = err.nested_under("Outer#field");
        assert!(nested.downcast_user::<NotAnEmail>().is_some());
    }
}
