use super::Error;

/// Error when a value assigned to an attribute or relation is rejected.
#[derive(Debug)]
pub(super) struct ValidationError {
    field: Box<str>,
    object: Box<str>,
    value: Box<str>,
    kind: ValidationErrorKind,
}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// A scalar was given to a multivalue field, or a sequence to a
    /// single-valued one.
    Cardinality { multivalue: bool },

    /// The value cannot be converted to the attribute's type.
    Coercion { to: Box<str> },

    /// The value is outside the attribute's range.
    Range { range: Box<str> },

    /// A date or time string does not match any accepted format.
    Format { accepted: Box<str> },

    /// A class-reference names a class with no derived type.
    UnknownClass,

    /// A relation value is not an object of the relation's target class.
    Target { expected: Box<str> },
}

impl std::error::Error for ValidationError {}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid value {} for `{}` of {}: ",
            self.value, self.field, self.object
        )?;

        match &self.kind {
            ValidationErrorKind::Cardinality { multivalue: true } => {
                f.write_str("multivalue fields must be set with a sequence")
            }
            ValidationErrorKind::Cardinality { multivalue: false } => {
                f.write_str("single-valued fields cannot be set with a sequence")
            }
            ValidationErrorKind::Coercion { to } => write!(f, "cannot convert to {to}"),
            ValidationErrorKind::Range { range } => write!(f, "not in range {range}"),
            ValidationErrorKind::Format { accepted } => {
                write!(f, "expected one of the formats {accepted}")
            }
            ValidationErrorKind::UnknownClass => f.write_str("no such class is known"),
            ValidationErrorKind::Target { expected } => {
                write!(f, "expected an object of class or subclass `{expected}`")
            }
        }
    }
}

impl Error {
    /// Creates a validation error.
    ///
    /// `object` identifies the owner (usually its full name), `value` is a
    /// rendering of the rejected value.
    pub fn validation(
        field: impl Into<String>,
        object: impl Into<String>,
        value: impl core::fmt::Display,
        kind: ValidationErrorKind,
    ) -> Error {
        Error::from(super::ErrorKind::Validation(ValidationError {
            field: field.into().into(),
            object: object.into().into(),
            value: value.to_string().into(),
            kind,
        }))
    }

    /// Returns `true` if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        self.validation_kind().is_some()
    }

    /// Returns `true` if this error is a cardinality validation error.
    pub fn is_cardinality(&self) -> bool {
        matches!(
            self.validation_kind(),
            Some(ValidationErrorKind::Cardinality { .. })
        )
    }

    /// The reason a value was rejected, if this is a validation error.
    pub fn validation_kind(&self) -> Option<&ValidationErrorKind> {
        self.chain().find_map(|err| match err.kind() {
            super::ErrorKind::Validation(err) => Some(&err.kind),
            _ => None,
        })
    }
}
