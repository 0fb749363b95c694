use super::Error;

/// Error when a name is neither an attribute nor a relation of a class's
/// effective schema.
#[derive(Debug)]
pub(super) struct UnknownField {
    class: Box<str>,
    field: Box<str>,
}

impl std::error::Error for UnknownField {}

impl core::fmt::Display for UnknownField {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "`{}` is not an attribute or relation of class `{}` or any of its superclasses",
            self.field, self.class
        )
    }
}

impl Error {
    /// Creates an unknown field error.
    pub fn unknown_field(class: impl Into<String>, field: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnknownField(UnknownField {
            class: class.into().into(),
            field: field.into().into(),
        }))
    }

    /// Returns `true` if this error is an unknown field error.
    pub fn is_unknown_field(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::UnknownField(_)))
    }
}
