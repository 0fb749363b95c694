use super::Error;

/// Error when an exact-id search over an object graph matches nothing.
#[derive(Debug)]
pub(super) struct ObjectNotFound {
    context: Box<str>,
}

impl std::error::Error for ObjectNotFound {}

impl core::fmt::Display for ObjectNotFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "object not found: {}", self.context)
    }
}

impl Error {
    /// Creates an object-not-found error.
    pub fn object_not_found(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ObjectNotFound(ObjectNotFound {
            context: context.into().into(),
        }))
    }

    /// Returns `true` if this error is an object-not-found error.
    pub fn is_object_not_found(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::ObjectNotFound(_)))
    }
}
