use super::Error;

/// Error when the record store refuses to create a record because one with
/// the same class and id is already visible.
#[derive(Debug)]
pub(super) struct AlreadyExists {
    context: Box<str>,
}

impl std::error::Error for AlreadyExists {}

impl core::fmt::Display for AlreadyExists {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "record already exists: {}", self.context)
    }
}

impl Error {
    /// Creates an already-exists error.
    pub fn already_exists(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::AlreadyExists(AlreadyExists {
            context: context.into().into(),
        }))
    }

    /// Returns `true` if this error is an already-exists error.
    pub fn is_already_exists(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::AlreadyExists(_)))
    }
}
