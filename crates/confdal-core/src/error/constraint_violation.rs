use super::Error;

/// Error when the record store rejects a mutation.
///
/// This occurs when:
/// - A relation points to a record that is not reachable from the database
///   holding the source record
/// - A record is destroyed while other records still reference it
/// - A record lives in a database that cannot be written to
#[derive(Debug)]
pub(super) struct ConstraintViolation {
    context: Box<str>,
}

impl std::error::Error for ConstraintViolation {}

impl core::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "constraint violation: {}", self.context)
    }
}

impl Error {
    /// Creates a constraint violation error.
    pub fn constraint_violation(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ConstraintViolation(ConstraintViolation {
            context: context.into().into(),
        }))
    }

    /// Returns `true` if this error is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::ConstraintViolation(_)))
    }
}
