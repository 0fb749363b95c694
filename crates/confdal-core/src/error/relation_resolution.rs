use super::Error;

/// Error when the records behind a relation cannot be fetched.
///
/// Reads recover from this locally; the error only ever reaches logs.
#[derive(Debug)]
pub(super) struct RelationResolution {
    relation: Box<str>,
    object: Box<str>,
}

impl std::error::Error for RelationResolution {}

impl core::fmt::Display for RelationResolution {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "cannot resolve relation `{}` of {}",
            self.relation, self.object
        )
    }
}

impl Error {
    /// Creates a relation resolution error, wrapping the store failure.
    pub fn relation_resolution(
        cause: Error,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Error {
        cause.context(Error::from(super::ErrorKind::RelationResolution(
            RelationResolution {
                relation: relation.into().into(),
                object: object.into().into(),
            },
        )))
    }

    /// Returns `true` if this error is a relation resolution error.
    pub fn is_relation_resolution(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::RelationResolution(_)))
    }
}
