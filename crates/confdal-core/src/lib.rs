#[macro_use]
mod macros;

pub mod coerce;

pub mod driver;
pub use driver::Driver;

mod error;
pub use error::{Error, IntoError, ValidationErrorKind};

pub mod schema;
pub use schema::SchemaCache;

pub mod value;
pub use value::Value;

/// A Result type alias that uses confdal's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
