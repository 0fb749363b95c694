pub mod db;
pub use db::Db;

mod materialize;
pub use materialize::Policy;

pub mod object;
pub use object::{DalObject, Field, Found, Query};

pub mod proxy;
pub use proxy::{ProxyValue, RecordProxy, Related};

pub mod registry;
pub use registry::{ClassType, DalType, Registry};

pub use confdal_core::{driver::Driver, schema, Error, Result, ValidationErrorKind, Value};
