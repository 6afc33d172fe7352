pub mod error;
pub mod types;
pub mod value;

pub use error::{DriverError, Result};
pub use types::{KeyedRecord, Record, Tuple};
pub use value::Value;
