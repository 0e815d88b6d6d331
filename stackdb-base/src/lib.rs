mod error;

pub use error::{operation, protocol, transaction, Error, Result};
