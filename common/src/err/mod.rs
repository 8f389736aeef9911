mod error;

pub use error::{CdcError, CdcResult, ErrorKind};
