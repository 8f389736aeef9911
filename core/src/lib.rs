pub mod cancel;
pub mod controller;
pub mod decoder;
pub mod id_generator;
pub mod position;
pub mod publisher;
pub mod source;
pub mod translate;
pub mod worker;

pub use common::err::{CdcError, CdcResult, ErrorKind};
