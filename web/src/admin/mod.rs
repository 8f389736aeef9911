//! The administrative HTTP control surface (spec.md §6 "Control API").

mod dto;
mod handlers;

pub use handlers::{delete, run, status, stop};
