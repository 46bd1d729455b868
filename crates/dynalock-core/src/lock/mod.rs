//! Lock acquisition and release
//!
//! - Acquire: conditional insert, polled until it wins or a deadline passes
//! - Release: consistent read, then delete if the record exists

mod model;
mod service;

pub use model::*;
pub use service::*;
