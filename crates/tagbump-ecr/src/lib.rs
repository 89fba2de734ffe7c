//! # tagbump-ecr
//!
//! Amazon ECR implementation of the tagbump registry check: before a
//! promotion commits, ask ECR whether the new tag has been pushed.

mod checker;
mod error;
mod host;

pub use checker::{EcrChecker, StaticCredentials};
pub use error::{Error, Result};
pub use host::EcrHost;
