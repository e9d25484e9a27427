//! Shared infrastructure for the wirelab crates.
//!
//! - [`LabError`]: the error taxonomy used across resolution, scheduling
//!   and wiring
//! - [`shell`]: safe shell command execution for kernel interface work

mod error;
pub mod shell;

pub use error::{LabError, LabResult};
