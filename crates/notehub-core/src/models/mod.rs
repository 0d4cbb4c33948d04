//! Data models
//!
//! Each sub-module represents one feature area.

mod file;
mod note;
mod profile;

pub use file::*;
pub use note::*;
pub use profile::*;
