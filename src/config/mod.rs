//! Configuration module.

mod env;
mod loader;
mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
