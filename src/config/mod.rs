//! Configuration module
//!
//! Light and simulation configuration, YAML loading, and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{LoadResult, LoadWarning, load_simulation, parse_simulation};
pub use schema::*;
pub use validation::{validate_light, validate_simulation};
