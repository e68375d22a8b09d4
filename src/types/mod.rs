//! Data type identifiers and the registry that answers compatibility queries.

pub mod data_type;
pub mod registry;

pub use data_type::*;
pub use registry::*;
