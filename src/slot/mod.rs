//! Slot descriptors and the per-node slot configuration engine.

pub mod configuration;
pub mod definition;
pub mod name;

pub use configuration::*;
pub use definition::*;
pub use name::*;
