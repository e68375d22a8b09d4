//! Parameter holders and the reflective tree built over them.
//!
//! Participating types implement [`ParameterHolder`] and expose their own leaves and the
//! nested holders they own. [`ParameterTree::build`] walks that structure into a tree of
//! groups and [`ParameterAccess`] leaves with path-qualified keys.

pub mod access;
pub mod dynamic;
pub mod holder;
pub mod tree;
pub mod value;

pub use access::*;
pub use dynamic::*;
pub use holder::*;
pub use tree::*;
pub use value::*;
