pub mod build;
pub mod conversion;
pub mod definition;

pub use build::*;
pub use conversion::*;
pub use definition::*;
