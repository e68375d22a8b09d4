//! Prelude module for convenient imports
//!
//! Re-exports the types needed to build, wire and inspect a pipeline graph.
//!
//! # Example
//!
//! ```rust,no_run
//! use kairo::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/pipeline.json")?;
//! let loaded = load(json.as_str())?;
//!
//! for issue in loaded.graph.validate() {
//!     println!("{}", issue);
//! }
//! println!("{}", DisplayGraph::new(&loaded.graph));
//! # Ok(())
//! # }
//! ```

// Data types
pub use crate::types::{DataTypeId, DataTypeInfo, DataTypeRegistry};

// Slots
pub use crate::slot::{
    AllowedTypes, InheritedSlot, SlotConfiguration, SlotConfigurationKind, SlotDefinition,
    SlotDirection, SlotEvent, SlotId,
};

// Graph
pub use crate::graph::{
    Edge, Graph, GraphEvent, GraphNode, NodeId, NodeLocation, SlotRef, SlotReplacement,
    ValidationIssue,
};

// Parameters
pub use crate::parameter::{
    DynamicParameterCollection, HolderMetadata, ParameterAccess, ParameterDeclaration,
    ParameterEvent, ParameterHolder, ParameterShape, ParameterTree, ParameterType,
    ParameterValue, SubHolder, TreeOptions,
};

// Change notification
pub use crate::event::{ChangeEvent, ChangeKind, EventBus, Subscription};

// Definitions
pub use crate::definition::{
    load, IntoPipeline, LoadedPipeline, NodeDefinition, PipelineDefinition, SlotSpec,
};

// Session and rendering
pub use crate::display::{DisplayGraph, DisplayParameterTree};
pub use crate::session::EditingSession;

// Error types
pub use crate::error::{DefinitionError, ErrorKind, GraphError, ParameterError, SlotError};

// Result type alias for convenience
pub type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;
