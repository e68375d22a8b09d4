//! # Kairo - Pipeline Graph Model
//!
//! **Kairo** is the editing core of a node-based analysis pipeline editor. It owns the state
//! a visual editor displays and manipulates, and keeps it consistent: which typed slots each
//! node exposes, which outputs feed which inputs, what data type actually flows along every
//! edge, and which parameters each node carries. Rendering and image processing live
//! elsewhere; this crate is the model they share.
//!
//! ## Core Concepts
//!
//! 1.  **Data types**: A [`DataTypeRegistry`](types::DataTypeRegistry) knows every data type,
//!     its parents and explicit conversions, and answers compatibility queries.
//! 2.  **Slots**: Every node owns a [`SlotConfiguration`](slot::SlotConfiguration) with
//!     ordered, uniquely named inputs and outputs. An output may *inherit* its type from an
//!     input, optionally converting it (`Image` in, `LabelImage` out).
//! 3.  **Graph**: The [`Graph`](graph::Graph) connects outputs to inputs. Every input takes at
//!     most one edge, edges must be type compatible and the graph stays acyclic.
//! 4.  **Parameters**: Nodes expose their settings through the
//!     [`ParameterHolder`](parameter::ParameterHolder) trait. A
//!     [`ParameterTree`](parameter::ParameterTree) flattens a holder and its nested holders
//!     into uniquely keyed leaves.
//! 5.  **Events**: Every mutable part publishes structural and value changes through an
//!     [`EventBus`](event::EventBus) that never keeps its subscribers alive.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kairo::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let registry = DataTypeRegistry::builder()
//!         .with_type(DataTypeInfo::new("image", "Image"))
//!         .with_type(DataTypeInfo::new("label-image", "Label Image").with_parent("image"))
//!         .build()?;
//!     let mut graph = Graph::new(Arc::new(registry));
//!
//!     let source = graph.add_node(GraphNode::new(
//!         "Load",
//!         SlotConfiguration::builder()
//!             .output("Image", SlotDefinition::output("image"))
//!             .build()?,
//!     ))?;
//!     let enhancer = graph.add_node(GraphNode::new(
//!         "Enhancer",
//!         SlotConfiguration::builder()
//!             .input("Input", SlotDefinition::input("image"))
//!             .output(
//!                 "Output",
//!                 SlotDefinition::output("image")
//!                     .inherits_from("Input")
//!                     .with_conversion("image", "label-image"),
//!             )
//!             .build()?,
//!     ))?;
//!
//!     graph.connect(SlotRef::new(source, "Image"), SlotRef::new(enhancer, "Input"))?;
//!     let resolved = graph.resolve_output_type(&SlotRef::new(enhancer, "Output"))?;
//!     println!("Enhancer produces {}", resolved);
//!     println!("{}", DisplayGraph::new(&graph));
//!     Ok(())
//! }
//! ```

pub mod definition;
pub mod display;
pub mod error;
pub mod event;
pub mod graph;
pub mod parameter;
pub mod prelude;
pub mod session;
pub mod slot;
pub mod types;
