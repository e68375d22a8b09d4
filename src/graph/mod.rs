//! Nodes, edges and the connectivity rules between them.
//!
//! Edges are stored against slot identities, so renaming or moving a slot never disturbs
//! them. Everything the graph hands out refers to slots by name through [`SlotRef`].

mod edit;
pub mod node;
mod resolve;
mod validate;

pub use edit::SlotReplacement;
pub use node::*;
pub use validate::ValidationIssue;

use crate::error::{GraphError, ParameterError};
use crate::event::{ChangeEvent, ChangeKind, EventBus, Subscription};
use crate::parameter::holder::find_holder_mut;
use crate::parameter::{
    get_by_key, set_by_key, DynamicParameterCollection, ParameterTree, ParameterValue,
};
use crate::slot::{SlotDirection, SlotId};
use crate::types::DataTypeRegistry;
use ahash::{AHashMap, AHashSet};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Identity of a node, assigned by the graph and never reused.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slot on a node, addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub node: NodeId,
    pub slot: String,
}

impl SlotRef {
    pub fn new(node: NodeId, slot: impl Into<String>) -> Self {
        Self {
            node,
            slot: slot.into(),
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.slot)
    }
}

/// A connection from an output slot to an input slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: SlotRef,
    pub target: SlotRef,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Changes reported by a [`Graph`].
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    EdgeAdded(Edge),
    EdgeRemoved(Edge),
    SlotsChanged { node: NodeId },
    /// The set of parameter keys of a node changed; parameter trees must be rebuilt.
    ParametersChanged { node: NodeId },
    NodeRenamed { node: NodeId, name: String },
    NodeMoved { node: NodeId, location: NodeLocation },
    ParameterChanged { node: NodeId, key: String },
    /// Output types of these nodes may resolve differently now.
    ResolvedTypesChanged { nodes: Vec<NodeId> },
}

impl ChangeEvent for GraphEvent {
    fn kind(&self) -> ChangeKind {
        match self {
            GraphEvent::NodeAdded(_)
            | GraphEvent::NodeRemoved(_)
            | GraphEvent::EdgeAdded(_)
            | GraphEvent::EdgeRemoved(_)
            | GraphEvent::SlotsChanged { .. }
            | GraphEvent::ParametersChanged { .. } => ChangeKind::Structural,
            GraphEvent::NodeRenamed { .. }
            | GraphEvent::NodeMoved { .. }
            | GraphEvent::ParameterChanged { .. }
            | GraphEvent::ResolvedTypesChanged { .. } => ChangeKind::Value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Endpoint {
    node: NodeId,
    slot: SlotId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdgeRecord {
    source: Endpoint,
    target: Endpoint,
}

impl EdgeRecord {
    fn touches(&self, node: NodeId) -> bool {
        self.source.node == node || self.target.node == node
    }
}

/// Owns the nodes of a pipeline and the edges between their slots.
///
/// Invariants: every input slot has at most one incoming edge, every edge was type
/// compatible when it was made, and the graph stays acyclic.
pub struct Graph {
    registry: Arc<DataTypeRegistry>,
    nodes: AHashMap<NodeId, GraphNode>,
    order: Vec<NodeId>,
    edges: Vec<EdgeRecord>,
    next_id: u64,
    events: EventBus<GraphEvent>,
}

impl Graph {
    pub fn new(registry: Arc<DataTypeRegistry>) -> Self {
        Self {
            registry,
            nodes: AHashMap::new(),
            order: Vec::new(),
            edges: Vec::new(),
            next_id: 1,
            events: EventBus::new(),
        }
    }

    pub fn registry(&self) -> &DataTypeRegistry {
        &self.registry
    }

    pub fn subscribe(&self, callback: impl FnMut(&GraphEvent) + 'static) -> Subscription {
        self.events.subscribe(callback)
    }

    pub fn subscribe_kind(
        &self,
        kind: ChangeKind,
        callback: impl FnMut(&GraphEvent) + 'static,
    ) -> Subscription {
        self.events.subscribe_kind(kind, callback)
    }

    // --- Nodes ---

    /// Adds a node. Every declared slot type must be registered.
    pub fn add_node(&mut self, mut node: GraphNode) -> Result<NodeId, GraphError> {
        let slots = node.slots();
        if let Some(unknown) = slots
            .inputs()
            .chain(slots.outputs())
            .map(|d| d.data_type())
            .find(|t| !self.registry.contains(t))
        {
            return Err(GraphError::UnknownDataType(unknown.clone()));
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.set_id(id);
        debug!("Added node {} '{}'", id, node.name());
        self.nodes.insert(id, node);
        self.order.push(id);
        self.events.emit(GraphEvent::NodeAdded(id));
        Ok(id)
    }

    /// Removes a node together with every edge attached to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(GraphNode, Vec<Edge>), GraphError> {
        self.require(id)?;
        let downstream = self.inheriting_downstream(id);
        let dropped = self.take_edges(|record| record.touches(id));
        self.order.retain(|n| *n != id);
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;

        debug!("Removed node {} '{}' and {} edge(s)", id, node.name(), dropped.len());
        for edge in &dropped {
            self.events.emit(GraphEvent::EdgeRemoved(edge.clone()));
        }
        self.events.emit(GraphEvent::NodeRemoved(id));
        self.notify_resolved(downstream.into_iter().filter(|n| *n != id).collect());
        Ok((node, dropped))
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// First node with the given name, in insertion order.
    pub fn find_node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes().find(|n| n.name() == name)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn rename_node(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        let name = name.into();
        self.require_mut(id)?.set_name(name.clone());
        trace!("Renamed node {} to '{}'", id, name);
        self.events.emit(GraphEvent::NodeRenamed { node: id, name });
        Ok(())
    }

    pub fn move_node(&mut self, id: NodeId, location: NodeLocation) -> Result<(), GraphError> {
        self.require_mut(id)?.set_location(location);
        trace!("Moved node {} to ({}, {})", id, location.x, location.y);
        self.events.emit(GraphEvent::NodeMoved { node: id, location });
        Ok(())
    }

    // --- Parameters ---

    /// Builds the parameter tree of one node.
    pub fn parameter_tree(&self, id: NodeId) -> Result<ParameterTree, GraphError> {
        Ok(ParameterTree::build(self.require(id)?)?)
    }

    pub fn get_parameter(&self, id: NodeId, key: &str) -> Result<ParameterValue, GraphError> {
        Ok(get_by_key(self.require(id)?, key)?)
    }

    /// Writes a parameter of a node, addressed by its key in the node's parameter tree.
    pub fn set_parameter(
        &mut self,
        id: NodeId,
        key: &str,
        value: impl Into<ParameterValue>,
    ) -> Result<(), GraphError> {
        let node = self.require_mut(id)?;
        let before = get_by_key(&*node, key)?;
        let stored = set_by_key(node, key, value.into())?;
        if before == stored {
            return Ok(());
        }
        trace!("Node {} parameter '{}' = {}", id, key, stored);
        if key == "name" {
            if let ParameterValue::Text(name) = stored {
                self.events.emit(GraphEvent::NodeRenamed { node: id, name });
            }
        }
        self.events.emit(GraphEvent::ParameterChanged {
            node: id,
            key: key.to_string(),
        });
        Ok(())
    }

    /// Adds an entry to a dynamic collection of a node, addressed by the collection's key
    /// in the node's parameter tree.
    pub fn add_parameter_entry(
        &mut self,
        id: NodeId,
        holder_key: &str,
        key: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Result<(), GraphError> {
        self.dynamic_parameters_mut(id, holder_key)?
            .add_entry(key, value)?;
        self.emit_parameters_changed(id);
        Ok(())
    }

    pub fn remove_parameter_entry(
        &mut self,
        id: NodeId,
        holder_key: &str,
        key: &str,
    ) -> Result<ParameterValue, GraphError> {
        let removed = self
            .dynamic_parameters_mut(id, holder_key)?
            .remove_entry(key)?;
        self.emit_parameters_changed(id);
        Ok(removed)
    }

    pub fn rename_parameter_entry(
        &mut self,
        id: NodeId,
        holder_key: &str,
        old_key: &str,
        new_key: impl Into<String>,
    ) -> Result<(), GraphError> {
        let new_key = new_key.into();
        let changed = old_key != new_key;
        self.dynamic_parameters_mut(id, holder_key)?
            .rename_entry(old_key, new_key)?;
        if changed {
            self.emit_parameters_changed(id);
        }
        Ok(())
    }

    // --- Edges ---

    /// Connects an output slot to an input slot.
    ///
    /// Checks run in a fixed order: endpoints exist, the edge keeps the graph acyclic, the
    /// input is free, and the resolved source type is compatible with the input.
    pub fn connect(&mut self, source: SlotRef, target: SlotRef) -> Result<Edge, GraphError> {
        let from = self.endpoint(&source, SlotDirection::Output)?;
        let to = self.endpoint(&target, SlotDirection::Input)?;

        if from.node == to.node || self.downstream(to.node).contains(&from.node) {
            return Err(GraphError::WouldCreateCycle {
                source_node: from.node,
                target_node: to.node,
            });
        }
        if self.incoming(to).is_some() {
            return Err(GraphError::SlotOccupied {
                node: to.node,
                slot: target.slot,
            });
        }

        let source_type = self.resolve_endpoint(from);
        let target_type = self.declared_type(to);
        if !self.registry.is_compatible(&source_type, &target_type) {
            return Err(GraphError::IncompatibleTypes {
                source_type,
                target_type,
            });
        }

        self.edges.push(EdgeRecord {
            source: from,
            target: to,
        });
        let edge = Edge { source, target };
        debug!("Connected {}", edge);
        self.events.emit(GraphEvent::EdgeAdded(edge.clone()));
        self.notify_resolved(self.inheriting_downstream(to.node));
        Ok(edge)
    }

    /// Removes the edge into `target`, if any. Unknown nodes or slots are treated as
    /// unconnected, and nothing is emitted when there was no edge.
    pub fn disconnect(&mut self, target: &SlotRef) -> Option<Edge> {
        let to = self.endpoint(target, SlotDirection::Input).ok()?;
        let index = self.edges.iter().position(|r| r.target == to)?;
        let record = self.edges[index];
        let edge = self.edge_view(&record)?;
        self.edges.remove(index);

        debug!("Disconnected {}", edge);
        self.events.emit(GraphEvent::EdgeRemoved(edge.clone()));
        self.notify_resolved(self.inheriting_downstream(to.node));
        Some(edge)
    }

    /// The edge feeding an input slot.
    pub fn source_of(&self, target: &SlotRef) -> Option<Edge> {
        let to = self.endpoint(target, SlotDirection::Input).ok()?;
        self.incoming(to).and_then(|r| self.edge_view(r))
    }

    /// Edges leaving an output slot, in insertion order.
    pub fn targets_of(&self, source: &SlotRef) -> Vec<Edge> {
        let Ok(from) = self.endpoint(source, SlotDirection::Output) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|r| r.source == from)
            .filter_map(|r| self.edge_view(r))
            .collect()
    }

    pub fn is_connected(&self, slot: &SlotRef, direction: SlotDirection) -> bool {
        match direction {
            SlotDirection::Input => self.source_of(slot).is_some(),
            SlotDirection::Output => !self.targets_of(slot).is_empty(),
        }
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.edges.iter().filter_map(|r| self.edge_view(r)).collect()
    }

    /// Edges attached to one node, in insertion order.
    pub fn edges_of(&self, id: NodeId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|r| r.touches(id))
            .filter_map(|r| self.edge_view(r))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes ordered so that every edge points forward. Ties keep insertion order.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: AHashMap<NodeId, usize> =
            self.order.iter().map(|id| (*id, 0)).collect();
        for record in &self.edges {
            *in_degree.entry(record.target.node).or_default() += 1;
        }

        let mut queue: VecDeque<NodeId> = self
            .order
            .iter()
            .filter(|id| in_degree.get(*id).copied() == Some(0))
            .copied()
            .collect();
        let mut result = Vec::with_capacity(self.order.len());
        while let Some(id) = queue.pop_front() {
            result.push(id);
            for record in self.edges.iter().filter(|r| r.source.node == id) {
                if let Some(degree) = in_degree.get_mut(&record.target.node) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(record.target.node);
                    }
                }
            }
        }
        result
    }

    // --- Internals ---

    fn require(&self, id: NodeId) -> Result<&GraphNode, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    fn require_mut(&mut self, id: NodeId) -> Result<&mut GraphNode, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    fn dynamic_parameters_mut(
        &mut self,
        id: NodeId,
        holder_key: &str,
    ) -> Result<&mut DynamicParameterCollection, GraphError> {
        let node = self.require_mut(id)?;
        find_holder_mut(node, holder_key, holder_key)?
            .as_any_mut()
            .downcast_mut::<DynamicParameterCollection>()
            .ok_or_else(|| {
                ParameterError::NotDynamic {
                    key: holder_key.to_string(),
                }
                .into()
            })
    }

    fn emit_parameters_changed(&self, node: NodeId) {
        debug!("Parameter keys of node {} changed", node);
        self.events.emit(GraphEvent::ParametersChanged { node });
    }

    fn endpoint(&self, slot: &SlotRef, direction: SlotDirection) -> Result<Endpoint, GraphError> {
        let node = self.require(slot.node)?;
        let id = node
            .slots()
            .slot_id(direction, &slot.slot)
            .ok_or_else(|| GraphError::SlotNotFound {
                node: slot.node,
                slot: slot.slot.clone(),
                direction,
            })?;
        Ok(Endpoint {
            node: slot.node,
            slot: id,
        })
    }

    fn slot_name(&self, endpoint: Endpoint, direction: SlotDirection) -> Option<&str> {
        self.nodes
            .get(&endpoint.node)?
            .slots()
            .entry_by_id(direction, endpoint.slot)
            .map(|e| e.name())
    }

    fn edge_view(&self, record: &EdgeRecord) -> Option<Edge> {
        Some(Edge {
            source: SlotRef::new(
                record.source.node,
                self.slot_name(record.source, SlotDirection::Output)?,
            ),
            target: SlotRef::new(
                record.target.node,
                self.slot_name(record.target, SlotDirection::Input)?,
            ),
        })
    }

    fn incoming(&self, target: Endpoint) -> Option<&EdgeRecord> {
        self.edges.iter().find(|r| r.target == target)
    }

    /// Removes matching edges and returns them, named as they were before removal.
    fn take_edges(&mut self, mut predicate: impl FnMut(&EdgeRecord) -> bool) -> Vec<Edge> {
        let (taken, kept): (Vec<EdgeRecord>, Vec<EdgeRecord>) =
            self.edges.iter().partition(|r| predicate(*r));
        let views = taken.iter().filter_map(|r| self.edge_view(r)).collect();
        self.edges = kept;
        views
    }

    /// Nodes reachable from `start` along edges, `start` included, in breadth-first order.
    fn downstream(&self, start: NodeId) -> Vec<NodeId> {
        let mut seen = AHashSet::from_iter([start]);
        let mut result = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            for record in self.edges.iter().filter(|r| r.source.node == id) {
                if seen.insert(record.target.node) {
                    result.push(record.target.node);
                    queue.push_back(record.target.node);
                }
            }
        }
        result
    }

    /// Nodes from `start` downstream whose outputs depend on incoming types.
    fn inheriting_downstream(&self, start: NodeId) -> Vec<NodeId> {
        self.downstream(start)
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.slots().outputs().any(|d| !d.inherited_slot().is_none()))
            })
            .collect()
    }

    fn notify_resolved(&self, nodes: Vec<NodeId>) {
        if !nodes.is_empty() {
            self.events.emit(GraphEvent::ResolvedTypesChanged { nodes });
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.order)
            .field("edges", &self.edges())
            .finish()
    }
}
