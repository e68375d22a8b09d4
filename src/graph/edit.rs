use super::{Edge, EdgeRecord, Endpoint, Graph, GraphEvent, NodeId};
use crate::error::GraphError;
use crate::slot::{InheritedSlot, SlotConfigurationKind, SlotDefinition, SlotDirection, SlotId};
use crate::types::DataTypeId;
use ahash::AHashSet;
use log::debug;

/// What happened to the edges of a slot that was replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotReplacement {
    /// Identity of the new slot.
    pub slot: Option<SlotId>,
    /// Edges re-established on the new slot, named as they are now.
    pub restored: Vec<Edge>,
    /// Edges that could not be kept, named as they were before the replacement.
    pub dropped: Vec<Edge>,
}

impl Graph {
    /// Adds a slot to a node. The data type must be registered.
    pub fn add_slot(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        definition: SlotDefinition,
    ) -> Result<SlotId, GraphError> {
        self.ensure_registered(definition.data_type())?;
        let id = self
            .require_mut(node)?
            .slots_mut()
            .add_slot(name, definition, true)?;
        self.emit_slots_changed(node);
        Ok(id)
    }

    /// Removes a slot and every edge attached to it. Returns the dropped edges.
    pub fn remove_slot(
        &mut self,
        node: NodeId,
        direction: SlotDirection,
        name: &str,
    ) -> Result<Vec<Edge>, GraphError> {
        let downstream = self.inheriting_downstream(node);
        // Views are captured first, while the removed slot still has a name.
        let attached: Vec<(EdgeRecord, Edge)> = self
            .edges
            .iter()
            .filter(|r| r.touches(node))
            .filter_map(|r| Some((*r, self.edge_view(r)?)))
            .collect();

        self.require_mut(node)?
            .slots_mut()
            .remove_slot(direction, name, true)?;

        let dangling: Vec<EdgeRecord> = attached
            .iter()
            .map(|(record, _)| *record)
            .filter(|record| !self.is_live(record))
            .collect();
        self.edges.retain(|r| !dangling.contains(r));
        let dropped: Vec<Edge> = attached
            .into_iter()
            .filter(|(record, _)| dangling.contains(record))
            .map(|(_, edge)| edge)
            .collect();

        debug!(
            "Removed {} slot '{}' from node {}, dropping {} edge(s)",
            direction,
            name,
            node,
            dropped.len()
        );
        for edge in &dropped {
            self.events.emit(GraphEvent::EdgeRemoved(edge.clone()));
        }
        self.emit_slots_changed(node);
        // Losing an input changes what "*" falls back to even when it was unconnected.
        if !dropped.is_empty() || direction == SlotDirection::Input {
            self.notify_resolved(downstream);
        }
        Ok(dropped)
    }

    /// Renames a slot. Edges follow the slot because they are keyed on its identity.
    pub fn rename_slot(
        &mut self,
        node: NodeId,
        direction: SlotDirection,
        old_name: &str,
        new_name: impl Into<String>,
    ) -> Result<(), GraphError> {
        self.require_mut(node)?
            .slots_mut()
            .rename_slot(direction, old_name, new_name, true)?;
        self.emit_slots_changed(node);
        Ok(())
    }

    pub fn move_slot(
        &mut self,
        node: NodeId,
        direction: SlotDirection,
        name: &str,
        new_index: usize,
    ) -> Result<(), GraphError> {
        self.require_mut(node)?
            .slots_mut()
            .move_slot(direction, name, new_index, true)?;
        self.emit_slots_changed(node);
        // Reordering inputs changes which one "*" picks when none is connected.
        if direction == SlotDirection::Input {
            self.notify_resolved(self.inheriting_downstream(node));
        }
        Ok(())
    }

    pub fn set_inherited_slot(
        &mut self,
        node: NodeId,
        output: &str,
        inherited: InheritedSlot,
    ) -> Result<(), GraphError> {
        self.require_mut(node)?
            .slots_mut()
            .set_inherited_slot(output, inherited, true)?;
        self.notify_resolved(self.inheriting_downstream(node));
        Ok(())
    }

    /// Replaces an inherited type `from` with `to` on one output of a node.
    pub fn set_inheritance_conversion(
        &mut self,
        node: NodeId,
        output: &str,
        from: impl Into<DataTypeId>,
        to: impl Into<DataTypeId>,
    ) -> Result<(), GraphError> {
        let (from, to) = (from.into(), to.into());
        self.ensure_registered(&from)?;
        self.ensure_registered(&to)?;
        self.require_mut(node)?
            .slots_mut()
            .set_inheritance_conversion(output, from, to, true)?;
        self.notify_resolved(self.inheriting_downstream(node));
        Ok(())
    }

    pub fn remove_inheritance_conversion(
        &mut self,
        node: NodeId,
        output: &str,
        from: &DataTypeId,
    ) -> Result<bool, GraphError> {
        let removed = self
            .require_mut(node)?
            .slots_mut()
            .remove_inheritance_conversion(output, from, true)?;
        if removed {
            self.notify_resolved(self.inheriting_downstream(node));
        }
        Ok(removed)
    }

    /// Replaces a slot's definition, for example to change its data type.
    ///
    /// Edges attached to the old slot (and, on pass-through nodes, to its mirrored output)
    /// are moved to the new slot when the types still fit. The rest are removed and listed
    /// in [`SlotReplacement::dropped`].
    pub fn replace_slot(
        &mut self,
        node: NodeId,
        direction: SlotDirection,
        name: &str,
        replacement: SlotDefinition,
    ) -> Result<SlotReplacement, GraphError> {
        self.ensure_registered(replacement.data_type())?;
        let graph_node = self.require(node)?;
        let slots = graph_node.slots();
        let old_id = slots
            .slot_id(direction, name)
            .ok_or_else(|| GraphError::SlotNotFound {
                node,
                slot: name.to_string(),
                direction,
            })?;
        let mirror_id = (slots.kind() == SlotConfigurationKind::IoPassthrough
            && direction == SlotDirection::Input)
            .then(|| slots.slot_id(SlotDirection::Output, name))
            .flatten();

        let old = Endpoint { node, slot: old_id };
        let mirror = mirror_id.map(|slot| Endpoint { node, slot });
        let affects = |record: &EdgeRecord| {
            record.source == old
                || record.target == old
                || mirror.is_some_and(|m| record.source == m)
        };
        let before: Vec<(usize, Edge)> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, r)| affects(*r))
            .filter_map(|(i, r)| Some((i, self.edge_view(r)?)))
            .collect();
        let downstream = self.inheriting_downstream(node);

        let new_id = self
            .require_mut(node)?
            .slots_mut()
            .replace_slot(direction, name, replacement, true)?;

        for record in &mut self.edges {
            if record.source == old {
                record.source.slot = new_id;
            }
            if record.target == old {
                record.target.slot = new_id;
            }
        }

        let mut outcome = SlotReplacement {
            slot: Some(new_id),
            ..SlotReplacement::default()
        };
        let mut removed = AHashSet::new();
        for (index, old_view) in before {
            let record = self.edges[index];
            match self.edge_view(&record) {
                Some(edge) if self.is_compatible_record(&record) => outcome.restored.push(edge),
                _ => {
                    removed.insert(index);
                    outcome.dropped.push(old_view);
                }
            }
        }
        let mut index = 0;
        self.edges.retain(|_| {
            let keep = !removed.contains(&index);
            index += 1;
            keep
        });

        debug!(
            "Replaced {} slot '{}' on node {}: {} edge(s) restored, {} dropped",
            direction,
            name,
            node,
            outcome.restored.len(),
            outcome.dropped.len()
        );
        for edge in &outcome.dropped {
            self.events.emit(GraphEvent::EdgeRemoved(edge.clone()));
        }
        self.emit_slots_changed(node);
        self.notify_resolved(downstream);
        Ok(outcome)
    }

    fn ensure_registered(&self, data_type: &DataTypeId) -> Result<(), GraphError> {
        if self.registry.contains(data_type) {
            Ok(())
        } else {
            Err(GraphError::UnknownDataType(data_type.clone()))
        }
    }

    /// Both endpoints of the record still exist.
    fn is_live(&self, record: &EdgeRecord) -> bool {
        self.slot_name(record.source, SlotDirection::Output).is_some()
            && self.slot_name(record.target, SlotDirection::Input).is_some()
    }

    pub(crate) fn is_compatible_record(&self, record: &EdgeRecord) -> bool {
        let source_type = self.resolve_endpoint(record.source);
        let target_type = self.declared_type(record.target);
        self.registry.is_compatible(&source_type, &target_type)
    }

    fn emit_slots_changed(&self, node: NodeId) {
        self.events.emit(GraphEvent::SlotsChanged { node });
    }
}
