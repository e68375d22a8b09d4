use super::{Endpoint, Graph, GraphNode, NodeId, SlotRef};
use crate::error::GraphError;
use crate::slot::{InheritedSlot, SlotDirection, SlotEntry};
use crate::types::DataTypeId;
use log::warn;

impl Graph {
    /// The effective data type of an output slot under the current wiring.
    ///
    /// An output without inheritance reports its declared type. An inheriting output takes
    /// the type flowing into its referenced input (for `"*"` the first declared input that
    /// is connected, else the first declared input) and then applies the output's
    /// conversion override for that type, if any. Nothing is cached.
    pub fn resolve_output_type(&self, slot: &SlotRef) -> Result<DataTypeId, GraphError> {
        let endpoint = self.endpoint(slot, SlotDirection::Output)?;
        Ok(self.resolve_endpoint(endpoint))
    }

    /// The data type arriving at an input: the resolved type of the connected output, or
    /// the input's declared type when nothing is connected.
    pub fn incoming_type(&self, slot: &SlotRef) -> Result<DataTypeId, GraphError> {
        let endpoint = self.endpoint(slot, SlotDirection::Input)?;
        Ok(self.type_flowing_into(endpoint))
    }

    /// Resolved types of every output of a node, in slot order.
    pub fn resolved_output_types(
        &self,
        node: NodeId,
    ) -> Result<Vec<(String, DataTypeId)>, GraphError> {
        let graph_node = self.require(node)?;
        Ok(graph_node
            .slots()
            .slots(SlotDirection::Output)
            .iter()
            .map(|entry| (entry.name().to_string(), self.resolve_entry(graph_node, entry)))
            .collect())
    }

    pub(crate) fn resolve_endpoint(&self, endpoint: Endpoint) -> DataTypeId {
        let Some(node) = self.nodes.get(&endpoint.node) else {
            return DataTypeId::new("");
        };
        match node.slots().entry_by_id(SlotDirection::Output, endpoint.slot) {
            Some(entry) => self.resolve_entry(node, entry),
            None => DataTypeId::new(""),
        }
    }

    pub(crate) fn declared_type(&self, endpoint: Endpoint) -> DataTypeId {
        self.nodes
            .get(&endpoint.node)
            .and_then(|n| n.slots().entry_by_id(SlotDirection::Input, endpoint.slot))
            .map(|e| e.definition().data_type().clone())
            .unwrap_or_else(|| DataTypeId::new(""))
    }

    fn resolve_entry(&self, node: &GraphNode, output: &SlotEntry) -> DataTypeId {
        let definition = output.definition();
        let Some(input) = self.inherited_input(node, output) else {
            return definition.data_type().clone();
        };
        let inherited = self.type_flowing_into(Endpoint {
            node: node.id(),
            slot: input.id(),
        });
        definition.convert_inherited(&inherited)
    }

    fn inherited_input<'n>(
        &self,
        node: &'n GraphNode,
        output: &SlotEntry,
    ) -> Option<&'n SlotEntry> {
        let inputs = node.slots().slots(SlotDirection::Input);
        match output.definition().inherited_slot() {
            InheritedSlot::None => None,
            InheritedSlot::Named(name) => {
                let input = inputs.iter().find(|e| e.name() == name);
                if input.is_none() {
                    warn!(
                        "Output '{}' of node {} inherits from missing input '{}'",
                        output.name(),
                        node.id(),
                        name
                    );
                }
                input
            }
            InheritedSlot::FirstConnected => inputs
                .iter()
                .find(|e| {
                    self.incoming(Endpoint {
                        node: node.id(),
                        slot: e.id(),
                    })
                    .is_some()
                })
                .or_else(|| inputs.first()),
        }
    }

    fn type_flowing_into(&self, input: Endpoint) -> DataTypeId {
        match self.incoming(input) {
            Some(record) => self.resolve_endpoint(record.source),
            None => self.declared_type(input),
        }
    }
}
