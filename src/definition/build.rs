use super::conversion::IntoPipeline;
use super::definition::{
    ConversionDefinition, EdgeDefinition, NodeDefinition, NodeKindDefinition, ParameterSpec,
    PipelineDefinition, SlotSpec,
};
use crate::error::{DefinitionError, GraphError};
use crate::graph::{Graph, GraphNode, NodeId, SlotRef};
use crate::parameter::{
    DynamicParameterCollection, HolderMetadata, ParameterDeclaration, ParameterHolder,
    ParameterValue,
};
use crate::slot::{AllowedTypes, SlotConfiguration, SlotConfigurationKind, SlotDirection};
use crate::types::{DataTypeId, DataTypeRegistry};
use ahash::AHashMap;
use log::{debug, info};
use std::sync::Arc;

/// A graph built from a definition, with the mapping from definition ids to node ids.
#[derive(Debug)]
pub struct LoadedPipeline {
    pub graph: Graph,
    pub node_ids: AHashMap<String, NodeId>,
}

impl LoadedPipeline {
    pub fn node_id(&self, definition_id: &str) -> Option<NodeId> {
        self.node_ids.get(definition_id).copied()
    }
}

/// Converts any supported input into a definition and builds it.
pub fn load(input: impl IntoPipeline) -> Result<LoadedPipeline, DefinitionError> {
    input.into_pipeline()?.build()
}

impl PipelineDefinition {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        json.into_pipeline()
    }

    pub fn to_json(&self) -> Result<String, DefinitionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DefinitionError::ValidationError(e.to_string()))
    }

    /// The registry described by `types` and `conversions`.
    pub fn registry(&self) -> Result<DataTypeRegistry, DefinitionError> {
        let mut builder = DataTypeRegistry::builder();
        for info in &self.types {
            builder = builder.with_type(info.clone());
        }
        for conversion in &self.conversions {
            builder = builder.with_conversion(conversion.from.clone(), conversion.to.clone());
        }
        Ok(builder.build()?)
    }

    /// Builds a graph over the registry described by this definition.
    pub fn build(&self) -> Result<LoadedPipeline, DefinitionError> {
        self.build_with(Arc::new(self.registry()?))
    }

    /// Builds a graph over an existing registry. `types` and `conversions` are ignored.
    pub fn build_with(
        &self,
        registry: Arc<DataTypeRegistry>,
    ) -> Result<LoadedPipeline, DefinitionError> {
        let mut graph = Graph::new(registry);
        let mut node_ids = AHashMap::new();

        for definition in &self.nodes {
            if node_ids.contains_key(&definition.id) {
                return Err(DefinitionError::ValidationError(format!(
                    "Duplicate node id '{}'",
                    definition.id
                )));
            }
            let node = build_node(definition)?;
            let id = graph.add_node(node).map_err(|source| node_error(definition, source))?;
            node_ids.insert(definition.id.clone(), id);
        }

        for edge in &self.edges {
            let lookup = |id: &String| {
                node_ids
                    .get(id)
                    .copied()
                    .ok_or_else(|| DefinitionError::UnknownNode(id.clone()))
            };
            let (source, target) = (lookup(&edge.source)?, lookup(&edge.target)?);
            graph
                .connect(
                    SlotRef::new(source, edge.source_slot.clone()),
                    SlotRef::new(target, edge.target_slot.clone()),
                )
                .map_err(|error| DefinitionError::Node {
                    node: edge.target.clone(),
                    source: error,
                })?;
        }

        info!(
            "Built pipeline with {} node(s) and {} edge(s)",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(LoadedPipeline { graph, node_ids })
    }

    /// Describes a graph as a definition. Node ids are the graph's node ids.
    pub fn from_graph(graph: &Graph) -> Self {
        let registry = graph.registry();
        let types = registry.types().cloned().collect();
        let conversions = registry
            .conversions()
            .into_iter()
            .map(|(from, to)| ConversionDefinition {
                from: from.clone(),
                to: to.clone(),
            })
            .collect();
        let nodes = graph.nodes().map(describe_node).collect();
        let edges = graph
            .edges()
            .into_iter()
            .map(|edge| EdgeDefinition {
                source: edge.source.node.to_string(),
                source_slot: edge.source.slot,
                target: edge.target.node.to_string(),
                target_slot: edge.target.slot,
            })
            .collect();

        debug!("Exported graph with {} node(s)", graph.node_count());
        PipelineDefinition {
            types,
            conversions,
            nodes,
            edges,
        }
    }
}

fn node_error(definition: &NodeDefinition, source: impl Into<GraphError>) -> DefinitionError {
    DefinitionError::Node {
        node: definition.id.clone(),
        source: source.into(),
    }
}

fn build_node(definition: &NodeDefinition) -> Result<GraphNode, DefinitionError> {
    let mut builder = SlotConfiguration::builder();
    if definition.kind == NodeKindDefinition::Passthrough {
        builder = builder.passthrough();
    }
    if let Some(types) = &definition.allowed_input_types {
        builder = builder.allowed_input_types(AllowedTypes::only(types.iter().cloned()));
    }
    if let Some(types) = &definition.allowed_output_types {
        builder = builder.allowed_output_types(AllowedTypes::only(types.iter().cloned()));
    }
    if definition.seal_inputs {
        builder = builder.seal_inputs();
    }
    if definition.seal_outputs {
        builder = builder.seal_outputs();
    }
    if let Some(max) = definition.max_inputs {
        builder = builder.max_inputs(max);
    }
    if let Some(max) = definition.max_outputs {
        builder = builder.max_outputs(max);
    }
    for slot in &definition.inputs {
        builder = builder.input(slot.name.clone(), slot.to_definition(SlotDirection::Input));
    }
    if definition.kind != NodeKindDefinition::Passthrough {
        for slot in &definition.outputs {
            builder = builder.output(slot.name.clone(), slot.to_definition(SlotDirection::Output));
        }
    }
    let slots = builder.build().map_err(|e| node_error(definition, e))?;

    let mut node = GraphNode::new(definition.display_name(), slots)
        .with_description(definition.description.clone())
        .at(definition.location.x, definition.location.y);
    if !definition.parameters.is_empty() {
        let parameters = build_parameters(definition)?;
        node = node.with_parameters(parameters);
    }
    Ok(node)
}

fn build_parameters(
    definition: &NodeDefinition,
) -> Result<DynamicParameterCollection, DefinitionError> {
    let mut collection =
        DynamicParameterCollection::new().with_metadata(HolderMetadata::new("Parameters"));
    for spec in &definition.parameters {
        let value = ParameterValue::from_json(&spec.value).ok_or_else(|| {
            DefinitionError::ValidationError(format!(
                "Parameter '{}' of node '{}' must be a boolean, number or string",
                spec.key, definition.id
            ))
        })?;
        let declaration = declaration_of(spec, &value);
        collection
            .add_declared(declaration, value)
            .map_err(|e| node_error(definition, e))?;
    }
    Ok(collection)
}

fn declaration_of(spec: &ParameterSpec, value: &ParameterValue) -> ParameterDeclaration {
    let mut declaration =
        ParameterDeclaration::new(spec.key.clone(), spec.value_type.unwrap_or(value.value_type()))
            .with_description(spec.description.clone());
    if let Some(name) = &spec.name {
        declaration = declaration.with_name(name.clone());
    }
    if spec.hidden {
        declaration = declaration.hidden();
    }
    if spec.important {
        declaration = declaration.important();
    }
    if spec.pinned {
        declaration = declaration.pinned();
    }
    declaration
}

fn describe_node(node: &GraphNode) -> NodeDefinition {
    let slots = node.slots();
    let passthrough = slots.kind() == SlotConfigurationKind::IoPassthrough;
    let allowed = |direction| -> Option<Vec<DataTypeId>> {
        match slots.allowed_types(direction) {
            AllowedTypes::Any => None,
            AllowedTypes::Only(set) => Some(set.iter().cloned().collect()),
        }
    };

    let mut definition = NodeDefinition::new(node.id().to_string());
    definition.name = node.name().to_string();
    definition.description = node.description().to_string();
    definition.location = node.location();
    definition.kind = if passthrough {
        NodeKindDefinition::Passthrough
    } else {
        NodeKindDefinition::Default
    };
    definition.allowed_input_types = allowed(SlotDirection::Input);
    definition.allowed_output_types = allowed(SlotDirection::Output);
    definition.seal_inputs = slots.is_sealed(SlotDirection::Input);
    definition.seal_outputs = slots.is_sealed(SlotDirection::Output);
    definition.max_inputs = slots.max_slots(SlotDirection::Input);
    definition.max_outputs = slots.max_slots(SlotDirection::Output);
    definition.inputs = slots.inputs().map(SlotSpec::from_definition).collect();
    if !passthrough {
        definition.outputs = slots.outputs().map(SlotSpec::from_definition).collect();
    }
    if let Some(parameters) = node.parameters() {
        definition.parameters = describe_parameters(parameters);
    }
    definition
}

/// Leaves of the node's own parameter holder. Nested holders are not exported.
fn describe_parameters(holder: &dyn ParameterHolder) -> Vec<ParameterSpec> {
    holder
        .shape()
        .declarations()
        .iter()
        .filter_map(|declaration| {
            let value = holder.get_parameter(&declaration.key).ok()?;
            Some(ParameterSpec {
                key: declaration.key.clone(),
                value: value.to_json(),
                value_type: Some(declaration.value_type),
                name: (declaration.name != declaration.key).then(|| declaration.name.clone()),
                description: declaration.description.clone(),
                hidden: declaration.hidden,
                important: declaration.important,
                pinned: declaration.pinned,
            })
        })
        .collect()
}
