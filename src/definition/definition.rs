use crate::graph::NodeLocation;
use crate::parameter::ParameterType;
use crate::slot::{InheritedSlot, SlotDefinition, SlotDirection};
use crate::types::{DataTypeId, DataTypeInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The complete, serializable description of a pipeline: its data types, nodes and edges.
/// This is the target structure for any custom pipeline format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub types: Vec<DataTypeInfo>,
    #[serde(default)]
    pub conversions: Vec<ConversionDefinition>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

/// An explicit converter edge between two data types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionDefinition {
    pub from: DataTypeId,
    pub to: DataTypeId,
}

/// How a node's slots may be edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindDefinition {
    #[default]
    Default,
    Passthrough,
}

/// Defines a single node of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Identifier used by edges. Only meaningful inside one definition.
    pub id: String,
    /// Display name. Falls back to `id` when empty.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: NodeLocation,
    #[serde(default)]
    pub kind: NodeKindDefinition,
    #[serde(default)]
    pub allowed_input_types: Option<Vec<DataTypeId>>,
    #[serde(default)]
    pub allowed_output_types: Option<Vec<DataTypeId>>,
    #[serde(default)]
    pub seal_inputs: bool,
    #[serde(default)]
    pub seal_outputs: bool,
    #[serde(default)]
    pub max_inputs: Option<usize>,
    #[serde(default)]
    pub max_outputs: Option<usize>,
    #[serde(default)]
    pub inputs: Vec<SlotSpec>,
    /// Ignored for pass-through nodes, whose outputs mirror their inputs.
    #[serde(default)]
    pub outputs: Vec<SlotSpec>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl NodeDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            location: NodeLocation::default(),
            kind: NodeKindDefinition::Default,
            allowed_input_types: None,
            allowed_output_types: None,
            seal_inputs: false,
            seal_outputs: false,
            max_inputs: None,
            max_outputs: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// One slot of a node definition. The direction comes from the list it appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub name: String,
    pub data_type: DataTypeId,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "InheritedSlot::is_none")]
    pub inherited_slot: InheritedSlot,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inheritance_conversions: BTreeMap<DataTypeId, DataTypeId>,
}

impl SlotSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<DataTypeId>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            optional: false,
            description: String::new(),
            inherited_slot: InheritedSlot::None,
            inheritance_conversions: BTreeMap::new(),
        }
    }

    pub fn to_definition(&self, direction: SlotDirection) -> SlotDefinition {
        let mut definition = SlotDefinition::new(direction, self.data_type.clone())
            .with_description(self.description.clone())
            .with_inherited_slot(self.inherited_slot.clone());
        if self.optional {
            definition = definition.optional();
        }
        for (from, to) in &self.inheritance_conversions {
            definition = definition.with_conversion(from.clone(), to.clone());
        }
        definition
    }

    pub fn from_definition(definition: &SlotDefinition) -> Self {
        Self {
            name: definition.name().to_string(),
            data_type: definition.data_type().clone(),
            optional: definition.is_optional(),
            description: definition.description().to_string(),
            inherited_slot: definition.inherited_slot().clone(),
            inheritance_conversions: definition.inheritance_conversions().clone(),
        }
    }
}

/// One user-defined parameter of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub key: String,
    pub value: serde_json::Value,
    /// Declared type. Inferred from `value` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ParameterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl ParameterSpec {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
            value_type: None,
            name: None,
            description: String::new(),
            hidden: false,
            important: false,
            pinned: false,
        }
    }
}

/// Defines a connection between two node slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub source: String,
    pub source_slot: String,
    pub target: String,
    pub target_slot: String,
}
