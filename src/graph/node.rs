use super::NodeId;
use crate::error::ParameterError;
use crate::parameter::{
    HolderMetadata, ParameterDeclaration, ParameterHolder, ParameterShape, ParameterType,
    ParameterValue, SubHolder,
};
use crate::slot::SlotConfiguration;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Key of the node's own parameter holder in its parameter tree.
pub const PARAMETERS_KEY: &str = "parameters";

/// Position of a node on the editor canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeLocation {
    pub x: i32,
    pub y: i32,
}

impl NodeLocation {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A node instance: its slots, its name and the parameters of its algorithm.
///
/// The slot configuration is only mutable through the owning [`Graph`](super::Graph), which
/// keeps edges consistent with it.
pub struct GraphNode {
    id: NodeId,
    name: String,
    description: String,
    location: NodeLocation,
    slots: SlotConfiguration,
    parameters: Option<Box<dyn ParameterHolder>>,
}

impl GraphNode {
    pub fn new(name: impl Into<String>, slots: SlotConfiguration) -> Self {
        Self {
            id: NodeId::default(),
            name: name.into(),
            description: String::new(),
            location: NodeLocation::default(),
            slots,
            parameters: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.location = NodeLocation::new(x, y);
        self
    }

    pub fn with_parameters(mut self, parameters: impl ParameterHolder) -> Self {
        self.parameters = Some(Box::new(parameters));
        self
    }

    /// Identity assigned by the graph. Meaningless before the node is added.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> NodeLocation {
        self.location
    }

    pub fn slots(&self) -> &SlotConfiguration {
        &self.slots
    }

    pub fn parameters(&self) -> Option<&dyn ParameterHolder> {
        self.parameters.as_deref()
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotConfiguration {
        &mut self.slots
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_location(&mut self, location: NodeLocation) {
        self.location = location;
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("location", &self.location)
            .field("slots", &self.slots)
            .field("parameters", &self.parameters.is_some())
            .finish()
    }
}

impl ParameterHolder for GraphNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn metadata(&self) -> HolderMetadata {
        HolderMetadata::new(self.name.clone()).with_description(self.description.clone())
    }

    fn shape(&self) -> ParameterShape {
        ParameterShape::Fixed(vec![
            ParameterDeclaration::new("name", ParameterType::Text)
                .with_name("Name")
                .important()
                .pinned(),
            ParameterDeclaration::new("description", ParameterType::Text)
                .with_name("Description")
                .ui_order(1),
        ])
    }

    fn get_parameter(&self, key: &str) -> Result<ParameterValue, ParameterError> {
        match key {
            "name" => Ok(ParameterValue::Text(self.name.clone())),
            "description" => Ok(ParameterValue::Text(self.description.clone())),
            _ => Err(ParameterError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    fn set_parameter(&mut self, key: &str, value: ParameterValue) -> Result<(), ParameterError> {
        let found = value.value_type();
        let ParameterValue::Text(text) = value else {
            return Err(ParameterError::TypeMismatch {
                key: key.to_string(),
                expected: ParameterType::Text,
                found,
            });
        };
        match key {
            "name" => self.name = text,
            "description" => self.description = text,
            _ => {
                return Err(ParameterError::NotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn sub_holders(&self) -> Vec<SubHolder<'_>> {
        self.parameters
            .as_deref()
            .map(|p| {
                SubHolder::new(PARAMETERS_KEY, p)
                    .with_metadata(HolderMetadata::new("Parameters"))
                    .ui_order(2)
            })
            .into_iter()
            .collect()
    }

    fn sub_holder_mut(&mut self, key: &str) -> Option<&mut dyn ParameterHolder> {
        if key != PARAMETERS_KEY {
            return None;
        }
        let parameters = self.parameters.as_mut()?;
        Some(parameters.as_mut())
    }
}
