use crate::types::DataTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a slot receives data or produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotDirection {
    Input,
    Output,
}

impl SlotDirection {
    pub fn opposite(self) -> Self {
        match self {
            SlotDirection::Input => SlotDirection::Output,
            SlotDirection::Output => SlotDirection::Input,
        }
    }
}

impl fmt::Display for SlotDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotDirection::Input => f.write_str("Input"),
            SlotDirection::Output => f.write_str("Output"),
        }
    }
}

/// Which input an output slot takes its effective data type from.
///
/// Serialized as an optional string, where `"*"` stands for [`InheritedSlot::FirstConnected`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum InheritedSlot {
    /// The declared type is used as is.
    #[default]
    None,
    /// Track the type flowing into the named input slot.
    Named(String),
    /// Track the first connected input slot, falling back to the first declared input.
    FirstConnected,
}

impl InheritedSlot {
    pub const WILDCARD: &'static str = "*";

    pub fn is_none(&self) -> bool {
        matches!(self, InheritedSlot::None)
    }
}

impl From<Option<String>> for InheritedSlot {
    fn from(value: Option<String>) -> Self {
        match value {
            None => InheritedSlot::None,
            Some(name) if name.is_empty() => InheritedSlot::None,
            Some(name) if name == Self::WILDCARD => InheritedSlot::FirstConnected,
            Some(name) => InheritedSlot::Named(name),
        }
    }
}

impl From<InheritedSlot> for Option<String> {
    fn from(value: InheritedSlot) -> Self {
        match value {
            InheritedSlot::None => None,
            InheritedSlot::Named(name) => Some(name),
            InheritedSlot::FirstConnected => Some(InheritedSlot::WILDCARD.to_string()),
        }
    }
}

impl fmt::Display for InheritedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InheritedSlot::None => f.write_str("-"),
            InheritedSlot::Named(name) => f.write_str(name),
            InheritedSlot::FirstConnected => f.write_str(Self::WILDCARD),
        }
    }
}

/// Immutable descriptor of one slot.
///
/// Definitions are assembled with the builder methods and handed to a
/// [`SlotConfiguration`](super::SlotConfiguration), which assigns the final name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    #[serde(default)]
    name: String,
    direction: SlotDirection,
    data_type: DataTypeId,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    inherited_slot: InheritedSlot,
    #[serde(default)]
    inheritance_conversions: BTreeMap<DataTypeId, DataTypeId>,
}

impl SlotDefinition {
    pub fn new(direction: SlotDirection, data_type: impl Into<DataTypeId>) -> Self {
        Self {
            name: String::new(),
            direction,
            data_type: data_type.into(),
            optional: false,
            description: String::new(),
            inherited_slot: InheritedSlot::None,
            inheritance_conversions: BTreeMap::new(),
        }
    }

    pub fn input(data_type: impl Into<DataTypeId>) -> Self {
        Self::new(SlotDirection::Input, data_type)
    }

    pub fn output(data_type: impl Into<DataTypeId>) -> Self {
        Self::new(SlotDirection::Output, data_type)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks an input as optional. Has no effect on outputs.
    pub fn optional(mut self) -> Self {
        self.optional = self.direction == SlotDirection::Input;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn inherits_from(mut self, input: impl Into<String>) -> Self {
        self.inherited_slot = InheritedSlot::Named(input.into());
        self
    }

    pub fn inherits_from_first_connected(mut self) -> Self {
        self.inherited_slot = InheritedSlot::FirstConnected;
        self
    }

    pub fn with_inherited_slot(mut self, inherited: InheritedSlot) -> Self {
        self.inherited_slot = inherited;
        self
    }

    /// Overrides the inherited type `from` with `to`.
    pub fn with_conversion(
        mut self,
        from: impl Into<DataTypeId>,
        to: impl Into<DataTypeId>,
    ) -> Self {
        self.inheritance_conversions.insert(from.into(), to.into());
        self
    }

    pub fn without_conversion(mut self, from: &DataTypeId) -> Self {
        self.inheritance_conversions.remove(from);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> SlotDirection {
        self.direction
    }

    pub fn data_type(&self) -> &DataTypeId {
        &self.data_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional && self.direction == SlotDirection::Input
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn inherited_slot(&self) -> &InheritedSlot {
        &self.inherited_slot
    }

    pub fn inheritance_conversions(&self) -> &BTreeMap<DataTypeId, DataTypeId> {
        &self.inheritance_conversions
    }

    /// Applies the conversion override for `inherited`, if one is declared.
    pub fn convert_inherited(&self, inherited: &DataTypeId) -> DataTypeId {
        self.inheritance_conversions
            .get(inherited)
            .unwrap_or(inherited)
            .clone()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_direction(&mut self, direction: SlotDirection) {
        self.direction = direction;
        if direction == SlotDirection::Output {
            self.optional = false;
        }
    }
}
