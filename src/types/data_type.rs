use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, globally unique identifier of a data type (e.g. `"image-2d-greyscale"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataTypeId(String);

impl DataTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DataTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DataTypeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Metadata describing one registered data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeInfo {
    pub id: DataTypeId,
    /// Human readable name shown in type pickers.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// How instances of this type are stored (e.g. `"image"`, `"table"`, `"file"`).
    #[serde(default)]
    pub storage_class: String,
    /// Hidden types are never offered in type pickers but remain fully usable.
    #[serde(default)]
    pub hidden: bool,
    /// Types this type inherits from. Values of this type may flow into slots of any parent.
    #[serde(default)]
    pub parents: Vec<DataTypeId>,
}

impl DataTypeInfo {
    pub fn new(id: impl Into<DataTypeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            storage_class: String::new(),
            hidden: false,
            parents: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = storage_class.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<DataTypeId>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}
