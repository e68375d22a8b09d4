use super::value::{AllowedParameterTypes, ParameterType, ParameterValue};
use crate::error::ParameterError;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Separator between the segments of a path-qualified parameter key.
pub const KEY_SEPARATOR: char = '/';

/// Static description of one parameter leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub value_type: ParameterType,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub ui_order: i32,
    #[serde(default)]
    pub read_only: bool,
}

impl ParameterDeclaration {
    /// Creates a declaration whose display name equals its key.
    pub fn new(key: impl Into<String>, value_type: ParameterType) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            description: String::new(),
            value_type,
            hidden: false,
            important: false,
            pinned: false,
            ui_order: 0,
            read_only: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn ui_order(mut self, order: i32) -> Self {
        self.ui_order = order;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Display name and description of a holder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolderMetadata {
    pub name: String,
    pub description: String,
}

impl HolderMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The leaves a holder exposes right now.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterShape {
    /// A set of leaves known when the holder type was written.
    Fixed(Vec<ParameterDeclaration>),
    /// Leaves defined at runtime by the user.
    Dynamic {
        entries: Vec<ParameterDeclaration>,
        allowed_types: AllowedParameterTypes,
    },
}

impl ParameterShape {
    pub fn declarations(&self) -> &[ParameterDeclaration] {
        match self {
            ParameterShape::Fixed(declarations) => declarations,
            ParameterShape::Dynamic { entries, .. } => entries,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParameterShape::Dynamic { .. })
    }

    pub fn declaration(&self, key: &str) -> Option<&ParameterDeclaration> {
        self.declarations().iter().find(|d| d.key == key)
    }
}

/// A nested holder as exposed by its owner.
pub struct SubHolder<'a> {
    pub key: String,
    pub metadata: HolderMetadata,
    pub hidden: bool,
    pub ui_order: i32,
    pub holder: &'a dyn ParameterHolder,
}

impl<'a> SubHolder<'a> {
    pub fn new(key: impl Into<String>, holder: &'a dyn ParameterHolder) -> Self {
        Self {
            key: key.into(),
            metadata: holder.metadata(),
            hidden: false,
            ui_order: 0,
            holder,
        }
    }

    pub fn with_metadata(mut self, metadata: HolderMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn ui_order(mut self, order: i32) -> Self {
        self.ui_order = order;
        self
    }
}

/// Implemented by every type that exposes editable parameters.
///
/// A holder reports its own leaves through [`shape`](Self::shape) and the holders it owns
/// through [`sub_holders`](Self::sub_holders). Values written through
/// [`set_by_key`] are already checked against the declaration, so implementations of
/// `set_parameter` only need to store them.
pub trait ParameterHolder: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn metadata(&self) -> HolderMetadata {
        HolderMetadata::default()
    }

    fn shape(&self) -> ParameterShape;

    fn get_parameter(&self, key: &str) -> Result<ParameterValue, ParameterError>;

    fn set_parameter(&mut self, key: &str, value: ParameterValue) -> Result<(), ParameterError>;

    fn sub_holders(&self) -> Vec<SubHolder<'_>> {
        Vec::new()
    }

    fn sub_holder_mut(&mut self, _key: &str) -> Option<&mut dyn ParameterHolder> {
        None
    }
}

/// Joins a holder key and a local key into a path-qualified key.
pub fn join_key(parent: &str, local: &str) -> String {
    if parent.is_empty() {
        local.to_string()
    } else {
        format!("{}{}{}", parent, KEY_SEPARATOR, local)
    }
}

/// Splits a path-qualified key into its holder path and local key.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind(KEY_SEPARATOR) {
        Some(at) => (&key[..at], &key[at + 1..]),
        None => ("", key),
    }
}

pub(crate) fn find_holder<'a>(
    root: &'a dyn ParameterHolder,
    path: &str,
    full_key: &str,
) -> Result<&'a dyn ParameterHolder, ParameterError> {
    let mut current = root;
    for segment in path.split(KEY_SEPARATOR).filter(|s| !s.is_empty()) {
        current = current
            .sub_holders()
            .into_iter()
            .find(|sub| sub.key == segment)
            .map(|sub| sub.holder)
            .ok_or_else(|| ParameterError::NotFound {
                key: full_key.to_string(),
            })?;
    }
    Ok(current)
}

pub(crate) fn find_holder_mut<'a>(
    root: &'a mut dyn ParameterHolder,
    path: &str,
    full_key: &str,
) -> Result<&'a mut dyn ParameterHolder, ParameterError> {
    let mut current = root;
    for segment in path.split(KEY_SEPARATOR).filter(|s| !s.is_empty()) {
        current = current
            .sub_holder_mut(segment)
            .ok_or_else(|| ParameterError::NotFound {
                key: full_key.to_string(),
            })?;
    }
    Ok(current)
}

/// Reads the parameter at a path-qualified key.
pub fn get_by_key(root: &dyn ParameterHolder, key: &str) -> Result<ParameterValue, ParameterError> {
    let (path, local) = split_key(key);
    let holder = find_holder(root, path, key)?;
    if holder.shape().declaration(local).is_none() {
        return Err(ParameterError::NotFound {
            key: key.to_string(),
        });
    }
    holder.get_parameter(local)
}

/// Checks `value` against the declaration of `local` on `holder` and returns the coerced value.
pub(crate) fn check_value(
    holder: &dyn ParameterHolder,
    local: &str,
    full_key: &str,
    value: ParameterValue,
) -> Result<ParameterValue, ParameterError> {
    let shape = holder.shape();
    let declaration = shape
        .declaration(local)
        .ok_or_else(|| ParameterError::NotFound {
            key: full_key.to_string(),
        })?;
    if declaration.read_only {
        return Err(ParameterError::ReadOnly {
            key: full_key.to_string(),
        });
    }
    value
        .coerce(declaration.value_type)
        .map_err(|found| ParameterError::TypeMismatch {
            key: full_key.to_string(),
            expected: declaration.value_type,
            found,
        })
}

/// Writes the parameter at a path-qualified key after checking it against its declaration.
///
/// Returns the value actually stored, which may differ from `value` by a lossless coercion.
pub fn set_by_key(
    root: &mut dyn ParameterHolder,
    key: &str,
    value: ParameterValue,
) -> Result<ParameterValue, ParameterError> {
    let (path, local) = split_key(key);
    let holder = find_holder_mut(root, path, key)?;
    let value = check_value(holder, local, key, value)?;
    holder.set_parameter(local, value.clone())?;
    Ok(value)
}
