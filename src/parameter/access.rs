use super::holder::{get_by_key, set_by_key, split_key, ParameterDeclaration, ParameterHolder};
use super::value::{ParameterType, ParameterValue};
use crate::error::ParameterError;

/// Handle to one leaf of a [`ParameterTree`](super::ParameterTree).
///
/// The handle never owns its holder. It remembers the holder's path from the tree root, so
/// reads and writes take the root they were built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAccess {
    key: String,
    declaration: ParameterDeclaration,
    hidden: bool,
    value: ParameterValue,
}

impl ParameterAccess {
    pub(crate) fn new(
        key: String,
        declaration: ParameterDeclaration,
        hidden: bool,
        value: ParameterValue,
    ) -> Self {
        Self {
            key,
            declaration,
            hidden,
            value,
        }
    }

    /// Path-qualified key, unique within its tree.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key of the leaf inside its holder.
    pub fn local_key(&self) -> &str {
        split_key(&self.key).1
    }

    /// Key of the owning holder. Empty for leaves of the root holder.
    pub fn holder_key(&self) -> &str {
        split_key(&self.key).0
    }

    /// Sub-holder keys leading from the root to the owning holder.
    pub fn holder_path(&self) -> impl Iterator<Item = &str> {
        self.holder_key().split('/').filter(|s| !s.is_empty())
    }

    pub fn declaration(&self) -> &ParameterDeclaration {
        &self.declaration
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn description(&self) -> &str {
        &self.declaration.description
    }

    pub fn value_type(&self) -> ParameterType {
        self.declaration.value_type
    }

    /// Hidden by its declaration, by an enclosing holder, or by the tree's predicate.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_important(&self) -> bool {
        self.declaration.important
    }

    pub fn is_pinned(&self) -> bool {
        self.declaration.pinned
    }

    pub fn ui_order(&self) -> i32 {
        self.declaration.ui_order
    }

    pub fn is_read_only(&self) -> bool {
        self.declaration.read_only
    }

    /// The value seen when the tree was built or last refreshed.
    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    /// Reads the current value from the holder.
    pub fn get(&self, root: &dyn ParameterHolder) -> Result<ParameterValue, ParameterError> {
        get_by_key(root, &self.key)
    }

    /// Writes through to the holder and updates the cached value.
    pub fn set(
        &mut self,
        root: &mut dyn ParameterHolder,
        value: impl Into<ParameterValue>,
    ) -> Result<(), ParameterError> {
        self.value = set_by_key(root, &self.key, value.into())?;
        Ok(())
    }

    /// Re-reads the holder. Returns true when the cached value changed.
    pub(crate) fn refresh(&mut self, root: &dyn ParameterHolder) -> Result<bool, ParameterError> {
        let current = self.get(root)?;
        if current == self.value {
            return Ok(false);
        }
        self.value = current;
        Ok(true)
    }
}
