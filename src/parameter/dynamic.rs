use super::holder::{HolderMetadata, ParameterDeclaration, ParameterHolder, ParameterShape};
use super::value::{AllowedParameterTypes, ParameterValue};
use crate::error::ParameterError;
use crate::event::{ChangeEvent, ChangeKind, EventBus, Subscription};
use crate::slot::is_valid_slot_name;
use log::{debug, trace};
use std::any::Any;

/// Changes reported by a [`DynamicParameterCollection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterEvent {
    EntryAdded { key: String },
    EntryRemoved { key: String },
    EntryRenamed { old_key: String, new_key: String },
    ValueChanged { key: String },
}

impl ChangeEvent for ParameterEvent {
    fn kind(&self) -> ChangeKind {
        match self {
            ParameterEvent::ValueChanged { .. } => ChangeKind::Value,
            _ => ChangeKind::Structural,
        }
    }
}

#[derive(Debug, Clone)]
struct DynamicEntry {
    declaration: ParameterDeclaration,
    value: ParameterValue,
}

/// A parameter holder whose keys are defined by the user at runtime.
///
/// Any add, remove or rename changes the shape of the holder, so trees built over it must
/// be rebuilt when a structural event arrives.
#[derive(Debug, Clone)]
pub struct DynamicParameterCollection {
    metadata: HolderMetadata,
    entries: Vec<DynamicEntry>,
    allowed_types: AllowedParameterTypes,
    user_modifiable: bool,
    events: EventBus<ParameterEvent>,
}

impl Default for DynamicParameterCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicParameterCollection {
    pub fn new() -> Self {
        Self {
            metadata: HolderMetadata::default(),
            entries: Vec::new(),
            allowed_types: AllowedParameterTypes::Any,
            user_modifiable: true,
            events: EventBus::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HolderMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_allowed_types(mut self, allowed: AllowedParameterTypes) -> Self {
        self.allowed_types = allowed;
        self
    }

    /// Keys can no longer be added, removed or renamed. Values stay writable.
    pub fn locked(mut self) -> Self {
        self.user_modifiable = false;
        self
    }

    /// Adds an entry before the collection is handed out, bypassing the lock.
    pub fn with_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Result<Self, ParameterError> {
        let value = value.into();
        let declaration = ParameterDeclaration::new(key, value.value_type());
        self.insert(declaration, value)?;
        Ok(self)
    }

    pub fn allowed_types(&self) -> &AllowedParameterTypes {
        &self.allowed_types
    }

    pub fn is_user_modifiable(&self) -> bool {
        self.user_modifiable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.declaration.key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.position(key).map(|i| &self.entries[i].value)
    }

    pub fn declaration(&self, key: &str) -> Option<&ParameterDeclaration> {
        self.position(key).map(|i| &self.entries[i].declaration)
    }

    pub fn subscribe(&self, callback: impl FnMut(&ParameterEvent) + 'static) -> Subscription {
        self.events.subscribe(callback)
    }

    pub fn subscribe_kind(
        &self,
        kind: ChangeKind,
        callback: impl FnMut(&ParameterEvent) + 'static,
    ) -> Subscription {
        self.events.subscribe_kind(kind, callback)
    }

    /// Appends an entry whose type is taken from its initial value.
    pub fn add_entry(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Result<(), ParameterError> {
        let value = value.into();
        let declaration = ParameterDeclaration::new(key, value.value_type());
        self.add_declared(declaration, value)
    }

    /// Appends an entry with a full declaration. `value` is coerced to the declared type.
    pub fn add_declared(
        &mut self,
        declaration: ParameterDeclaration,
        value: ParameterValue,
    ) -> Result<(), ParameterError> {
        self.ensure_modifiable(&declaration.key)?;
        let key = declaration.key.clone();
        self.insert(declaration, value)?;
        debug!("Added dynamic parameter '{}'", key);
        self.events.emit(ParameterEvent::EntryAdded { key });
        Ok(())
    }

    pub fn remove_entry(&mut self, key: &str) -> Result<ParameterValue, ParameterError> {
        self.ensure_modifiable(key)?;
        let index = self.require(key)?;
        let removed = self.entries.remove(index);
        debug!("Removed dynamic parameter '{}'", key);
        self.events.emit(ParameterEvent::EntryRemoved {
            key: key.to_string(),
        });
        Ok(removed.value)
    }

    pub fn rename_entry(
        &mut self,
        old_key: &str,
        new_key: impl Into<String>,
    ) -> Result<(), ParameterError> {
        let new_key = new_key.into();
        self.ensure_modifiable(old_key)?;
        let index = self.require(old_key)?;
        if old_key == new_key {
            return Ok(());
        }
        self.ensure_key(&new_key)?;

        let declaration = &mut self.entries[index].declaration;
        if declaration.name == declaration.key {
            declaration.name = new_key.clone();
        }
        declaration.key = new_key.clone();
        debug!("Renamed dynamic parameter '{}' to '{}'", old_key, new_key);
        self.events.emit(ParameterEvent::EntryRenamed {
            old_key: old_key.to_string(),
            new_key,
        });
        Ok(())
    }

    /// Replaces the value of an existing entry. A value event is emitted when it changes.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<ParameterValue>,
    ) -> Result<(), ParameterError> {
        let index = self.require(key)?;
        let entry = &mut self.entries[index];
        let expected = entry.declaration.value_type;
        let value = value
            .into()
            .coerce(expected)
            .map_err(|found| ParameterError::TypeMismatch {
                key: key.to_string(),
                expected,
                found,
            })?;
        if entry.value == value {
            return Ok(());
        }
        trace!("Dynamic parameter '{}' = {}", key, value);
        entry.value = value;
        self.events.emit(ParameterEvent::ValueChanged {
            key: key.to_string(),
        });
        Ok(())
    }

    fn insert(
        &mut self,
        declaration: ParameterDeclaration,
        value: ParameterValue,
    ) -> Result<(), ParameterError> {
        self.ensure_key(&declaration.key)?;
        if !self.allowed_types.allows(declaration.value_type) {
            return Err(ParameterError::TypeNotAllowed {
                value_type: declaration.value_type,
            });
        }
        let value = value
            .coerce(declaration.value_type)
            .map_err(|found| ParameterError::TypeMismatch {
                key: declaration.key.clone(),
                expected: declaration.value_type,
                found,
            })?;
        self.entries.push(DynamicEntry { declaration, value });
        Ok(())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.declaration.key == key)
    }

    fn require(&self, key: &str) -> Result<usize, ParameterError> {
        self.position(key).ok_or_else(|| ParameterError::NotFound {
            key: key.to_string(),
        })
    }

    fn ensure_key(&self, key: &str) -> Result<(), ParameterError> {
        if !is_valid_slot_name(key) {
            return Err(ParameterError::InvalidName {
                key: key.to_string(),
            });
        }
        if self.contains(key) {
            return Err(ParameterError::DuplicateName {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_modifiable(&self, key: &str) -> Result<(), ParameterError> {
        if self.user_modifiable {
            Ok(())
        } else {
            Err(ParameterError::ReadOnly {
                key: key.to_string(),
            })
        }
    }
}

impl ParameterHolder for DynamicParameterCollection {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn metadata(&self) -> HolderMetadata {
        self.metadata.clone()
    }

    fn shape(&self) -> ParameterShape {
        ParameterShape::Dynamic {
            entries: self.entries.iter().map(|e| e.declaration.clone()).collect(),
            allowed_types: self.allowed_types.clone(),
        }
    }

    fn get_parameter(&self, key: &str) -> Result<ParameterValue, ParameterError> {
        self.get(key).cloned().ok_or_else(|| ParameterError::NotFound {
            key: key.to_string(),
        })
    }

    fn set_parameter(&mut self, key: &str, value: ParameterValue) -> Result<(), ParameterError> {
        self.set(key, value)
    }
}
