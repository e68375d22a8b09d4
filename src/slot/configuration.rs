use super::definition::{InheritedSlot, SlotDefinition, SlotDirection};
use super::name::validate_slot_name;
use crate::error::SlotError;
use crate::event::{ChangeEvent, ChangeKind, EventBus, Subscription};
use crate::types::DataTypeId;
use log::{debug, trace};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a slot inside its configuration. Never reused, survives renames and moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A slot definition together with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    id: SlotId,
    definition: SlotDefinition,
}

impl SlotEntry {
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn definition(&self) -> &SlotDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }
}

/// How a node lets its slots be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotConfigurationKind {
    /// Slots may be added and removed freely within the allowed type sets.
    #[default]
    DefaultMutable,
    /// Every input is mirrored by an output of the same name that inherits its type.
    /// Outputs cannot be edited directly. Used by compartment and boundary nodes.
    IoPassthrough,
}

/// The data types a node accepts for one slot direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowedTypes {
    #[default]
    Any,
    Only(BTreeSet<DataTypeId>),
}

impl AllowedTypes {
    pub fn only<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DataTypeId>,
    {
        AllowedTypes::Only(types.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, data_type: &DataTypeId) -> bool {
        match self {
            AllowedTypes::Any => true,
            AllowedTypes::Only(set) => set.contains(data_type),
        }
    }
}

/// Changes reported by a [`SlotConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    SlotAdded {
        direction: SlotDirection,
        name: String,
    },
    SlotRemoved {
        direction: SlotDirection,
        name: String,
    },
    SlotRenamed {
        direction: SlotDirection,
        old_name: String,
        new_name: String,
    },
    SlotsReordered {
        direction: SlotDirection,
    },
    DefinitionChanged {
        direction: SlotDirection,
        name: String,
    },
}

impl ChangeEvent for SlotEvent {
    fn kind(&self) -> ChangeKind {
        match self {
            SlotEvent::DefinitionChanged { .. } => ChangeKind::Value,
            _ => ChangeKind::Structural,
        }
    }
}

/// The ordered input and output slots of one node plus the rules for editing them.
///
/// Iteration order is significant and only changes through the methods below. Every
/// command validates before mutating, so a failed call leaves the configuration as it was.
#[derive(Debug, Clone)]
pub struct SlotConfiguration {
    kind: SlotConfigurationKind,
    inputs: Vec<SlotEntry>,
    outputs: Vec<SlotEntry>,
    allowed_inputs: AllowedTypes,
    allowed_outputs: AllowedTypes,
    inputs_sealed: bool,
    outputs_sealed: bool,
    max_inputs: Option<usize>,
    max_outputs: Option<usize>,
    next_id: u32,
    events: EventBus<SlotEvent>,
}

impl Default for SlotConfiguration {
    fn default() -> Self {
        Self::new(SlotConfigurationKind::DefaultMutable)
    }
}

impl SlotConfiguration {
    pub fn new(kind: SlotConfigurationKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            allowed_inputs: AllowedTypes::Any,
            allowed_outputs: AllowedTypes::Any,
            inputs_sealed: false,
            outputs_sealed: false,
            max_inputs: None,
            max_outputs: None,
            next_id: 0,
            events: EventBus::new(),
        }
    }

    pub fn builder() -> SlotConfigurationBuilder {
        SlotConfigurationBuilder::default()
    }

    pub fn kind(&self) -> SlotConfigurationKind {
        self.kind
    }

    // --- Queries ---

    pub fn slots(&self, direction: SlotDirection) -> &[SlotEntry] {
        match direction {
            SlotDirection::Input => &self.inputs,
            SlotDirection::Output => &self.outputs,
        }
    }

    pub fn inputs(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.inputs.iter().map(SlotEntry::definition)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.outputs.iter().map(SlotEntry::definition)
    }

    pub fn names(&self, direction: SlotDirection) -> Vec<&str> {
        self.slots(direction).iter().map(SlotEntry::name).collect()
    }

    pub fn len(&self, direction: SlotDirection) -> usize {
        self.slots(direction).len()
    }

    pub fn get(&self, direction: SlotDirection, name: &str) -> Option<&SlotDefinition> {
        self.entry(direction, name).map(SlotEntry::definition)
    }

    pub fn entry(&self, direction: SlotDirection, name: &str) -> Option<&SlotEntry> {
        self.slots(direction).iter().find(|e| e.name() == name)
    }

    pub fn entry_by_id(&self, direction: SlotDirection, id: SlotId) -> Option<&SlotEntry> {
        self.slots(direction).iter().find(|e| e.id == id)
    }

    pub fn slot_id(&self, direction: SlotDirection, name: &str) -> Option<SlotId> {
        self.entry(direction, name).map(SlotEntry::id)
    }

    pub fn index_of(&self, direction: SlotDirection, name: &str) -> Option<usize> {
        self.slots(direction).iter().position(|e| e.name() == name)
    }

    pub fn contains(&self, direction: SlotDirection, name: &str) -> bool {
        self.entry(direction, name).is_some()
    }

    pub fn allowed_types(&self, direction: SlotDirection) -> &AllowedTypes {
        match direction {
            SlotDirection::Input => &self.allowed_inputs,
            SlotDirection::Output => &self.allowed_outputs,
        }
    }

    pub fn is_type_allowed(&self, direction: SlotDirection, data_type: &DataTypeId) -> bool {
        self.allowed_types(direction).allows(data_type)
    }

    pub fn max_slots(&self, direction: SlotDirection) -> Option<usize> {
        match direction {
            SlotDirection::Input => self.max_inputs,
            SlotDirection::Output => self.max_outputs,
        }
    }

    pub fn is_sealed(&self, direction: SlotDirection) -> bool {
        match direction {
            SlotDirection::Input => self.inputs_sealed,
            SlotDirection::Output => self.outputs_sealed,
        }
    }

    /// Whether users may add, remove or rename slots in this direction.
    pub fn can_modify(&self, direction: SlotDirection) -> bool {
        match direction {
            SlotDirection::Input => !self.inputs_sealed,
            SlotDirection::Output => {
                !self.outputs_sealed && self.kind != SlotConfigurationKind::IoPassthrough
            }
        }
    }

    /// Whether another slot may be added in this direction.
    pub fn can_add(&self, direction: SlotDirection) -> bool {
        self.can_modify(direction)
            && self
                .max_slots(direction)
                .is_none_or(|max| self.len(direction) < max)
    }

    // --- Subscriptions ---

    pub fn subscribe(&self, callback: impl FnMut(&SlotEvent) + 'static) -> Subscription {
        self.events.subscribe(callback)
    }

    pub fn subscribe_kind(
        &self,
        kind: ChangeKind,
        callback: impl FnMut(&SlotEvent) + 'static,
    ) -> Subscription {
        self.events.subscribe_kind(kind, callback)
    }

    // --- Commands ---

    /// Appends a slot named `name` built from `definition` to the end of its direction.
    pub fn add_slot(
        &mut self,
        name: impl Into<String>,
        mut definition: SlotDefinition,
        notify: bool,
    ) -> Result<SlotId, SlotError> {
        let name = name.into();
        let direction = definition.direction();
        self.ensure_modifiable(direction)?;
        validate_slot_name(&name)?;
        self.ensure_free(direction, &name)?;
        self.ensure_allowed(direction, definition.data_type())?;
        self.ensure_capacity(direction)?;

        let passthrough = self.mirrors(direction);
        if passthrough {
            self.ensure_free(SlotDirection::Output, &name)?;
            self.ensure_allowed(SlotDirection::Output, definition.data_type())?;
        }

        definition.set_name(name.clone());
        let mirror = passthrough.then(|| Self::mirror_of(&definition));
        let id = self.push(definition);
        if let Some(mirror) = mirror {
            self.push(mirror);
        }

        debug!("Added {} slot '{}'", direction, name);
        if notify {
            if passthrough {
                self.events.emit(SlotEvent::SlotAdded {
                    direction: SlotDirection::Input,
                    name: name.clone(),
                });
                self.events.emit(SlotEvent::SlotAdded {
                    direction: SlotDirection::Output,
                    name,
                });
            } else {
                self.events.emit(SlotEvent::SlotAdded { direction, name });
            }
        }
        Ok(id)
    }

    /// Removes a slot. In pass-through mode removing an input also removes its mirror.
    ///
    /// Outputs that inherited from a removed input stop inheriting and fall back to their
    /// declared type.
    pub fn remove_slot(
        &mut self,
        direction: SlotDirection,
        name: &str,
        notify: bool,
    ) -> Result<SlotDefinition, SlotError> {
        self.ensure_modifiable(direction)?;
        let index = self.require_index(direction, name)?;

        let removed = self.slots_mut(direction).remove(index).definition;
        let mirror_removed = self.mirrors(direction)
            && match self.index_of(SlotDirection::Output, name) {
                Some(mirror) => {
                    self.outputs.remove(mirror);
                    true
                }
                None => false,
            };
        // Outputs must not rebind to a later input that happens to reuse the name.
        if direction == SlotDirection::Input {
            self.retarget_inheritance(name, InheritedSlot::None);
        }

        debug!("Removed {} slot '{}'", direction, name);
        if notify {
            self.events.emit(SlotEvent::SlotRemoved {
                direction,
                name: name.to_string(),
            });
            if mirror_removed {
                self.events.emit(SlotEvent::SlotRemoved {
                    direction: SlotDirection::Output,
                    name: name.to_string(),
                });
            }
        }
        Ok(removed)
    }

    /// Renames a slot, keeping its identity, position and all inheritance references to it.
    pub fn rename_slot(
        &mut self,
        direction: SlotDirection,
        old_name: &str,
        new_name: impl Into<String>,
        notify: bool,
    ) -> Result<(), SlotError> {
        let new_name = new_name.into();
        self.ensure_modifiable(direction)?;
        let index = self.require_index(direction, old_name)?;
        if old_name == new_name {
            return Ok(());
        }
        validate_slot_name(&new_name)?;
        self.ensure_free(direction, &new_name)?;

        let mirror_index = if self.mirrors(direction) {
            let mirror = self.index_of(SlotDirection::Output, old_name);
            if mirror.is_some() {
                self.ensure_free(SlotDirection::Output, &new_name)?;
            }
            mirror
        } else {
            None
        };

        self.slots_mut(direction)[index]
            .definition
            .set_name(new_name.clone());
        if let Some(mirror) = mirror_index {
            self.outputs[mirror].definition.set_name(new_name.clone());
        }
        if direction == SlotDirection::Input {
            self.retarget_inheritance(old_name, InheritedSlot::Named(new_name.clone()));
        }

        debug!("Renamed {} slot '{}' to '{}'", direction, old_name, new_name);
        if notify {
            self.events.emit(SlotEvent::SlotRenamed {
                direction,
                old_name: old_name.to_string(),
                new_name: new_name.clone(),
            });
            if mirror_index.is_some() {
                self.events.emit(SlotEvent::SlotRenamed {
                    direction: SlotDirection::Output,
                    old_name: old_name.to_string(),
                    new_name,
                });
            }
        }
        Ok(())
    }

    /// Moves a slot to `new_index` within its direction.
    pub fn move_slot(
        &mut self,
        direction: SlotDirection,
        name: &str,
        new_index: usize,
        notify: bool,
    ) -> Result<(), SlotError> {
        self.ensure_modifiable(direction)?;
        let index = self.require_index(direction, name)?;
        let len = self.len(direction);
        if new_index >= len {
            return Err(SlotError::IndexOutOfRange {
                direction,
                index: new_index,
                len,
            });
        }
        if index == new_index {
            return Ok(());
        }

        let slots = self.slots_mut(direction);
        let entry = slots.remove(index);
        slots.insert(new_index, entry);
        if self.mirrors(direction) {
            self.sync_mirror_order();
        }

        debug!("Moved {} slot '{}' to index {}", direction, name, new_index);
        if notify {
            self.events.emit(SlotEvent::SlotsReordered { direction });
            if self.mirrors(direction) {
                self.events.emit(SlotEvent::SlotsReordered {
                    direction: SlotDirection::Output,
                });
            }
        }
        Ok(())
    }

    /// Replaces the definition of an existing slot in place.
    ///
    /// The slot keeps its position but receives a fresh identity, so anything keyed on the
    /// old identity (graph edges) has to be re-established by the caller. An empty name on
    /// `replacement` keeps the current name; outputs inheriting from a renamed input follow
    /// the new name.
    pub fn replace_slot(
        &mut self,
        direction: SlotDirection,
        name: &str,
        replacement: SlotDefinition,
        notify: bool,
    ) -> Result<SlotId, SlotError> {
        self.ensure_modifiable(direction)?;
        let index = self.require_index(direction, name)?;
        let new_name = if replacement.name().is_empty() {
            name.to_string()
        } else {
            replacement.name().to_string()
        };
        validate_slot_name(&new_name)?;
        if new_name != name {
            self.ensure_free(direction, &new_name)?;
        }
        let mut replacement = replacement;
        replacement.set_direction(direction);
        self.ensure_allowed(direction, replacement.data_type())?;

        let mirror_index = if self.mirrors(direction) {
            let mirror = self.index_of(SlotDirection::Output, name);
            if mirror.is_some() {
                if new_name != name {
                    self.ensure_free(SlotDirection::Output, &new_name)?;
                }
                self.ensure_allowed(SlotDirection::Output, replacement.data_type())?;
            }
            mirror
        } else {
            None
        };

        replacement.set_name(new_name.clone());
        let id = self.allocate_id();
        if let Some(mirror) = mirror_index {
            self.outputs[mirror].definition = Self::mirror_of(&replacement);
        }
        self.slots_mut(direction)[index] = SlotEntry {
            id,
            definition: replacement,
        };
        if direction == SlotDirection::Input && new_name != name {
            self.retarget_inheritance(name, InheritedSlot::Named(new_name.clone()));
        }

        debug!("Replaced {} slot '{}'", direction, name);
        if notify {
            self.events.emit(SlotEvent::SlotRemoved {
                direction,
                name: name.to_string(),
            });
            self.events.emit(SlotEvent::SlotAdded {
                direction,
                name: new_name,
            });
        }
        Ok(id)
    }

    /// Changes which input an output slot inherits its type from.
    pub fn set_inherited_slot(
        &mut self,
        output: &str,
        inherited: InheritedSlot,
        notify: bool,
    ) -> Result<(), SlotError> {
        let index = self.require_index(SlotDirection::Output, output)?;
        if let InheritedSlot::Named(input) = &inherited {
            self.require_index(SlotDirection::Input, input)?;
        }
        self.update_output(index, notify, |d| d.with_inherited_slot(inherited))
    }

    /// Declares that an inherited type `from` is replaced by `to` on the given output.
    pub fn set_inheritance_conversion(
        &mut self,
        output: &str,
        from: impl Into<DataTypeId>,
        to: impl Into<DataTypeId>,
        notify: bool,
    ) -> Result<(), SlotError> {
        let (from, to) = (from.into(), to.into());
        let index = self.require_index(SlotDirection::Output, output)?;
        self.ensure_allowed(SlotDirection::Output, &to)?;
        self.update_output(index, notify, |d| d.with_conversion(from, to))
    }

    /// Removes a conversion override. Returns whether one was present.
    pub fn remove_inheritance_conversion(
        &mut self,
        output: &str,
        from: &DataTypeId,
        notify: bool,
    ) -> Result<bool, SlotError> {
        let index = self.require_index(SlotDirection::Output, output)?;
        if !self.outputs[index]
            .definition
            .inheritance_conversions()
            .contains_key(from)
        {
            return Ok(false);
        }
        self.update_output(index, notify, |d| d.without_conversion(from))?;
        Ok(true)
    }

    // --- Internals ---

    fn update_output(
        &mut self,
        index: usize,
        notify: bool,
        change: impl FnOnce(SlotDefinition) -> SlotDefinition,
    ) -> Result<(), SlotError> {
        let entry = &mut self.outputs[index];
        entry.definition = change(entry.definition.clone());
        let name = entry.name().to_string();
        debug!("Updated output slot '{}'", name);
        if notify {
            self.events.emit(SlotEvent::DefinitionChanged {
                direction: SlotDirection::Output,
                name,
            });
        }
        Ok(())
    }

    /// Points every output inheriting from input `old_name` at `target` instead.
    fn retarget_inheritance(&mut self, old_name: &str, target: InheritedSlot) {
        for entry in &mut self.outputs {
            let inherits = matches!(
                entry.definition.inherited_slot(),
                InheritedSlot::Named(n) if n == old_name
            );
            if inherits {
                trace!("Output '{}' now inherits {:?}", entry.name(), target);
                entry.definition = entry.definition.clone().with_inherited_slot(target.clone());
            }
        }
    }

    fn slots_mut(&mut self, direction: SlotDirection) -> &mut Vec<SlotEntry> {
        match direction {
            SlotDirection::Input => &mut self.inputs,
            SlotDirection::Output => &mut self.outputs,
        }
    }

    fn allocate_id(&mut self) -> SlotId {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, definition: SlotDefinition) -> SlotId {
        let id = self.allocate_id();
        self.slots_mut(definition.direction())
            .push(SlotEntry { id, definition });
        id
    }

    fn mirrors(&self, direction: SlotDirection) -> bool {
        self.kind == SlotConfigurationKind::IoPassthrough && direction == SlotDirection::Input
    }

    fn mirror_of(input: &SlotDefinition) -> SlotDefinition {
        SlotDefinition::output(input.data_type().clone())
            .named(input.name())
            .with_description(input.description())
            .inherits_from(input.name())
    }

    /// Orders mirrored outputs like their inputs; unmatched outputs keep their relative order.
    fn sync_mirror_order(&mut self) {
        let inputs = &self.inputs;
        self.outputs.sort_by_key(|out| {
            inputs
                .iter()
                .position(|i| i.name() == out.name())
                .unwrap_or(usize::MAX)
        });
    }

    fn require_index(&self, direction: SlotDirection, name: &str) -> Result<usize, SlotError> {
        self.index_of(direction, name)
            .ok_or_else(|| SlotError::NotFound {
                name: name.to_string(),
                direction,
            })
    }

    fn ensure_modifiable(&self, direction: SlotDirection) -> Result<(), SlotError> {
        if self.can_modify(direction) {
            Ok(())
        } else {
            Err(SlotError::Sealed { direction })
        }
    }

    fn ensure_free(&self, direction: SlotDirection, name: &str) -> Result<(), SlotError> {
        if self.contains(direction, name) {
            Err(SlotError::DuplicateName {
                name: name.to_string(),
                direction,
            })
        } else {
            Ok(())
        }
    }

    fn ensure_allowed(
        &self,
        direction: SlotDirection,
        data_type: &DataTypeId,
    ) -> Result<(), SlotError> {
        if self.is_type_allowed(direction, data_type) {
            Ok(())
        } else {
            Err(SlotError::TypeNotAllowed {
                data_type: data_type.clone(),
                direction,
            })
        }
    }

    fn ensure_capacity(&self, direction: SlotDirection) -> Result<(), SlotError> {
        match self.max_slots(direction) {
            Some(limit) if self.len(direction) >= limit => {
                Err(SlotError::LimitReached { direction, limit })
            }
            _ => Ok(()),
        }
    }
}

/// Assembles a [`SlotConfiguration`], validating every initial slot.
#[derive(Debug, Default)]
pub struct SlotConfigurationBuilder {
    kind: SlotConfigurationKind,
    allowed_inputs: AllowedTypes,
    allowed_outputs: AllowedTypes,
    seal_inputs: bool,
    seal_outputs: bool,
    max_inputs: Option<usize>,
    max_outputs: Option<usize>,
    slots: Vec<(String, SlotDefinition)>,
}

impl SlotConfigurationBuilder {
    pub fn kind(mut self, kind: SlotConfigurationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn passthrough(self) -> Self {
        self.kind(SlotConfigurationKind::IoPassthrough)
    }

    pub fn allowed_input_types(mut self, allowed: AllowedTypes) -> Self {
        self.allowed_inputs = allowed;
        self
    }

    pub fn allowed_output_types(mut self, allowed: AllowedTypes) -> Self {
        self.allowed_outputs = allowed;
        self
    }

    pub fn seal_inputs(mut self) -> Self {
        self.seal_inputs = true;
        self
    }

    pub fn seal_outputs(mut self) -> Self {
        self.seal_outputs = true;
        self
    }

    pub fn max_inputs(mut self, max: usize) -> Self {
        self.max_inputs = Some(max);
        self
    }

    pub fn max_outputs(mut self, max: usize) -> Self {
        self.max_outputs = Some(max);
        self
    }

    pub fn input(self, name: impl Into<String>, mut definition: SlotDefinition) -> Self {
        definition.set_direction(SlotDirection::Input);
        self.slot(name, definition)
    }

    pub fn output(self, name: impl Into<String>, mut definition: SlotDefinition) -> Self {
        definition.set_direction(SlotDirection::Output);
        self.slot(name, definition)
    }

    /// Adds a slot keeping the direction of `definition`.
    pub fn slot(mut self, name: impl Into<String>, definition: SlotDefinition) -> Self {
        self.slots.push((name.into(), definition));
        self
    }

    pub fn build(self) -> Result<SlotConfiguration, SlotError> {
        let mut config = SlotConfiguration::new(self.kind);
        config.allowed_inputs = self.allowed_inputs;
        config.allowed_outputs = self.allowed_outputs;
        config.max_inputs = self.max_inputs;
        config.max_outputs = self.max_outputs;

        // Initial slots may populate a direction that is sealed afterwards.
        for (name, definition) in self.slots {
            config.add_slot(name, definition, false)?;
        }
        config.inputs_sealed = self.seal_inputs;
        config.outputs_sealed = self.seal_outputs;
        Ok(config)
    }
}
