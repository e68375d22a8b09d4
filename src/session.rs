//! State that lives for one editing session.
//!
//! An editor creates an [`EditingSession`] when the user starts working on a pipeline and
//! drops it when the session ends. Commands that offer a data type (for example when the
//! user adds a slot) consult it for a sensible default.

use crate::slot::{SlotConfiguration, SlotDirection};
use crate::types::{DataTypeId, DataTypeRegistry};
use log::trace;

#[derive(Debug, Clone, Default)]
pub struct EditingSession {
    last_selected_type: Option<DataTypeId>,
}

impl EditingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the type the user picked last.
    pub fn remember_type(&mut self, data_type: impl Into<DataTypeId>) {
        let data_type = data_type.into();
        trace!("Remembering data type '{}'", data_type);
        self.last_selected_type = Some(data_type);
    }

    pub fn last_selected_type(&self) -> Option<&DataTypeId> {
        self.last_selected_type.as_ref()
    }

    pub fn forget(&mut self) {
        self.last_selected_type = None;
    }

    /// The type to preselect when adding a slot in `direction` to `config`.
    ///
    /// The remembered type wins when the slot list allows it and it is registered and
    /// visible. Otherwise the first visible type (by display name) the list allows is
    /// returned. `None` when no visible type is allowed.
    pub fn preferred_type(
        &self,
        config: &SlotConfiguration,
        direction: SlotDirection,
        registry: &DataTypeRegistry,
    ) -> Option<DataTypeId> {
        let offered = |id: &DataTypeId| {
            config.is_type_allowed(direction, id)
                && registry.get(id).is_some_and(|info| !info.hidden)
        };
        if let Some(last) = self.last_selected_type.as_ref().filter(|&id| offered(id)) {
            return Some(last.clone());
        }
        registry
            .visible_types()
            .into_iter()
            .map(|info| &info.id)
            .find(|id| config.is_type_allowed(direction, id))
            .cloned()
    }
}
