use super::{DataTypeId, DataTypeInfo};
use crate::error::RegistryError;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use log::debug;
use std::collections::VecDeque;

/// Maps data type identifiers to their metadata and answers compatibility queries.
///
/// A value of type `A` may flow into a slot of type `B` when `A == B`, or when `B` can be
/// reached from `A` by walking parent (inheritance) edges and explicit conversion edges.
#[derive(Debug, Clone, Default)]
pub struct DataTypeRegistry {
    types: AHashMap<DataTypeId, DataTypeInfo>,
    /// Registration order, used to keep listings deterministic.
    order: Vec<DataTypeId>,
    conversions: AHashMap<DataTypeId, Vec<DataTypeId>>,
}

impl DataTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DataTypeRegistryBuilder {
        DataTypeRegistryBuilder::default()
    }

    /// Registers a data type. Parents must be registered before their children.
    pub fn register(&mut self, info: DataTypeInfo) -> Result<(), RegistryError> {
        if self.types.contains_key(&info.id) {
            return Err(RegistryError::AlreadyRegistered(info.id));
        }
        if let Some(missing) = info.parents.iter().find(|p| !self.types.contains_key(*p)) {
            return Err(RegistryError::UnknownType(missing.clone()));
        }
        debug!("Registered data type '{}' ({})", info.id, info.name);
        self.order.push(info.id.clone());
        self.types.insert(info.id.clone(), info);
        Ok(())
    }

    /// Declares that values of `from` can be converted into `to`.
    pub fn register_conversion(
        &mut self,
        from: impl Into<DataTypeId>,
        to: impl Into<DataTypeId>,
    ) -> Result<(), RegistryError> {
        let (from, to) = (from.into(), to.into());
        for id in [&from, &to] {
            if !self.types.contains_key(id) {
                return Err(RegistryError::UnknownType(id.clone()));
            }
        }
        let targets = self.conversions.entry(from.clone()).or_default();
        if !targets.contains(&to) {
            debug!("Registered conversion '{}' -> '{}'", from, to);
            targets.push(to);
        }
        Ok(())
    }

    pub fn get(&self, id: &DataTypeId) -> Option<&DataTypeInfo> {
        self.types.get(id)
    }

    pub fn contains(&self, id: &DataTypeId) -> bool {
        self.types.contains_key(id)
    }

    /// Display name of a type, falling back to its raw id for unknown types.
    pub fn name_of(&self, id: &DataTypeId) -> String {
        self.types
            .get(id)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &DataTypeInfo> {
        self.order.iter().filter_map(|id| self.types.get(id))
    }

    /// Types that may be offered in type pickers, sorted by display name.
    pub fn visible_types(&self) -> Vec<&DataTypeInfo> {
        self.types()
            .filter(|info| !info.hidden)
            .sorted_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)))
            .collect()
    }

    /// Declared conversions, sorted by source then target.
    pub fn conversions(&self) -> Vec<(&DataTypeId, &DataTypeId)> {
        self.conversions
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from, to)))
            .sorted()
            .collect()
    }

    /// Returns true if values of `source` may flow into a slot accepting `target`.
    pub fn is_compatible(&self, source: &DataTypeId, target: &DataTypeId) -> bool {
        source == target || self.conversion_path(source, target).is_some()
    }

    /// Shortest chain of types leading from `source` to `target`, both ends included.
    pub fn conversion_path(
        &self,
        source: &DataTypeId,
        target: &DataTypeId,
    ) -> Option<Vec<DataTypeId>> {
        if source == target {
            return Some(vec![source.clone()]);
        }

        let mut previous: AHashMap<&DataTypeId, &DataTypeId> = AHashMap::new();
        let mut visited: AHashSet<&DataTypeId> = AHashSet::new();
        let mut queue = VecDeque::from([source]);
        visited.insert(source);

        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if !visited.insert(next) {
                    continue;
                }
                previous.insert(next, current);
                if next == target {
                    let mut path = vec![next.clone()];
                    let mut cursor = next;
                    while let Some(prev) = previous.get(cursor) {
                        path.push((*prev).clone());
                        cursor = *prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// All ancestors of a type through inheritance only, nearest first.
    pub fn ancestors(&self, id: &DataTypeId) -> Vec<DataTypeId> {
        let mut result = Vec::new();
        let mut queue: VecDeque<&DataTypeId> = self
            .types
            .get(id)
            .map(|info| info.parents.iter().collect())
            .unwrap_or_default();
        while let Some(current) = queue.pop_front() {
            if result.contains(current) {
                continue;
            }
            result.push(current.clone());
            if let Some(info) = self.types.get(current) {
                queue.extend(info.parents.iter());
            }
        }
        result
    }

    fn successors<'a>(&'a self, id: &DataTypeId) -> impl Iterator<Item = &'a DataTypeId> {
        let parents = self.types.get(id).into_iter().flat_map(|i| i.parents.iter());
        let converted = self.conversions.get(id).into_iter().flatten();
        parents.chain(converted)
    }
}

/// Collects type registrations and conversions, validating them on `build`.
#[derive(Debug, Default)]
pub struct DataTypeRegistryBuilder {
    types: Vec<DataTypeInfo>,
    conversions: Vec<(DataTypeId, DataTypeId)>,
}

impl DataTypeRegistryBuilder {
    pub fn with_type(mut self, info: DataTypeInfo) -> Self {
        self.types.push(info);
        self
    }

    pub fn with_conversion(
        mut self,
        from: impl Into<DataTypeId>,
        to: impl Into<DataTypeId>,
    ) -> Self {
        self.conversions.push((from.into(), to.into()));
        self
    }

    pub fn build(self) -> Result<DataTypeRegistry, RegistryError> {
        let mut registry = DataTypeRegistry::new();
        for info in self.types {
            registry.register(info)?;
        }
        for (from, to) in self.conversions {
            registry.register_conversion(from, to)?;
        }
        Ok(registry)
    }
}
