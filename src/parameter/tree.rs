use super::access::ParameterAccess;
use super::holder::{
    check_value, find_holder, join_key, split_key, HolderMetadata, ParameterHolder,
    ParameterShape,
};
use super::value::{AllowedParameterTypes, ParameterValue};
use crate::error::ParameterError;
use crate::slot::is_valid_slot_name;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use log::{debug, trace};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

type HidePredicate = Box<dyn Fn(&str) -> bool>;

/// Options for [`ParameterTree::build_with`].
#[derive(Default)]
pub struct TreeOptions {
    hide: Option<HidePredicate>,
}

impl TreeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags every holder or leaf whose key matches `predicate` as hidden.
    pub fn hide_when(mut self, predicate: impl Fn(&str) -> bool + 'static) -> Self {
        self.hide = Some(Box::new(predicate));
        self
    }

    fn hides(&self, key: &str) -> bool {
        self.hide.as_ref().is_some_and(|hide| hide(key))
    }
}

impl fmt::Debug for TreeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("hide", &self.hide.is_some())
            .finish()
    }
}

/// One holder in a [`ParameterTree`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTreeNode {
    key: String,
    metadata: HolderMetadata,
    hidden: bool,
    ui_order: i32,
    allowed_types: Option<AllowedParameterTypes>,
    parent: Option<usize>,
    children: Vec<usize>,
    parameters: Vec<usize>,
}

impl ParameterTreeNode {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn local_key(&self) -> &str {
        split_key(&self.key).1
    }

    /// Display name, falling back to the local key for anonymous holders.
    pub fn name(&self) -> &str {
        if self.metadata.name.is_empty() {
            self.local_key()
        } else {
            &self.metadata.name
        }
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn ui_order(&self) -> i32 {
        self.ui_order
    }

    /// Whether the holder's keys are defined at runtime.
    pub fn is_dynamic(&self) -> bool {
        self.allowed_types.is_some()
    }

    /// The value types a dynamic holder accepts for new entries.
    pub fn allowed_types(&self) -> Option<&AllowedParameterTypes> {
        self.allowed_types.as_ref()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// A snapshot view of every parameter reachable from one root holder.
///
/// The tree never holds on to the holder. Reads and writes take the root again, and a
/// structural change in any holder (including a dynamic collection gaining or losing a key)
/// requires building a fresh tree. Value-only changes are picked up by [`refresh`](Self::refresh).
#[derive(Debug, Clone)]
pub struct ParameterTree {
    nodes: Vec<ParameterTreeNode>,
    leaves: Vec<ParameterAccess>,
    node_index: AHashMap<String, usize>,
    leaf_index: AHashMap<String, usize>,
}

/// Identity of a holder during traversal: address plus concrete type, so a holder and its
/// first field are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HolderIdentity {
    address: usize,
    type_id: TypeId,
}

impl HolderIdentity {
    fn of(holder: &dyn ParameterHolder) -> Self {
        Self {
            address: holder as *const dyn ParameterHolder as *const () as usize,
            type_id: holder.as_any().type_id(),
        }
    }
}

struct TreeBuilder<'o> {
    tree: ParameterTree,
    options: &'o TreeOptions,
    ancestors: Vec<HolderIdentity>,
}

impl TreeBuilder<'_> {
    fn visit(
        &mut self,
        holder: &dyn ParameterHolder,
        key: String,
        metadata: HolderMetadata,
        hidden: bool,
        ui_order: i32,
        parent: Option<usize>,
    ) -> Result<(), ParameterError> {
        let identity = HolderIdentity::of(holder);
        if self.ancestors.contains(&identity) {
            return Err(ParameterError::CyclicParameterGraph { key });
        }

        let shape = holder.shape();
        let hidden = hidden || self.options.hides(&key);
        let index = self.tree.nodes.len();
        self.tree.nodes.push(ParameterTreeNode {
            key: key.clone(),
            metadata,
            hidden,
            ui_order,
            allowed_types: match &shape {
                ParameterShape::Dynamic { allowed_types, .. } => Some(allowed_types.clone()),
                ParameterShape::Fixed(_) => None,
            },
            parent,
            children: Vec::new(),
            parameters: Vec::new(),
        });
        self.tree.node_index.insert(key.clone(), index);
        if let Some(parent) = parent {
            self.tree.nodes[parent].children.push(index);
        }

        let mut local_keys = AHashSet::new();
        for declaration in shape.declarations() {
            let leaf_key = claim_key(&mut local_keys, &key, &declaration.key)?;
            let value = holder.get_parameter(&declaration.key)?;
            let leaf_hidden = hidden || declaration.hidden || self.options.hides(&leaf_key);
            let leaf = self.tree.leaves.len();
            self.tree.leaf_index.insert(leaf_key.clone(), leaf);
            self.tree.leaves.push(ParameterAccess::new(
                leaf_key,
                declaration.clone(),
                leaf_hidden,
                value,
            ));
            self.tree.nodes[index].parameters.push(leaf);
        }

        self.ancestors.push(identity);
        for sub in holder.sub_holders() {
            let child_key = claim_key(&mut local_keys, &key, &sub.key)?;
            self.visit(
                sub.holder,
                child_key,
                sub.metadata,
                hidden || sub.hidden,
                sub.ui_order,
                Some(index),
            )?;
        }
        self.ancestors.pop();
        Ok(())
    }
}

/// Leaves and sub-holders of one holder share a namespace.
fn claim_key(
    taken: &mut AHashSet<String>,
    parent: &str,
    local: &str,
) -> Result<String, ParameterError> {
    let key = join_key(parent, local);
    if !is_valid_slot_name(local) {
        return Err(ParameterError::InvalidName { key });
    }
    if !taken.insert(local.to_string()) {
        return Err(ParameterError::DuplicateName { key });
    }
    Ok(key)
}

impl ParameterTree {
    pub fn build(root: &dyn ParameterHolder) -> Result<Self, ParameterError> {
        Self::build_with(root, &TreeOptions::default())
    }

    pub fn build_with(
        root: &dyn ParameterHolder,
        options: &TreeOptions,
    ) -> Result<Self, ParameterError> {
        let mut builder = TreeBuilder {
            tree: ParameterTree {
                nodes: Vec::new(),
                leaves: Vec::new(),
                node_index: AHashMap::new(),
                leaf_index: AHashMap::new(),
            },
            options,
            ancestors: Vec::new(),
        };
        builder.visit(root, String::new(), root.metadata(), false, 0, None)?;
        let tree = builder.tree;
        debug!(
            "Built parameter tree with {} holder(s) and {} parameter(s)",
            tree.nodes.len(),
            tree.leaves.len()
        );
        Ok(tree)
    }

    pub fn root(&self) -> &ParameterTreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, key: &str) -> Option<&ParameterTreeNode> {
        self.node_index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn parent(&self, node: &ParameterTreeNode) -> Option<&ParameterTreeNode> {
        node.parent.map(|i| &self.nodes[i])
    }

    /// Child holders in declaration order.
    pub fn children<'a>(
        &'a self,
        node: &'a ParameterTreeNode,
    ) -> impl Iterator<Item = &'a ParameterTreeNode> + 'a {
        node.children.iter().map(move |&i| &self.nodes[i])
    }

    /// Leaves of one holder in declaration order.
    pub fn parameters<'a>(
        &'a self,
        node: &'a ParameterTreeNode,
    ) -> impl Iterator<Item = &'a ParameterAccess> + 'a {
        node.parameters.iter().map(move |&i| &self.leaves[i])
    }

    pub fn access(&self, key: &str) -> Option<&ParameterAccess> {
        self.leaf_index.get(key).map(|&i| &self.leaves[i])
    }

    /// Every leaf in canonical (depth-first, declaration) order.
    pub fn leaves(&self) -> impl Iterator<Item = &ParameterAccess> {
        self.leaves.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.leaves.iter().map(ParameterAccess::key)
    }

    /// Leaves that are not flagged hidden, in canonical order.
    pub fn visible_leaves(&self) -> impl Iterator<Item = &ParameterAccess> {
        self.leaves.iter().filter(|leaf| !leaf.is_hidden())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ParameterTreeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaves of a holder ordered for presentation: pinned first, then by UI order, then
    /// by name. The canonical order returned by [`parameters`](Self::parameters) is unaffected.
    pub fn display_order(&self, node_key: &str) -> Vec<&ParameterAccess> {
        let Some(node) = self.node(node_key) else {
            return Vec::new();
        };
        self.parameters(node)
            .sorted_by(|a, b| {
                b.is_pinned()
                    .cmp(&a.is_pinned())
                    .then(a.ui_order().cmp(&b.ui_order()))
                    .then_with(|| a.name().cmp(b.name()))
            })
            .collect()
    }

    /// Child holders ordered for presentation by UI order, then by name.
    pub fn display_children(&self, node_key: &str) -> Vec<&ParameterTreeNode> {
        let Some(node) = self.node(node_key) else {
            return Vec::new();
        };
        self.children(node)
            .sorted_by(|a, b| {
                a.ui_order()
                    .cmp(&b.ui_order())
                    .then_with(|| a.name().cmp(b.name()))
            })
            .collect()
    }

    /// Leaves whose key, name or description contains `text`, ignoring case.
    pub fn search(&self, text: &str) -> Vec<&ParameterAccess> {
        let needle = text.to_lowercase();
        self.leaves
            .iter()
            .filter(|leaf| {
                [leaf.key(), leaf.name(), leaf.description()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Re-reads every leaf value from `root`. Returns the keys whose value changed.
    ///
    /// Fails with `NotFound` when the holder's structure no longer matches the tree; the
    /// caller should rebuild in that case.
    pub fn refresh(&mut self, root: &dyn ParameterHolder) -> Result<Vec<String>, ParameterError> {
        let mut changed = Vec::new();
        for leaf in &mut self.leaves {
            if leaf.refresh(root)? {
                changed.push(leaf.key().to_string());
            }
        }
        trace!("Refreshed parameter tree, {} value(s) changed", changed.len());
        Ok(changed)
    }

    /// Writes one leaf through to its holder and updates the cached value.
    pub fn set(
        &mut self,
        root: &mut dyn ParameterHolder,
        key: &str,
        value: impl Into<ParameterValue>,
    ) -> Result<(), ParameterError> {
        let index = *self
            .leaf_index
            .get(key)
            .ok_or_else(|| ParameterError::NotFound {
                key: key.to_string(),
            })?;
        self.leaves[index].set(root, value)
    }

    /// Current values of every leaf, keyed by path-qualified key.
    pub fn snapshot(
        &self,
        root: &dyn ParameterHolder,
    ) -> Result<BTreeMap<String, ParameterValue>, ParameterError> {
        self.leaves
            .iter()
            .map(|leaf| Ok((leaf.key().to_string(), leaf.get(root)?)))
            .collect()
    }

    /// Writes every known key of `values` back to the holders.
    ///
    /// All values are checked before the first write, so a type or read-only failure leaves
    /// every holder untouched. Returns the keys that do not exist in this tree.
    pub fn apply_snapshot(
        &mut self,
        root: &mut dyn ParameterHolder,
        values: &BTreeMap<String, ParameterValue>,
    ) -> Result<Vec<String>, ParameterError> {
        let mut unknown = Vec::new();
        let mut pending = Vec::new();
        for (key, value) in values {
            let Some(&index) = self.leaf_index.get(key.as_str()) else {
                unknown.push(key.clone());
                continue;
            };
            let (path, local) = split_key(key);
            let holder = find_holder(&*root, path, key)?;
            pending.push((index, check_value(holder, local, key, value.clone())?));
        }

        for (index, value) in pending {
            self.leaves[index].set(root, value)?;
        }
        if !unknown.is_empty() {
            debug!("Snapshot contained {} unknown key(s)", unknown.len());
        }
        Ok(unknown)
    }
}
