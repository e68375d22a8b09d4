//! Plain-text renderings of graphs and parameter trees.
//!
//! Both wrappers implement [`fmt::Display`] and draw their contents as an indented tree:
//!
//! ```text
//! Blur
//! ├── Name = "Blur"
//! ├── Description = ""
//! └── Parameters
//!     └── Sigma = 1.5
//! ```

use crate::graph::{Graph, GraphNode, NodeId, SlotRef};
use crate::parameter::{ParameterAccess, ParameterTree, ParameterTreeNode};
use crate::slot::SlotDirection;
use std::fmt;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

fn connector(last: bool) -> &'static str {
    if last { LAST_BRANCH } else { BRANCH }
}

fn indent(prefix: &str, last: bool) -> String {
    format!("{}{}", prefix, if last { SPACE } else { PIPE })
}

/// Renders a [`ParameterTree`] in presentation order.
pub struct DisplayParameterTree<'a> {
    tree: &'a ParameterTree,
    show_hidden: bool,
}

impl<'a> DisplayParameterTree<'a> {
    pub fn new(tree: &'a ParameterTree) -> Self {
        Self {
            tree,
            show_hidden: false,
        }
    }

    /// Also lists hidden holders and parameters, marked with `(hidden)`.
    pub fn show_hidden(mut self, show: bool) -> Self {
        self.show_hidden = show;
        self
    }

    fn write_holder(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: &ParameterTreeNode,
        prefix: &str,
    ) -> fmt::Result {
        enum Item<'t> {
            Leaf(&'t ParameterAccess),
            Holder(&'t ParameterTreeNode),
        }

        let visible = |hidden: bool| self.show_hidden || !hidden;
        let leaves = self
            .tree
            .display_order(node.key())
            .into_iter()
            .filter(|leaf| visible(leaf.is_hidden()))
            .map(Item::Leaf);
        let holders = self
            .tree
            .display_children(node.key())
            .into_iter()
            .filter(|child| visible(child.is_hidden()))
            .map(Item::Holder);
        let items: Vec<Item> = leaves.chain(holders).collect();

        for (i, item) in items.iter().enumerate() {
            let last = i + 1 == items.len();
            match item {
                Item::Leaf(leaf) => {
                    write!(f, "{}{}{} = {}", prefix, connector(last), leaf.name(), leaf.value())?;
                    self.write_hidden_marker(f, leaf.is_hidden())?;
                    writeln!(f)?;
                }
                Item::Holder(child) => {
                    write!(f, "{}{}{}", prefix, connector(last), child.name())?;
                    self.write_hidden_marker(f, child.is_hidden())?;
                    writeln!(f)?;
                    self.write_holder(f, child, &indent(prefix, last))?;
                }
            }
        }
        Ok(())
    }

    fn write_hidden_marker(&self, f: &mut fmt::Formatter<'_>, hidden: bool) -> fmt::Result {
        if hidden && self.show_hidden {
            f.write_str(" (hidden)")?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayParameterTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.tree.root();
        let title = if root.name().is_empty() {
            "Parameters"
        } else {
            root.name()
        };
        writeln!(f, "{}", title)?;
        self.write_holder(f, root, "")
    }
}

/// Renders the nodes of a [`Graph`] with their slots and resolved types, followed by
/// the edge list.
pub struct DisplayGraph<'a> {
    graph: &'a Graph,
    only: Option<NodeId>,
}

impl<'a> DisplayGraph<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph, only: None }
    }

    /// Restricts the output to one node and its edges.
    pub fn only(mut self, node: NodeId) -> Self {
        self.only = Some(node);
        self
    }

    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: &GraphNode,
        prefix: &str,
    ) -> fmt::Result {
        let resolved = self.graph.resolved_output_types(node.id()).unwrap_or_default();
        let slots = node.slots();
        let count = slots.slots(SlotDirection::Input).len() + resolved.len();
        let mut written = 0;

        for entry in slots.slots(SlotDirection::Input) {
            written += 1;
            let definition = entry.definition();
            write!(
                f,
                "{}{}input {}: {}",
                prefix,
                connector(written == count),
                entry.name(),
                definition.data_type()
            )?;
            if definition.is_optional() {
                f.write_str(" (optional)")?;
            }
            if let Some(edge) = self
                .graph
                .source_of(&SlotRef::new(node.id(), entry.name()))
            {
                write!(f, " <- {}", edge.source)?;
            }
            writeln!(f)?;
        }

        for (name, data_type) in &resolved {
            written += 1;
            write!(
                f,
                "{}{}output {}: {}",
                prefix,
                connector(written == count),
                name,
                data_type
            )?;
            if let Some(declared) = slots.get(SlotDirection::Output, name) {
                if declared.data_type() != data_type {
                    write!(f, " (declared {})", declared.data_type())?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<&GraphNode> = self
            .graph
            .nodes()
            .filter(|node| self.only.is_none_or(|only| node.id() == only))
            .collect();
        let edges = match self.only {
            Some(id) => self.graph.edges_of(id),
            None => self.graph.edges(),
        };
        writeln!(
            f,
            "Pipeline ({} node(s), {} edge(s))",
            nodes.len(),
            edges.len()
        )?;

        for (i, node) in nodes.iter().enumerate() {
            let last = edges.is_empty() && i + 1 == nodes.len();
            writeln!(f, "{}[{}] {}", connector(last), node.id(), node.name())?;
            self.write_node(f, node, &indent("", last))?;
        }

        if !edges.is_empty() {
            writeln!(f, "{}Edges", LAST_BRANCH)?;
            for (i, edge) in edges.iter().enumerate() {
                writeln!(f, "{}{}{}", SPACE, connector(i + 1 == edges.len()), edge)?;
            }
        }
        Ok(())
    }
}
