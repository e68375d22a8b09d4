use super::{Edge, Endpoint, Graph, NodeId};
use crate::slot::SlotDirection;
use crate::types::DataTypeId;
use std::fmt;

/// A problem found by [`Graph::validate`]. None of these block editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A required input has no incoming edge.
    UnconnectedInput { node: NodeId, slot: String },
    /// An edge whose source no longer resolves to a type the target accepts, usually after
    /// an upstream slot or conversion was edited.
    IncompatibleEdge {
        edge: Edge,
        source_type: DataTypeId,
        target_type: DataTypeId,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnconnectedInput { node, slot } => {
                write!(f, "Required input '{}' of node {} is not connected", slot, node)
            }
            ValidationIssue::IncompatibleEdge {
                edge,
                source_type,
                target_type,
            } => write!(
                f,
                "Edge {} carries '{}' into a slot accepting '{}'",
                edge, source_type, target_type
            ),
        }
    }
}

impl Graph {
    /// Checks the whole graph. Issues are reported node by node in insertion order,
    /// followed by edge issues in edge order.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for node in self.nodes() {
            for entry in node.slots().slots(SlotDirection::Input) {
                if entry.definition().is_optional() {
                    continue;
                }
                let endpoint = Endpoint {
                    node: node.id(),
                    slot: entry.id(),
                };
                if self.incoming(endpoint).is_none() {
                    issues.push(ValidationIssue::UnconnectedInput {
                        node: node.id(),
                        slot: entry.name().to_string(),
                    });
                }
            }
        }

        for record in &self.edges {
            if self.is_compatible_record(record) {
                continue;
            }
            if let Some(edge) = self.edge_view(record) {
                issues.push(ValidationIssue::IncompatibleEdge {
                    edge,
                    source_type: self.resolve_endpoint(record.source),
                    target_type: self.declared_type(record.target),
                });
            }
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
