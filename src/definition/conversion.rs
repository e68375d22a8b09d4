use super::definition::PipelineDefinition;
use crate::error::DefinitionError;

/// A trait for custom data models that can be converted into a `PipelineDefinition`.
///
/// This is the extension point for loading pipelines from any format. Implement it on your
/// own configuration structs to translate them into the canonical definition, which can
/// then be built into a [`Graph`](crate::graph::Graph).
///
/// # Example
///
/// ```rust,no_run
/// use kairo::prelude::*;
/// use kairo::error::DefinitionError;
///
/// struct MyStep { id: String, image_type: String }
/// struct MyWorkflow { steps: Vec<MyStep> }
///
/// impl IntoPipeline for MyWorkflow {
///     fn into_pipeline(self) -> std::result::Result<PipelineDefinition, DefinitionError> {
///         let mut nodes = Vec::new();
///         for step in self.steps {
///             let mut node = NodeDefinition::new(step.id);
///             node.inputs.push(SlotSpec::new("Input", step.image_type.as_str()));
///             nodes.push(node);
///         }
///         Ok(PipelineDefinition {
///             nodes,
///             ..Default::default()
///         })
///     }
/// }
/// ```
pub trait IntoPipeline {
    /// Consumes the object and converts it into a pipeline definition.
    fn into_pipeline(self) -> Result<PipelineDefinition, DefinitionError>;
}

impl IntoPipeline for PipelineDefinition {
    fn into_pipeline(self) -> Result<PipelineDefinition, DefinitionError> {
        Ok(self)
    }
}

/// JSON text in the layout of [`PipelineDefinition`].
impl IntoPipeline for &str {
    fn into_pipeline(self) -> Result<PipelineDefinition, DefinitionError> {
        serde_json::from_str(self).map_err(|e| DefinitionError::JsonParseError(e.to_string()))
    }
}
