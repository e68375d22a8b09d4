//! Common test utilities for building registries, graphs and parameter holders.
use kairo::prelude::*;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Registry used by most tests.
///
/// `label-image` and `mask` are both images. `table` converts into `text` explicitly and
/// `internal` is hidden from type pickers.
#[allow(dead_code)]
pub fn create_registry() -> DataTypeRegistry {
    DataTypeRegistry::builder()
        .with_type(DataTypeInfo::new("image", "Image").with_storage_class("image"))
        .with_type(
            DataTypeInfo::new("label-image", "Label Image")
                .with_storage_class("image")
                .with_parent("image"),
        )
        .with_type(
            DataTypeInfo::new("mask", "Mask")
                .with_storage_class("image")
                .with_parent("image"),
        )
        .with_type(DataTypeInfo::new("table", "Table").with_storage_class("table"))
        .with_type(DataTypeInfo::new("text", "Text").with_storage_class("file"))
        .with_type(DataTypeInfo::new("internal", "Internal").hidden())
        .with_conversion("table", "text")
        .build()
        .expect("test registry is valid")
}

#[allow(dead_code)]
pub fn create_graph() -> Graph {
    Graph::new(Arc::new(create_registry()))
}

/// A node with one output named `Output`.
#[allow(dead_code)]
pub fn source_node(name: &str, data_type: &str) -> GraphNode {
    GraphNode::new(
        name,
        SlotConfiguration::builder()
            .output("Output", SlotDefinition::output(data_type))
            .build()
            .expect("valid source slots"),
    )
}

/// A node with one input named `Input`.
#[allow(dead_code)]
pub fn sink_node(name: &str, data_type: &str) -> GraphNode {
    GraphNode::new(
        name,
        SlotConfiguration::builder()
            .input("Input", SlotDefinition::input(data_type))
            .build()
            .expect("valid sink slots"),
    )
}

/// The enhancer: takes any image and declares that it produces a label image.
///
/// `Output` inherits from `Input` and replaces an inherited `image` with `label-image`.
#[allow(dead_code)]
pub fn enhancer_node() -> GraphNode {
    GraphNode::new(
        "Enhancer",
        SlotConfiguration::builder()
            .input("Input", SlotDefinition::input("image"))
            .output(
                "Output",
                SlotDefinition::output("image")
                    .inherits_from("Input")
                    .with_conversion("image", "label-image"),
            )
            .build()
            .expect("valid enhancer slots"),
    )
}

/// Records every event delivered to the returned callback.
#[allow(dead_code)]
pub fn recorder<E: Clone + 'static>() -> (Rc<RefCell<Vec<E>>>, impl FnMut(&E) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |event: &E| sink.borrow_mut().push(event.clone()))
}

/// A hand-written holder with fixed leaves and two dynamic sub-collections.
#[allow(dead_code)]
pub struct BlurSettings {
    pub sigma: f64,
    pub iterations: i64,
    pub label: String,
    pub extra: DynamicParameterCollection,
    pub advanced: DynamicParameterCollection,
}

#[allow(dead_code)]
impl BlurSettings {
    pub fn new() -> Self {
        Self {
            sigma: 1.5,
            iterations: 2,
            label: "blur".to_string(),
            extra: DynamicParameterCollection::new()
                .with_metadata(HolderMetadata::new("Extra"))
                .with_entry("radius", 3_i64)
                .expect("valid entry"),
            advanced: DynamicParameterCollection::new()
                .with_metadata(HolderMetadata::new("Advanced"))
                .with_entry("radius", 0.25)
                .expect("valid entry"),
        }
    }
}

impl ParameterHolder for BlurSettings {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn metadata(&self) -> HolderMetadata {
        HolderMetadata::new("Blur").with_description("Gaussian blur settings")
    }

    fn shape(&self) -> ParameterShape {
        ParameterShape::Fixed(vec![
            ParameterDeclaration::new("sigma", ParameterType::Number)
                .with_name("Sigma")
                .with_description("Standard deviation of the kernel")
                .ui_order(1),
            ParameterDeclaration::new("iterations", ParameterType::Integer)
                .with_name("Iterations")
                .pinned(),
            ParameterDeclaration::new("label", ParameterType::Text)
                .with_name("Label")
                .hidden(),
        ])
    }

    fn get_parameter(&self, key: &str) -> Result<ParameterValue, ParameterError> {
        match key {
            "sigma" => Ok(self.sigma.into()),
            "iterations" => Ok(self.iterations.into()),
            "label" => Ok(self.label.as_str().into()),
            _ => Err(ParameterError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    fn set_parameter(&mut self, key: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match (key, value) {
            ("sigma", ParameterValue::Number(v)) => self.sigma = v,
            ("iterations", ParameterValue::Integer(v)) => self.iterations = v,
            ("label", ParameterValue::Text(v)) => self.label = v,
            _ => {
                return Err(ParameterError::NotFound {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    fn sub_holders(&self) -> Vec<SubHolder<'_>> {
        vec![
            SubHolder::new("extra", &self.extra),
            SubHolder::new("advanced", &self.advanced).hidden().ui_order(-1),
        ]
    }

    fn sub_holder_mut(&mut self, key: &str) -> Option<&mut dyn ParameterHolder> {
        match key {
            "extra" => Some(&mut self.extra),
            "advanced" => Some(&mut self.advanced),
            _ => None,
        }
    }
}
