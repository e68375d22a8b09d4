//! Tests for graph connectivity, type resolution and graph-level slot editing
mod common;
use common::*;
use kairo::error::ErrorKind;
use kairo::prelude::*;

fn slot(node: NodeId, name: &str) -> SlotRef {
    SlotRef::new(node, name)
}

#[cfg(test)]
mod connect_tests {
    use super::*;

    #[test]
    fn test_connect_checks_type_compatibility() {
        let mut graph = create_graph();
        let mask = graph.add_node(source_node("Mask", "mask")).unwrap();
        let label = graph.add_node(source_node("Labels", "label-image")).unwrap();
        let wants_labels = graph.add_node(sink_node("Count", "label-image")).unwrap();
        let wants_image = graph.add_node(sink_node("Show", "image")).unwrap();

        let err = graph
            .connect(slot(mask, "Output"), slot(wants_labels, "Input"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::IncompatibleTypes {
                source_type: "mask".into(),
                target_type: "label-image".into(),
            }
        );
        assert_eq!(err.kind(), ErrorKind::IncompatibleTypes);

        graph
            .connect(slot(label, "Output"), slot(wants_labels, "Input"))
            .unwrap();
        graph
            .connect(slot(label, "Output"), slot(wants_image, "Input"))
            .unwrap();
        assert_eq!(graph.targets_of(&slot(label, "Output")).len(), 2);
    }

    #[test]
    fn test_explicit_conversion_allows_connection() {
        let mut graph = create_graph();
        let table = graph.add_node(source_node("Measure", "table")).unwrap();
        let text = graph.add_node(sink_node("Export", "text")).unwrap();

        let edge = graph
            .connect(slot(table, "Output"), slot(text, "Input"))
            .unwrap();
        assert_eq!(edge.to_string(), format!("{}.Output -> {}.Input", table, text));
    }

    #[test]
    fn test_input_accepts_one_edge() {
        let mut graph = create_graph();
        let a = graph.add_node(source_node("A", "image")).unwrap();
        let b = graph.add_node(source_node("B", "image")).unwrap();
        let sink = graph.add_node(sink_node("Sink", "image")).unwrap();

        graph.connect(slot(a, "Output"), slot(sink, "Input")).unwrap();
        let err = graph
            .connect(slot(b, "Output"), slot(sink, "Input"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SlotOccupied);
        assert_eq!(graph.source_of(&slot(sink, "Input")).unwrap().source, slot(a, "Output"));
    }

    #[test]
    fn test_connect_rejects_cycles() {
        let mut graph = create_graph();
        let first = graph.add_node(enhancer_node()).unwrap();
        let second = graph.add_node(enhancer_node()).unwrap();

        graph
            .connect(slot(first, "Output"), slot(second, "Input"))
            .unwrap();
        assert!(matches!(
            graph.connect(slot(second, "Output"), slot(first, "Input")),
            Err(GraphError::WouldCreateCycle { .. })
        ));
        assert!(matches!(
            graph.connect(slot(first, "Output"), slot(first, "Input")),
            Err(GraphError::WouldCreateCycle { .. })
        ));
    }

    #[test]
    fn test_connect_reports_missing_endpoints() {
        let mut graph = create_graph();
        let a = graph.add_node(source_node("A", "image")).unwrap();
        let b = graph.add_node(sink_node("B", "image")).unwrap();

        let err = graph
            .connect(slot(a, "Nope"), slot(b, "Input"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // An input is not an output.
        assert!(matches!(
            graph.connect(slot(b, "Input"), slot(a, "Output")),
            Err(GraphError::SlotNotFound { .. })
        ));
        assert_eq!(
            graph.connect(slot(a, "Output"), slot(NodeId::new(99), "Input")),
            Err(GraphError::NodeNotFound(NodeId::new(99)))
        );
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut graph = create_graph();
        let a = graph.add_node(source_node("A", "image")).unwrap();
        let b = graph.add_node(sink_node("B", "image")).unwrap();
        graph.connect(slot(a, "Output"), slot(b, "Input")).unwrap();

        let (seen, callback) = recorder::<GraphEvent>();
        let _sub = graph.subscribe(callback);

        assert!(graph.disconnect(&slot(b, "Input")).is_some());
        assert_eq!(seen.borrow().len(), 1);
        assert!(graph.disconnect(&slot(b, "Input")).is_none());
        assert!(graph.disconnect(&slot(NodeId::new(42), "Input")).is_none());
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_unknown_slot_types_are_rejected() {
        let mut graph = create_graph();
        assert_eq!(
            graph.add_node(sink_node("Odd", "volume")),
            Err(GraphError::UnknownDataType("volume".into()))
        );
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_topological_order_follows_edges() {
        let mut graph = create_graph();
        let sink = graph.add_node(sink_node("Sink", "image")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let source = graph.add_node(source_node("Source", "image")).unwrap();
        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();
        graph
            .connect(slot(enhancer, "Output"), slot(sink, "Input"))
            .unwrap();

        assert_eq!(graph.topological_order(), vec![source, enhancer, sink]);
    }
}

#[cfg(test)]
mod resolve_tests {
    use super::*;

    #[test]
    fn test_enhancer_turns_image_into_label_image() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "image")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let count = graph.add_node(sink_node("Count", "label-image")).unwrap();

        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();
        assert_eq!(
            graph.resolve_output_type(&slot(enhancer, "Output")).unwrap(),
            DataTypeId::new("label-image")
        );
        graph
            .connect(slot(enhancer, "Output"), slot(count, "Input"))
            .unwrap();
        assert!(graph.is_valid());
    }

    #[test]
    fn test_inheritance_without_matching_conversion_passes_type_through() {
        let mut graph = create_graph();
        let mask = graph.add_node(source_node("Mask", "mask")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let count = graph.add_node(sink_node("Count", "label-image")).unwrap();

        graph
            .connect(slot(mask, "Output"), slot(enhancer, "Input"))
            .unwrap();
        assert_eq!(
            graph.resolve_output_type(&slot(enhancer, "Output")).unwrap(),
            DataTypeId::new("mask")
        );
        assert_eq!(
            graph
                .connect(slot(enhancer, "Output"), slot(count, "Input"))
                .unwrap_err()
                .kind(),
            ErrorKind::IncompatibleTypes
        );
    }

    #[test]
    fn test_unconnected_inheriting_output_uses_input_declaration() {
        let mut graph = create_graph();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        // Declared input type "image" goes through the image -> label-image override.
        assert_eq!(
            graph.resolve_output_type(&slot(enhancer, "Output")).unwrap(),
            DataTypeId::new("label-image")
        );
        assert_eq!(
            graph.incoming_type(&slot(enhancer, "Input")).unwrap(),
            DataTypeId::new("image")
        );
    }

    #[test]
    fn test_wildcard_inherits_first_connected_input() {
        let mut graph = create_graph();
        let merge = graph
            .add_node(GraphNode::new(
                "Merge",
                SlotConfiguration::builder()
                    .input("I1", SlotDefinition::input("mask"))
                    .input("I2", SlotDefinition::input("table"))
                    .output(
                        "Out",
                        SlotDefinition::output("image").inherits_from_first_connected(),
                    )
                    .build()
                    .unwrap(),
            ))
            .unwrap();
        assert_eq!(
            graph.resolve_output_type(&slot(merge, "Out")).unwrap(),
            DataTypeId::new("mask")
        );

        let table = graph.add_node(source_node("Measure", "table")).unwrap();
        graph
            .connect(slot(table, "Output"), slot(merge, "I2"))
            .unwrap();
        assert_eq!(
            graph.resolve_output_type(&slot(merge, "Out")).unwrap(),
            DataTypeId::new("table")
        );

        graph.disconnect(&slot(merge, "I2"));
        assert_eq!(
            graph.resolve_output_type(&slot(merge, "Out")).unwrap(),
            DataTypeId::new("mask")
        );
    }

    #[test]
    fn test_conversion_override_replaces_inherited_type() {
        let mut graph = create_graph();
        let table = graph.add_node(source_node("Measure", "table")).unwrap();
        let export = graph
            .add_node(GraphNode::new(
                "Export",
                SlotConfiguration::builder()
                    .input("Data", SlotDefinition::input("table"))
                    .output(
                        "File",
                        SlotDefinition::output("table")
                            .inherits_from("Data")
                            .with_conversion("table", "text"),
                    )
                    .build()
                    .unwrap(),
            ))
            .unwrap();
        graph
            .connect(slot(table, "Output"), slot(export, "Data"))
            .unwrap();

        assert_eq!(
            graph.resolved_output_types(export).unwrap(),
            vec![("File".to_string(), DataTypeId::new("text"))]
        );

        assert!(graph
            .remove_inheritance_conversion(export, "File", &"table".into())
            .unwrap());
        assert_eq!(
            graph.resolve_output_type(&slot(export, "File")).unwrap(),
            DataTypeId::new("table")
        );
    }

    #[test]
    fn test_types_propagate_through_chains() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "label-image")).unwrap();
        let boundary = graph
            .add_node(GraphNode::new(
                "Boundary",
                SlotConfiguration::builder()
                    .passthrough()
                    .input("Image", SlotDefinition::input("image"))
                    .build()
                    .unwrap(),
            ))
            .unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();

        graph
            .connect(slot(source, "Output"), slot(boundary, "Image"))
            .unwrap();
        graph
            .connect(slot(boundary, "Image"), slot(enhancer, "Input"))
            .unwrap();

        assert_eq!(
            graph.resolve_output_type(&slot(boundary, "Image")).unwrap(),
            DataTypeId::new("label-image")
        );
        // label-image has no override on the enhancer, so it passes through unchanged.
        assert_eq!(
            graph.resolve_output_type(&slot(enhancer, "Output")).unwrap(),
            DataTypeId::new("label-image")
        );
    }

    #[test]
    fn test_connect_announces_resolved_type_changes() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "mask")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let (seen, callback) = recorder::<GraphEvent>();
        let _sub = graph.subscribe_kind(ChangeKind::Value, callback);

        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![GraphEvent::ResolvedTypesChanged {
                nodes: vec![enhancer]
            }]
        );
    }
}

#[cfg(test)]
mod edit_tests {
    use super::*;

    #[test]
    fn test_rename_and_move_keep_edges() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "image")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        graph
            .add_slot(enhancer, "Extra", SlotDefinition::input("mask").optional())
            .unwrap();
        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();

        graph
            .rename_slot(enhancer, SlotDirection::Input, "Input", "Raw")
            .unwrap();
        graph
            .move_slot(enhancer, SlotDirection::Input, "Raw", 1)
            .unwrap();

        let edge = graph.source_of(&slot(enhancer, "Raw")).unwrap();
        assert_eq!(edge.source, slot(source, "Output"));
        assert_eq!(
            graph.resolve_output_type(&slot(enhancer, "Output")).unwrap(),
            DataTypeId::new("label-image")
        );
    }

    #[test]
    fn test_remove_slot_drops_its_edges() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "image")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let sink = graph.add_node(sink_node("Show", "image")).unwrap();
        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();
        graph
            .connect(slot(enhancer, "Output"), slot(sink, "Input"))
            .unwrap();

        let dropped = graph
            .remove_slot(enhancer, SlotDirection::Output, "Output")
            .unwrap();
        assert_eq!(
            dropped,
            vec![Edge {
                source: slot(enhancer, "Output"),
                target: slot(sink, "Input"),
            }]
        );
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_replace_slot_keeps_compatible_edges_only() {
        let mut graph = create_graph();
        let image = graph.add_node(source_node("Image", "image")).unwrap();
        let mask = graph.add_node(source_node("Mask", "mask")).unwrap();
        let target = graph
            .add_node(GraphNode::new(
                "Target",
                SlotConfiguration::builder()
                    .input("A", SlotDefinition::input("image"))
                    .input("B", SlotDefinition::input("image"))
                    .build()
                    .unwrap(),
            ))
            .unwrap();
        graph.connect(slot(image, "Output"), slot(target, "A")).unwrap();
        graph.connect(slot(mask, "Output"), slot(target, "B")).unwrap();

        let first = graph
            .replace_slot(target, SlotDirection::Input, "A", SlotDefinition::input("mask"))
            .unwrap();
        assert!(first.restored.is_empty());
        assert_eq!(first.dropped.len(), 1);
        assert_eq!(first.dropped[0].source, slot(image, "Output"));

        let second = graph
            .replace_slot(
                target,
                SlotDirection::Input,
                "B",
                SlotDefinition::input("mask").named("Mask"),
            )
            .unwrap();
        assert!(second.dropped.is_empty());
        assert_eq!(second.restored[0].target, slot(target, "Mask"));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.validate(),
            vec![ValidationIssue::UnconnectedInput {
                node: target,
                slot: "A".to_string(),
            }]
        );
    }

    #[test]
    fn test_replacing_an_inherited_input_keeps_the_resolved_type() {
        let mut graph = create_graph();
        let mask = graph.add_node(source_node("Mask", "mask")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        graph
            .connect(slot(mask, "Output"), slot(enhancer, "Input"))
            .unwrap();
        let before = graph.resolve_output_type(&slot(enhancer, "Output")).unwrap();

        let outcome = graph
            .replace_slot(
                enhancer,
                SlotDirection::Input,
                "Input",
                SlotDefinition::input("image").named("Source"),
            )
            .unwrap();

        assert_eq!(outcome.restored.len(), 1);
        assert_eq!(before, DataTypeId::new("mask"));
        assert_eq!(
            graph.resolve_output_type(&slot(enhancer, "Output")).unwrap(),
            before
        );
        let node = graph.node(enhancer).unwrap();
        assert_eq!(
            node.slots()
                .get(SlotDirection::Output, "Output")
                .unwrap()
                .inherited_slot(),
            &InheritedSlot::Named("Source".into())
        );
    }

    #[test]
    fn test_remove_node_drops_attached_edges() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "image")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let sink = graph.add_node(sink_node("Show", "image")).unwrap();
        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();
        graph
            .connect(slot(enhancer, "Output"), slot(sink, "Input"))
            .unwrap();

        let (node, dropped) = graph.remove_node(enhancer).unwrap();
        assert_eq!(node.name(), "Enhancer");
        assert_eq!(dropped.len(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains_node(enhancer));
        assert_eq!(graph.remove_node(enhancer).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_add_slot_requires_registered_type() {
        let mut graph = create_graph();
        let node = graph.add_node(sink_node("Sink", "image")).unwrap();
        assert_eq!(
            graph.add_slot(node, "Other", SlotDefinition::input("volume")),
            Err(GraphError::UnknownDataType("volume".into()))
        );
        assert_eq!(
            graph
                .add_slot(node, "Input", SlotDefinition::input("mask"))
                .unwrap_err()
                .kind(),
            ErrorKind::DuplicateName
        );
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_optional_inputs_may_stay_unconnected() {
        let mut graph = create_graph();
        graph
            .add_node(GraphNode::new(
                "Node",
                SlotConfiguration::builder()
                    .input("Required", SlotDefinition::input("image"))
                    .input("Extra", SlotDefinition::input("image").optional())
                    .build()
                    .unwrap(),
            ))
            .unwrap();

        let issues = graph.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("'Required'"));
    }

    #[test]
    fn test_upstream_edit_surfaces_incompatible_edge() {
        let mut graph = create_graph();
        let source = graph.add_node(source_node("Load", "image")).unwrap();
        let enhancer = graph.add_node(enhancer_node()).unwrap();
        let count = graph.add_node(sink_node("Count", "label-image")).unwrap();
        graph
            .connect(slot(source, "Output"), slot(enhancer, "Input"))
            .unwrap();
        graph
            .connect(slot(enhancer, "Output"), slot(count, "Input"))
            .unwrap();

        graph
            .remove_inheritance_conversion(enhancer, "Output", &"image".into())
            .unwrap();

        assert_eq!(
            graph.validate(),
            vec![ValidationIssue::IncompatibleEdge {
                edge: Edge {
                    source: slot(enhancer, "Output"),
                    target: slot(count, "Input"),
                },
                source_type: "image".into(),
                target_type: "label-image".into(),
            }]
        );
    }
}

#[cfg(test)]
mod node_tests {
    use super::*;

    #[test]
    fn test_name_parameter_renames_node() {
        let mut graph = create_graph();
        let node = graph.add_node(enhancer_node()).unwrap();
        let (seen, callback) = recorder::<GraphEvent>();
        let _sub = graph.subscribe(callback);

        graph.set_parameter(node, "name", "Sharpen").unwrap();
        graph.set_parameter(node, "name", "Sharpen").unwrap();

        assert_eq!(graph.node(node).unwrap().name(), "Sharpen");
        assert_eq!(
            *seen.borrow(),
            vec![
                GraphEvent::NodeRenamed {
                    node,
                    name: "Sharpen".into()
                },
                GraphEvent::ParameterChanged {
                    node,
                    key: "name".into()
                },
            ]
        );
        assert!(graph.find_node("Sharpen").is_some());
    }

    #[test]
    fn test_node_parameters_are_reachable_by_key() {
        let mut graph = create_graph();
        let node = graph
            .add_node(enhancer_node().with_parameters(BlurSettings::new()))
            .unwrap();

        graph.set_parameter(node, "parameters/sigma", 2_i64).unwrap();
        assert_eq!(
            graph.get_parameter(node, "parameters/sigma").unwrap(),
            ParameterValue::Number(2.0)
        );
        assert_eq!(
            graph.get_parameter(node, "parameters/extra/radius").unwrap(),
            ParameterValue::Integer(3)
        );
        assert_eq!(
            graph
                .set_parameter(node, "parameters/sigma", "wide")
                .unwrap_err()
                .kind(),
            ErrorKind::IncompatibleTypes
        );
    }

    #[test]
    fn test_dynamic_entries_can_be_edited_inside_a_graph() {
        let mut graph = create_graph();
        let node = graph
            .add_node(enhancer_node().with_parameters(BlurSettings::new()))
            .unwrap();
        let (seen, callback) = recorder::<GraphEvent>();
        let _sub = graph.subscribe_kind(ChangeKind::Structural, callback);

        graph
            .add_parameter_entry(node, "parameters/extra", "gain", 0.5)
            .unwrap();
        let tree = graph.parameter_tree(node).unwrap();
        assert_eq!(
            tree.access("parameters/extra/gain").unwrap().value(),
            &ParameterValue::Number(0.5)
        );

        graph
            .rename_parameter_entry(node, "parameters/extra", "gain", "boost")
            .unwrap();
        assert_eq!(
            graph.get_parameter(node, "parameters/extra/boost").unwrap(),
            ParameterValue::Number(0.5)
        );
        assert_eq!(
            graph
                .remove_parameter_entry(node, "parameters/extra", "boost")
                .unwrap(),
            ParameterValue::Number(0.5)
        );

        let tree = graph.parameter_tree(node).unwrap();
        assert!(tree.access("parameters/extra/gain").is_none());
        assert!(tree.access("parameters/extra/boost").is_none());
        assert!(tree.access("parameters/extra/radius").is_some());
        assert_eq!(*seen.borrow(), vec![GraphEvent::ParametersChanged { node }; 3]);
    }

    #[test]
    fn test_parameter_entry_commands_need_a_dynamic_collection() {
        let mut graph = create_graph();
        let blurred = graph
            .add_node(enhancer_node().with_parameters(BlurSettings::new()))
            .unwrap();
        let bare = graph.add_node(source_node("Load", "image")).unwrap();
        let (seen, callback) = recorder::<GraphEvent>();
        let _sub = graph.subscribe(callback);

        assert_eq!(
            graph.add_parameter_entry(blurred, "parameters", "gain", 1.0),
            Err(GraphError::Parameter(ParameterError::NotDynamic {
                key: "parameters".into()
            }))
        );
        assert_eq!(
            graph
                .add_parameter_entry(bare, "parameters", "gain", 1.0)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            graph
                .add_parameter_entry(blurred, "parameters/extra", "radius", 1_i64)
                .unwrap_err()
                .kind(),
            ErrorKind::DuplicateName
        );
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_move_node_reports_location() {
        let mut graph = create_graph();
        let node = graph.add_node(source_node("Load", "image").at(1, 2)).unwrap();
        assert_eq!(graph.node(node).unwrap().location(), NodeLocation::new(1, 2));

        graph.move_node(node, NodeLocation::new(10, 20)).unwrap();
        assert_eq!(graph.node(node).unwrap().location(), NodeLocation::new(10, 20));
    }
}
