//! Tests for slot configurations
mod common;
use common::*;
use kairo::error::ErrorKind;
use kairo::prelude::*;
use kairo::slot::{sanitize_slot_name, unique_slot_name};

fn image_config() -> SlotConfiguration {
    SlotConfiguration::builder()
        .input("Input", SlotDefinition::input("image"))
        .output("Output", SlotDefinition::output("image").inherits_from("Input"))
        .build()
        .unwrap()
}

#[cfg(test)]
mod configuration_tests {
    use super::*;

    #[test]
    fn test_names_must_be_unique_per_direction() {
        let mut config = image_config();
        let err = config
            .add_slot("Input", SlotDefinition::input("mask"), true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);

        // The same name in the other direction is fine.
        config
            .add_slot("Input", SlotDefinition::output("mask"), true)
            .unwrap();
        assert_eq!(config.names(SlotDirection::Output), vec!["Output", "Input"]);
    }

    #[test]
    fn test_names_follow_the_grammar() {
        let mut config = image_config();
        for bad in ["", "Input Image", "a/b", "a-b"] {
            let err = config
                .add_slot(bad, SlotDefinition::input("image"), true)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidName, "{bad:?}");
        }
        config
            .add_slot("Mask.#1,b_2", SlotDefinition::input("mask"), true)
            .unwrap();
        assert_eq!(config.len(SlotDirection::Input), 2);
    }

    #[test]
    fn test_add_then_remove_restores_configuration() {
        let mut config = image_config();
        let before_inputs = config.names(SlotDirection::Input).join(",");
        let before_outputs = config.names(SlotDirection::Output).join(",");

        config
            .add_slot("Extra", SlotDefinition::input("mask"), true)
            .unwrap();
        let removed = config
            .remove_slot(SlotDirection::Input, "Extra", true)
            .unwrap();

        assert_eq!(removed.data_type(), &DataTypeId::new("mask"));
        assert_eq!(config.names(SlotDirection::Input).join(","), before_inputs);
        assert_eq!(config.names(SlotDirection::Output).join(","), before_outputs);
    }

    #[test]
    fn test_allowed_types_are_enforced() {
        let mut config = SlotConfiguration::builder()
            .allowed_input_types(AllowedTypes::only(["image", "mask"]))
            .build()
            .unwrap();
        config
            .add_slot("A", SlotDefinition::input("mask"), true)
            .unwrap();
        let err = config
            .add_slot("B", SlotDefinition::input("table"), true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeNotAllowed);
        assert!(config.add_slot("B", SlotDefinition::output("table"), true).is_ok());
    }

    #[test]
    fn test_sealed_and_limited_directions() {
        let mut sealed = SlotConfiguration::builder()
            .input("In", SlotDefinition::input("image"))
            .seal_inputs()
            .build()
            .unwrap();
        assert!(!sealed.can_modify(SlotDirection::Input));
        assert_eq!(
            sealed.remove_slot(SlotDirection::Input, "In", true),
            Err(SlotError::Sealed {
                direction: SlotDirection::Input
            })
        );

        let mut limited = SlotConfiguration::builder().max_outputs(1).build().unwrap();
        limited
            .add_slot("A", SlotDefinition::output("table"), true)
            .unwrap();
        assert!(!limited.can_add(SlotDirection::Output));
        assert!(matches!(
            limited.add_slot("B", SlotDefinition::output("table"), true),
            Err(SlotError::LimitReached { limit: 1, .. })
        ));
    }

    #[test]
    fn test_rename_keeps_identity_and_inheritance() {
        let mut config = image_config();
        let id = config.slot_id(SlotDirection::Input, "Input").unwrap();

        config
            .rename_slot(SlotDirection::Input, "Input", "Source", true)
            .unwrap();

        assert_eq!(config.slot_id(SlotDirection::Input, "Source"), Some(id));
        assert!(!config.contains(SlotDirection::Input, "Input"));
        assert_eq!(
            config.get(SlotDirection::Output, "Output").unwrap().inherited_slot(),
            &InheritedSlot::Named("Source".to_string())
        );
    }

    #[test]
    fn test_move_slot_reorders() {
        let mut config = SlotConfiguration::builder()
            .input("A", SlotDefinition::input("image"))
            .input("B", SlotDefinition::input("image"))
            .input("C", SlotDefinition::input("image"))
            .build()
            .unwrap();
        config.move_slot(SlotDirection::Input, "C", 0, true).unwrap();
        assert_eq!(config.names(SlotDirection::Input), vec!["C", "A", "B"]);

        assert!(matches!(
            config.move_slot(SlotDirection::Input, "A", 3, true),
            Err(SlotError::IndexOutOfRange { len: 3, .. })
        ));
    }

    #[test]
    fn test_replace_slot_gives_new_identity_in_place() {
        let mut config = SlotConfiguration::builder()
            .input("A", SlotDefinition::input("image"))
            .input("B", SlotDefinition::input("image"))
            .build()
            .unwrap();
        let old = config.slot_id(SlotDirection::Input, "A").unwrap();

        let new = config
            .replace_slot(SlotDirection::Input, "A", SlotDefinition::input("mask"), true)
            .unwrap();

        assert_ne!(old, new);
        assert_eq!(config.names(SlotDirection::Input), vec!["A", "B"]);
        assert_eq!(
            config.get(SlotDirection::Input, "A").unwrap().data_type(),
            &DataTypeId::new("mask")
        );
    }

    #[test]
    fn test_replace_with_new_name_keeps_inheritance() {
        let mut config = image_config();
        config
            .replace_slot(
                SlotDirection::Input,
                "Input",
                SlotDefinition::input("image").named("Source"),
                true,
            )
            .unwrap();

        assert_eq!(
            config.get(SlotDirection::Output, "Output").unwrap().inherited_slot(),
            &InheritedSlot::Named("Source".to_string())
        );
    }

    #[test]
    fn test_removed_input_is_no_longer_inherited() {
        let mut config = image_config();
        config
            .remove_slot(SlotDirection::Input, "Input", true)
            .unwrap();
        assert_eq!(
            config.get(SlotDirection::Output, "Output").unwrap().inherited_slot(),
            &InheritedSlot::None
        );

        // A new input reusing the name does not pick up the old inheritance.
        config
            .add_slot("Input", SlotDefinition::input("table"), true)
            .unwrap();
        assert_eq!(
            config.get(SlotDirection::Output, "Output").unwrap().inherited_slot(),
            &InheritedSlot::None
        );
    }

    #[test]
    fn test_inheritance_must_reference_existing_input() {
        let mut config = image_config();
        let err = config
            .set_inherited_slot("Output", InheritedSlot::Named("Missing".into()), true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        config
            .set_inheritance_conversion("Output", "image", "label-image", true)
            .unwrap();
        assert!(config
            .remove_inheritance_conversion("Output", &"image".into(), true)
            .unwrap());
        assert!(!config
            .remove_inheritance_conversion("Output", &"image".into(), true)
            .unwrap());
    }

    #[test]
    fn test_failed_command_leaves_configuration_untouched() {
        let mut config = image_config();
        let (seen, callback) = recorder::<SlotEvent>();
        let _sub = config.subscribe(callback);

        assert!(config
            .rename_slot(SlotDirection::Input, "Input", "bad name", true)
            .is_err());
        assert_eq!(config.names(SlotDirection::Input), vec!["Input"]);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_notify_flag_controls_events() {
        let mut config = image_config();
        let (seen, callback) = recorder::<SlotEvent>();
        let _sub = config.subscribe(callback);

        config
            .add_slot("Quiet", SlotDefinition::input("image"), false)
            .unwrap();
        assert!(seen.borrow().is_empty());

        config
            .add_slot("Loud", SlotDefinition::input("image"), true)
            .unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![SlotEvent::SlotAdded {
                direction: SlotDirection::Input,
                name: "Loud".into()
            }]
        );
    }
}

#[cfg(test)]
mod passthrough_tests {
    use super::*;

    fn passthrough() -> SlotConfiguration {
        SlotConfiguration::builder()
            .passthrough()
            .input("Image", SlotDefinition::input("image"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_inputs_are_mirrored_as_outputs() {
        let mut config = passthrough();
        config
            .add_slot("Labels", SlotDefinition::input("label-image"), true)
            .unwrap();

        assert_eq!(config.names(SlotDirection::Output), vec!["Image", "Labels"]);
        let mirror = config.get(SlotDirection::Output, "Labels").unwrap();
        assert_eq!(mirror.data_type(), &DataTypeId::new("label-image"));
        assert_eq!(mirror.inherited_slot(), &InheritedSlot::Named("Labels".into()));
    }

    #[test]
    fn test_outputs_cannot_be_edited_directly() {
        let mut config = passthrough();
        assert!(!config.can_modify(SlotDirection::Output));
        assert!(matches!(
            config.add_slot("Out", SlotDefinition::output("image"), true),
            Err(SlotError::Sealed { .. })
        ));
    }

    #[test]
    fn test_rename_move_and_remove_follow_inputs() {
        let mut config = passthrough();
        config
            .add_slot("Mask", SlotDefinition::input("mask"), true)
            .unwrap();

        config
            .rename_slot(SlotDirection::Input, "Image", "Raw", true)
            .unwrap();
        assert_eq!(config.names(SlotDirection::Output), vec!["Raw", "Mask"]);

        config.move_slot(SlotDirection::Input, "Mask", 0, true).unwrap();
        assert_eq!(config.names(SlotDirection::Output), vec!["Mask", "Raw"]);

        config.remove_slot(SlotDirection::Input, "Mask", true).unwrap();
        assert_eq!(config.names(SlotDirection::Output), vec!["Raw"]);
    }
}

#[cfg(test)]
mod name_tests {
    use super::*;

    #[test]
    fn test_sanitize_and_unique_names() {
        assert_eq!(sanitize_slot_name("Label Image"), Some("LabelImage".to_string()));
        assert_eq!(sanitize_slot_name("  "), None);
        assert_eq!(unique_slot_name("Input", ["Input", "Input2"]), "Input3");
        assert_eq!(unique_slot_name("Mask", ["Input"]), "Mask");
    }

    #[test]
    fn test_wildcard_inheritance_serializes_as_star() {
        let definition = SlotDefinition::output("image").inherits_from_first_connected();
        let json = serde_json::to_value(&definition).unwrap();
        assert_eq!(json["inherited_slot"], "*");

        let back: SlotDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back.inherited_slot(), &InheritedSlot::FirstConnected);
    }
}
