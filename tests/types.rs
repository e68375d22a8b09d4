//! Tests for the data type registry
mod common;
use common::*;
use kairo::error::{ErrorKind, RegistryError};
use kairo::prelude::*;

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_inheritance_is_compatible_upwards_only() {
        let registry = create_registry();
        let (image, label) = (DataTypeId::new("image"), DataTypeId::new("label-image"));

        assert!(registry.is_compatible(&label, &image));
        assert!(!registry.is_compatible(&image, &label));
        assert!(registry.is_compatible(&image, &image));
    }

    #[test]
    fn test_explicit_conversion_is_directional() {
        let registry = create_registry();
        let (table, text) = (DataTypeId::new("table"), DataTypeId::new("text"));

        assert!(registry.is_compatible(&table, &text));
        assert!(!registry.is_compatible(&text, &table));
        assert_eq!(
            registry.conversion_path(&table, &text),
            Some(vec![table.clone(), text.clone()])
        );
    }

    #[test]
    fn test_siblings_are_not_compatible() {
        let registry = create_registry();
        assert!(!registry.is_compatible(&"mask".into(), &"label-image".into()));
        assert_eq!(
            registry.ancestors(&"mask".into()),
            vec![DataTypeId::new("image")]
        );
    }

    #[test]
    fn test_visible_types_skip_hidden_and_sort_by_name() {
        let registry = create_registry();
        let names: Vec<&str> = registry
            .visible_types()
            .iter()
            .map(|info| info.name.as_str())
            .collect();
        assert_eq!(names, vec!["Image", "Label Image", "Mask", "Table", "Text"]);
        assert!(registry.contains(&"internal".into()));
    }

    #[test]
    fn test_duplicate_and_unknown_registrations_fail() {
        let duplicate = DataTypeRegistry::builder()
            .with_type(DataTypeInfo::new("image", "Image"))
            .with_type(DataTypeInfo::new("image", "Image again"))
            .build();
        let err = duplicate.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("image".into()));
        assert_eq!(err.kind(), ErrorKind::DuplicateName);

        let orphan = DataTypeRegistry::builder()
            .with_type(DataTypeInfo::new("label-image", "Label Image").with_parent("image"))
            .build();
        assert_eq!(
            orphan.unwrap_err(),
            RegistryError::UnknownType("image".into())
        );

        let mut registry = create_registry();
        assert!(registry.register_conversion("table", "nowhere").is_err());
    }

    #[test]
    fn test_name_of_falls_back_to_id() {
        let registry = create_registry();
        assert_eq!(registry.name_of(&"label-image".into()), "Label Image");
        assert_eq!(registry.name_of(&"unknown".into()), "unknown");
    }

    #[test]
    fn test_conversions_are_listed_sorted() {
        let registry = create_registry();
        let conversions: Vec<(String, String)> = registry
            .conversions()
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        assert_eq!(conversions, vec![("table".to_string(), "text".to_string())]);
    }
}
