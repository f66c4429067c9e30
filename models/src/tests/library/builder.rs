use crate::{DomainPolicy, LibraryDescriptor, LibrarySetBuilder, LibrarySetId, ModelError};

fn swc(name: &str, position: u32) -> LibraryDescriptor {
    LibraryDescriptor::new(name, format!("/libs/{name}"), position, false)
}

/// **VALUE**: Verifies that libraries keep the order the dependency sorter produced.
///
/// **WHY THIS MATTERS**: The worker loads archives in registration order. A set that
/// reorders its libraries would load `B.swc` before the `A.swc` it depends on.
///
/// **BUG THIS CATCHES**: Would catch if the builder collects into a hash-ordered
/// container or sorts by name instead of keeping the supplied order.
#[test]
fn given_sorted_libraries_when_building_then_preserves_order() {
    // GIVEN: Two libraries in dependency order
    let builder = LibrarySetBuilder::default()
        .with_id(LibrarySetId::new("project1234"))
        .with_library(swc("A.swc", 0))
        .with_library(swc("B.swc", 1));

    // WHEN: Building the set
    let set = builder.build().expect("valid library set");

    // THEN: Order and default policy are kept
    let names: Vec<&str> = set.libraries().iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["A.swc", "B.swc"]);
    assert_eq!(set.policy(), DomainPolicy::OneForSet);
}

/// **VALUE**: Verifies that duplicate archives are dropped, keeping the first.
///
/// **BUG THIS CATCHES**: Would catch a set that registers the same archive twice,
/// which makes the worker define the same classes in two domains.
#[test]
fn given_duplicate_paths_when_building_then_keeps_first_occurrence() {
    let set = LibrarySetBuilder::default()
        .with_id(LibrarySetId::new("p"))
        .with_libraries(vec![swc("A.swc", 0), swc("A.swc", 1), swc("B.swc", 2)])
        .build()
        .expect("valid library set");

    assert_eq!(set.libraries().len(), 2);
    assert_eq!(set.libraries()[0].position(), 0);
    assert_eq!(set.libraries()[1].name(), "B.swc");
}

#[test]
fn given_positions_out_of_order_when_building_then_returns_validation_error() {
    let result = LibrarySetBuilder::default()
        .with_id(LibrarySetId::new("p"))
        .with_library(swc("B.swc", 3))
        .with_library(swc("A.swc", 1))
        .build();

    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert!(message.contains("out of dependency order"), "{message}");
        }
        Err(other) => panic!("Expected a validation error, got {other}"),
        Ok(_) => panic!("Unsorted libraries should be rejected"),
    }
}

#[test]
fn given_missing_id_when_building_then_returns_missing_field_error() {
    let result = LibrarySetBuilder::default()
        .with_library(swc("A.swc", 0))
        .build();

    match result {
        Err(ModelError::Missing { field, .. }) => assert_eq!(field, "Library set id"),
        Err(other) => panic!("Expected a missing field error, got {other}"),
        Ok(_) => panic!("Missing id should be rejected"),
    }
}

#[test]
fn given_no_libraries_when_building_then_returns_validation_error() {
    let result = LibrarySetBuilder::default()
        .with_id(LibrarySetId::new("p"))
        .with_policy(DomainPolicy::OnePerLibrary)
        .build();

    assert!(result.is_err(), "An empty set is not registrable");
}

#[test]
fn given_policy_codes_when_round_tripped_then_match() {
    for policy in [DomainPolicy::OneForSet, DomainPolicy::OnePerLibrary] {
        assert_eq!(DomainPolicy::from_wire(policy.wire_code()), Some(policy));
    }
    assert_eq!(DomainPolicy::from_wire(7), None);
}
