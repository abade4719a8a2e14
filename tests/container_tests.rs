mod common;

use common::*;
use octofhir_hl7v2::*;
use std::sync::Arc;

fn make(slot: &SlotDeclaration) -> Result<String> {
    Ok(format!("{}-child", slot.name))
}

#[test]
fn test_undeclared_slot_is_unknown() {
    let mut container = create_test_container();

    assert!(matches!(
        container.get_first_with("Z", make),
        Err(Hl7Error::UnknownSlot { .. })
    ));
    assert!(matches!(
        container.get_repetition_with("Z", 0, make),
        Err(Hl7Error::UnknownSlot { .. })
    ));
    assert!(matches!(
        container.count_repetitions("Z"),
        Err(Hl7Error::UnknownSlot { .. })
    ));
    assert!(matches!(
        container.all_repetitions("Z"),
        Err(Hl7Error::UnknownSlot { .. })
    ));
}

#[test]
fn test_never_accessed_slot_counts_zero() {
    let container = create_test_container();
    assert_eq!(container.count_repetitions("A").unwrap(), 0);
    assert_eq!(container.count_repetitions("B").unwrap(), 0);
    assert!(container.all_repetitions("B").unwrap().is_empty());
}

#[test]
fn test_repetition_monotonicity() {
    let mut table = SlotTable::new("ZRP");
    table
        .declare(SlotDeclaration::field("Notes", "ST").repeating())
        .unwrap();
    let mut container: BranchingContainer<String> = BranchingContainer::new(Arc::new(table));

    container.get_repetition_with("Notes", 0, make).unwrap();
    container.get_repetition_with("Notes", 1, make).unwrap();
    assert_eq!(container.count_repetitions("Notes").unwrap(), 2);

    let err = container
        .get_repetition_with("Notes", 3, make)
        .unwrap_err();
    match err {
        Hl7Error::RepetitionOutOfSequence {
            slot,
            requested,
            count,
            ..
        } => {
            assert_eq!(slot, "Notes");
            assert_eq!(requested, 3);
            assert_eq!(count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(container.count_repetitions("Notes").unwrap(), 2);
}

#[test]
fn test_bound_enforcement() {
    let mut table = SlotTable::new("ZBD");
    table
        .declare(SlotDeclaration::field("Pair", "ST").with_max_occurs(MaxOccurs::Bounded(2)))
        .unwrap();
    let mut container: BranchingContainer<String> = BranchingContainer::new(Arc::new(table));

    container.get_repetition_with("Pair", 0, make).unwrap();
    container.get_repetition_with("Pair", 1, make).unwrap();

    let err = container.get_repetition_with("Pair", 2, make).unwrap_err();
    assert!(matches!(
        err,
        Hl7Error::MaxOccursExceeded {
            requested: 2,
            max_occurs: 2,
            ..
        }
    ));
    assert_eq!(container.count_repetitions("Pair").unwrap(), 2);
}

#[test]
fn test_non_repeating_slot_has_one_repetition() {
    let mut container = create_test_container();
    container.get_first_with("A", make).unwrap();
    assert!(matches!(
        container.get_repetition_with("A", 1, make),
        Err(Hl7Error::MaxOccursExceeded { max_occurs: 1, .. })
    ));
}

#[test]
fn test_existing_repetition_is_not_rebuilt() {
    let mut container = create_test_container();
    container.get_first_with("A", make).unwrap().push_str("!");

    let again = container
        .get_first_with("A", |_| Ok("replacement".to_string()))
        .unwrap();
    assert_eq!(again, "A-child!");
    assert_eq!(container.count_repetitions("A").unwrap(), 1);
}

#[test]
fn test_peek_never_creates() {
    let container = create_test_container();
    assert_eq!(container.peek("A", 0).unwrap(), None);
    assert_eq!(container.count_repetitions("A").unwrap(), 0);
    assert!(container.peek("Z", 0).is_err());
}

#[test]
fn test_lookup_then_fill() {
    let mut container = create_test_container();

    let vacant = match container.lookup("B", 0).unwrap() {
        Lookup::Vacant(vacant) => vacant,
        Lookup::Occupied(_) => panic!("nothing was created yet"),
    };
    assert_eq!(vacant.slot(), 1);
    assert_eq!(vacant.repetition(), 0);
    container.fill(vacant, "first".to_string());

    assert!(matches!(
        container.lookup("B", 0).unwrap(),
        Lookup::Occupied(child) if child == "first"
    ));
}

#[test]
#[should_panic(expected = "issued by another container")]
fn test_fill_rejects_vacancy_from_other_container() {
    let table = Arc::new(create_segment_table());
    let source = BranchingContainer::<String>::new(Arc::clone(&table));
    let mut target = BranchingContainer::<String>::new(table);

    let Lookup::Vacant(vacant) = source.lookup("B", 0).unwrap() else {
        panic!("nothing was created yet");
    };
    target.fill(vacant, "stray".to_string());
}

#[test]
#[should_panic(expected = "issued by another container")]
fn test_cloned_container_does_not_accept_original_vacancy() {
    let original = create_test_container();
    let mut copy = original.clone();

    let Lookup::Vacant(vacant) = original.lookup("A", 0).unwrap() else {
        panic!("nothing was created yet");
    };
    copy.fill(vacant, "stray".to_string());
}

#[test]
fn test_end_to_end_segment_like_container() {
    let mut container = create_test_container();

    let a = container.get_first_with("A", make).unwrap().clone();
    assert_eq!(a, "A-child");
    assert_eq!(container.count_repetitions("A").unwrap(), 1);

    container
        .get_repetition_with("B", 0, |_| Ok("b0".to_string()))
        .unwrap();
    container
        .get_repetition_with("B", 1, |_| Ok("b1".to_string()))
        .unwrap();
    assert_eq!(container.all_repetitions("B").unwrap(), ["b0", "b1"]);

    assert!(matches!(
        container.get_repetition_with("B", 3, make),
        Err(Hl7Error::MaxOccursExceeded { .. })
    ));
    assert_eq!(container.count_repetitions("B").unwrap(), 2);
}

#[test]
fn test_slots_follow_declaration_order() {
    let mut container = create_test_container();
    container.get_repetition_with("B", 0, make).unwrap();

    let summary: Vec<(&str, usize)> = container
        .slots()
        .map(|(declaration, children)| (declaration.name.as_str(), children.len()))
        .collect();
    assert_eq!(summary, vec![("A", 0), ("B", 1)]);
}
