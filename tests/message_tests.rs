mod common;

use common::*;
use octofhir_hl7v2::*;

#[test]
fn test_new_message_is_empty_root() {
    let message = create_test_message();
    let root = message.root();

    assert_eq!(message.structure(), "ZZZ_Z01");
    assert_eq!(message.version(), Hl7Version::V2_5);
    assert_eq!(message.node_count(), 1);
    assert!(message.group(root).unwrap().is_root());
    assert_eq!(message.parent(root), None);
    assert_eq!(message.node(root).kind_label(), "message");
    assert_eq!(message.count_repetitions(root, "ZAB").unwrap(), 0);
}

#[test]
fn test_unknown_message_structure() {
    let err = Message::new(create_test_library(), "ADT_A01").unwrap_err();
    assert!(matches!(
        err,
        Hl7Error::UnknownStructure {
            kind: "message",
            ..
        }
    ));
}

#[test]
fn test_get_first_creates_once() {
    let mut message = create_test_message();
    let root = message.root();

    let first = message.get_first(root, "ZAB").unwrap();
    let nodes = message.node_count();
    let again = message.get_first(root, "ZAB").unwrap();

    assert_eq!(first, again);
    assert_eq!(message.node_count(), nodes);
    assert_eq!(message.segment(first).unwrap().name(), "ZAB");
    assert_eq!(message.parent(first), Some(root));
}

#[test]
fn test_referential_stability_of_repetitions() {
    let mut message = create_test_message();
    let root = message.root();

    let detail0 = message.get_repetition(root, "DETAIL", 0).unwrap();
    let detail1 = message.get_repetition(root, "DETAIL", 1).unwrap();

    assert_ne!(detail0, detail1);
    assert_eq!(message.get_repetition(root, "DETAIL", 0).unwrap(), detail0);
    assert_eq!(message.get_repetition(root, "DETAIL", 1).unwrap(), detail1);
    assert_eq!(message.all_repetitions(root, "DETAIL").unwrap(), [detail0, detail1]);
}

#[test]
fn test_undeclared_child_is_unknown() {
    let mut message = create_test_message();
    let root = message.root();

    assert!(matches!(
        message.get_first(root, "PID"),
        Err(Hl7Error::UnknownSlot { .. })
    ));
    assert!(matches!(
        message.get_repetition(root, "PID", 0),
        Err(Hl7Error::UnknownSlot { .. })
    ));
    assert_eq!(message.node_count(), 1);
}

#[test]
fn test_group_repetition_rules() {
    let mut message = create_test_message();
    let root = message.root();
    let detail = message.get_first(root, "DETAIL").unwrap();

    message.get_repetition(detail, "ZAB", 0).unwrap();
    message.get_repetition(detail, "ZAB", 1).unwrap();
    assert!(matches!(
        message.get_repetition(detail, "ZAB", 2),
        Err(Hl7Error::MaxOccursExceeded { .. })
    ));

    assert!(matches!(
        message.get_repetition(root, "DETAIL", 5),
        Err(Hl7Error::RepetitionOutOfSequence {
            requested: 5,
            count: 1,
            ..
        })
    ));
    assert_eq!(message.count_repetitions(root, "DETAIL").unwrap(), 1);
}

#[test]
fn test_peek_does_not_materialize() {
    let mut message = create_test_message();
    let root = message.root();

    assert_eq!(message.peek(root, "ZAB", 0).unwrap(), None);
    assert_eq!(message.node_count(), 1);

    let zab = message.get_first(root, "ZAB").unwrap();
    assert_eq!(message.peek(root, "ZAB", 0).unwrap(), Some(zab));
}

#[test]
fn test_nested_parent_links() {
    let mut message = create_test_message();
    let root = message.root();
    let detail = message.get_first(root, "DETAIL").unwrap();
    let zcd = message.get_first(detail, "ZCD").unwrap();
    let code = message.get_first(zcd, "Code").unwrap();

    assert_eq!(message.parent(code), Some(zcd));
    assert_eq!(message.parent(zcd), Some(detail));
    assert_eq!(message.parent(detail), Some(root));
    assert_eq!(message.group(detail).unwrap().name(), "ZZZ_Z01_DETAIL");
    assert_eq!(message.field(code).unwrap().number(), 1);
}

#[test]
fn test_fields_hold_built_elements() {
    let mut message = create_test_message();
    let zcd = message.get_first(message.root(), "ZCD").unwrap();

    let code = message.get_field(zcd, 1, 0).unwrap();
    let element = message.element(code).unwrap();
    assert_eq!(element.type_name(), "CE");
    assert_eq!(element.as_composite().unwrap().arity(), 3);

    let notes = message.get_field(zcd, 3, 1);
    assert!(matches!(notes, Err(Hl7Error::RepetitionOutOfSequence { .. })));
    assert!(matches!(
        message.get_field(zcd, 4, 0),
        Err(Hl7Error::UnknownSlot { ref name, .. }) if name == "ZCD-4"
    ));
}

#[test]
fn test_kind_mismatch_between_nodes() {
    let mut message = create_test_message();
    let root = message.root();
    let zab = message.get_first(root, "ZAB").unwrap();
    let a = message.get_first(zab, "A").unwrap();

    assert!(matches!(
        message.segment(root),
        Err(Hl7Error::KindMismatch {
            expected: "segment",
            found: "message"
        })
    ));
    assert!(message.group(zab).is_err());
    assert!(message.container(a).is_err());
    assert!(message.get_first(a, "A").is_err());
}

#[test]
fn test_set_and_read_field_values() {
    let mut message = create_test_message();
    let zab = message.get_first(message.root(), "ZAB").unwrap();
    let a = message.get_first(zab, "A").unwrap();

    assert_eq!(message.value(a).unwrap(), None);
    message.set_value(a, "hello").unwrap();
    assert_eq!(message.value(a).unwrap(), Some("hello"));

    let zcd = message.get_first(message.root(), "ZCD").unwrap();
    let code = message.get_first(zcd, "Code").unwrap();
    message.set_value(code, "GLU").unwrap();
    assert_eq!(message.value(code).unwrap(), Some("GLU"));
}

#[test]
fn test_missing_required_reports_paths() {
    let mut message = create_test_message();
    assert_eq!(message.missing_required(), vec!["/ZAB".to_string()]);

    let root = message.root();
    let zab = message.get_first(root, "ZAB").unwrap();
    message.get_first(root, "DETAIL").unwrap();

    let missing = message.missing_required();
    assert!(missing.contains(&"/ZAB(0)-1".to_string()));
    assert!(missing.contains(&"/DETAIL(0)/ZCD".to_string()));

    message.get_first(zab, "A").unwrap();
    assert!(!message.missing_required().contains(&"/ZAB(0)-1".to_string()));
}

#[test]
fn test_build_required_fills_required_slots() {
    let mut message = create_test_message();
    message.build_required().unwrap();

    let root = message.root();
    let zab = message.peek(root, "ZAB", 0).unwrap().unwrap();
    assert_eq!(message.count_repetitions(zab, "A").unwrap(), 1);
    assert_eq!(message.count_repetitions(zab, "B").unwrap(), 0);
    assert_eq!(message.count_repetitions(root, "DETAIL").unwrap(), 0);
    assert!(message.missing_required().is_empty());
}

#[test]
fn test_build_required_completes_optional_children_already_created() {
    let mut message = create_test_message();
    let root = message.root();
    message.get_first(root, "ZCD").unwrap();
    let detail = message.get_repetition(root, "DETAIL", 0).unwrap();

    message.build_required().unwrap();

    assert!(message.missing_required().is_empty());
    let zcd = message.peek(root, "ZCD", 0).unwrap().unwrap();
    assert_eq!(message.count_repetitions(zcd, "Code").unwrap(), 1);
    assert_eq!(message.count_repetitions(detail, "ZCD").unwrap(), 1);
    assert_eq!(message.count_repetitions(root, "DETAIL").unwrap(), 1);
}

#[test]
fn test_length_violations_are_advisory() {
    let mut message = create_test_message();
    let zcd = message.get_first(message.root(), "ZCD").unwrap();
    let count = message.get_field(zcd, 2, 0).unwrap();

    message.set_value(count, "123456").unwrap();
    assert_eq!(message.value(count).unwrap(), Some("123456"));

    let violations = message.length_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "Count");
    assert_eq!(violations[0].length, 6);
    assert_eq!(violations[0].max_length, Some(4));
    assert_eq!(violations[0].path, "/ZCD(0)-2(0)");

    message.set_value(count, "12").unwrap();
    assert!(message.length_violations().is_empty());
}

#[test]
fn test_ignore_policy_still_records_violations() {
    let config = ModelConfig::default().with_length_policy(LengthPolicy::Ignore);
    let mut message = Message::with_config(create_test_library(), "ZZZ_Z01", &config).unwrap();
    let zcd = message.get_first(message.root(), "ZCD").unwrap();
    let count = message.get_field(zcd, 2, 0).unwrap();

    message.set_value(count, "999999").unwrap();
    assert_eq!(message.length_violations().len(), 1);
}

#[test]
fn test_path_of_nodes() {
    let mut message = create_test_message();
    let root = message.root();
    message.get_repetition(root, "DETAIL", 0).unwrap();
    let detail = message.get_repetition(root, "DETAIL", 1).unwrap();
    let zcd = message.get_first(detail, "ZCD").unwrap();
    message.get_repetition(zcd, "Notes", 0).unwrap();
    let note = message.get_repetition(zcd, "Notes", 1).unwrap();

    assert_eq!(message.path_of(root), "/");
    assert_eq!(message.path_of(detail), "/DETAIL(1)");
    assert_eq!(message.path_of(note), "/DETAIL(1)/ZCD(0)-3(1)");
}

#[test]
fn test_descendants_follow_declared_order() {
    let mut message = create_test_message();
    let root = message.root();
    let zcd = message.get_first(root, "ZCD").unwrap();
    let zab = message.get_first(root, "ZAB").unwrap();
    let a = message.get_first(zab, "A").unwrap();

    let walk = message.descendants(root);
    assert_eq!(walk, vec![(1, zab), (2, a), (1, zcd)]);
}

#[test]
fn test_slots_expose_declarations_and_children() {
    let mut message = create_test_message();
    let root = message.root();
    let zab = message.get_first(root, "ZAB").unwrap();

    let slots: Vec<(String, usize)> = message
        .slots(root)
        .unwrap()
        .map(|(declaration, children)| (declaration.name.clone(), children.len()))
        .collect();
    assert_eq!(
        slots,
        vec![
            ("ZAB".to_string(), 1),
            ("DETAIL".to_string(), 0),
            ("ZCD".to_string(), 0)
        ]
    );

    let field = message.get_first(zab, "B").unwrap();
    let declaration = message.field_declaration(field).unwrap();
    assert_eq!(declaration.max_occurs, MaxOccurs::Bounded(3));
}

#[test]
fn test_end_to_end_segment_in_message() {
    let mut message = create_test_message();
    let zab = message.get_first(message.root(), "ZAB").unwrap();

    let a = message.get_first(zab, "A").unwrap();
    assert_eq!(message.get_first(zab, "A").unwrap(), a);

    let b0 = message.get_repetition(zab, "B", 0).unwrap();
    let b1 = message.get_repetition(zab, "B", 1).unwrap();
    assert_eq!(message.all_repetitions(zab, "B").unwrap(), [b0, b1]);

    assert!(matches!(
        message.get_repetition(zab, "B", 3),
        Err(Hl7Error::MaxOccursExceeded { .. })
    ));
    assert_eq!(message.count_repetitions(zab, "B").unwrap(), 2);
}
