use octofhir_hl7v2::*;
use std::sync::Arc;

/// Segment-like table with a required single `A` and an optional `B`
/// repeating up to three times.
#[allow(dead_code)]
pub fn create_segment_table() -> SlotTable {
    let mut table = SlotTable::new("ZAB");
    table
        .declare(SlotDeclaration::field("A", "ST").with_required(true))
        .unwrap();
    table
        .declare(SlotDeclaration::field("B", "ST").with_max_occurs(MaxOccurs::Bounded(3)))
        .unwrap();
    table
}

#[allow(dead_code)]
pub fn create_test_container() -> BranchingContainer<String> {
    BranchingContainer::new(Arc::new(create_segment_table()))
}

/// A small library:
///
/// ```text
/// ZZZ_Z01
///   ZAB           required
///   DETAIL        group ZZZ_Z01_DETAIL, unbounded
///     ZCD         required
///     ZAB         0..2
///   ZCD           optional
/// ```
#[allow(dead_code)]
pub fn create_test_library() -> Arc<SchemaLibrary> {
    let mut zcd = SlotTable::new("ZCD");
    zcd.declare(SlotDeclaration::field("Code", "CE").with_required(true))
        .unwrap();
    zcd.declare(SlotDeclaration::field("Count", "NM").with_length(0, Some(4)))
        .unwrap();
    zcd.declare(SlotDeclaration::field("Notes", "ST").repeating())
        .unwrap();

    let mut detail = SlotTable::new("ZZZ_Z01_DETAIL");
    detail
        .declare(SlotDeclaration::segment("ZCD", "ZCD").with_required(true))
        .unwrap();
    detail
        .declare(SlotDeclaration::segment("ZAB", "ZAB").with_max_occurs(MaxOccurs::Bounded(2)))
        .unwrap();

    let mut message = SlotTable::new("ZZZ_Z01");
    message
        .declare(SlotDeclaration::segment("ZAB", "ZAB").with_required(true))
        .unwrap();
    message
        .declare(SlotDeclaration::group("DETAIL", "ZZZ_Z01_DETAIL").repeating())
        .unwrap();
    message
        .declare(SlotDeclaration::segment("ZCD", "ZCD"))
        .unwrap();

    let library = SchemaLibrary::builder(Hl7Version::V2_5)
        .primitive("ST")
        .primitive("NM")
        .primitive("ID")
        .composite(
            "CE",
            &[
                ("Identifier", "ST"),
                ("Text", "ST"),
                ("Name of Coding System", "ID"),
            ],
        )
        .segment(create_segment_table())
        .segment(zcd)
        .group(detail)
        .message(message)
        .build()
        .unwrap();

    Arc::new(library)
}

#[allow(dead_code)]
pub fn create_test_message() -> Message {
    Message::new(create_test_library(), "ZZZ_Z01").unwrap()
}

#[allow(dead_code)]
pub fn create_embedded_registry() -> SchemaRegistry {
    SchemaRegistry::embedded().unwrap()
}

/// Minimal schema document used by file-loading tests.
#[allow(dead_code)]
pub fn minimal_schema_json(version: &str) -> String {
    format!(
        r#"{{
  "version": "{version}",
  "dataTypes": {{
    "ST": {{ "kind": "primitive" }},
    "CE": {{
      "kind": "composite",
      "components": [
        {{ "label": "Identifier", "type": "ST" }},
        {{ "label": "Text", "type": "ST" }}
      ]
    }}
  }},
  "segments": {{
    "ZPI": {{
      "fields": [
        {{ "name": "Set ID", "type": "ST", "required": true, "maxLength": 4 }},
        {{ "name": "Kind", "type": "CE", "maxOccurs": "*" }}
      ]
    }}
  }},
  "messages": {{
    "ZPI_Z01": {{
      "children": [
        {{ "segment": "ZPI", "required": true, "maxOccurs": 2 }}
      ]
    }}
  }}
}}"#
    )
}
