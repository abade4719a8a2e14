// Slot declarations and the ordered tables that hold them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Hl7Error, Result};

/// Upper bound on the number of repetitions a slot may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MaxOccursRepr", into = "MaxOccursRepr")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaxOccursRepr {
    Count(u32),
    Symbol(String),
}

impl TryFrom<MaxOccursRepr> for MaxOccurs {
    type Error = String;

    fn try_from(repr: MaxOccursRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            MaxOccursRepr::Count(n) => Ok(MaxOccurs::Bounded(n)),
            MaxOccursRepr::Symbol(s) if s == "*" => Ok(MaxOccurs::Unbounded),
            MaxOccursRepr::Symbol(s) => s
                .parse::<u32>()
                .map(MaxOccurs::Bounded)
                .map_err(|_| format!("invalid maxOccurs '{s}', expected a number or '*'")),
        }
    }
}

impl From<MaxOccurs> for MaxOccursRepr {
    fn from(max: MaxOccurs) -> Self {
        match max {
            MaxOccurs::Bounded(n) => MaxOccursRepr::Count(n),
            MaxOccurs::Unbounded => MaxOccursRepr::Symbol("*".to_string()),
        }
    }
}

impl MaxOccurs {
    pub const ONE: MaxOccurs = MaxOccurs::Bounded(1);

    /// Whether a zero-based repetition index fits under this bound.
    pub fn admits(&self, repetition: usize) -> bool {
        match self {
            MaxOccurs::Bounded(max) => (repetition as u64) < u64::from(*max),
            MaxOccurs::Unbounded => true,
        }
    }

    pub fn is_repeating(&self) -> bool {
        !matches!(self, MaxOccurs::Bounded(0 | 1))
    }

    pub fn bound(&self) -> Option<u32> {
        match self {
            MaxOccurs::Bounded(max) => Some(*max),
            MaxOccurs::Unbounded => None,
        }
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        MaxOccurs::ONE
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(max) => write!(f, "{max}"),
            MaxOccurs::Unbounded => f.write_str("*"),
        }
    }
}

/// What a slot holds: a segment, a nested group, or a field of some data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Segment(String),
    Group(String),
    Field(String),
}

impl SlotKind {
    /// Name of the segment, group or data type the slot instantiates.
    pub fn structure(&self) -> &str {
        match self {
            SlotKind::Segment(name) | SlotKind::Group(name) | SlotKind::Field(name) => name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotKind::Segment(_) => "segment",
            SlotKind::Group(_) => "group",
            SlotKind::Field(_) => "field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDeclaration {
    pub name: String,
    pub kind: SlotKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_occurs: MaxOccurs,
    #[serde(default)]
    pub min_length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extensions: HashMap<String, serde_json::Value>,
}

impl SlotDeclaration {
    pub fn new(name: impl Into<String>, kind: SlotKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            max_occurs: MaxOccurs::ONE,
            min_length: 0,
            max_length: None,
            table: None,
            description: None,
            extensions: HashMap::new(),
        }
    }

    pub fn segment(name: impl Into<String>, structure: impl Into<String>) -> Self {
        Self::new(name, SlotKind::Segment(structure.into()))
    }

    pub fn group(name: impl Into<String>, structure: impl Into<String>) -> Self {
        Self::new(name, SlotKind::Group(structure.into()))
    }

    pub fn field(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::new(name, SlotKind::Field(data_type.into()))
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_max_occurs(mut self, max_occurs: MaxOccurs) -> Self {
        self.max_occurs = max_occurs;
        self
    }

    /// Shorthand for an unbounded slot
    pub fn repeating(self) -> Self {
        self.with_max_occurs(MaxOccurs::Unbounded)
    }

    pub fn with_length(mut self, min_length: u32, max_length: Option<u32>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_table(mut self, table: u32) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn is_repeating(&self) -> bool {
        self.max_occurs.is_repeating()
    }

    /// Check a value length against the declared limits.
    pub fn length_fits(&self, len: usize) -> bool {
        let len = len as u64;
        len >= u64::from(self.min_length) && self.max_length.is_none_or(|max| len <= u64::from(max))
    }

    fn validate(&self, table: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Hl7Error::configuration(format!(
                "'{table}' declares a slot with an empty name"
            )));
        }
        if self.max_occurs == MaxOccurs::Bounded(0) {
            return Err(Hl7Error::configuration(format!(
                "Slot '{}' in '{table}' declares maxOccurs 0",
                self.name
            )));
        }
        if let Some(max) = self.max_length {
            if self.min_length > max {
                return Err(Hl7Error::configuration(format!(
                    "Slot '{}' in '{table}' has min length {} above max length {max}",
                    self.name, self.min_length
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SlotDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = if self.required { 1 } else { 0 };
        write!(
            f,
            "{} ({} {}) [{}..{}]",
            self.name,
            self.kind.label(),
            self.kind.structure(),
            min,
            self.max_occurs
        )?;
        if let Some(max_length) = self.max_length {
            write!(f, " len<={max_length}")?;
        }
        Ok(())
    }
}

/// Ordered, name-indexed schema of one container.
///
/// Declaration order mirrors the protocol-defined sequence of the segments,
/// groups or fields, and names are unique within a table.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotTable {
    name: String,
    slots: Vec<SlotDeclaration>,
    index: HashMap<String, usize>,
}

impl SlotTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Name of the structure this table describes (e.g. "PID", "ADT_A01").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a declaration. A rejected declaration leaves the table as it was.
    pub fn declare(&mut self, declaration: SlotDeclaration) -> Result<usize> {
        if self.index.contains_key(&declaration.name) {
            return Err(Hl7Error::DuplicateSlot {
                table: self.name.clone(),
                name: declaration.name,
            });
        }
        declaration.validate(&self.name)?;

        let position = self.slots.len();
        self.index.insert(declaration.name.clone(), position);
        self.slots.push(declaration);
        Ok(position)
    }

    pub fn lookup(&self, name: &str) -> Result<&SlotDeclaration> {
        self.position(name).map(|position| &self.slots[position])
    }

    /// Zero-based declaration position of `name`.
    pub fn position(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Hl7Error::UnknownSlot {
                container: self.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn slot_at(&self, position: usize) -> Option<&SlotDeclaration> {
        self.slots.get(position)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn as_slice(&self) -> &[SlotDeclaration] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SlotDeclaration> {
        self.slots.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a> IntoIterator for &'a SlotTable {
    type Item = &'a SlotDeclaration;
    type IntoIter = std::slice::Iter<'a, SlotDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

impl fmt::Display for SlotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} slots)", self.name, self.slots.len())?;
        for (position, slot) in self.slots.iter().enumerate() {
            writeln!(f, "  {:>3}. {slot}", position + 1)?;
        }
        Ok(())
    }
}
