// Primitive and composite data type instances

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::Hl7Version;
use crate::error::{Hl7Error, Result};

/// A data type instance: either a scalar leaf or a fixed-arity composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Primitive(Primitive),
    Composite(Composite),
}

/// Leaf element holding at most one textual value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Primitive {
    type_name: String,
    version: Hl7Version,
    value: Option<String>,
}

/// Fixed-size ordered tuple of labelled components.
///
/// The arity and per-position type are fixed when the composite is built and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    type_name: String,
    components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub label: String,
    pub element: Element,
}

impl Primitive {
    pub fn new(type_name: impl Into<String>, version: Hl7Version) -> Self {
        Self {
            type_name: type_name.into(),
            version,
            value: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The protocol version that defines this primitive's format.
    pub fn version(&self) -> Hl7Version {
        self.version
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    pub fn clear(&mut self) -> Option<String> {
        self.value.take()
    }

    pub fn is_empty(&self) -> bool {
        self.value.as_deref().is_none_or(str::is_empty)
    }
}

impl Composite {
    pub fn new(type_name: impl Into<String>, components: Vec<Component>) -> Self {
        Self {
            type_name: type_name.into(),
            components,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn arity(&self) -> usize {
        self.components.len()
    }

    /// Component at a zero-based index.
    pub fn component(&self, index: usize) -> Result<&Element> {
        let arity = self.arity();
        self.components
            .get(index)
            .map(|c| &c.element)
            .ok_or_else(|| self.out_of_range(index as i64, arity))
    }

    pub fn component_mut(&mut self, index: usize) -> Result<&mut Element> {
        let arity = self.arity();
        if index >= arity {
            return Err(self.out_of_range(index as i64, arity));
        }
        Ok(&mut self.components[index].element)
    }

    /// Component at a signed ordinal, as generated accessors and codecs
    /// compute it. Negative ordinals are out of range.
    pub fn component_at(&self, index: i64) -> Result<&Element> {
        match usize::try_from(index) {
            Ok(index) => self.component(index),
            Err(_) => Err(self.out_of_range(index, self.arity())),
        }
    }

    /// Component at an HL7 one-based position (`CE-2` is position 2).
    /// Position 0 is reported as index -1.
    pub fn component_by_position(&self, position: usize) -> Result<&Element> {
        match position.checked_sub(1) {
            Some(index) => self.component(index),
            None => Err(self.out_of_range(-1, self.arity())),
        }
    }

    pub fn component_by_position_mut(&mut self, position: usize) -> Result<&mut Element> {
        match position.checked_sub(1) {
            Some(index) => self.component_mut(index),
            None => Err(self.out_of_range(-1, self.arity())),
        }
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(|c| c.label.as_str())
    }

    fn out_of_range(&self, index: i64, arity: usize) -> Hl7Error {
        Hl7Error::IndexOutOfRange {
            type_name: self.type_name.clone(),
            index,
            arity,
        }
    }
}

impl Element {
    pub fn type_name(&self) -> &str {
        match self {
            Element::Primitive(p) => p.type_name(),
            Element::Composite(c) => c.type_name(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Element::Primitive(_) => "primitive",
            Element::Composite(_) => "composite",
        }
    }

    pub fn as_primitive(&self) -> Result<&Primitive> {
        match self {
            Element::Primitive(p) => Ok(p),
            other => Err(Hl7Error::KindMismatch {
                expected: "primitive",
                found: other.kind_label(),
            }),
        }
    }

    pub fn as_primitive_mut(&mut self) -> Result<&mut Primitive> {
        match self {
            Element::Primitive(p) => Ok(p),
            other => Err(Hl7Error::KindMismatch {
                expected: "primitive",
                found: other.kind_label(),
            }),
        }
    }

    pub fn as_composite(&self) -> Result<&Composite> {
        match self {
            Element::Composite(c) => Ok(c),
            other => Err(Hl7Error::KindMismatch {
                expected: "composite",
                found: other.kind_label(),
            }),
        }
    }

    pub fn as_composite_mut(&mut self) -> Result<&mut Composite> {
        match self {
            Element::Composite(c) => Ok(c),
            other => Err(Hl7Error::KindMismatch {
                expected: "composite",
                found: other.kind_label(),
            }),
        }
    }

    /// The leading scalar: the primitive's value, or the first component's
    /// for a composite.
    pub fn value(&self) -> Option<&str> {
        match self {
            Element::Primitive(p) => p.value(),
            Element::Composite(c) => c.components.first().and_then(|c| c.element.value()),
        }
    }

    /// The leading primitive, descending through first components.
    pub fn first_primitive_mut(&mut self) -> Option<&mut Primitive> {
        match self {
            Element::Primitive(p) => Some(p),
            Element::Composite(c) => c
                .components
                .first_mut()
                .and_then(|c| c.element.first_primitive_mut()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Element::Primitive(p) => p.is_empty(),
            Element::Composite(c) => c.components.iter().all(|c| c.element.is_empty()),
        }
    }

    /// Length of the element as text with trailing empty components
    /// dropped, counting one separator between components at each level.
    pub fn text_len(&self) -> usize {
        match self {
            Element::Primitive(p) => p.value().map_or(0, str::len),
            Element::Composite(c) => {
                let Some(last) = c.components.iter().rposition(|c| !c.element.is_empty()) else {
                    return 0;
                };
                c.components[..=last]
                    .iter()
                    .map(|c| c.element.text_len())
                    .sum::<usize>()
                    + last
            }
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Primitive(p) => write!(f, "{}", p.value().unwrap_or("")),
            Element::Composite(c) => {
                write!(f, "{}(", c.type_name)?;
                for (index, component) in c.components.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", component.label, component.element)?;
                }
                f.write_str(")")
            }
        }
    }
}
