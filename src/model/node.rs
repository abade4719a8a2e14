use std::fmt;

use super::BranchingContainer;
use crate::error::{Hl7Error, Result};
use crate::types::Element;

/// Handle to a node in a [`Message`](crate::Message) arena.
///
/// Only meaningful for the message that issued it; the same slot and
/// repetition always yields the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Group(Group),
    Segment(Segment),
    Field(Field),
}

/// A group or the message root. Children are segments and nested groups.
#[derive(Debug, Clone)]
pub struct Group {
    pub(crate) children: BranchingContainer<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

/// A segment; its slots are fields.
#[derive(Debug, Clone)]
pub struct Segment {
    pub(crate) fields: BranchingContainer<NodeId>,
    pub(crate) parent: NodeId,
}

/// One repetition of a segment field.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) element: Element,
    pub(crate) parent: NodeId,
    pub(crate) slot: usize,
}

impl Group {
    pub fn name(&self) -> &str {
        self.children.name()
    }

    pub fn children(&self) -> &BranchingContainer<NodeId> {
        &self.children
    }

    /// `None` for the message root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl Segment {
    pub fn name(&self) -> &str {
        self.fields.name()
    }

    pub fn fields(&self) -> &BranchingContainer<NodeId> {
        &self.fields
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }
}

impl Field {
    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Declaration position of the field within its segment (0 is field 1).
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// HL7 field number, e.g. 5 for PID-5.
    pub fn number(&self) -> usize {
        self.slot + 1
    }
}

impl Node {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Node::Group(g) if g.is_root() => "message",
            Node::Group(_) => "group",
            Node::Segment(_) => "segment",
            Node::Field(_) => "field",
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Group(g) => g.parent,
            Node::Segment(s) => Some(s.parent),
            Node::Field(f) => Some(f.parent),
        }
    }

    pub fn as_group(&self) -> Result<&Group> {
        match self {
            Node::Group(g) => Ok(g),
            other => Err(self.mismatch("group", other)),
        }
    }

    pub fn as_segment(&self) -> Result<&Segment> {
        match self {
            Node::Segment(s) => Ok(s),
            other => Err(self.mismatch("segment", other)),
        }
    }

    pub fn as_field(&self) -> Result<&Field> {
        match self {
            Node::Field(f) => Ok(f),
            other => Err(self.mismatch("field", other)),
        }
    }

    /// The branching container of a group or segment.
    pub fn container(&self) -> Result<&BranchingContainer<NodeId>> {
        match self {
            Node::Group(g) => Ok(&g.children),
            Node::Segment(s) => Ok(&s.fields),
            Node::Field(_) => Err(self.mismatch("group or segment", self)),
        }
    }

    pub(crate) fn container_mut(&mut self) -> Result<&mut BranchingContainer<NodeId>> {
        match self {
            Node::Group(g) => Ok(&mut g.children),
            Node::Segment(s) => Ok(&mut s.fields),
            Node::Field(_) => Err(Hl7Error::KindMismatch {
                expected: "group or segment",
                found: "field",
            }),
        }
    }

    fn mismatch(&self, expected: &'static str, found: &Node) -> Hl7Error {
        Hl7Error::KindMismatch {
            expected,
            found: found.kind_label(),
        }
    }
}
