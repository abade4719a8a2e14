use serde::Serialize;
use std::sync::Arc;

use super::node::{Field, Group, Node, NodeId, Segment};
use super::path::{FieldSpec, Hl7Path};
use super::{BranchingContainer, Lookup};
use crate::core::{Hl7Version, LengthPolicy, ModelConfig};
use crate::error::{Hl7Error, Result};
use crate::types::{Element, SchemaLibrary, SlotDeclaration, SlotKind, SlotTable};

const ROOT: NodeId = NodeId(0);

/// One HL7 message instance.
///
/// The message owns every group, segment and field below it in a single
/// arena. Nodes are created the first time they are reached through a
/// `get_*` accessor and live until the message is dropped. Accessors that
/// can create nodes take `&mut self`; `peek`, `count_repetitions` and
/// `all_repetitions` never do.
#[derive(Debug, Clone)]
pub struct Message {
    library: Arc<SchemaLibrary>,
    length_policy: LengthPolicy,
    nodes: Vec<Node>,
}

/// A field, or a component of one, whose text is outside its length limits.
///
/// Field limits come from the segment's slot declaration. Component limits
/// come from the `maxLength` of the primitive data type in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthViolation {
    pub path: String,
    pub field: String,
    pub data_type: String,
    pub length: usize,
    pub min_length: u32,
    pub max_length: Option<u32>,
}

impl Message {
    /// Create an empty message for `structure` (e.g. "ADT_A01").
    pub fn new(library: Arc<SchemaLibrary>, structure: &str) -> Result<Self> {
        Self::with_config(library, structure, &ModelConfig::default())
    }

    pub fn with_config(
        library: Arc<SchemaLibrary>,
        structure: &str,
        config: &ModelConfig,
    ) -> Result<Self> {
        let table = Arc::clone(library.message(structure)?);
        let root = Node::Group(Group {
            children: BranchingContainer::new(table),
            parent: None,
        });

        tracing::debug!("Created {} message {}", library.version(), structure);

        Ok(Self {
            library,
            length_policy: config.length_policy,
            nodes: vec![root],
        })
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Message structure name, e.g. "ORU_R01".
    pub fn structure(&self) -> &str {
        self.root_group().name()
    }

    pub fn version(&self) -> Hl7Version {
        self.library.version()
    }

    pub fn library(&self) -> &Arc<SchemaLibrary> {
        &self.library
    }

    /// Number of materialized nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// # Panics
    ///
    /// If `id` was not issued by this message.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn group(&self, id: NodeId) -> Result<&Group> {
        self.node(id).as_group()
    }

    pub fn segment(&self, id: NodeId) -> Result<&Segment> {
        self.node(id).as_segment()
    }

    pub fn field(&self, id: NodeId) -> Result<&Field> {
        self.node(id).as_field()
    }

    pub fn element(&self, id: NodeId) -> Result<&Element> {
        self.field(id).map(Field::element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.nodes[id.0] {
            Node::Field(field) => Ok(&mut field.element),
            other => Err(Hl7Error::KindMismatch {
                expected: "field",
                found: other.kind_label(),
            }),
        }
    }

    /// Non-owning back-reference; `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent()
    }

    pub fn container(&self, id: NodeId) -> Result<&BranchingContainer<NodeId>> {
        self.node(id).container()
    }

    /// First repetition of `name` under `parent`, created if needed.
    pub fn get_first(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.get_repetition(parent, name, 0)
    }

    /// Repetition `repetition` of `name` under `parent`.
    ///
    /// Returns the existing node when there is one. Otherwise the node is
    /// created, which is only allowed for the next repetition in sequence
    /// and within the slot's declared bound.
    pub fn get_repetition(&mut self, parent: NodeId, name: &str, repetition: usize) -> Result<NodeId> {
        let container = self.container(parent)?;
        let vacant = match container.lookup(name, repetition)? {
            Lookup::Occupied(id) => return Ok(*id),
            Lookup::Vacant(vacant) => vacant,
        };
        let kind = container.table().as_slice()[vacant.slot()].kind.clone();

        let node = self.instantiate(&kind, parent, vacant.slot())?;
        let id = self.insert(node);
        self.nodes[parent.0].container_mut()?.fill(vacant, id);

        tracing::debug!(
            "Materialized {} {}({}) under {} as {}",
            kind.label(),
            name,
            repetition,
            self.container(parent)?.name(),
            id
        );
        Ok(id)
    }

    pub fn peek(&self, parent: NodeId, name: &str, repetition: usize) -> Result<Option<NodeId>> {
        Ok(self.container(parent)?.peek(name, repetition)?.copied())
    }

    pub fn count_repetitions(&self, parent: NodeId, name: &str) -> Result<usize> {
        self.container(parent)?.count_repetitions(name)
    }

    pub fn all_repetitions(&self, parent: NodeId, name: &str) -> Result<&[NodeId]> {
        self.container(parent)?.all_repetitions(name)
    }

    /// Slots of a group or segment in declared order with their current
    /// children. This is the traversal an encoder uses.
    pub fn slots(&self, id: NodeId) -> Result<impl Iterator<Item = (&SlotDeclaration, &[NodeId])>> {
        Ok(self.container(id)?.slots())
    }

    /// Field `number` (one-based, as in PID-5) of a segment.
    pub fn get_field(&mut self, segment: NodeId, number: usize, repetition: usize) -> Result<NodeId> {
        let name = self.field_name(segment, number)?;
        self.get_repetition(segment, &name, repetition)
    }

    /// The declaration a field node was created from.
    pub fn field_declaration(&self, id: NodeId) -> Result<&SlotDeclaration> {
        let field = self.field(id)?;
        let table = self.container(field.parent)?.table();
        Ok(&table.as_slice()[field.slot])
    }

    /// Set the leading primitive of a field.
    pub fn set_value(&mut self, field: NodeId, value: impl Into<String>) -> Result<()> {
        let element = self.element_mut(field)?;
        let type_name = element.type_name().to_string();
        let primitive = element.first_primitive_mut().ok_or(Hl7Error::KindMismatch {
            expected: "primitive",
            found: "composite",
        })?;
        primitive.set_value(value);
        tracing::trace!("Set value of {} field {}", type_name, field);
        self.check_length(field)
    }

    pub fn value(&self, field: NodeId) -> Result<Option<&str>> {
        Ok(self.element(field)?.value())
    }

    /// Resolve a path to its segment or field node, creating nodes on the way.
    pub fn locate(&mut self, path: &str) -> Result<NodeId> {
        let parsed = Hl7Path::parse(path)?;
        let segment = self.resolve_steps(path, &parsed)?;
        match parsed.field {
            Some(spec) => self.get_field(segment, spec.field, spec.repetition),
            None => Ok(segment),
        }
    }

    /// Read the value at a path.
    ///
    /// Like every `get_*` accessor this creates the nodes along the path.
    pub fn get(&mut self, path: &str) -> Result<Option<&str>> {
        let (field, spec) = self.locate_field(path)?;
        let element = self.element(field)?;
        let leaf = address(element, &spec)?;
        Ok(leaf.value())
    }

    /// Write the value at a path.
    pub fn set(&mut self, path: &str, value: impl Into<String>) -> Result<()> {
        let (field, spec) = self.locate_field(path)?;
        let element = self.element_mut(field)?;
        let leaf = address_mut(element, &spec)?;
        let found = leaf.kind_label();
        let primitive = leaf.first_primitive_mut().ok_or(Hl7Error::KindMismatch {
            expected: "primitive",
            found,
        })?;
        primitive.set_value(value);
        self.check_length(field)
    }

    /// Terser-style path of a node, e.g. `/PATIENT_RESULT(0)/PID(0)-5(1)`.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let (slot, repetition) = self.position_in(parent, current);
            let text = match self.node(current) {
                Node::Field(field) => format!("-{}({})", field.number(), repetition),
                _ => format!("/{}({})", slot, repetition),
            };
            parts.push(text);
            current = parent;
        }
        parts.reverse();
        if parts.is_empty() {
            "/".to_string()
        } else {
            parts.concat()
        }
    }

    /// All materialized nodes below `id` in depth-first declared order,
    /// paired with their depth relative to `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        self.collect_descendants(id, 1, &mut out);
        out
    }

    /// Required slots that have no repetition under a materialized parent.
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for id in std::iter::once(ROOT).chain(self.descendants(ROOT).into_iter().map(|(_, id)| id)) {
            let Ok(container) = self.container(id) else {
                continue;
            };
            let base = self.path_of(id);
            let base = if base == "/" { String::new() } else { base };
            for (position, (declaration, children)) in container.slots().enumerate() {
                if declaration.required && children.is_empty() {
                    let path = match declaration.kind {
                        SlotKind::Field(_) => format!("{base}-{}", position + 1),
                        _ => format!("{base}/{}", declaration.name),
                    };
                    missing.push(path);
                }
            }
        }
        missing
    }

    /// Materialized fields whose text length breaks the declared limits.
    /// Empty fields are not reported.
    pub fn length_violations(&self) -> Vec<LengthViolation> {
        self.nodes
            .iter()
            .enumerate()
            .flat_map(|(index, node)| match node {
                Node::Field(field) => self.field_length_violations(NodeId(index), field),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Materialize every required slot, recursively, starting at the root.
    pub fn build_required(&mut self) -> Result<()> {
        self.build_required_under(ROOT)
    }

    fn build_required_under(&mut self, id: NodeId) -> Result<()> {
        let required: Vec<String> = match self.container(id) {
            Ok(container) => container
                .table()
                .iter()
                .filter(|slot| slot.required)
                .map(|slot| slot.name.clone())
                .collect(),
            Err(_) => return Ok(()),
        };

        for name in required {
            self.get_first(id, &name)?;
        }

        // Optional children created earlier by the caller need their own
        // required slots too.
        let children: Vec<NodeId> = self
            .container(id)?
            .slots()
            .flat_map(|(_, children)| children.iter().copied())
            .collect();
        for child in children {
            self.build_required_under(child)?;
        }
        Ok(())
    }

    fn root_group(&self) -> &Group {
        match &self.nodes[ROOT.0] {
            Node::Group(group) => group,
            _ => unreachable!("message root is always a group"),
        }
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn instantiate(&self, kind: &SlotKind, parent: NodeId, slot: usize) -> Result<Node> {
        Ok(match kind {
            SlotKind::Segment(name) => Node::Segment(Segment {
                fields: BranchingContainer::new(Arc::clone(self.library.segment(name)?)),
                parent,
            }),
            SlotKind::Group(name) => Node::Group(Group {
                children: BranchingContainer::new(Arc::clone(self.library.group(name)?)),
                parent: Some(parent),
            }),
            SlotKind::Field(data_type) => Node::Field(Field {
                element: self.library.build_element(data_type)?,
                parent,
                slot,
            }),
        })
    }

    fn field_name(&self, segment: NodeId, number: usize) -> Result<String> {
        let segment = self.segment(segment)?;
        let table = segment.fields().table();
        number
            .checked_sub(1)
            .and_then(|position| table.slot_at(position))
            .map(|slot| slot.name.clone())
            .ok_or_else(|| Hl7Error::UnknownSlot {
                container: table.name().to_string(),
                name: format!("{}-{}", table.name(), number),
            })
    }

    fn locate_field(&mut self, path: &str) -> Result<(NodeId, FieldSpec)> {
        let parsed = Hl7Path::parse(path)?;
        let spec = parsed
            .field
            .ok_or_else(|| Hl7Error::invalid_path(path, "path does not reach a field"))?;
        let segment = self.resolve_steps(path, &parsed)?;
        let field = self.get_field(segment, spec.field, spec.repetition)?;
        Ok((field, spec))
    }

    fn resolve_steps(&mut self, path: &str, parsed: &Hl7Path) -> Result<NodeId> {
        let mut current = ROOT;
        for step in &parsed.steps {
            if step.search {
                let table = Arc::clone(self.container(current)?.table());
                let route = find_slot(&self.library, &table, &step.name).ok_or_else(|| {
                    Hl7Error::invalid_path(
                        path,
                        format!("no slot named '{}' below '{}'", step.name, table.name()),
                    )
                })?;
                let Some((last, groups)) = route.split_last() else {
                    return Err(Hl7Error::invalid_path(path, "empty search route"));
                };
                for group in groups {
                    current = self.get_first(current, group)?;
                }
                current = self.get_repetition(current, last, step.repetition)?;
            } else {
                current = self.get_repetition(current, &step.name, step.repetition)?;
            }
        }

        if !matches!(self.node(current), Node::Segment(_)) && parsed.field.is_some() {
            return Err(Hl7Error::invalid_path(
                path,
                format!("'{}' is not a segment", parsed.target().name),
            ));
        }
        Ok(current)
    }

    fn position_in(&self, parent: NodeId, child: NodeId) -> (String, usize) {
        if let Ok(container) = self.container(parent) {
            for (declaration, children) in container.slots() {
                if let Some(repetition) = children.iter().position(|c| *c == child) {
                    return (declaration.name.clone(), repetition);
                }
            }
        }
        unreachable!("{child} is not a child of {parent}")
    }

    fn collect_descendants(&self, id: NodeId, depth: usize, out: &mut Vec<(usize, NodeId)>) {
        let Ok(container) = self.container(id) else {
            return;
        };
        for (_, children) in container.slots() {
            for child in children {
                out.push((depth, *child));
                self.collect_descendants(*child, depth + 1, out);
            }
        }
    }

    fn field_length_violations(&self, id: NodeId, field: &Field) -> Vec<LengthViolation> {
        let Ok(declaration) = self.field_declaration(id) else {
            return Vec::new();
        };
        let path = self.path_of(id);
        let mut violations = Vec::new();

        let length = field.element.text_len();
        if length > 0 && !declaration.length_fits(length) {
            violations.push(LengthViolation {
                path: path.clone(),
                field: declaration.name.clone(),
                data_type: field.element.type_name().to_string(),
                length,
                min_length: declaration.min_length,
                max_length: declaration.max_length,
            });
        }

        match &field.element {
            // The field limit already covers the whole value.
            Element::Primitive(_) if !violations.is_empty() => {}
            element => self.collect_type_overruns(&path, &declaration.name, element, &mut violations),
        }
        violations
    }

    /// Primitive values longer than their data type's `maxLength`, with
    /// component positions appended to `path`.
    fn collect_type_overruns(
        &self,
        path: &str,
        field: &str,
        element: &Element,
        out: &mut Vec<LengthViolation>,
    ) {
        match element {
            Element::Primitive(primitive) => {
                let Some(max) = self.library.max_length(primitive.type_name()) else {
                    return;
                };
                let length = primitive.value().map_or(0, str::len);
                if length as u64 > u64::from(max) {
                    out.push(LengthViolation {
                        path: path.to_string(),
                        field: field.to_string(),
                        data_type: primitive.type_name().to_string(),
                        length,
                        min_length: 0,
                        max_length: Some(max),
                    });
                }
            }
            Element::Composite(composite) => {
                for (index, component) in composite.components().iter().enumerate() {
                    let nested = format!("{path}-{}", index + 1);
                    self.collect_type_overruns(&nested, field, &component.element, out);
                }
            }
        }
    }

    fn check_length(&self, id: NodeId) -> Result<()> {
        if self.length_policy == LengthPolicy::Ignore {
            return Ok(());
        }
        for violation in self.field_length_violations(id, self.field(id)?) {
            tracing::warn!(
                "Value of {} ({}, {}) is {} characters; declared limits are {}..{}",
                violation.path,
                violation.field,
                violation.data_type,
                violation.length,
                violation.min_length,
                violation
                    .max_length
                    .map_or_else(|| "*".to_string(), |max| max.to_string())
            );
        }
        Ok(())
    }
}

/// Route of slot names from `table` down to the first slot named `name`,
/// searching declared groups depth-first in declaration order.
fn find_slot(library: &SchemaLibrary, table: &SlotTable, name: &str) -> Option<Vec<String>> {
    for slot in table.iter() {
        if slot.name == name {
            return Some(vec![slot.name.clone()]);
        }
        if let SlotKind::Group(group) = &slot.kind {
            let nested = library.group(group).ok()?;
            if let Some(mut route) = find_slot(library, nested, name) {
                route.insert(0, slot.name.clone());
                return Some(route);
            }
        }
    }
    None
}

fn address<'a>(element: &'a Element, spec: &FieldSpec) -> Result<&'a Element> {
    let mut current = element;
    for position in [spec.component, spec.subcomponent].into_iter().flatten() {
        if let Element::Primitive(primitive) = current {
            check_primitive_position(primitive.type_name(), position)?;
            continue;
        }
        current = current.as_composite()?.component_by_position(position)?;
    }
    Ok(current)
}

fn address_mut<'a>(element: &'a mut Element, spec: &FieldSpec) -> Result<&'a mut Element> {
    let mut current = element;
    for position in [spec.component, spec.subcomponent].into_iter().flatten() {
        if let Element::Primitive(primitive) = &*current {
            check_primitive_position(primitive.type_name(), position)?;
            continue;
        }
        current = current.as_composite_mut()?.component_by_position_mut(position)?;
    }
    Ok(current)
}

/// A primitive stands in for its own first component.
fn check_primitive_position(type_name: &str, position: usize) -> Result<()> {
    if position == 1 {
        return Ok(());
    }
    Err(Hl7Error::IndexOutOfRange {
        type_name: type_name.to_string(),
        index: position as i64 - 1,
        arity: 1,
    })
}
