use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::{Component, Composite, Element, MaxOccurs, Primitive, SlotDeclaration, SlotKind, SlotTable};
use crate::core::Hl7Version;
use crate::error::{Hl7Error, Result};

/// Serialized form of one protocol version's tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub version: Hl7Version,

    #[serde(default)]
    pub data_types: BTreeMap<String, DataTypeDefinition>,

    #[serde(default)]
    pub segments: BTreeMap<String, SegmentDefinition>,

    #[serde(default)]
    pub groups: BTreeMap<String, GroupDefinition>,

    #[serde(default)]
    pub messages: BTreeMap<String, GroupDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataTypeDefinition {
    Primitive {
        #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Composite {
        components: Vec<ComponentDefinition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDefinition {
    pub label: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
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

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub children: Vec<ChildDefinition>,
}

/// One child of a group: exactly one of `segment` or `group` is set.
/// `name` defaults to the segment id, and must be given for groups and for
/// segments that appear twice in the same group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_occurs: MaxOccurs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extensions: HashMap<String, serde_json::Value>,
}

impl DataTypeDefinition {
    pub fn description(&self) -> Option<&str> {
        match self {
            DataTypeDefinition::Primitive { description, .. }
            | DataTypeDefinition::Composite { description, .. } => description.as_deref(),
        }
    }
}

/// Copy the optional documentation of a definition onto its declaration.
fn annotate(
    mut declaration: SlotDeclaration,
    description: &Option<String>,
    extensions: &HashMap<String, serde_json::Value>,
) -> SlotDeclaration {
    if let Some(description) = description {
        declaration = declaration.with_description(description.clone());
    }
    for (key, value) in extensions {
        declaration = declaration.with_extension(key.clone(), value.clone());
    }
    declaration
}

impl FieldDefinition {
    fn to_declaration(&self) -> SlotDeclaration {
        let mut declaration = SlotDeclaration::field(&self.name, &self.data_type)
            .with_required(self.required)
            .with_max_occurs(self.max_occurs)
            .with_length(self.min_length, self.max_length);
        if let Some(table) = self.table {
            declaration = declaration.with_table(table);
        }
        annotate(declaration, &self.description, &self.extensions)
    }
}

impl ChildDefinition {
    fn to_declaration(&self, owner: &str) -> Result<SlotDeclaration> {
        let kind = match (&self.segment, &self.group) {
            (Some(segment), None) => SlotKind::Segment(segment.clone()),
            (None, Some(group)) => SlotKind::Group(group.clone()),
            _ => {
                return Err(Hl7Error::configuration(format!(
                    "A child of '{owner}' must name exactly one segment or group"
                )));
            }
        };
        let name = match (&self.name, &kind) {
            (Some(name), _) => name.clone(),
            (None, SlotKind::Segment(segment)) => segment.clone(),
            (None, _) => {
                return Err(Hl7Error::configuration(format!(
                    "Group child '{}' of '{owner}' needs an explicit slot name",
                    kind.structure()
                )));
            }
        };

        let declaration = SlotDeclaration::new(name, kind)
            .with_required(self.required)
            .with_max_occurs(self.max_occurs);
        Ok(annotate(declaration, &self.description, &self.extensions))
    }
}

/// The resolved, immutable tables for one protocol version.
///
/// Every slot table has gone through [`SlotTable::declare`], every reference
/// to a segment, group or data type resolves, and no composite contains
/// itself. Tables are shared through `Arc` by all messages built from the
/// library.
#[derive(Debug)]
pub struct SchemaLibrary {
    version: Hl7Version,
    data_types: HashMap<String, DataTypeDefinition>,
    segments: HashMap<String, Arc<SlotTable>>,
    groups: HashMap<String, Arc<SlotTable>>,
    messages: HashMap<String, Arc<SlotTable>>,
    descriptions: HashMap<String, String>,
}

impl SchemaLibrary {
    pub fn builder(version: Hl7Version) -> SchemaLibraryBuilder {
        SchemaLibraryBuilder::new(version)
    }

    pub fn from_document(document: &SchemaDocument) -> Result<Self> {
        let mut builder = SchemaLibraryBuilder::new(document.version);

        for (name, definition) in &document.data_types {
            builder = builder.data_type(name.clone(), definition.clone());
        }

        for (name, segment) in &document.segments {
            let mut table = SlotTable::new(name.clone());
            for field in &segment.fields {
                table.declare(field.to_declaration())?;
            }
            builder = builder.segment(table);
            if let Some(description) = &segment.description {
                builder = builder.describe(name.clone(), description.clone());
            }
        }

        for (name, group) in &document.groups {
            builder = builder.group(Self::group_table(name, group)?);
            if let Some(description) = &group.description {
                builder = builder.describe(name.clone(), description.clone());
            }
        }

        for (name, message) in &document.messages {
            builder = builder.message(Self::group_table(name, message)?);
            if let Some(description) = &message.description {
                builder = builder.describe(name.clone(), description.clone());
            }
        }

        builder.build()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        Self::from_document(&document)
    }

    fn group_table(name: &str, definition: &GroupDefinition) -> Result<SlotTable> {
        let mut table = SlotTable::new(name);
        for child in &definition.children {
            table.declare(child.to_declaration(name)?)?;
        }
        Ok(table)
    }

    pub fn version(&self) -> Hl7Version {
        self.version
    }

    pub fn segment(&self, name: &str) -> Result<&Arc<SlotTable>> {
        self.segments
            .get(name)
            .ok_or_else(|| self.unknown("segment", name))
    }

    pub fn group(&self, name: &str) -> Result<&Arc<SlotTable>> {
        self.groups.get(name).ok_or_else(|| self.unknown("group", name))
    }

    pub fn message(&self, name: &str) -> Result<&Arc<SlotTable>> {
        self.messages
            .get(name)
            .ok_or_else(|| self.unknown("message", name))
    }

    pub fn data_type(&self, name: &str) -> Result<&DataTypeDefinition> {
        self.data_types
            .get(name)
            .ok_or_else(|| self.unknown("data type", name))
    }

    /// Declared `maxLength` of a primitive data type, if any.
    pub fn max_length(&self, type_name: &str) -> Option<u32> {
        match self.data_types.get(type_name)? {
            DataTypeDefinition::Primitive { max_length, .. } => *max_length,
            DataTypeDefinition::Composite { .. } => None,
        }
    }

    /// Description of a data type, segment, group or message, if one was given.
    pub fn description(&self, name: &str) -> Option<&str> {
        if let Some(definition) = self.data_types.get(name) {
            return definition.description();
        }
        self.descriptions.get(name).map(String::as_str)
    }

    pub fn has_message(&self, name: &str) -> bool {
        self.messages.contains_key(name)
    }

    pub fn message_names(&self) -> Vec<&str> {
        sorted_keys(&self.messages)
    }

    pub fn segment_names(&self) -> Vec<&str> {
        sorted_keys(&self.segments)
    }

    pub fn group_names(&self) -> Vec<&str> {
        sorted_keys(&self.groups)
    }

    pub fn data_type_names(&self) -> Vec<&str> {
        sorted_keys(&self.data_types)
    }

    /// Build a fresh element of `type_name`, creating every component of a
    /// composite eagerly in declared order.
    pub fn build_element(&self, type_name: &str) -> Result<Element> {
        match self.data_type(type_name)? {
            DataTypeDefinition::Primitive { .. } => {
                Ok(Element::Primitive(Primitive::new(type_name, self.version)))
            }
            DataTypeDefinition::Composite { components, .. } => {
                let components = components
                    .iter()
                    .map(|component| {
                        Ok(Component {
                            label: component.label.clone(),
                            element: self.build_element(&component.data_type)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Element::Composite(Composite::new(type_name, components)))
            }
        }
    }

    fn unknown(&self, kind: &'static str, name: &str) -> Hl7Error {
        Hl7Error::UnknownStructure {
            kind,
            name: name.to_string(),
            version: self.version,
        }
    }
}

impl fmt::Display for SchemaLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HL7 {} ({} messages, {} groups, {} segments, {} data types)",
            self.version,
            self.messages.len(),
            self.groups.len(),
            self.segments.len(),
            self.data_types.len()
        )
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Collects tables for one version and resolves them into a [`SchemaLibrary`].
#[derive(Debug)]
pub struct SchemaLibraryBuilder {
    version: Hl7Version,
    data_types: HashMap<String, DataTypeDefinition>,
    segments: Vec<SlotTable>,
    groups: Vec<SlotTable>,
    messages: Vec<SlotTable>,
    descriptions: HashMap<String, String>,
}

impl SchemaLibraryBuilder {
    pub fn new(version: Hl7Version) -> Self {
        Self {
            version,
            data_types: HashMap::new(),
            segments: Vec::new(),
            groups: Vec::new(),
            messages: Vec::new(),
            descriptions: HashMap::new(),
        }
    }

    pub fn data_type(mut self, name: impl Into<String>, definition: DataTypeDefinition) -> Self {
        self.data_types.insert(name.into(), definition);
        self
    }

    pub fn primitive(self, name: impl Into<String>) -> Self {
        self.data_type(
            name,
            DataTypeDefinition::Primitive {
                max_length: None,
                description: None,
            },
        )
    }

    /// Register a composite from `(label, data type)` pairs.
    pub fn composite(self, name: impl Into<String>, components: &[(&str, &str)]) -> Self {
        let components = components
            .iter()
            .map(|(label, data_type)| ComponentDefinition {
                label: label.to_string(),
                data_type: data_type.to_string(),
            })
            .collect();
        self.data_type(
            name,
            DataTypeDefinition::Composite {
                components,
                description: None,
            },
        )
    }

    /// Attach a description to a segment, group or message table.
    pub fn describe(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.descriptions.insert(name.into(), description.into());
        self
    }

    pub fn segment(mut self, table: SlotTable) -> Self {
        self.segments.push(table);
        self
    }

    pub fn group(mut self, table: SlotTable) -> Self {
        self.groups.push(table);
        self
    }

    pub fn message(mut self, table: SlotTable) -> Self {
        self.messages.push(table);
        self
    }

    pub fn build(self) -> Result<SchemaLibrary> {
        self.check_data_types()?;

        let segments = Self::index("segment", self.segments)?;
        let groups = Self::index("group", self.groups)?;
        let messages = Self::index("message", self.messages)?;

        for table in segments.values() {
            for slot in table.iter() {
                match &slot.kind {
                    SlotKind::Field(data_type) if self.data_types.contains_key(data_type) => {}
                    SlotKind::Field(data_type) => {
                        return Err(unresolved(table, "data type", data_type));
                    }
                    other => {
                        return Err(Hl7Error::configuration(format!(
                            "Segment '{}' declares {} slot '{}'; segments only hold fields",
                            table.name(),
                            other.label(),
                            slot.name
                        )));
                    }
                }
            }
        }

        for table in groups.values().chain(messages.values()) {
            for slot in table.iter() {
                match &slot.kind {
                    SlotKind::Segment(segment) if segments.contains_key(segment) => {}
                    SlotKind::Group(group) if groups.contains_key(group) => {}
                    SlotKind::Segment(segment) => {
                        return Err(unresolved(table, "segment", segment));
                    }
                    SlotKind::Group(group) => return Err(unresolved(table, "group", group)),
                    SlotKind::Field(_) => {
                        return Err(Hl7Error::configuration(format!(
                            "Group '{}' declares field slot '{}'; groups only hold segments and groups",
                            table.name(),
                            slot.name
                        )));
                    }
                }
            }
        }

        check_group_nesting(&groups)?;

        tracing::info!(
            "Built HL7 {} schema library: {} messages, {} groups, {} segments, {} data types",
            self.version,
            messages.len(),
            groups.len(),
            segments.len(),
            self.data_types.len()
        );

        Ok(SchemaLibrary {
            version: self.version,
            data_types: self.data_types,
            segments,
            groups,
            messages,
            descriptions: self.descriptions,
        })
    }

    fn index(kind: &str, tables: Vec<SlotTable>) -> Result<HashMap<String, Arc<SlotTable>>> {
        let mut indexed = HashMap::with_capacity(tables.len());
        for table in tables {
            let name = table.name().to_string();
            if indexed.insert(name.clone(), Arc::new(table)).is_some() {
                return Err(Hl7Error::configuration(format!(
                    "{kind} '{name}' is registered twice"
                )));
            }
        }
        Ok(indexed)
    }

    /// Every component type must exist and no composite may reach itself.
    fn check_data_types(&self) -> Result<()> {
        for (name, definition) in &self.data_types {
            if let DataTypeDefinition::Composite { components, .. } = definition {
                if components.is_empty() {
                    return Err(Hl7Error::configuration(format!(
                        "Composite '{name}' has no components"
                    )));
                }
                for component in components {
                    if !self.data_types.contains_key(&component.data_type) {
                        return Err(Hl7Error::UnresolvedReference {
                            owner: name.clone(),
                            kind: "data type",
                            name: component.data_type.clone(),
                        });
                    }
                }
            }
        }

        let mut done = HashSet::new();
        for name in self.data_types.keys() {
            let mut path = Vec::new();
            self.visit_data_type(name, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn visit_data_type<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(Hl7Error::RecursiveDataType {
                name: name.to_string(),
            });
        }

        path.push(name);
        if let Some(DataTypeDefinition::Composite { components, .. }) = self.data_types.get(name) {
            for component in components {
                self.visit_data_type(&component.data_type, path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }
}

fn unresolved(table: &SlotTable, kind: &'static str, name: &str) -> Hl7Error {
    Hl7Error::UnresolvedReference {
        owner: table.name().to_string(),
        kind,
        name: name.to_string(),
    }
}

/// A group may not contain itself, directly or through nested groups.
fn check_group_nesting(groups: &HashMap<String, Arc<SlotTable>>) -> Result<()> {
    fn visit<'a>(
        name: &'a str,
        groups: &'a HashMap<String, Arc<SlotTable>>,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(Hl7Error::configuration(format!(
                "Group '{name}' contains itself"
            )));
        }
        path.push(name);
        if let Some(table) = groups.get(name) {
            for slot in table.iter() {
                if let SlotKind::Group(child) = &slot.kind {
                    visit(child, groups, path, done)?;
                }
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }

    let mut done = HashSet::new();
    for name in groups.keys() {
        visit(name, groups, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}
