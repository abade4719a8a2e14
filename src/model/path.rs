//! Terser-style location paths.
//!
//! A path walks from the message root through groups to a segment and,
//! optionally, into a field:
//!
//! ```text
//! /PATIENT_RESULT(0)/ORDER_OBSERVATION(1)/OBX(2)-5(0)-1-2
//! /.PID-3(1)-1
//! MSH-9-2
//! ```
//!
//! Group and segment repetitions and field repetitions are zero-based and
//! default to 0. Field, component and subcomponent numbers are HL7
//! one-based positions. A `.` before a name searches the declared
//! structure below the current group for the first slot with that name.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::error::{Hl7Error, Result};

static STEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\.)?([A-Za-z0-9_]+)(?:\((\d+)\))?$").expect("step pattern is valid")
});

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)(?:\((\d+)\))?(?:-(\d+))?(?:-(\d+))?$").expect("field pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub name: String,
    pub repetition: usize,
    pub search: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: usize,
    pub repetition: usize,
    pub component: Option<usize>,
    pub subcomponent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hl7Path {
    pub steps: Vec<PathStep>,
    pub field: Option<FieldSpec>,
}

impl Hl7Path {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(Hl7Error::invalid_path(path, "path is empty"));
        }

        let raw_steps: Vec<&str> = trimmed.split('/').collect();
        let last_index = raw_steps.len() - 1;
        let mut steps = Vec::with_capacity(raw_steps.len());
        let mut field = None;

        for (index, raw) in raw_steps.iter().enumerate() {
            let step_text = if index == last_index {
                match raw.split_once('-') {
                    Some((step, field_text)) => {
                        field = Some(parse_field(path, field_text)?);
                        step
                    }
                    None => raw,
                }
            } else {
                raw
            };
            steps.push(parse_step(path, step_text)?);
        }

        Ok(Self { steps, field })
    }

    /// The segment or group the path ends on.
    pub fn target(&self) -> &PathStep {
        &self.steps[self.steps.len() - 1]
    }
}

fn parse_step(path: &str, text: &str) -> Result<PathStep> {
    let captures = STEP
        .captures(text)
        .ok_or_else(|| Hl7Error::invalid_path(path, format!("'{text}' is not a group or segment")))?;

    Ok(PathStep {
        search: captures.get(1).is_some(),
        name: captures[2].to_string(),
        repetition: number(path, captures.get(3).map(|m| m.as_str()))?.unwrap_or(0),
    })
}

fn parse_field(path: &str, text: &str) -> Result<FieldSpec> {
    let captures = FIELD.captures(text).ok_or_else(|| {
        Hl7Error::invalid_path(path, format!("'{text}' is not a field specification"))
    })?;

    let field = number(path, Some(&captures[1]))?.unwrap_or(0);
    if field == 0 {
        return Err(Hl7Error::invalid_path(path, "field numbers start at 1"));
    }

    Ok(FieldSpec {
        field,
        repetition: number(path, captures.get(2).map(|m| m.as_str()))?.unwrap_or(0),
        component: number(path, captures.get(3).map(|m| m.as_str()))?,
        subcomponent: number(path, captures.get(4).map(|m| m.as_str()))?,
    })
}

fn number(path: &str, text: Option<&str>) -> Result<Option<usize>> {
    text.map(|t| {
        t.parse::<usize>()
            .map_err(|_| Hl7Error::invalid_path(path, format!("'{t}' is out of range")))
    })
    .transpose()
}

impl FromStr for Hl7Path {
    type Err = Hl7Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Hl7Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            f.write_str("/")?;
            if step.search {
                f.write_str(".")?;
            }
            write!(f, "{}({})", step.name, step.repetition)?;
        }
        if let Some(field) = &self.field {
            write!(f, "-{}({})", field.field, field.repetition)?;
            if let Some(component) = field.component {
                write!(f, "-{component}")?;
            }
            if let Some(subcomponent) = field.subcomponent {
                write!(f, "-{subcomponent}")?;
            }
        }
        Ok(())
    }
}
