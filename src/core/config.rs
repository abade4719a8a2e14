use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Hl7Error, Result};

/// Settings for building registries and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub version: Hl7Version,
    pub length_policy: LengthPolicy,
    pub load_embedded_schemas: bool,
    #[serde(default)]
    pub schema_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hl7Version {
    #[serde(rename = "2.1")]
    V2_1,
    #[serde(rename = "2.2")]
    V2_2,
    #[serde(rename = "2.3")]
    V2_3,
    #[serde(rename = "2.3.1")]
    V2_3_1,
    #[serde(rename = "2.4")]
    V2_4,
    #[serde(rename = "2.5")]
    V2_5,
    #[serde(rename = "2.5.1")]
    V2_5_1,
    #[serde(rename = "2.6")]
    V2_6,
    #[serde(rename = "2.7")]
    V2_7,
    #[serde(rename = "2.7.1")]
    V2_7_1,
    #[serde(rename = "2.8")]
    V2_8,
    #[serde(rename = "2.8.1")]
    V2_8_1,
    #[serde(rename = "2.8.2")]
    V2_8_2,
}

/// What to do when a field value is longer than its declared maximum.
///
/// Lengths are advisory at the structural layer: the value is always stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthPolicy {
    Ignore,
    #[default]
    Warn,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            version: Hl7Version::V2_5,
            length_policy: LengthPolicy::Warn,
            load_embedded_schemas: cfg!(feature = "embedded-schemas"),
            schema_paths: Vec::new(),
        }
    }
}

impl ModelConfig {
    pub fn for_version(version: Hl7Version) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    pub fn with_length_policy(mut self, length_policy: LengthPolicy) -> Self {
        self.length_policy = length_policy;
        self
    }

    pub fn with_embedded_schemas(mut self, enabled: bool) -> Self {
        self.load_embedded_schemas = enabled;
        self
    }

    /// Add a schema document to load when a registry is built from this config.
    pub fn add_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_paths.push(path.into());
        self
    }

    /// Read a configuration from a JSON file. Missing keys fall back to the
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let mut merged = serde_json::to_value(Self::default())?;

        match (&mut merged, value) {
            (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
                base.extend(overrides);
            }
            _ => {
                return Err(Hl7Error::configuration(format!(
                    "{} must contain a JSON object",
                    path.as_ref().display()
                )));
            }
        }

        Ok(serde_json::from_value(merged)?)
    }
}

impl Hl7Version {
    pub fn all() -> &'static [Hl7Version] {
        &[
            Hl7Version::V2_1,
            Hl7Version::V2_2,
            Hl7Version::V2_3,
            Hl7Version::V2_3_1,
            Hl7Version::V2_4,
            Hl7Version::V2_5,
            Hl7Version::V2_5_1,
            Hl7Version::V2_6,
            Hl7Version::V2_7,
            Hl7Version::V2_7_1,
            Hl7Version::V2_8,
            Hl7Version::V2_8_1,
            Hl7Version::V2_8_2,
        ]
    }

    /// The version string as carried in MSH-12.
    pub fn as_str(&self) -> &'static str {
        match self {
            Hl7Version::V2_1 => "2.1",
            Hl7Version::V2_2 => "2.2",
            Hl7Version::V2_3 => "2.3",
            Hl7Version::V2_3_1 => "2.3.1",
            Hl7Version::V2_4 => "2.4",
            Hl7Version::V2_5 => "2.5",
            Hl7Version::V2_5_1 => "2.5.1",
            Hl7Version::V2_6 => "2.6",
            Hl7Version::V2_7 => "2.7",
            Hl7Version::V2_7_1 => "2.7.1",
            Hl7Version::V2_8 => "2.8",
            Hl7Version::V2_8_1 => "2.8.1",
            Hl7Version::V2_8_2 => "2.8.2",
        }
    }

    /// Short identifier used for file names (e.g. "v25", "v231")
    pub fn short_name(&self) -> String {
        format!("v{}", self.as_str().replace('.', ""))
    }

    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let normalized = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == normalized || v.as_str().replace('.', "") == normalized)
    }
}

impl fmt::Display for Hl7Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hl7Version {
    type Err = Hl7Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Hl7Error::UnsupportedVersion {
            version: s.to_string(),
        })
    }
}
