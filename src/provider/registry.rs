use std::path::Path;
use std::sync::Arc;

use crate::core::{Hl7Version, ModelConfig};
use crate::error::{Hl7Error, Result};
use crate::model::Message;
use crate::types::SchemaLibrary;

/// Resolved schema libraries keyed by protocol version.
///
/// Registration goes through `&self`, so a registry can be shared between
/// threads behind an `Arc` while messages are created from it.
#[derive(Debug)]
pub struct SchemaRegistry {
    libraries: papaya::HashMap<Hl7Version, Arc<SchemaLibrary>>,
    config: ModelConfig,
}

impl SchemaRegistry {
    /// An empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// An empty registry; nothing is loaded until asked for.
    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            libraries: papaya::HashMap::new(),
            config,
        }
    }

    /// A registry holding whatever `config` asks for: the embedded tables
    /// when enabled, then every file in `schema_paths` in order.
    pub fn from_config(config: ModelConfig) -> Result<Self> {
        let registry = Self::with_config(config);

        if registry.config.load_embedded_schemas {
            registry.load_embedded()?;
        }
        for path in &registry.config.schema_paths {
            registry.load_file(path)?;
        }

        tracing::info!(
            "Schema registry ready with {} version(s)",
            registry.libraries.len()
        );
        Ok(registry)
    }

    /// A registry preloaded with every embedded version.
    pub fn embedded() -> Result<Self> {
        Self::from_config(ModelConfig::default().with_embedded_schemas(true))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    #[cfg(feature = "embedded-schemas")]
    pub fn load_embedded(&self) -> Result<Vec<Hl7Version>> {
        let versions = super::embedded::embedded_versions();
        for version in versions {
            self.register_shared(super::embedded::embedded_library(*version)?);
        }
        Ok(versions.to_vec())
    }

    #[cfg(not(feature = "embedded-schemas"))]
    pub fn load_embedded(&self) -> Result<Vec<Hl7Version>> {
        Err(Hl7Error::configuration(
            "Built without the embedded-schemas feature",
        ))
    }

    /// Add a library, replacing any earlier one for the same version.
    pub fn register(&self, library: SchemaLibrary) -> Arc<SchemaLibrary> {
        self.register_shared(Arc::new(library))
    }

    pub fn register_shared(&self, library: Arc<SchemaLibrary>) -> Arc<SchemaLibrary> {
        let version = library.version();
        let replaced = self
            .libraries
            .pin()
            .insert(version, Arc::clone(&library))
            .is_some();

        if replaced {
            tracing::info!("Replaced HL7 {} schema library", version);
        } else {
            tracing::info!("Registered HL7 {} schema library", version);
        }
        library
    }

    /// Parse a schema document and register the result.
    pub fn load_json(&self, json: &str) -> Result<Arc<SchemaLibrary>> {
        Ok(self.register(SchemaLibrary::from_json(json)?))
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Arc<SchemaLibrary>> {
        let path = path.as_ref();
        tracing::debug!("Loading schema document {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.load_json(&content)
    }

    pub fn library(&self, version: Hl7Version) -> Result<Arc<SchemaLibrary>> {
        self.libraries
            .pin()
            .get(&version)
            .cloned()
            .ok_or_else(|| Hl7Error::UnsupportedVersion {
                version: version.to_string(),
            })
    }

    pub fn contains(&self, version: Hl7Version) -> bool {
        self.libraries.pin().contains_key(&version)
    }

    /// Registered versions, oldest first.
    pub fn versions(&self) -> Vec<Hl7Version> {
        let mut versions: Vec<Hl7Version> = self.libraries.pin().keys().copied().collect();
        versions.sort_unstable();
        versions
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Create an empty message of `structure` for `version`, using this
    /// registry's length policy.
    pub fn new_message(&self, version: Hl7Version, structure: &str) -> Result<Message> {
        Message::with_config(self.library(version)?, structure, &self.config)
    }

    /// Like [`new_message`](Self::new_message) for the configured default version.
    pub fn default_message(&self, structure: &str) -> Result<Message> {
        self.new_message(self.config.version, structure)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
