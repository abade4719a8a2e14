//! Schema tables compiled into the crate.
//!
//! The JSON documents under `schemas/` are parsed on first use and the
//! resolved libraries are cached for the life of the process.

use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::core::Hl7Version;
use crate::error::{Hl7Error, Result};
use crate::types::SchemaLibrary;

#[cfg(feature = "embedded-schemas")]
pub static V2_3_SCHEMA: &str = include_str!("../../schemas/hl7v2_3.json");
#[cfg(feature = "embedded-schemas")]
pub static V2_5_SCHEMA: &str = include_str!("../../schemas/hl7v2_5.json");

static PARSED: Lazy<papaya::HashMap<Hl7Version, Arc<SchemaLibrary>>> =
    Lazy::new(papaya::HashMap::new);

/// Versions with tables compiled into this build.
pub fn embedded_versions() -> &'static [Hl7Version] {
    #[cfg(feature = "embedded-schemas")]
    const VERSIONS: &[Hl7Version] = &[Hl7Version::V2_3, Hl7Version::V2_5];
    #[cfg(not(feature = "embedded-schemas"))]
    const VERSIONS: &[Hl7Version] = &[];
    VERSIONS
}

/// Raw JSON of the embedded tables for `version`.
pub fn embedded_source(version: Hl7Version) -> Option<&'static str> {
    match version {
        #[cfg(feature = "embedded-schemas")]
        Hl7Version::V2_3 => Some(V2_3_SCHEMA),
        #[cfg(feature = "embedded-schemas")]
        Hl7Version::V2_5 => Some(V2_5_SCHEMA),
        _ => None,
    }
}

/// The resolved embedded library for `version`, parsed once per process.
pub fn embedded_library(version: Hl7Version) -> Result<Arc<SchemaLibrary>> {
    let cache = PARSED.pin();
    if let Some(library) = cache.get(&version) {
        return Ok(Arc::clone(library));
    }

    let source = embedded_source(version).ok_or_else(|| Hl7Error::UnsupportedVersion {
        version: version.to_string(),
    })?;
    let library = SchemaLibrary::from_json(source)?;
    if library.version() != version {
        return Err(Hl7Error::configuration(format!(
            "Embedded tables for {} declare version {}",
            version,
            library.version()
        )));
    }

    tracing::debug!("Parsed embedded HL7 {} tables", version);
    Ok(Arc::clone(cache.get_or_insert(version, Arc::new(library))))
}
