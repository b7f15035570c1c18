//! Catalog resolution backed by a JSON mapping file.
//!
//! Maps logical rule-set identifiers to concrete resolvable locations. The
//! file holds a single JSON object of identifier → location strings.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use pds_label::CatalogResolver;

#[derive(Debug, Default)]
pub struct JsonCatalog {
    entries: HashMap<String, String>,
}

impl JsonCatalog {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog {}", path.display()))?;
        let entries: HashMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("parse catalog {}", path.display()))?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogResolver for JsonCatalog {
    fn resolve(&self, identifier: &str) -> Option<String> {
        self.entries.get(identifier).cloned()
    }
}
