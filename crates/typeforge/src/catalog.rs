//! Semantic type catalog storage.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use indexmap::IndexMap;

use crate::error::{ForgeError, Result};
use crate::types::CustomSemanticType;

/// Storage for semantic type definitions.
pub trait CatalogStore: Send + Sync {
    /// Every stored type, in catalog order.
    fn list_all(&self) -> Vec<CustomSemanticType>;

    fn get(&self, semantic_type: &str) -> Option<CustomSemanticType>;

    /// Validate and store a whole definition, replacing any type with the same id.
    fn put(&self, definition: CustomSemanticType) -> Result<()>;
}

/// Insertion-ordered in-memory catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    types: RwLock<IndexMap<String, CustomSemanticType>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a catalog from a JSON array of definitions.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ForgeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let definitions: Vec<CustomSemanticType> =
            serde_json::from_reader(BufReader::new(file))?;
        let catalog = Self::new();
        for definition in definitions {
            catalog.put(definition)?;
        }
        Ok(catalog)
    }

    /// Write the catalog as a pretty-printed JSON array.
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ForgeError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let file = File::create(path).map_err(|e| ForgeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.list_all())?;
        Ok(())
    }
}

impl CatalogStore for InMemoryCatalog {
    fn list_all(&self) -> Vec<CustomSemanticType> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn get(&self, semantic_type: &str) -> Option<CustomSemanticType> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(semantic_type)
            .cloned()
    }

    fn put(&self, mut definition: CustomSemanticType) -> Result<()> {
        definition.validate()?;
        if definition.created_at.is_none() {
            definition.created_at = Some(Utc::now());
        }
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(definition.semantic_type.clone(), definition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_keeps_insertion_order_on_replace() {
        let catalog = InMemoryCatalog::new();
        catalog
            .put(CustomSemanticType::list("B.TYPE", "b", ["X"]))
            .unwrap();
        catalog
            .put(CustomSemanticType::list("A.TYPE", "a", ["Y"]))
            .unwrap();
        catalog
            .put(CustomSemanticType::list("B.TYPE", "b again", ["Z"]))
            .unwrap();

        let ids: Vec<String> = catalog
            .list_all()
            .into_iter()
            .map(|t| t.semantic_type)
            .collect();
        assert_eq!(ids, vec!["B.TYPE", "A.TYPE"]);
        assert_eq!(catalog.get("B.TYPE").unwrap().description, "b again");
        assert!(catalog.get("B.TYPE").unwrap().created_at.is_some());
    }

    #[test]
    fn test_put_rejects_invalid_definition() {
        let catalog = InMemoryCatalog::new();
        let err = catalog
            .put(CustomSemanticType::regex("bad id", "x", "^a$"))
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidDefinition(_)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = InMemoryCatalog::from_json_file("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, ForgeError::Io { .. }));
    }
}
