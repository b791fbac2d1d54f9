//! JSON file unit source
//!
//! Accepts either a flat array of units (linked by `parent_id`) or nested
//! hierarchies: a single `{unit, children}` object or an array of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, PathContextExt};
use crate::domain::{BuildOptions, DomainError, HierarchyTreeNode, UnitSnapshot};
use crate::infrastructure::traits::{FileSystem, UnitSource};

/// Reads units from a JSON document on every load.
pub struct JsonFileUnitSource {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    options: BuildOptions,
}

impl JsonFileUnitSource {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>, options: BuildOptions) -> Self {
        Self {
            fs,
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UnitSource for JsonFileUnitSource {
    fn load_units(&self) -> ApplicationResult<Vec<UnitSnapshot>> {
        debug!("load_units: path={}", self.path.display());
        if !self.fs.exists(&self.path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("unit file not found: {}", self.path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }

        let content = self
            .fs
            .read_to_string(&self.path)
            .with_path_context("read unit file", &self.path)?;
        let document: Value =
            serde_json::from_str(&content).with_path_context("parse unit file", &self.path)?;

        let units = parse_units_document(&document, &self.options)?;
        debug!("load_units: {} units", units.len());
        Ok(units)
    }
}

/// Turn a JSON document into linked unit snapshots.
pub fn parse_units_document(
    document: &Value,
    options: &BuildOptions,
) -> Result<Vec<UnitSnapshot>, DomainError> {
    match document {
        Value::Object(object) if object.contains_key("unit") => {
            let tree = HierarchyTreeNode::build_with(document, options)?;
            Ok(tree.to_linked_units())
        }
        Value::Array(items) if items.iter().all(is_nested_node) && !items.is_empty() => {
            let mut units = Vec::new();
            for item in items {
                let tree = HierarchyTreeNode::build_with(item, options)?;
                units.extend(tree.to_linked_units());
            }
            Ok(units)
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                UnitSnapshot::deserialize(item)
                    .map_err(|e| DomainError::malformed(&format!("/{i}"), e.to_string()))
            })
            .collect(),
        _ => Err(DomainError::malformed(
            "",
            "expected an array of units or a `{unit, children}` hierarchy",
        )),
    }
}

fn is_nested_node(value: &Value) -> bool {
    value
        .as_object()
        .map(|object| object.contains_key("unit"))
        .unwrap_or(false)
}
