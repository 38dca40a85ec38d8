//! Label catalog loading from a `label2id` JSON file.

use std::collections::HashMap;
use std::path::Path;

use answerbook_core::LabelCatalog;
use tracing::info;

use crate::StoreError;

/// Load a `{"label": class_id, ...}` JSON object from disk.
///
/// Id validation failures come back as [`StoreError::Config`].
pub fn load_catalog(path: &Path) -> Result<LabelCatalog, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let json = std::fs::read_to_string(path)?;
    let raw: HashMap<String, i64> = serde_json::from_str(&json)?;
    let catalog = LabelCatalog::from_pairs(raw)?;

    info!(labels = catalog.len(), path = %path.display(), "loaded label catalog");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use answerbook_core::ConfigError;
    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("label_mapping.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_label_mapping() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"farewell": 1, "greeting": 0}"#);

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label_for_id(0), Some("greeting"));
        assert_eq!(catalog.label_for_id(1), Some("farewell"));
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_catalog(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"greeting": 0,"#);
        assert!(matches!(load_catalog(&path).unwrap_err(), StoreError::Json(_)));
    }

    #[test]
    fn invalid_ids_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"greeting": 0, "farewell": 0}"#);
        assert!(matches!(
            load_catalog(&path).unwrap_err(),
            StoreError::Config(ConfigError::DuplicateClassId { id: 0, .. })
        ));
    }

    #[test]
    fn gaps_in_ids_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"greeting": 0, "farewell": 5}"#);
        assert!(matches!(
            load_catalog(&path).unwrap_err(),
            StoreError::Config(ConfigError::NonContiguousClassIds { size: 2, max_id: 5 })
        ));
    }

    #[test]
    fn wrong_json_shape() {
        let dir = TempDir::new().unwrap();
        let list = write(&dir, r#"["greeting", "farewell"]"#);
        assert!(matches!(load_catalog(&list).unwrap_err(), StoreError::Json(_)));

        let string_ids = write(&dir, r#"{"greeting": "zero"}"#);
        assert!(matches!(load_catalog(&string_ids).unwrap_err(), StoreError::Json(_)));
    }
}
