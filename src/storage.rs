//! Persistence of collections and the environment, plus collection export/import.
//!
//! Files are UTF-8 JSON with 2-space indentation so they round-trip with
//! other tools and stay diffable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{COLLECTIONS_FILE, ENVIRONMENT_FILE};
use crate::models::{Collection, Collections, Environment};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid collection format")]
    InvalidFormat,
}

/// What to write when exporting
#[derive(Debug, Clone, Copy)]
pub enum ExportPayload<'a> {
    Collection(&'a Collection),
    Bundle {
        collections: &'a Collections,
        environment: &'a Environment,
    },
}

impl ExportPayload<'_> {
    /// File name offered to the user
    pub fn default_file_name(&self) -> String {
        match self {
            ExportPayload::Collection(collection) => format!("{}.json", collection.name),
            ExportPayload::Bundle { .. } => String::from("collections.json"),
        }
    }
}

#[derive(Serialize)]
struct BundleRef<'a> {
    collections: &'a Collections,
    environment: &'a Environment,
}

#[derive(Deserialize)]
struct BundleFile {
    collections: Collections,
    #[serde(default)]
    environment: Environment,
}

/// Parsed content of an import file
#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    Collection(Collection),
    Bundle {
        collections: Collections,
        environment: Environment,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Exported(PathBuf),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported(ImportPayload),
    Cancelled,
}

/// Persistence collaborator of the session.
///
/// A `None` path for export/import means the user dismissed the file prompt.
pub trait Store: Send {
    fn save_collections(&self, collections: &Collections) -> Result<(), StoreError>;
    fn load_collections(&self) -> Result<Collections, StoreError>;
    fn save_environment(&self, environment: &Environment) -> Result<(), StoreError>;
    fn load_environment(&self) -> Result<Environment, StoreError>;
    fn export_collection(
        &self,
        payload: ExportPayload<'_>,
        dest: Option<&Path>,
    ) -> Result<ExportOutcome, StoreError>;
    fn import_collection(&self, source: Option<&Path>) -> Result<ImportOutcome, StoreError>;
}

/// JSON files in a data directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure data directory exists
    fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
                action: "create",
                path: self.dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content).map_err(|source| StoreError::Io {
            action: "write",
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Wrote file");
        Ok(())
    }

    /// Missing files read as the type's default
    fn read_json<T: for<'de> Deserialize<'de> + Default>(&self, path: &Path) -> Result<T, StoreError> {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = read_file(path)?;
        let value = serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded file");
        Ok(value)
    }
}

impl Store for FileStore {
    fn save_collections(&self, collections: &Collections) -> Result<(), StoreError> {
        self.ensure_dir()?;
        self.write_json(&self.dir.join(COLLECTIONS_FILE), collections)
    }

    fn load_collections(&self) -> Result<Collections, StoreError> {
        self.read_json(&self.dir.join(COLLECTIONS_FILE))
    }

    fn save_environment(&self, environment: &Environment) -> Result<(), StoreError> {
        self.ensure_dir()?;
        self.write_json(&self.dir.join(ENVIRONMENT_FILE), environment)
    }

    fn load_environment(&self) -> Result<Environment, StoreError> {
        self.read_json(&self.dir.join(ENVIRONMENT_FILE))
    }

    fn export_collection(
        &self,
        payload: ExportPayload<'_>,
        dest: Option<&Path>,
    ) -> Result<ExportOutcome, StoreError> {
        let Some(path) = dest else {
            return Ok(ExportOutcome::Cancelled);
        };
        match payload {
            ExportPayload::Collection(collection) => self.write_json(path, collection)?,
            ExportPayload::Bundle {
                collections,
                environment,
            } => self.write_json(
                path,
                &BundleRef {
                    collections,
                    environment,
                },
            )?,
        }
        Ok(ExportOutcome::Exported(path.to_path_buf()))
    }

    fn import_collection(&self, source: Option<&Path>) -> Result<ImportOutcome, StoreError> {
        let Some(path) = source else {
            return Ok(ImportOutcome::Cancelled);
        };
        let content = read_file(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        parse_import(value).map(ImportOutcome::Imported)
    }
}

fn read_file(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })
}

/// Accepts a bundle `{collections, environment}` or a single `{name, requests}`.
pub fn parse_import(value: Value) -> Result<ImportPayload, StoreError> {
    let has = |key: &str| value.get(key).map_or(false, is_truthy);

    if has("collections") {
        let bundle: BundleFile =
            serde_json::from_value(value).map_err(|_| StoreError::InvalidFormat)?;
        return Ok(ImportPayload::Bundle {
            collections: bundle.collections,
            environment: bundle.environment,
        });
    }

    if has("name") && has("requests") {
        let collection: Collection =
            serde_json::from_value(value).map_err(|_| StoreError::InvalidFormat)?;
        return Ok(ImportPayload::Collection(collection));
    }

    Err(StoreError::InvalidFormat)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyEncoding, HttpMethod, RawBody, SavedRequest};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_collection() -> Collection {
        let mut collection = Collection::new("1700000000000", "Users API");
        collection.requests.push(SavedRequest {
            id: "1700000000001".into(),
            name: "List users".into(),
            method: HttpMethod::GET,
            url: "{{base_url}}/users".into(),
            headers: [("Accept".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body_type: BodyEncoding::Json,
            body: None,
            timestamp: "2024-01-01T00:00:00.000Z".into(),
        });
        collection.requests.push(SavedRequest {
            id: "1700000000002".into(),
            name: "Login".into(),
            method: HttpMethod::POST,
            url: "{{base_url}}/login".into(),
            headers: Default::default(),
            body_type: BodyEncoding::UrlEncoded,
            body: Some(RawBody::Fields(
                [("user".to_string(), "me".to_string())].into_iter().collect(),
            )),
            timestamp: "2024-01-01T00:00:01.000Z".into(),
        });
        collection
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.load_collections().unwrap().is_empty());
        assert!(store.load_environment().unwrap().is_empty());
    }

    #[test]
    fn test_collections_and_environment_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        let mut collections = Collections::new();
        let collection = sample_collection();
        collections.insert(collection.id.clone(), collection);
        let environment: Environment = [("base_url", "http://localhost:3000")].into_iter().collect();

        store.save_collections(&collections).unwrap();
        store.save_environment(&environment).unwrap();

        assert_eq!(store.load_collections().unwrap(), collections);
        assert_eq!(store.load_environment().unwrap(), environment);

        let raw = fs::read_to_string(dir.path().join("data").join(ENVIRONMENT_FILE)).unwrap();
        assert_eq!(raw, "{\n  \"base_url\": \"http://localhost:3000\"\n}");
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(COLLECTIONS_FILE), "{ nope").unwrap();
        let store = FileStore::new(dir.path());
        let err = store.load_collections().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains(COLLECTIONS_FILE));
    }

    #[test]
    fn test_export_then_import_single_collection() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let collection = sample_collection();
        let path = dir.path().join("users.json");

        let outcome = store
            .export_collection(ExportPayload::Collection(&collection), Some(&path))
            .unwrap();
        assert_eq!(outcome, ExportOutcome::Exported(path.clone()));

        let imported = store.import_collection(Some(&path)).unwrap();
        assert_eq!(
            imported,
            ImportOutcome::Imported(ImportPayload::Collection(collection))
        );
    }

    #[test]
    fn test_export_bundle_shape() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut collections = Collections::new();
        let collection = sample_collection();
        collections.insert(collection.id.clone(), collection);
        let environment: Environment = [("k", "v")].into_iter().collect();
        let path = dir.path().join("all.json");

        store
            .export_collection(
                ExportPayload::Bundle {
                    collections: &collections,
                    environment: &environment,
                },
                Some(&path),
            )
            .unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["environment"], json!({"k": "v"}));
        assert_eq!(written["collections"]["1700000000000"]["name"], "Users API");

        match store.import_collection(Some(&path)).unwrap() {
            ImportOutcome::Imported(ImportPayload::Bundle {
                collections: c,
                environment: e,
            }) => {
                assert_eq!(c, collections);
                assert_eq!(e, environment);
            }
            other => panic!("expected bundle, got {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_dialogs() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let collection = sample_collection();
        assert_eq!(
            store
                .export_collection(ExportPayload::Collection(&collection), None)
                .unwrap(),
            ExportOutcome::Cancelled
        );
        assert_eq!(store.import_collection(None).unwrap(), ImportOutcome::Cancelled);
    }

    #[test]
    fn test_import_rejects_other_shapes() {
        for value in [
            json!({"foo": 1}),
            json!({"name": "x"}),
            json!({"requests": []}),
            json!([1, 2]),
            json!({"collections": "nope"}),
        ] {
            assert!(matches!(parse_import(value), Err(StoreError::InvalidFormat)));
        }
        assert!(matches!(
            parse_import(json!({"name": "x", "requests": []})),
            Ok(ImportPayload::Collection(_))
        ));
    }

    #[test]
    fn test_export_default_file_name() {
        let collection = sample_collection();
        assert_eq!(
            ExportPayload::Collection(&collection).default_file_name(),
            "Users API.json"
        );
    }
}
