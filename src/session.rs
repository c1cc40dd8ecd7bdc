//! Session context - environment, collections and history for one run of the app.
//!
//! Mutations are applied in memory first and then persisted. A failed write is
//! reported as [`SessionError::Persist`] but the in-memory change is kept so no
//! work is lost; the user can retry the save.

use chrono::{SecondsFormat, Utc};
use std::path::Path;
use thiserror::Error;

use crate::builder::BuildError;
use crate::constants::JSON_CONTENT_TYPE;
use crate::history::History;
use crate::models::{
    Collection, Collections, Environment, ExecutionResult, HistoryEntry, HttpMethod, RawBody,
    RequestDescriptor, RequestDraft, SavedRequest,
};
use crate::storage::{ExportOutcome, ExportPayload, ImportOutcome, ImportPayload, Store, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please enter a collection name")]
    EmptyCollectionName,

    #[error("Please enter a request name")]
    EmptyRequestName,

    #[error("Please create a collection first")]
    NoCollections,

    #[error("Collection not found")]
    CollectionNotFound,

    #[error("Request not found")]
    RequestNotFound,

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Failed to {operation}: {source}")]
    Persist {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

/// What an export should contain
#[derive(Debug, Clone, PartialEq)]
pub enum ExportTarget {
    Collection(String),
    All,
}

/// Result of a successful import, for user feedback
#[derive(Debug, Clone, PartialEq)]
pub enum ImportSummary {
    Collection { id: String, name: String },
    Bundle { collections: usize, variables: usize },
    Cancelled,
}

pub struct Session {
    environment: Environment,
    collections: Collections,
    history: History,
    store: Box<dyn Store>,
    last_id: i64,
}

impl Session {
    pub fn new(store: Box<dyn Store>, history_limit: usize) -> Self {
        Session {
            environment: Environment::new(),
            collections: Collections::new(),
            history: History::new(history_limit),
            store,
            last_id: 0,
        }
    }

    /// Load persisted state. Both stores are attempted; the first failure is returned.
    pub fn load(&mut self) -> Result<(), SessionError> {
        let environment = self.store.load_environment();
        let collections = self.store.load_collections();

        let env_result = environment
            .map(|env| self.environment = env)
            .map_err(|source| persist("load environment", source));
        let collections_result = collections
            .map(|collections| self.collections = collections)
            .map_err(|source| persist("load collections", source));
        env_result.and(collections_result)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // ========================
    // Requests
    // ========================

    /// Resolve a draft against the current environment snapshot
    pub fn prepare(&self, draft: &RequestDraft) -> Result<RequestDescriptor, SessionError> {
        Ok(draft.build(&self.environment)?)
    }

    pub fn record(&mut self, request: RequestDescriptor, response: ExecutionResult) -> &HistoryEntry {
        self.history.record(request, response)
    }

    // ========================
    // Environment
    // ========================

    /// Replace all variables. Persistence is left to the caller's debounce.
    pub fn replace_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    pub fn set_variable(&mut self, key: &str, value: &str) {
        let key = key.trim();
        if !key.is_empty() {
            self.environment.set(key, value.trim());
        }
    }

    /// Removal is persisted immediately
    pub fn remove_variable(&mut self, key: &str) -> Result<(), SessionError> {
        self.environment.remove(key);
        self.save_environment()
    }

    pub fn save_environment(&self) -> Result<(), SessionError> {
        self.store
            .save_environment(&self.environment)
            .map_err(|source| persist("save environment", source))
    }

    // ========================
    // Collections
    // ========================

    pub fn create_collection(&mut self, name: &str) -> Result<String, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyCollectionName);
        }
        let id = self.next_id();
        self.collections
            .insert(id.clone(), Collection::new(id.clone(), name));
        self.save_collections()?;
        Ok(id)
    }

    pub fn delete_collection(&mut self, id: &str) -> Result<(), SessionError> {
        self.collections
            .shift_remove(id)
            .ok_or(SessionError::CollectionNotFound)?;
        self.save_collections()
    }

    /// Flip the expanded flag; returns the new value
    pub fn toggle_collection(&mut self, id: &str) -> Result<bool, SessionError> {
        let collection = self
            .collections
            .get_mut(id)
            .ok_or(SessionError::CollectionNotFound)?;
        collection.expanded = !collection.expanded;
        let expanded = collection.expanded;
        self.save_collections()?;
        Ok(expanded)
    }

    /// Store the unresolved draft so `{{vars}}` keep working when loaded again
    pub fn save_request(
        &mut self,
        collection_id: &str,
        name: &str,
        draft: &RequestDraft,
    ) -> Result<String, SessionError> {
        if self.collections.is_empty() {
            return Err(SessionError::NoCollections);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyRequestName);
        }
        if !self.collections.contains_key(collection_id) {
            return Err(SessionError::CollectionNotFound);
        }

        let id = self.next_id();
        let request = SavedRequest::from_draft(id.clone(), name, draft, now_iso());
        if let Some(collection) = self.collections.get_mut(collection_id) {
            collection.requests.push(request);
        }
        self.save_collections()?;
        Ok(id)
    }

    pub fn delete_request(&mut self, collection_id: &str, request_id: &str) -> Result<(), SessionError> {
        let collection = self
            .collections
            .get_mut(collection_id)
            .ok_or(SessionError::CollectionNotFound)?;
        let before = collection.requests.len();
        collection.requests.retain(|r| r.id != request_id);
        if collection.requests.len() == before {
            return Err(SessionError::RequestNotFound);
        }
        self.save_collections()
    }

    pub fn find_request(&self, collection_id: &str, request_id: &str) -> Option<&SavedRequest> {
        self.collections
            .get(collection_id)?
            .requests
            .iter()
            .find(|r| r.id == request_id)
    }

    pub fn save_collections(&self) -> Result<(), SessionError> {
        self.store
            .save_collections(&self.collections)
            .map_err(|source| persist("save collections", source))
    }

    // ========================
    // Export / import
    // ========================

    pub fn export_payload(&self, target: &ExportTarget) -> Result<ExportPayload<'_>, SessionError> {
        match target {
            ExportTarget::Collection(id) => self
                .collections
                .get(id)
                .map(ExportPayload::Collection)
                .ok_or(SessionError::CollectionNotFound),
            ExportTarget::All => Ok(ExportPayload::Bundle {
                collections: &self.collections,
                environment: &self.environment,
            }),
        }
    }

    pub fn export(
        &self,
        target: &ExportTarget,
        dest: Option<&Path>,
    ) -> Result<ExportOutcome, SessionError> {
        let payload = self.export_payload(target)?;
        self.store
            .export_collection(payload, dest)
            .map_err(|source| persist("export collection", source))
    }

    /// Invalid files leave the stored collections untouched
    pub fn import(&mut self, source: Option<&Path>) -> Result<ImportSummary, SessionError> {
        let outcome = self
            .store
            .import_collection(source)
            .map_err(|source| persist("import collection", source))?;

        let summary = match outcome {
            ImportOutcome::Cancelled => return Ok(ImportSummary::Cancelled),
            ImportOutcome::Imported(payload) => self.apply_import(payload),
        };

        self.save_collections()?;
        self.save_environment()?;
        Ok(summary)
    }

    fn apply_import(&mut self, payload: ImportPayload) -> ImportSummary {
        match payload {
            ImportPayload::Bundle {
                collections,
                environment,
            } => {
                let summary = ImportSummary::Bundle {
                    collections: collections.len(),
                    variables: environment.len(),
                };
                self.collections.extend(collections);
                self.environment.merge(&environment);
                summary
            }
            ImportPayload::Collection(mut collection) => {
                let id = self.next_id();
                collection.id = id.clone();
                collection.expanded = true;
                let name = collection.name.clone();
                self.collections.insert(id.clone(), collection);
                ImportSummary::Collection { id, name }
            }
        }
    }

    // ========================
    // First run
    // ========================

    /// Populate sample variables and a sample collection when both are empty
    pub fn seed_samples_if_empty(&mut self) -> Result<bool, SessionError> {
        if !self.environment.is_empty() || !self.collections.is_empty() {
            return Ok(false);
        }

        self.environment = [
            ("base_url", "https://jsonplaceholder.typicode.com"),
            ("api_key", "your-api-key-here"),
            ("user_id", "123"),
        ]
        .into_iter()
        .collect();

        let id = self.next_id();
        let mut collection = Collection::new(id.clone(), "Sample API Tests");
        let samples = [
            ("Get All Posts", HttpMethod::GET, "{{base_url}}/posts", None),
            ("Get Single Post", HttpMethod::GET, "{{base_url}}/posts/1", None),
            (
                "Create New Post",
                HttpMethod::POST,
                "{{base_url}}/posts",
                Some("{\n  \"title\": \"Sample Post\",\n  \"body\": \"This is a sample post created via API\",\n  \"userId\": 1\n}"),
            ),
            ("Get Random Image", HttpMethod::GET, "https://picsum.photos/400/300", None),
        ];
        for (name, method, url, body) in samples {
            let mut draft = RequestDraft {
                method,
                url: url.to_string(),
                body: body.map(|b| RawBody::Text(b.to_string())),
                ..RequestDraft::default()
            };
            if body.is_some() {
                draft
                    .headers
                    .insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
            }
            let request_id = self.next_id();
            collection
                .requests
                .push(SavedRequest::from_draft(request_id, name, &draft, now_iso()));
        }
        self.collections.insert(id, collection);

        self.save_environment()?;
        self.save_collections()?;
        Ok(true)
    }

    /// Time-based id, strictly increasing within the session
    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id.to_string()
    }
}

fn persist(operation: &'static str, source: StoreError) -> SessionError {
    tracing::warn!(operation, error = %source, "Persistence failed");
    SessionError::Persist { operation, source }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `"<METHOD> <last path segment>"`, ignoring the query string
pub fn suggest_request_name(method: HttpMethod, url: &str) -> String {
    let path = url.split('?').next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let segment = if segment.is_empty() { "Request" } else { segment };
    format!("{} {}", method.as_str(), segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyEncoding, FailureData, Headers};
    use crate::storage::FileStore;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Records writes and can be told to fail them
    #[derive(Clone, Default)]
    struct FlakyStore {
        fail_writes: Arc<Mutex<bool>>,
        collection_writes: Arc<Mutex<usize>>,
    }

    impl Store for FlakyStore {
        fn save_collections(&self, _: &Collections) -> Result<(), StoreError> {
            *self.collection_writes.lock().unwrap() += 1;
            self.write_result()
        }
        fn load_collections(&self) -> Result<Collections, StoreError> {
            Ok(Collections::new())
        }
        fn save_environment(&self, _: &Environment) -> Result<(), StoreError> {
            self.write_result()
        }
        fn load_environment(&self) -> Result<Environment, StoreError> {
            Err(StoreError::InvalidFormat)
        }
        fn export_collection(
            &self,
            _: ExportPayload<'_>,
            _: Option<&Path>,
        ) -> Result<ExportOutcome, StoreError> {
            Ok(ExportOutcome::Cancelled)
        }
        fn import_collection(&self, _: Option<&Path>) -> Result<ImportOutcome, StoreError> {
            Ok(ImportOutcome::Cancelled)
        }
    }

    impl FlakyStore {
        fn write_result(&self) -> Result<(), StoreError> {
            if *self.fail_writes.lock().unwrap() {
                Err(StoreError::Io {
                    action: "write",
                    path: "collections.json".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                })
            } else {
                Ok(())
            }
        }
    }

    fn file_session(dir: &Path) -> Session {
        Session::new(Box::new(FileStore::new(dir)), 50)
    }

    fn draft() -> RequestDraft {
        RequestDraft {
            method: HttpMethod::POST,
            url: "{{base_url}}/users".into(),
            headers: Headers::new(),
            body_encoding: BodyEncoding::Json,
            body: Some(RawBody::Text("{\"name\": \"{{user}}\"}".into())),
        }
    }

    #[test]
    fn test_collection_lifecycle_persists() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());

        let id = session.create_collection("  Users  ").unwrap();
        let request_id = session.save_request(&id, "Create user", &draft()).unwrap();
        assert!(!session.toggle_collection(&id).unwrap());

        let mut reloaded = file_session(dir.path());
        reloaded.load().unwrap();
        let collection = &reloaded.collections()[&id];
        assert_eq!(collection.name, "Users");
        assert!(!collection.expanded);
        let saved = reloaded.find_request(&id, &request_id).unwrap();
        assert_eq!(saved.url, "{{base_url}}/users");
        assert_eq!(saved.draft(), draft());

        reloaded.delete_request(&id, &request_id).unwrap();
        reloaded.delete_collection(&id).unwrap();
        assert!(reloaded.collections().is_empty());
        assert!(matches!(
            reloaded.delete_collection(&id),
            Err(SessionError::CollectionNotFound)
        ));
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());
        let a = session.create_collection("a").unwrap();
        let b = session.create_collection("b").unwrap();
        assert!(b.parse::<i64>().unwrap() > a.parse::<i64>().unwrap());
    }

    #[test]
    fn test_validation_errors() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());
        assert!(matches!(
            session.save_request("x", "name", &draft()),
            Err(SessionError::NoCollections)
        ));
        assert!(matches!(
            session.create_collection("   "),
            Err(SessionError::EmptyCollectionName)
        ));
        let id = session.create_collection("c").unwrap();
        assert!(matches!(
            session.save_request(&id, " ", &draft()),
            Err(SessionError::EmptyRequestName)
        ));
        assert!(matches!(
            session.save_request("missing", "n", &draft()),
            Err(SessionError::CollectionNotFound)
        ));
    }

    #[test]
    fn test_write_failure_keeps_memory() {
        let store = FlakyStore::default();
        let mut session = Session::new(Box::new(store.clone()), 50);
        *store.fail_writes.lock().unwrap() = true;

        let err = session.create_collection("Kept").unwrap_err();
        assert!(err.to_string().starts_with("Failed to save collections"));
        assert_eq!(session.collections().len(), 1);

        *store.fail_writes.lock().unwrap() = false;
        session.save_collections().unwrap();
        assert_eq!(*store.collection_writes.lock().unwrap(), 2);
    }

    #[test]
    fn test_load_reports_failure_but_keeps_going() {
        let mut session = Session::new(Box::new(FlakyStore::default()), 50);
        let err = session.load().unwrap_err();
        assert!(err.to_string().contains("load environment"));
    }

    #[test]
    fn test_prepare_uses_environment() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());
        session.set_variable(" base_url ", " http://api ");
        let descriptor = session.prepare(&draft()).unwrap();
        assert_eq!(descriptor.url, "http://api/users");
    }

    #[test]
    fn test_import_single_collection_gets_new_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("import.json");
        fs::write(
            &path,
            r#"{"id": "old", "name": "Imported", "expanded": false, "requests": [
                {"id": "r1", "name": "Ping", "method": "GET", "url": "{{base_url}}/ping"}
            ]}"#,
        )
        .unwrap();

        let mut session = file_session(&dir.path().join("data"));
        let summary = session.import(Some(path.as_path())).unwrap();
        let ImportSummary::Collection { id, name } = summary else {
            panic!("expected single collection import");
        };
        assert_eq!(name, "Imported");
        assert_ne!(id, "old");
        let collection = &session.collections()[&id];
        assert!(collection.expanded);
        assert_eq!(collection.id, id);
        assert_eq!(collection.requests.len(), 1);
    }

    #[test]
    fn test_import_bundle_merges() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        fs::write(
            &path,
            r#"{"collections": {"c1": {"id": "c1", "name": "One", "requests": [], "expanded": true}},
                "environment": {"base_url": "http://new", "extra": "1"}}"#,
        )
        .unwrap();

        let mut session = file_session(&dir.path().join("data"));
        session.set_variable("base_url", "http://old");
        session.set_variable("keep", "yes");
        session.create_collection("Existing").unwrap();

        let summary = session.import(Some(path.as_path())).unwrap();
        assert_eq!(summary, ImportSummary::Bundle { collections: 1, variables: 2 });
        assert_eq!(session.collections().len(), 2);
        assert_eq!(session.environment().get("base_url").unwrap(), "http://new");
        assert_eq!(session.environment().get("keep").unwrap(), "yes");

        let mut reloaded = file_session(&dir.path().join("data"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.environment().get("extra").unwrap(), "1");
    }

    #[test]
    fn test_invalid_import_does_not_mutate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"something": "else"}"#).unwrap();

        let mut session = file_session(&dir.path().join("data"));
        session.create_collection("Existing").unwrap();
        let before = session.collections().clone();

        let err = session.import(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("Invalid collection format"));
        assert_eq!(session.collections(), &before);
    }

    #[test]
    fn test_export_targets() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());
        let id = session.create_collection("Users").unwrap();

        let dest = dir.path().join("users.json");
        let outcome = session
            .export(&ExportTarget::Collection(id), Some(dest.as_path()))
            .unwrap();
        assert_eq!(outcome, ExportOutcome::Exported(dest));

        assert_eq!(
            session.export(&ExportTarget::All, None).unwrap(),
            ExportOutcome::Cancelled
        );
        assert!(matches!(
            session.export(&ExportTarget::Collection("nope".into()), None),
            Err(SessionError::CollectionNotFound)
        ));
    }

    #[test]
    fn test_seed_only_when_empty() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());
        assert!(session.seed_samples_if_empty().unwrap());
        assert_eq!(session.environment().len(), 3);
        let collection = session.collections().values().next().unwrap();
        assert_eq!(collection.requests.len(), 4);
        assert!(!session.seed_samples_if_empty().unwrap());
    }

    #[test]
    fn test_history_records() {
        let dir = tempdir().unwrap();
        let mut session = file_session(dir.path());
        let descriptor = session.prepare(&RequestDraft {
            url: "http://h".into(),
            ..RequestDraft::default()
        })
        .unwrap();
        let failure = ExecutionResult::Failure(FailureData {
            message: "refused".into(),
            code: Some("CONNECTION_REFUSED".into()),
            status: None,
            status_text: None,
            headers: None,
            response_time_ms: 3,
            raw_body_text: None,
        });
        session.record(descriptor, failure);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_suggest_request_name() {
        assert_eq!(
            suggest_request_name(HttpMethod::GET, "{{base_url}}/posts?page=2"),
            "GET posts"
        );
        assert_eq!(suggest_request_name(HttpMethod::POST, "http://h/"), "POST Request");
        assert_eq!(suggest_request_name(HttpMethod::DELETE, ""), "DELETE Request");
    }
}
