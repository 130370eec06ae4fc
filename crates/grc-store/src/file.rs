// file.rs: JsonFileStore, one JSON file per document.
//
// Layout under the store directory:
//
//   risks/<riskId>.json
//   treatments/<riskId>/<treatmentId>.json
//   workshops/<id>.json
//
// This keeps documents isolated and makes the store easy to inspect by
// hand. Each write goes to its own temp file in the target directory and is
// renamed over the target, so a crash never leaves a half-written document.
//
// Writers take an advisory lock on `<root>/.lock` for the whole
// read-modify-write. grcd and the grc CLI may open the same directory at
// once; the lock makes every modify_* call atomic across handles and
// processes, not only across threads.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs4::fs_std::FileExt;
use grc_register::{Risk, Treatment, Workshop};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::{check_key, EntityStore, Mutation, StoreResult};

const LOCK_FILE: &str = ".lock";

/// Held for the duration of one write. Field order matters: the file lock
/// is released before the in-process mutex.
struct WriteGuard<'a> {
    _file: File,
    _local: MutexGuard<'a, ()>,
}

/// Persistent store backed by a directory of JSON documents.
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a new store backed by the given directory.
    /// Creates the directory layout if it doesn't exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        for sub in ["risks", "treatments", "workshops"] {
            let dir = root.join(sub);
            fs::create_dir_all(&dir).map_err(|source| StoreError::IoError {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> StoreResult<WriteGuard<'_>> {
        let local = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let path = self.root.join(LOCK_FILE);
        let io_err = |source| StoreError::IoError {
            path: path.display().to_string(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_err)?;
        file.lock_exclusive().map_err(io_err)?;
        Ok(WriteGuard {
            _file: file,
            _local: local,
        })
    }

    fn risk_file(&self, risk_id: &str) -> StoreResult<PathBuf> {
        check_key(risk_id)?;
        Ok(self.root.join("risks").join(format!("{}.json", risk_id)))
    }

    fn treatment_dir(&self, risk_id: &str) -> StoreResult<PathBuf> {
        check_key(risk_id)?;
        Ok(self.root.join("treatments").join(risk_id))
    }

    fn treatment_file(&self, risk_id: &str, treatment_id: &str) -> StoreResult<PathBuf> {
        check_key(treatment_id)?;
        Ok(self
            .treatment_dir(risk_id)?
            .join(format!("{}.json", treatment_id)))
    }

    fn workshop_file(&self, id: &str) -> StoreResult<PathBuf> {
        check_key(id)?;
        Ok(self.root.join("workshops").join(format!("{}.json", id)))
    }

    fn insert_doc<T: Serialize>(
        &self,
        path: StoreResult<PathBuf>,
        collection: &'static str,
        key: &str,
        doc: &T,
    ) -> StoreResult<()> {
        let path = path?;
        let _guard = self.lock()?;
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                collection,
                key: key.to_string(),
            });
        }
        write_doc(&path, doc)
    }

    fn modify_doc<T: Serialize + DeserializeOwned>(
        &self,
        path: StoreResult<PathBuf>,
        mutate: Mutation<'_, T>,
    ) -> StoreResult<Option<T>> {
        let Ok(path) = path else {
            return Ok(None);
        };
        let _guard = self.lock()?;
        let Some(mut doc) = read_doc::<T>(&path)? else {
            return Ok(None);
        };
        if mutate(&mut doc) {
            write_doc(&path, &doc)?;
        }
        Ok(Some(doc))
    }

    fn delete_doc(&self, path: StoreResult<PathBuf>) -> StoreResult<bool> {
        let Ok(path) = path else {
            return Ok(false);
        };
        let _guard = self.lock()?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| StoreError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(true)
    }
}

impl EntityStore for JsonFileStore {
    fn get_risk(&self, risk_id: &str) -> StoreResult<Option<Risk>> {
        match self.risk_file(risk_id) {
            Ok(path) => read_doc(&path),
            Err(_) => Ok(None),
        }
    }

    fn list_risks(&self) -> StoreResult<Vec<Risk>> {
        let mut risks: Vec<Risk> = read_dir_docs(&self.root.join("risks"))?;
        risks.sort_by(|a, b| a.risk_id.cmp(&b.risk_id));
        Ok(risks)
    }

    fn insert_risk(&self, risk: &Risk) -> StoreResult<()> {
        self.insert_doc(self.risk_file(&risk.risk_id), "risk", &risk.risk_id, risk)
    }

    fn modify_risk(&self, risk_id: &str, mutate: Mutation<'_, Risk>) -> StoreResult<Option<Risk>> {
        self.modify_doc(self.risk_file(risk_id), mutate)
    }

    fn delete_risk(&self, risk_id: &str) -> StoreResult<bool> {
        self.delete_doc(self.risk_file(risk_id))
    }

    fn get_treatment(&self, risk_id: &str, treatment_id: &str) -> StoreResult<Option<Treatment>> {
        match self.treatment_file(risk_id, treatment_id) {
            Ok(path) => read_doc(&path),
            Err(_) => Ok(None),
        }
    }

    fn list_treatments(&self, risk_id: &str) -> StoreResult<Vec<Treatment>> {
        let Ok(dir) = self.treatment_dir(risk_id) else {
            return Ok(Vec::new());
        };
        let mut treatments: Vec<Treatment> = read_dir_docs(&dir)?;
        treatments.sort_by(|a, b| a.treatment_id.cmp(&b.treatment_id));
        Ok(treatments)
    }

    fn insert_treatment(&self, treatment: &Treatment) -> StoreResult<()> {
        let dir = self.treatment_dir(&treatment.risk_id)?;
        fs::create_dir_all(&dir).map_err(|source| StoreError::IoError {
            path: dir.display().to_string(),
            source,
        })?;
        self.insert_doc(
            self.treatment_file(&treatment.risk_id, &treatment.treatment_id),
            "treatment",
            &treatment.treatment_id,
            treatment,
        )
    }

    fn modify_treatment(
        &self,
        risk_id: &str,
        treatment_id: &str,
        mutate: Mutation<'_, Treatment>,
    ) -> StoreResult<Option<Treatment>> {
        self.modify_doc(self.treatment_file(risk_id, treatment_id), mutate)
    }

    fn delete_treatment(&self, risk_id: &str, treatment_id: &str) -> StoreResult<bool> {
        self.delete_doc(self.treatment_file(risk_id, treatment_id))
    }

    fn get_workshop(&self, id: &str) -> StoreResult<Option<Workshop>> {
        match self.workshop_file(id) {
            Ok(path) => read_doc(&path),
            Err(_) => Ok(None),
        }
    }

    fn list_workshops(&self) -> StoreResult<Vec<Workshop>> {
        let mut workshops: Vec<Workshop> = read_dir_docs(&self.root.join("workshops"))?;
        workshops.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(workshops)
    }

    fn insert_workshop(&self, workshop: &Workshop) -> StoreResult<()> {
        self.insert_doc(
            self.workshop_file(&workshop.id),
            "workshop",
            &workshop.id,
            workshop,
        )
    }

    fn modify_workshop(
        &self,
        id: &str,
        mutate: Mutation<'_, Workshop>,
    ) -> StoreResult<Option<Workshop>> {
        self.modify_doc(self.workshop_file(id), mutate)
    }

    fn delete_workshop(&self, id: &str) -> StoreResult<bool> {
        self.delete_doc(self.workshop_file(id))
    }
}

fn read_doc<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path).map_err(|source| StoreError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(serde_json::from_str(&json)?))
}

fn write_doc<T: Serialize>(path: &Path, doc: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(doc)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |source| StoreError::IoError {
        path: path.display().to_string(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(json.as_bytes()).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Parse every `*.json` document in a directory. Unreadable documents are
/// skipped with a warning so one bad file does not hide the rest.
fn read_dir_docs<T: DeserializeOwned>(dir: &Path) -> StoreResult<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| StoreError::IoError {
        path: dir.display().to_string(),
        source,
    })?;

    let mut docs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::IoError {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        match read_doc::<T>(&path) {
            Ok(Some(doc)) => docs.push(doc),
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable document: {}", e),
        }
    }
    Ok(docs)
}
