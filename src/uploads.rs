//! Storage of uploaded attack and exploit scripts
//!
//! Files are written under `{upload_dir}/attack_scripts` or
//! `{upload_dir}/exploit_scripts` and referenced from the matching table.
//! Scripts are never executed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::storage::models::{AttackScript, ExploitScript, Script};
use crate::storage::{Database, Fields, ListParams, StoreError};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Failed to store script file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which script table and directory an upload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Attack,
    Exploit,
}

impl ScriptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::Attack => "attack",
            ScriptKind::Exploit => "exploit",
        }
    }

    /// Subdirectory of the upload directory
    pub fn dir_name(self) -> &'static str {
        match self {
            ScriptKind::Attack => "attack_scripts",
            ScriptKind::Exploit => "exploit_scripts",
        }
    }
}

/// Reduce a client-supplied file name to its final path component.
///
/// Returns `None` for names that are empty or resolve to `.`/`..`.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\0', "");

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

/// Guess a script language from its file extension
pub fn language_from_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename).extension()?.to_str()?.to_lowercase();
    let language = match extension.as_str() {
        "sh" | "bash" => "bash",
        "py" => "python",
        "rb" => "ruby",
        "js" => "javascript",
        "pl" => "perl",
        "go" => "go",
        "ps1" => "powershell",
        _ => return None,
    };
    Some(language)
}

/// Attempts at finding a free `{stem}-{n}.{ext}` name before giving up
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `scan.sh` -> `scan-2.sh`, `README` -> `README-2`
fn numbered_filename(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, n, ext),
        _ => format!("{}-{}", filename, n),
    }
}

/// Create a new file in `dir` named `filename`, or a numbered variant when
/// that name is taken, and write `data` to it.
async fn write_new_file(dir: &Path, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    for n in 1..=MAX_NAME_ATTEMPTS {
        let candidate = if n == 1 {
            dir.join(filename)
        } else {
            dir.join(numbered_filename(filename, n))
        };
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };
        if let Err(e) = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await
        {
            let _ = tokio::fs::remove_file(&candidate).await;
            return Err(e);
        }
        return Ok(candidate);
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("No free file name for {}", filename),
    ))
}

/// Metadata accompanying an uploaded file
#[derive(Debug, Default, Clone)]
pub struct UploadMeta {
    pub name: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
}

/// Result of a stored upload
#[derive(Debug, Clone, PartialEq)]
pub struct StoredScript {
    pub id: i64,
    pub file_path: String,
}

/// Script files on disk plus their database records
#[derive(Debug, Clone)]
pub struct ScriptStore {
    upload_dir: PathBuf,
}

impl ScriptStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Write the file and record it. Existing files are never replaced: a taken
    /// name gets a numeric suffix, while `filename` keeps the uploaded name.
    pub async fn save(
        &self,
        db: &Database,
        kind: ScriptKind,
        filename: &str,
        data: &[u8],
        meta: UploadMeta,
    ) -> Result<StoredScript, UploadError> {
        let filename = sanitize_filename(filename)
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;

        let dir = self.upload_dir.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir).await?;
        let path = write_new_file(&dir, &filename, data).await?;
        let file_path = path.display().to_string();

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let mut fields: Fields = json!({
            "name": non_empty(meta.name).unwrap_or_else(|| filename.clone()),
            "filename": filename,
            "file_path": file_path,
        })
        .as_object()
        .cloned()
        .unwrap_or_default();
        if let Some(language) = non_empty(meta.language)
            .or_else(|| language_from_filename(&filename).map(str::to_string))
        {
            fields.insert("language".to_string(), Value::String(language));
        }
        if let Some(description) = non_empty(meta.description) {
            fields.insert("description".to_string(), Value::String(description));
        }

        let id = match kind {
            ScriptKind::Attack => db.create::<AttackScript>(&fields),
            ScriptKind::Exploit => db.create::<ExploitScript>(&fields),
        };
        let id = match id {
            Ok(id) => id,
            Err(e) => {
                // Do not leave an unreferenced file behind
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }
        };

        info!(kind = kind.as_str(), id = id, path = %file_path, size = data.len(), "Script uploaded");
        Ok(StoredScript { id, file_path })
    }

    pub fn list(&self, db: &Database, kind: ScriptKind, params: &ListParams) -> Result<Vec<Script>, StoreError> {
        Ok(match kind {
            ScriptKind::Attack => db.list::<AttackScript>(params)?.into_iter().map(|s| s.0).collect(),
            ScriptKind::Exploit => db.list::<ExploitScript>(params)?.into_iter().map(|s| s.0).collect(),
        })
    }

    /// Mark a script as stopped. Nothing runs, so this only changes its status.
    pub fn stop(&self, db: &Database, kind: ScriptKind, id: i64) -> Result<Script, StoreError> {
        let mut fields = Fields::new();
        fields.insert("status".to_string(), Value::String("stopped".to_string()));
        Ok(match kind {
            ScriptKind::Attack => db.update::<AttackScript>(id, &fields)?.0,
            ScriptKind::Exploit => db.update::<ExploitScript>(id, &fields)?.0,
        })
    }

    /// Delete the record and its stored file. Missing records are not an error.
    pub async fn delete(&self, db: &Database, kind: ScriptKind, id: i64) -> Result<bool, StoreError> {
        let existing = match kind {
            ScriptKind::Attack => db.read::<AttackScript>(id).map(|s| s.0),
            ScriptKind::Exploit => db.read::<ExploitScript>(id).map(|s| s.0),
        };
        let script = match existing {
            Ok(script) => script,
            Err(StoreError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        let deleted = match kind {
            ScriptKind::Attack => db.delete::<AttackScript>(id)?,
            ScriptKind::Exploit => db.delete::<ExploitScript>(id)?,
        };

        if let Some(path) = script.file_path.as_deref().filter(|p| self.owns(p)) {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path, "Removed script file"),
                Err(e) => warn!(path = %path, error = %e, "Failed to remove script file"),
            }
        }

        Ok(deleted)
    }

    /// Whether `path` lies inside the upload directory
    fn owns(&self, path: &str) -> bool {
        Path::new(path).starts_with(&self.upload_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("scan.sh").as_deref(), Some("scan.sh"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\tools\\run.ps1").as_deref(), Some("run.ps1"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("  "), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_language_from_filename() {
        assert_eq!(language_from_filename("enum.py"), Some("python"));
        assert_eq!(language_from_filename("takeover.SH"), Some("bash"));
        assert_eq!(language_from_filename("README"), None);
        assert_eq!(language_from_filename("notes.txt"), None);
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path());
        let db = Database::new(":memory:").unwrap();

        let stored = store
            .save(&db, ScriptKind::Attack, "../enum.py", b"print('hi')", UploadMeta::default())
            .await
            .expect("Upload should succeed");
        let expected = dir.path().join("attack_scripts").join("enum.py");
        assert_eq!(stored.file_path, expected.display().to_string());
        assert_eq!(std::fs::read(&expected).unwrap(), b"print('hi')");

        let script = db.read::<AttackScript>(stored.id).unwrap().0;
        assert_eq!(script.name, "enum.py");
        assert_eq!(script.language.as_deref(), Some("python"));
        assert_eq!(script.status.as_deref(), Some("ready"));

        assert!(store.delete(&db, ScriptKind::Attack, stored.id).await.unwrap());
        assert!(!expected.exists());
        assert!(!store.delete(&db, ScriptKind::Attack, stored.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_with_meta_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path());
        let db = Database::new(":memory:").unwrap();

        let meta = UploadMeta {
            name: Some("SSRF chain".to_string()),
            language: Some("go".to_string()),
            description: Some("cloud metadata pivot".to_string()),
        };
        let stored = store
            .save(&db, ScriptKind::Exploit, "ssrf.bin", b"\x00\x01", meta)
            .await
            .unwrap();
        assert!(stored.file_path.contains("exploit_scripts"));

        let scripts = store.list(&db, ScriptKind::Exploit, &ListParams::default()).unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].name, "SSRF chain");
        assert_eq!(scripts[0].language.as_deref(), Some("go"));
        assert!(store.list(&db, ScriptKind::Attack, &ListParams::default()).unwrap().is_empty());

        let stopped = store.stop(&db, ScriptKind::Exploit, stored.id).unwrap();
        assert_eq!(stopped.status.as_deref(), Some("stopped"));
    }

    #[test]
    fn test_numbered_filename() {
        assert_eq!(numbered_filename("scan.sh", 2), "scan-2.sh");
        assert_eq!(numbered_filename("a.tar.gz", 3), "a.tar-3.gz");
        assert_eq!(numbered_filename("README", 2), "README-2");
        assert_eq!(numbered_filename(".env", 2), ".env-2");
    }

    #[tokio::test]
    async fn test_same_name_uploads_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path());
        let db = Database::new(":memory:").unwrap();

        let first = store
            .save(&db, ScriptKind::Attack, "scan.sh", b"echo first", UploadMeta::default())
            .await
            .unwrap();
        let second = store
            .save(&db, ScriptKind::Attack, "scan.sh", b"echo second", UploadMeta::default())
            .await
            .unwrap();

        assert_ne!(first.file_path, second.file_path);
        assert!(second.file_path.ends_with("scan-2.sh"));
        let record = db.read::<AttackScript>(second.id).unwrap().0;
        assert_eq!(record.filename.as_deref(), Some("scan.sh"));

        assert!(store.delete(&db, ScriptKind::Attack, first.id).await.unwrap());
        assert!(!Path::new(&first.file_path).exists());
        assert_eq!(std::fs::read(&second.file_path).unwrap(), b"echo second");

        // The freed name is reused
        let third = store
            .save(&db, ScriptKind::Attack, "scan.sh", b"echo third", UploadMeta::default())
            .await
            .unwrap();
        assert_eq!(third.file_path, first.file_path);
        assert_eq!(std::fs::read(&second.file_path).unwrap(), b"echo second");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path());
        let db = Database::new(":memory:").unwrap();

        let err = store
            .save(&db, ScriptKind::Attack, "..", b"x", UploadMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidFilename(_)));
    }

    #[test]
    fn test_stop_unknown_script() {
        let store = ScriptStore::new("/tmp/unused");
        let db = Database::new(":memory:").unwrap();
        assert!(matches!(
            store.stop(&db, ScriptKind::Attack, 9).unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
