//! Single-file JSON todo repository with an in-process cache.
//!
//! # Responsibility
//! - Keep the whole collection in memory after the first access.
//! - Persist every write as a complete JSON document.
//!
//! # Invariants
//! - Reads share the cache lock; writes hold it exclusively, disk write
//!   included, so readers never observe a half-applied write.
//! - The storage path only ever holds a complete snapshot: writes go to
//!   `<path>.tmp` and are renamed over the target.
//! - A missing, unreadable or unparseable file, or one holding invalid
//!   records or repeated ids, loads as an empty collection.
//! - Ids are unique: `create` refuses an id already in the cache.
//! - Running two processes against the same path is unsupported.

use crate::model::todo::TodoItem;
use crate::repo::todo_repo::{sort_created_desc, RepoError, RepoResult, TodoRepository};
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// File-backed todo repository.
///
/// The cache is loaded lazily on first use and never reloaded afterwards.
pub struct FileTodoRepository {
    path: PathBuf,
    cache: OnceCell<RwLock<Vec<TodoItem>>>,
}

impl FileTodoRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    /// Storage document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache(&self) -> &RwLock<Vec<TodoItem>> {
        self.cache
            .get_or_init(|| RwLock::new(load_from_disk(&self.path)))
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Vec<TodoItem>>> {
        self.cache().read().map_err(|_| RepoError::LockPoisoned)
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Vec<TodoItem>>> {
        self.cache().write().map_err(|_| RepoError::LockPoisoned)
    }

    /// Applies `mutate` to a copy of the cache, persists it, then swaps it in.
    ///
    /// The cache keeps its previous state when `mutate` or persistence fails.
    fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<TodoItem>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut guard = self.write()?;
        let mut next = guard.clone();
        let output = mutate(&mut next)?;
        persist(&self.path, &next)?;
        *guard = next;
        Ok(output)
    }
}

impl TodoRepository for FileTodoRepository {
    fn list(&self) -> RepoResult<Vec<TodoItem>> {
        let mut items = self.read()?.clone();
        sort_created_desc(&mut items);
        Ok(items)
    }

    fn find_by_id(&self, id: &str) -> RepoResult<Option<TodoItem>> {
        Ok(self.read()?.iter().find(|item| item.id == id).cloned())
    }

    fn create(&self, item: &TodoItem) -> RepoResult<TodoItem> {
        item.validate()?;
        self.commit(|items| {
            if items.iter().any(|existing| existing.id == item.id) {
                return Err(RepoError::DuplicateId(item.id.clone()));
            }
            items.push(item.clone());
            Ok(())
        })?;
        Ok(item.clone())
    }

    fn update(&self, item: &TodoItem) -> RepoResult<TodoItem> {
        item.validate()?;
        let replaced = self.commit(|items| {
            match items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => {
                    *existing = item.clone();
                    Ok(true)
                }
                None => {
                    items.push(item.clone());
                    Ok(false)
                }
            }
        })?;

        if !replaced {
            warn!(
                "event=todo_upsert module=repo status=ok backend=file id={} reason=missing_on_update",
                item.id
            );
        }
        Ok(item.clone())
    }

    fn delete(&self, id: &str) -> RepoResult<bool> {
        let mut guard = self.write()?;
        let Some(index) = guard.iter().position(|item| item.id == id) else {
            return Ok(false);
        };

        let mut next = guard.clone();
        next.remove(index);
        persist(&self.path, &next)?;
        *guard = next;
        Ok(true)
    }
}

fn load_from_disk(path: &Path) -> Vec<TodoItem> {
    let started_at = Instant::now();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                "event=store_load module=repo status=ok backend=file count=0 reason=missing_file"
            );
            return Vec::new();
        }
        Err(err) => {
            warn!(
                "event=store_load module=repo status=degraded backend=file error_code=read_failed error={}",
                err
            );
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        return Vec::new();
    }

    let parsed = serde_json::from_str::<Vec<TodoItem>>(&content)
        .map_err(|err| ("parse_failed", err.to_string()))
        .and_then(|items| check_records(&items).map(|()| items));

    match parsed {
        Ok(items) => {
            info!(
                "event=store_load module=repo status=ok backend=file count={} duration_ms={}",
                items.len(),
                started_at.elapsed().as_millis()
            );
            items
        }
        Err((error_code, err)) => {
            warn!(
                "event=store_load module=repo status=degraded backend=file error_code={} error={}",
                error_code, err
            );
            Vec::new()
        }
    }
}

/// Rejects documents holding invalid records or repeated ids.
fn check_records(items: &[TodoItem]) -> Result<(), (&'static str, String)> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if let Err(err) = item.validate() {
            return Err(("invalid_record", format!("todo `{}`: {err}", item.id)));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(("duplicate_id", format!("todo `{}` appears twice", item.id)));
        }
    }
    Ok(())
}

/// Writes the full collection to `<path>.tmp` and renames it over `path`.
fn persist(path: &Path, items: &[TodoItem]) -> RepoResult<()> {
    let started_at = Instant::now();
    let json = serde_json::to_string_pretty(items)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    if let Err(err) = write_and_rename(&tmp, path, json.as_bytes()) {
        error!(
            "event=store_persist module=repo status=error backend=file duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        );
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }

    debug!(
        "event=store_persist module=repo status=ok backend=file count={} duration_ms={}",
        items.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

fn write_and_rename(tmp: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, target)
}

/// Sibling temp file named `<target>.tmp`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::tmp_path;
    use std::path::Path;

    #[test]
    fn tmp_path_appends_suffix_next_to_target() {
        assert_eq!(
            tmp_path(Path::new("data/todos.json")),
            Path::new("data/todos.json.tmp")
        );
    }
}
