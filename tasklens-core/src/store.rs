//! Task store with local JSON persistence
//!
//! Every mutation is written through to disk before it returns. Writes go to a
//! temporary sibling file which is then renamed over the data file, so a crash
//! mid-write leaves the previous list intact.

use crate::image_ref::ImageRef;
use crate::task::{Task, TaskFilter, TaskId};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct TaskStore {
    path: Option<PathBuf>,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Open the store backed by `path`; a missing file is an empty list
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tasks = if path.exists() {
            let content = fs::read(&path)?;
            if content.iter().all(|b| b.is_ascii_whitespace()) {
                Vec::new()
            } else {
                serde_json::from_slice::<Vec<Task>>(&content).map_err(|e| {
                    Error::Deserialization(format!("{}: {}", path.display(), e))
                })?
            }
        } else {
            Vec::new()
        };

        info!("Loaded {} tasks from {:?}", tasks.len(), path);
        Ok(Self { path: Some(path), tasks })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self { path: None, tasks: Vec::new() }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All tasks, newest first
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Resolve a full id or a unique prefix of one
    pub fn resolve(&self, needle: &str) -> Result<TaskId> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidTask("task id must not be empty".to_string()));
        }

        let mut matches = self.tasks.iter().filter(|t| {
            let full = t.id.to_string();
            full.starts_with(&needle) || t.id.as_uuid().simple().to_string().starts_with(&needle)
        });

        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id),
            (Some(_), Some(_)) => Err(Error::InvalidTask(format!(
                "task id prefix '{}' is ambiguous",
                needle
            ))),
            (None, _) => Err(Error::TaskNotFound(needle)),
        }
    }

    /// Add a task at the front of the list
    pub fn add(&mut self, text: &str) -> Result<Task> {
        let task = Task::new(text)?;
        let added = task.clone();
        self.commit(move |tasks| {
            tasks.insert(0, task);
            Ok(())
        })?;
        debug!("Added task {}", added.id);
        Ok(added)
    }

    /// Flip the completion state of a task
    pub fn toggle(&mut self, id: TaskId) -> Result<Task> {
        self.update(id, |task| task.completed = !task.completed)
    }

    /// Set or clear the proof photo of a task
    pub fn update_image(&mut self, id: TaskId, image: Option<ImageRef>) -> Result<Task> {
        self.update(id, move |task| task.proof_image = image)
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Task> {
        let removed = self.commit(|tasks| {
            let index = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            Ok(tasks.remove(index))
        })?;
        debug!("Deleted task {}", id);
        Ok(removed)
    }

    /// Remove every completed task, returning how many were removed
    pub fn clear_completed(&mut self) -> Result<usize> {
        if !self.has_completed() {
            return Ok(0);
        }
        let removed = self.commit(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| !t.completed);
            Ok(before - tasks.len())
        })?;
        debug!("Cleared {} completed tasks", removed);
        Ok(removed)
    }

    pub fn filtered(&self, filter: TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn has_completed(&self) -> bool {
        self.tasks.iter().any(|t| t.completed)
    }

    fn update<F>(&mut self, id: TaskId, apply: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        self.commit(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            apply(task);
            Ok(task.clone())
        })
    }

    /// Apply a mutation and persist it; on any failure the list is restored
    fn commit<T, F>(&mut self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T>,
    {
        let snapshot = self.tasks.clone();
        let outcome = mutate(&mut self.tasks).and_then(|value| {
            self.persist()?;
            Ok(value)
        });
        if outcome.is_err() {
            self.tasks = snapshot;
        }
        outcome
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(&self.tasks)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::Io(e)
        })?;

        debug!("Persisted {} tasks to {:?}", self.tasks.len(), path);
        Ok(())
    }
}
