use crate::shared::logging::{append_log_line, store_log_path};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

pub mod collection;
pub mod paths;
pub mod records;

pub use collection::{load_collection, persist_collection, LoadStatus, LoadedCollection};
pub use paths::{
    bootstrap_state_root, default_state_root_path, StorePaths, DEFAULT_STATE_ROOT_DIR,
    STATE_ROOT_ENV,
};
pub use records::{
    now_rfc3339, ProjectRecord, TaskRecord, TaskStatus, UserCollection, UserRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project {project_id} not found")]
    ProjectNotFound { project_id: u64 },
    #[error("task {task_id} not found in project {project_id}")]
    TaskNotFound { project_id: u64, task_id: u64 },
    #[error("failed to resolve home directory for state root")]
    HomeDirectoryUnavailable,
    #[error("failed to create store path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write collection {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode collection {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Legacy id rule of the original file-backed tracker: ids were allocated as
/// `count + 1`, so deleting the highest-id record makes the next create reuse
/// that id. Kept only for regression coverage of the defect; repositories
/// allocate from a persisted high-water counter instead.
pub fn count_based_next_id(record_count: usize) -> u64 {
    record_count as u64 + 1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    #[serde(default)]
    pub projects: u64,
    #[serde(default)]
    pub tasks: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single-writer repository over the projects collection. Every mutation
/// re-persists the whole collection while the lock is held.
#[derive(Debug)]
pub struct ProjectRepository {
    path: PathBuf,
    records: Mutex<Vec<ProjectRecord>>,
    load_status: LoadStatus,
}

impl ProjectRepository {
    fn open(path: PathBuf) -> Self {
        let loaded = load_collection::<Vec<ProjectRecord>>(&path);
        Self {
            path,
            records: Mutex::new(loaded.records),
            load_status: loaded.status,
        }
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn all(&self) -> Vec<ProjectRecord> {
        lock(&self.records).clone()
    }

    pub fn list_owned_by(&self, owner_email: &str) -> Vec<ProjectRecord> {
        lock(&self.records)
            .iter()
            .filter(|project| project.owner_email == owner_email)
            .cloned()
            .collect()
    }

    pub fn get_owned(&self, project_id: u64, owner_email: &str) -> Result<ProjectRecord, StoreError> {
        lock(&self.records)
            .iter()
            .find(|project| project.id == project_id && project.owner_email == owner_email)
            .cloned()
            .ok_or(StoreError::ProjectNotFound { project_id })
    }

    pub fn max_id(&self) -> u64 {
        lock(&self.records)
            .iter()
            .map(|project| project.id)
            .max()
            .unwrap_or(0)
    }

    fn insert(&self, record: ProjectRecord) -> Result<(), StoreError> {
        let mut records = lock(&self.records);
        records.push(record);
        persist_collection(&self.path, &*records)
    }

    fn update_owned(
        &self,
        project_id: u64,
        owner_email: &str,
        title: &str,
        description: &str,
    ) -> Result<ProjectRecord, StoreError> {
        let mut records = lock(&self.records);
        let project = records
            .iter_mut()
            .find(|project| project.id == project_id && project.owner_email == owner_email)
            .ok_or(StoreError::ProjectNotFound { project_id })?;
        project.title = title.to_string();
        project.description = description.to_string();
        let updated = project.clone();
        persist_collection(&self.path, &*records)?;
        Ok(updated)
    }

    fn remove_owned(&self, project_id: u64, owner_email: &str) -> Result<ProjectRecord, StoreError> {
        let mut records = lock(&self.records);
        let index = records
            .iter()
            .position(|project| project.id == project_id && project.owner_email == owner_email)
            .ok_or(StoreError::ProjectNotFound { project_id })?;
        let removed = records.remove(index);
        persist_collection(&self.path, &*records)?;
        Ok(removed)
    }
}

/// Single-writer repository over the tasks collection.
#[derive(Debug)]
pub struct TaskRepository {
    path: PathBuf,
    records: Mutex<Vec<TaskRecord>>,
    load_status: LoadStatus,
}

impl TaskRepository {
    fn open(path: PathBuf) -> Self {
        let loaded = load_collection::<Vec<TaskRecord>>(&path);
        Self {
            path,
            records: Mutex::new(loaded.records),
            load_status: loaded.status,
        }
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn all(&self) -> Vec<TaskRecord> {
        lock(&self.records).clone()
    }

    pub fn list_for_project(&self, project_id: u64) -> Vec<TaskRecord> {
        lock(&self.records)
            .iter()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn get_in_project(&self, project_id: u64, task_id: u64) -> Result<TaskRecord, StoreError> {
        lock(&self.records)
            .iter()
            .find(|task| task.id == task_id && task.project_id == project_id)
            .cloned()
            .ok_or(StoreError::TaskNotFound {
                project_id,
                task_id,
            })
    }

    pub fn max_id(&self) -> u64 {
        lock(&self.records)
            .iter()
            .map(|task| task.id)
            .max()
            .unwrap_or(0)
    }

    fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let mut records = lock(&self.records);
        records.push(record);
        persist_collection(&self.path, &*records)
    }

    fn set_status(
        &self,
        project_id: u64,
        task_id: u64,
        status: TaskStatus,
    ) -> Result<TaskRecord, StoreError> {
        let mut records = lock(&self.records);
        let task = records
            .iter_mut()
            .find(|task| task.id == task_id && task.project_id == project_id)
            .ok_or(StoreError::TaskNotFound {
                project_id,
                task_id,
            })?;
        task.status = status;
        let updated = task.clone();
        persist_collection(&self.path, &*records)?;
        Ok(updated)
    }

    fn update_in_project(
        &self,
        project_id: u64,
        task_id: u64,
        title: &str,
        description: &str,
        status: TaskStatus,
    ) -> Result<TaskRecord, StoreError> {
        let mut records = lock(&self.records);
        let task = records
            .iter_mut()
            .find(|task| task.id == task_id && task.project_id == project_id)
            .ok_or(StoreError::TaskNotFound {
                project_id,
                task_id,
            })?;
        task.title = title.to_string();
        task.description = description.to_string();
        task.status = status;
        let updated = task.clone();
        persist_collection(&self.path, &*records)?;
        Ok(updated)
    }

    fn remove_in_project(&self, project_id: u64, task_id: u64) -> Result<TaskRecord, StoreError> {
        let mut records = lock(&self.records);
        let index = records
            .iter()
            .position(|task| task.id == task_id && task.project_id == project_id)
            .ok_or(StoreError::TaskNotFound {
                project_id,
                task_id,
            })?;
        let removed = records.remove(index);
        persist_collection(&self.path, &*records)?;
        Ok(removed)
    }

    fn remove_for_project(&self, project_id: u64) -> Result<usize, StoreError> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|task| task.project_id != project_id);
        let removed = before - records.len();
        persist_collection(&self.path, &*records)?;
        Ok(removed)
    }
}

/// Read-only view over the users collection. Account records are written by
/// the authentication collaborator, never by this core.
#[derive(Debug)]
pub struct UserDirectory {
    records: UserCollection,
    load_status: LoadStatus,
}

impl UserDirectory {
    fn open(path: &std::path::Path) -> Self {
        let loaded = load_collection::<UserCollection>(path);
        Self {
            records: loaded.records,
            load_status: loaded.status,
        }
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn get(&self, email: &str) -> Option<&UserRecord> {
        self.records.get(email)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The three collections plus the id counters, loaded wholesale at open and
/// re-persisted in full on every mutation.
#[derive(Debug)]
pub struct RecordStore {
    paths: StorePaths,
    pub projects: ProjectRepository,
    pub tasks: TaskRepository,
    pub users: UserDirectory,
    counters: Mutex<IdCounters>,
}

impl RecordStore {
    pub fn open(paths: StorePaths) -> Result<Self, StoreError> {
        bootstrap_state_root(&paths)?;
        let projects = ProjectRepository::open(paths.projects_file());
        let tasks = TaskRepository::open(paths.tasks_file());
        let users = UserDirectory::open(&paths.users_file());

        let counters_loaded = load_collection::<IdCounters>(&paths.counters_file());
        let mut counters = counters_loaded.records;
        // Never hand out an id at or below one already in the data, even if
        // the counter file was lost.
        counters.projects = counters.projects.max(projects.max_id());
        counters.tasks = counters.tasks.max(tasks.max_id());

        let store = Self {
            paths,
            projects,
            tasks,
            users,
            counters: Mutex::new(counters),
        };
        store.log_recovery("projects", store.projects.load_status());
        store.log_recovery("tasks", store.tasks.load_status());
        store.log_recovery("users", store.users.load_status());
        store.log_recovery("counters", &counters_loaded.status);
        Ok(store)
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    fn log_recovery(&self, name: &str, status: &LoadStatus) {
        if let LoadStatus::Recovered(reason) = status {
            let _ = append_log_line(
                &store_log_path(&self.paths.root),
                &format!("load {name}: substituted empty collection ({reason})"),
            );
        }
    }

    fn allocate_project_id(&self) -> Result<u64, StoreError> {
        let mut counters = lock(&self.counters);
        counters.projects += 1;
        persist_collection(&self.paths.counters_file(), &*counters)?;
        Ok(counters.projects)
    }

    fn allocate_task_id(&self) -> Result<u64, StoreError> {
        let mut counters = lock(&self.counters);
        counters.tasks += 1;
        persist_collection(&self.paths.counters_file(), &*counters)?;
        Ok(counters.tasks)
    }

    pub fn create_project(
        &self,
        owner_email: &str,
        title: &str,
        description: &str,
    ) -> Result<ProjectRecord, StoreError> {
        let record = ProjectRecord {
            id: self.allocate_project_id()?,
            title: title.to_string(),
            description: description.to_string(),
            owner_email: owner_email.to_string(),
            created_at: now_rfc3339(),
        };
        self.projects.insert(record.clone())?;
        Ok(record)
    }

    pub fn list_projects(&self, owner_email: &str) -> Vec<ProjectRecord> {
        self.projects.list_owned_by(owner_email)
    }

    pub fn get_project(&self, project_id: u64, owner_email: &str) -> Result<ProjectRecord, StoreError> {
        self.projects.get_owned(project_id, owner_email)
    }

    pub fn update_project(
        &self,
        project_id: u64,
        owner_email: &str,
        title: &str,
        description: &str,
    ) -> Result<ProjectRecord, StoreError> {
        self.projects
            .update_owned(project_id, owner_email, title, description)
    }

    /// Physical removal; cascades to every task of the project. Tasks of
    /// other projects are untouched.
    pub fn delete_project(&self, project_id: u64, owner_email: &str) -> Result<(), StoreError> {
        self.projects.remove_owned(project_id, owner_email)?;
        self.tasks.remove_for_project(project_id)?;
        Ok(())
    }

    pub fn create_task(
        &self,
        project_id: u64,
        owner_email: &str,
        title: &str,
        description: &str,
        status: TaskStatus,
    ) -> Result<TaskRecord, StoreError> {
        self.get_project(project_id, owner_email)?;
        let record = TaskRecord {
            id: self.allocate_task_id()?,
            project_id,
            title: title.to_string(),
            description: description.to_string(),
            status,
            created_at: now_rfc3339(),
        };
        self.tasks.insert(record.clone())?;
        Ok(record)
    }

    pub fn list_tasks(&self, project_id: u64, owner_email: &str) -> Result<Vec<TaskRecord>, StoreError> {
        self.get_project(project_id, owner_email)?;
        Ok(self.tasks.list_for_project(project_id))
    }

    pub fn get_task(
        &self,
        project_id: u64,
        task_id: u64,
        owner_email: &str,
    ) -> Result<TaskRecord, StoreError> {
        self.get_project(project_id, owner_email)?;
        self.tasks.get_in_project(project_id, task_id)
    }

    pub fn update_task(
        &self,
        project_id: u64,
        task_id: u64,
        owner_email: &str,
        title: &str,
        description: &str,
        status: TaskStatus,
    ) -> Result<TaskRecord, StoreError> {
        self.get_project(project_id, owner_email)?;
        self.tasks
            .update_in_project(project_id, task_id, title, description, status)
    }

    pub fn set_task_status(
        &self,
        project_id: u64,
        task_id: u64,
        owner_email: &str,
        status: TaskStatus,
    ) -> Result<TaskRecord, StoreError> {
        self.get_project(project_id, owner_email)?;
        self.tasks.set_status(project_id, task_id, status)
    }

    pub fn delete_task(
        &self,
        project_id: u64,
        task_id: u64,
        owner_email: &str,
    ) -> Result<(), StoreError> {
        self.get_project(project_id, owner_email)?;
        self.tasks.remove_in_project(project_id, task_id)?;
        Ok(())
    }

    /// Tasks belonging to the given projects, in collection order. Input to
    /// intent classification.
    pub fn tasks_for_projects(&self, projects: &[ProjectRecord]) -> Vec<TaskRecord> {
        let ids: Vec<u64> = projects.iter().map(|project| project.id).collect();
        self.tasks
            .all()
            .into_iter()
            .filter(|task| ids.contains(&task.project_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn count_based_rule_reuses_ids_after_delete() {
        // Two records, delete the highest id, allocate by count: collision.
        let deleted_id = 2_u64;
        assert_eq!(count_based_next_id(1), deleted_id);
    }

    #[test]
    fn high_water_ids_survive_deletion() {
        let tmp = tempdir().expect("tempdir");
        let store = RecordStore::open(StorePaths::new(tmp.path())).expect("open");

        let first = store
            .create_project("alice@example.com", "Atlas", "")
            .expect("create first");
        let second = store
            .create_project("alice@example.com", "Vyta", "")
            .expect("create second");
        store
            .delete_project(second.id, "alice@example.com")
            .expect("delete highest");

        let third = store
            .create_project("alice@example.com", "Nimbus", "")
            .expect("create third");
        assert!(third.id > second.id);
        assert!(third.id > first.id);
    }

    #[test]
    fn counters_are_raised_above_existing_ids_when_counter_file_is_lost() {
        let tmp = tempdir().expect("tempdir");
        {
            let store = RecordStore::open(StorePaths::new(tmp.path())).expect("open");
            store
                .create_project("alice@example.com", "Atlas", "")
                .expect("create");
        }
        std::fs::remove_file(StorePaths::new(tmp.path()).counters_file())
            .expect("drop counter file");

        let store = RecordStore::open(StorePaths::new(tmp.path())).expect("reopen");
        let next = store
            .create_project("alice@example.com", "Vyta", "")
            .expect("create after reopen");
        assert_eq!(next.id, 2);
    }
}
