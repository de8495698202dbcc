// Task store persisted through a blob storage port

use crate::attachment;
use crate::error::{Result, TaskError};
use crate::models::{Direction, Task, TaskDraft, TaskPatch, fresh_id};
use crate::snapshot;
use crate::storage::BlobStorage;
use tracing::{debug, info, warn};

/// Default name of the blob holding the task collection
pub const DEFAULT_STORAGE_KEY: &str = "studyTasks";

/// Single source of truth for the task collection
///
/// Every operation reads the stored collection, applies its change and writes
/// the whole collection back. Storage failures never reach the caller: reads
/// degrade to an empty collection and writes are logged and dropped.
pub struct TaskStore<S: BlobStorage> {
    storage: S,
    key: String,
}

impl<S: BlobStorage> TaskStore<S> {
    /// Create a store using the default storage key
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Read the persisted collection, empty if absent, unavailable or corrupt
    pub fn load(&self) -> Vec<Task> {
        let blob = match self.storage.get(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read tasks, using empty collection");
                return Vec::new();
            }
        };

        match snapshot::decode(&blob) {
            Ok(tasks) => {
                debug!(key = %self.key, count = tasks.len(), "Loaded tasks");
                tasks
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Persisted tasks are corrupt, using empty collection");
                Vec::new()
            }
        }
    }

    fn save(&mut self, tasks: &[Task]) {
        let blob = match snapshot::encode(tasks) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to encode tasks, not saving");
                return;
            }
        };

        if let Err(e) = self.storage.set(&self.key, &blob) {
            warn!(key = %self.key, error = %e, "Failed to save tasks");
        }
    }

    // ========================================================================
    // Collection operations
    // ========================================================================

    /// Append a task; the caller supplies its id and defaults
    pub fn add(&mut self, task: Task) -> Vec<Task> {
        let mut tasks = self.load();
        debug!(id = task.id, "Adding task");
        tasks.push(task);
        self.save(&tasks);
        tasks
    }

    /// Merge `patch` over the task with `id`; unknown ids are a no-op
    pub fn update(&mut self, id: i64, patch: TaskPatch) -> Vec<Task> {
        let mut tasks = self.load();

        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.apply(patch);
                self.save(&tasks);
            }
            None => debug!(id, "Update for unknown task ignored"),
        }

        tasks
    }

    /// Remove the task with `id`
    pub fn delete(&mut self, id: i64) -> Vec<Task> {
        let mut tasks = self.load();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);

        if tasks.len() == before {
            debug!(id, "Delete for unknown task ignored");
        }
        self.save(&tasks);
        tasks
    }

    /// Swap the task with its neighbour in `direction`
    ///
    /// No-op when the task is missing or already at that edge.
    pub fn move_task(&mut self, id: i64, direction: Direction) -> Vec<Task> {
        let mut tasks = self.load();

        let Some(index) = tasks.iter().position(|t| t.id == id) else {
            return tasks;
        };

        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < tasks.len()),
        };

        if let Some(target) = target {
            tasks.swap(index, target);
            self.save(&tasks);
            debug!(id, %direction, from = index, to = target, "Moved task");
        }

        tasks
    }

    /// Remove all persisted task data
    pub fn clear(&mut self) {
        match self.storage.remove(&self.key) {
            Ok(()) => info!(key = %self.key, "Cleared tasks"),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to clear tasks"),
        }
    }

    /// Pretty-printed JSON of the current collection
    pub fn export_snapshot(&self) -> Result<String> {
        snapshot::encode_pretty(&self.load())
    }

    /// Replace the collection with the well-formed entries of `text`
    ///
    /// Fails without touching stored state when `text` is not a JSON array.
    pub fn import_snapshot(&mut self, text: &str) -> Result<Vec<Task>> {
        let tasks = snapshot::decode_import(text)?;
        self.save(&tasks);
        info!(count = tasks.len(), "Imported tasks");
        Ok(tasks)
    }

    // ========================================================================
    // Convenience operations
    // ========================================================================

    pub fn get(&self, id: i64) -> Option<Task> {
        self.load().into_iter().find(|t| t.id == id)
    }

    /// Flip the completion flag of the task with `id`
    pub fn toggle_completion(&mut self, id: i64) -> Vec<Task> {
        match self.get(id) {
            Some(task) => self.update(id, TaskPatch::default().completed(!task.completed)),
            None => self.load(),
        }
    }

    /// Rename a task; blank titles are ignored
    pub fn edit_title(&mut self, id: i64, title: &str) -> Vec<Task> {
        let title = title.trim();
        if title.is_empty() {
            debug!(id, "Blank title ignored");
            return self.load();
        }
        self.update(id, TaskPatch::default().title(title))
    }

    /// Build a new task from `draft` and append it
    ///
    /// A non-PDF attachment is rejected before anything is stored. A failed
    /// read of an accepted attachment is logged and the task is created
    /// without it.
    pub async fn create(&mut self, draft: TaskDraft) -> Result<Task> {
        if let Some(source) = &draft.exercise {
            attachment::check_content_type(&source.content_type)?;
        }

        let id = fresh_id(&self.load());
        let mut task = Task::new(id, &draft.title, draft.category, draft.has_exercise)?;

        if let (true, Some(source)) = (draft.has_exercise, &draft.exercise) {
            match attachment::read_exercise_file(source).await {
                Ok(file) => task.exercise_file = Some(file),
                Err(e @ TaskError::AttachmentRead { .. }) => {
                    warn!(id, error = %e, "Creating task without attachment");
                }
                Err(e) => return Err(e),
            }
        }

        self.add(task.clone());
        info!(id, title = %task.title, "Created task");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::models::{Category, ExerciseSource};
    use crate::storage::{FileStorage, MemoryStorage, UnavailableStorage};
    use tempfile::TempDir;

    fn task(id: i64, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: String::new(),
            category: Category::DireitoAdministrativo,
            completed: false,
            created_at: "2024-05-01T12:00:00.000Z".to_string(),
            has_exercise: false,
            exercise_file: None,
        }
    }

    fn store_with(tasks: &[Task]) -> TaskStore<MemoryStorage> {
        let mut store = TaskStore::new(MemoryStorage::new());
        for t in tasks {
            store.add(t.clone());
        }
        store
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    /// Storage whose writes always fail but reads succeed
    #[derive(Default)]
    struct ReadOnlyStorage(MemoryStorage);

    impl BlobStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("read-only")))
        }

        fn remove(&mut self, _key: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("read-only")))
        }
    }

    #[test]
    fn test_load_empty() {
        let store = TaskStore::new(MemoryStorage::new());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_blob_is_empty() {
        let mut storage = MemoryStorage::new();
        storage.set(DEFAULT_STORAGE_KEY, "{not json").unwrap();

        let store = TaskStore::new(storage);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_bad_record_does_not_wipe_collection() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                DEFAULT_STORAGE_KEY,
                r#"[{"id":1,"title":"A","category":"Geografia","completed":false},
                    {"id":2,"title":"B","category":"Física","completed":false}]"#,
            )
            .unwrap();

        let mut store = TaskStore::new(storage);
        assert_eq!(ids(&store.load()), vec![1]);
        assert_eq!(ids(&store.add(task(3, "C"))), vec![1, 3]);
        assert_eq!(ids(&store.load()), vec![1, 3]);
    }

    #[test]
    fn test_unavailable_storage_degrades() {
        let mut store = TaskStore::new(UnavailableStorage);
        assert!(store.load().is_empty());

        let tasks = store.add(task(1, "A"));
        assert_eq!(ids(&tasks), vec![1]);
        assert!(store.load().is_empty());

        store.clear();
        assert!(store.export_snapshot().unwrap().starts_with('['));
    }

    #[test]
    fn test_failed_write_is_swallowed() {
        let mut store = TaskStore::new(ReadOnlyStorage::default());
        let tasks = store.add(task(1, "A"));
        assert_eq!(tasks.len(), 1);
        assert!(store.load().is_empty());
        store.clear();
    }

    #[test]
    fn test_add_appends_and_persists() {
        let mut store = store_with(&[task(1, "A"), task(2, "B")]);
        let c = task(3, "C");

        let tasks = store.add(c.clone());
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks.last(), Some(&c));
        assert_eq!(store.load(), tasks);
    }

    #[test]
    fn test_update_merges_fields() {
        let mut store = store_with(&[task(1, "A"), task(2, "B")]);

        let tasks = store.update(
            2,
            TaskPatch::default().completed(true).category(Category::Historia),
        );
        assert!(tasks[1].completed);
        assert_eq!(tasks[1].category, Category::Historia);
        assert_eq!(tasks[1].title, "B");
        assert_eq!(tasks[0], task(1, "A"));
        assert_eq!(store.load(), tasks);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut store = store_with(&[task(1, "A"), task(2, "B"), task(3, "C")]);
        let before = store.load();

        assert_eq!(store.update(99, TaskPatch::default().completed(true)), before);
        assert_eq!(store.delete(99), before);
        assert_eq!(store.move_task(99, Direction::Up), before);
        assert_eq!(store.move_task(99, Direction::Down), before);
        assert_eq!(store.toggle_completion(99), before);
        assert_eq!(store.edit_title(99, "X"), before);
        assert_eq!(store.load(), before);
    }

    #[test]
    fn test_delete() {
        let mut store = store_with(&[task(1, "A"), task(2, "B")]);
        assert_eq!(ids(&store.delete(1)), vec![2]);
        assert_eq!(ids(&store.load()), vec![2]);
    }

    #[test]
    fn test_move_swaps_neighbours() {
        let mut store = store_with(&[task(1, "A"), task(2, "B"), task(3, "C"), task(4, "D")]);

        assert_eq!(ids(&store.move_task(3, Direction::Up)), vec![1, 3, 2, 4]);
        assert_eq!(ids(&store.move_task(1, Direction::Down)), vec![3, 1, 2, 4]);
        assert_eq!(ids(&store.load()), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_move_out_of_bounds_is_noop() {
        let mut store = store_with(&[task(1, "A"), task(2, "B")]);
        assert_eq!(ids(&store.move_task(1, Direction::Up)), vec![1, 2]);
        assert_eq!(ids(&store.move_task(2, Direction::Down)), vec![1, 2]);
    }

    #[test]
    fn test_clear() {
        let mut store = store_with(&[task(1, "A")]);
        store.clear();
        assert!(store.load().is_empty());
        assert_eq!(store.storage().get(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_import_invalid_json_leaves_state() {
        let mut store = store_with(&[task(1, "A")]);
        let before = store.load();

        assert!(matches!(store.import_snapshot("{not json"), Err(TaskError::Import(_))));
        assert!(matches!(store.import_snapshot("{\"id\": 1}"), Err(TaskError::Import(_))));
        assert_eq!(store.load(), before);
    }

    #[test]
    fn test_import_replaces_and_filters() {
        let mut store = store_with(&[task(1, "A")]);
        let text = r#"[
            {"id": 10, "title": "Good", "category": "Direito Penal", "completed": true},
            {"id": 11, "category": "Direito Penal", "completed": false}
        ]"#;

        let tasks = store.import_snapshot(text).unwrap();
        assert_eq!(ids(&tasks), vec![10]);
        assert_eq!(store.load(), tasks);
    }

    #[test]
    fn test_toggle_and_edit_title() {
        let mut store = store_with(&[task(1, "A")]);

        assert!(store.toggle_completion(1)[0].completed);
        assert!(!store.toggle_completion(1)[0].completed);

        assert_eq!(store.edit_title(1, "  Novo título ")[0].title, "Novo título");
        assert_eq!(store.edit_title(1, "   ")[0].title, "Novo título");
    }

    #[test]
    fn test_scenario_reorder_delete_export_import() {
        let mut store = TaskStore::new(MemoryStorage::new());
        let (a, b, c) = (task(1, "A"), task(2, "B"), task(3, "C"));

        store.add(a.clone());
        store.add(b.clone());
        store.add(c.clone());

        assert_eq!(store.move_task(b.id, Direction::Up), vec![b.clone(), a.clone(), c.clone()]);
        assert_eq!(store.delete(a.id), vec![b.clone(), c.clone()]);

        let text = store.export_snapshot().unwrap();
        store.clear();

        let mut other = TaskStore::new(MemoryStorage::new());
        assert_eq!(other.import_snapshot(&text).unwrap(), vec![b.clone(), c.clone()]);
        assert_eq!(other.load(), vec![b, c]);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::new(FileStorage::open(temp.path()).unwrap());

        let mut t = task(1, "Com anexo");
        t.has_exercise = true;
        t.exercise_file = Some(crate::models::ExerciseFile {
            name: "lista.pdf".to_string(),
            data_url: "data:application/pdf;base64,JVBERi0xLjQ=".to_string(),
        });
        store.add(t.clone());
        store.add(task(2, "Sem anexo"));

        let reopened = TaskStore::new(FileStorage::open(temp.path()).unwrap());
        assert_eq!(reopened.load(), vec![t, task(2, "Sem anexo")]);
        assert!(temp.path().join("studyTasks.json").exists());
    }

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let mut store = TaskStore::new(MemoryStorage::new());
        let draft = TaskDraft {
            title: "  Estudar crase ".to_string(),
            category: Category::Portugues,
            has_exercise: false,
            exercise: None,
        };

        let first = store.create(draft.clone()).await.unwrap();
        let second = store.create(draft).await.unwrap();

        assert_eq!(first.title, "Estudar crase");
        assert!(second.id > first.id);
        assert_eq!(ids(&store.load()), vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let mut store = TaskStore::new(MemoryStorage::new());
        let draft = TaskDraft {
            title: " ".to_string(),
            category: Category::Portugues,
            has_exercise: false,
            exercise: None,
        };
        assert!(matches!(store.create(draft).await, Err(TaskError::EmptyTitle)));
        assert!(store.load().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_attachment() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("simulado.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let mut store = TaskStore::new(MemoryStorage::new());
        let task = store
            .create(TaskDraft {
                title: "Simulado".to_string(),
                category: Category::Informatica,
                has_exercise: true,
                exercise: Some(ExerciseSource {
                    path,
                    content_type: attachment::PDF_CONTENT_TYPE.to_string(),
                }),
            })
            .await
            .unwrap();

        let file = task.exercise_file.unwrap();
        assert_eq!(file.name, "simulado.pdf");
        assert_eq!(file.data_url, "data:application/pdf;base64,JVBERi0xLjQ=");
    }

    #[tokio::test]
    async fn test_create_rejects_non_pdf() {
        let mut store = TaskStore::new(MemoryStorage::new());
        let result = store
            .create(TaskDraft {
                title: "Mapa".to_string(),
                category: Category::Geografia,
                has_exercise: true,
                exercise: Some(ExerciseSource {
                    path: "mapa.png".into(),
                    content_type: "image/png".to_string(),
                }),
            })
            .await;

        assert!(matches!(result, Err(TaskError::AttachmentRejected { .. })));
        assert!(store.load().is_empty());
    }

    #[tokio::test]
    async fn test_create_survives_read_failure() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::new(MemoryStorage::new());

        let task = store
            .create(TaskDraft {
                title: "Lista perdida".to_string(),
                category: Category::Matematica,
                has_exercise: true,
                exercise: Some(ExerciseSource {
                    path: temp.path().join("missing.pdf"),
                    content_type: attachment::PDF_CONTENT_TYPE.to_string(),
                }),
            })
            .await
            .unwrap();

        assert!(task.has_exercise);
        assert!(task.exercise_file.is_none());
        assert_eq!(store.load(), vec![task]);
    }
}
