// studytasks - Study task tracker with a pluggable local blob store

pub mod attachment;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod snapshot;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use error::{Result, StorageError, TaskError};
pub use models::{Category, Direction, ExerciseFile, ExerciseSource, Task, TaskDraft, TaskPatch, fresh_id, now_ms};
pub use query::{StatusFilter, TaskFilter, TaskStats};
pub use storage::{BlobStorage, FileStorage, MemoryStorage, UnavailableStorage};
pub use store::{DEFAULT_STORAGE_KEY, TaskStore};
