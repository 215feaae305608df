// TodoStore - To-do list state with filtered views and key-value persistence

pub mod clock;
pub mod config;
pub mod filter;
pub mod models;
pub mod persist;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, SystemClock};
pub use config::{Backend, Config};
pub use filter::{Filter, SortOrder};
pub use models::{Task, TaskId};
pub use persist::{BlobPersistence, Persistence};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, SqliteStorage};
pub use store::{StoreOptions, TaskStore};
