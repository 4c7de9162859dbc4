//! tasklens-core: tasks, proof images and local persistence
//!
//! Owns the task list and everything it stores. The image analysis engine in
//! `tasklens-eye` only borrows [`ImageRef`] from here and never sees tasks.

pub mod config;
pub mod error;
pub mod image_ref;
pub mod store;
pub mod task;

pub use config::TaskLensConfig;
pub use error::{Error, Result};
pub use image_ref::ImageRef;
pub use store::TaskStore;
pub use task::{Task, TaskFilter, TaskId};
