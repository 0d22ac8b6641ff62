pub mod api;
pub mod stats;
pub mod store;
pub mod types;
pub mod worker;

pub use store::RecordStore;
pub use types::{WorkerConfig, WorkerError};
pub use worker::{Worker, WorkerHandle};
