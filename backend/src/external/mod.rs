//! External API integrations

pub mod storage;

pub use storage::{run_post_commit, PostCommit, StorageClient};
