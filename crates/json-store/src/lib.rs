//! # AgentOS JSON Store
//!
//! File-per-record JSON persistence used by the agent metadata repository and
//! the bridge registry.
//!
//! - [`JsonFileHandler`] reads and atomically writes a single document
//! - [`JsonDirectory`] maps record ids to `<root>/<id>.json` and enumerates them

mod dir;
mod error;
mod file;

pub use dir::JsonDirectory;
pub use error::{JsonStoreError, Result};
pub use file::{JsonFileHandler, WriteOptions};
