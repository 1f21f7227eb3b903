//! # AgentOS Agent Metadata
//!
//! Durable CRUD storage for agent metadata.
//!
//! ## Storage layout
//!
//! ```text
//! <root>/
//!     ├── 1718000000000-1a2b3c4d.json
//!     └── 1718000000123-9f8e7d6c.json
//! ```
//!
//! Each record carries a monotonic `version`. Passing
//! [`UpdateOptions::expected_version`] turns an update into a compare-and-set:
//! a stale version fails with `VERSION_CONFLICT` and the file is left as is.
//!
//! ## Example
//!
//! ```no_run
//! use agentos_agent_metadata::{
//!     AgentMetadataRepository, CreateAgentMetadata, FileAgentMetadataRepository,
//! };
//!
//! # async fn demo() -> agentos_protocol::CoreResult<()> {
//! let repo = FileAgentMetadataRepository::new("/tmp/agents");
//! let agent = repo
//!     .create(CreateAgentMetadata {
//!         name: "Researcher".into(),
//!         ..Default::default()
//!     })
//!     .await?;
//! assert_eq!(agent.version, "1");
//! # Ok(())
//! # }
//! ```

mod ids;
mod repository;
mod types;

pub use ids::{generate_agent_id, next_version, validate_agent_id, INITIAL_VERSION};
pub use repository::{
    AgentMetadataEvent, AgentMetadataEventKind, AgentMetadataHandler, AgentMetadataRepository,
    FileAgentMetadataRepository, AGENT_METADATA_CHANGED_CHANNEL, AGENT_METADATA_DELETED_CHANNEL,
};
pub use types::{
    AgentMetadata, AgentMetadataPatch, AgentSearchQuery, AgentStatus, CreateAgentMetadata,
    EnabledMcp, Preset, UpdateOptions,
};
