use crate::ids::{generate_agent_id, next_version, validate_agent_id, INITIAL_VERSION};
use crate::types::{
    AgentMetadata, AgentMetadataPatch, AgentSearchQuery, CreateAgentMetadata, UpdateOptions,
};
use agentos_json_store::{JsonDirectory, JsonStoreError, WriteOptions};
use agentos_protocol::{
    paginate_by_key, CoreError, CoreResult, CursorPagination, CursorPaginationResult, ErrorDomain,
    EventPublisher, Listeners, Unsubscribe,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const AGENT_METADATA_CHANGED_CHANNEL: &str = "agent-metadata.changed";
pub const AGENT_METADATA_DELETED_CHANNEL: &str = "agent-metadata.deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMetadataEventKind {
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentMetadataEvent {
    Changed { id: String, version: String },
    Deleted { id: String },
}

impl AgentMetadataEvent {
    #[must_use]
    pub const fn kind(&self) -> AgentMetadataEventKind {
        match self {
            Self::Changed { .. } => AgentMetadataEventKind::Changed,
            Self::Deleted { .. } => AgentMetadataEventKind::Deleted,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Changed { id, .. } | Self::Deleted { id } => id,
        }
    }
}

pub type AgentMetadataHandler = Arc<dyn Fn(&AgentMetadataEvent) + Send + Sync>;

/// Durable agent metadata storage.
///
/// Listeners registered through [`AgentMetadataRepository::on`] are invoked
/// before the mutating call returns.
#[async_trait]
pub trait AgentMetadataRepository: Send + Sync {
    /// `Ok(None)` when no record exists for `id`.
    async fn get(&self, id: &str) -> CoreResult<Option<AgentMetadata>>;

    async fn list(
        &self,
        pagination: &CursorPagination,
    ) -> CoreResult<CursorPaginationResult<AgentMetadata>>;

    async fn search(
        &self,
        query: &AgentSearchQuery,
        pagination: &CursorPagination,
    ) -> CoreResult<CursorPaginationResult<AgentMetadata>>;

    async fn create(&self, meta: CreateAgentMetadata) -> CoreResult<AgentMetadata>;

    async fn update(
        &self,
        id: &str,
        patch: AgentMetadataPatch,
        options: UpdateOptions,
    ) -> CoreResult<AgentMetadata>;

    /// Idempotent: deleting an absent id succeeds.
    async fn delete(&self, id: &str) -> CoreResult<()>;

    async fn add_active_session_count(&self, id: &str) -> CoreResult<AgentMetadata>;

    /// Never drops below zero.
    async fn minus_active_session_count(&self, id: &str) -> CoreResult<AgentMetadata>;

    /// Bump `usage_count` and stamp `last_used`.
    async fn record_usage(&self, id: &str) -> CoreResult<AgentMetadata>;

    fn on(&self, kind: AgentMetadataEventKind, handler: AgentMetadataHandler) -> Unsubscribe;
}

/// One pretty-printed `<root>/<id>.json` document per agent.
///
/// There is no in-process locking: concurrent updates of the same id race
/// unless callers pass an expected version. Only one repository should own a
/// directory at a time.
pub struct FileAgentMetadataRepository {
    dir: JsonDirectory,
    changed: Listeners<AgentMetadataEvent>,
    deleted: Listeners<AgentMetadataEvent>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl FileAgentMetadataRepository {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: JsonDirectory::new(root_dir),
            changed: Listeners::new(),
            deleted: Listeners::new(),
            publisher: None,
        }
    }

    /// Also forward every event to `publisher` on the `agent-metadata.*` channels.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        self.dir.root()
    }

    fn storage_error(&self, operation: &str, id: Option<&str>, err: &JsonStoreError) -> CoreError {
        CoreError::internal(
            ErrorDomain::Agent,
            format!("failed to {operation} agent metadata"),
        )
        .with_details(serde_json::json!({
            "operation": operation,
            "id": id,
            "root": self.dir.root().display().to_string(),
        }))
        .with_cause(err)
    }

    async fn read_record(&self, id: &str) -> CoreResult<Option<AgentMetadata>> {
        self.dir
            .handler(id)
            .read_optional::<AgentMetadata>()
            .await
            .map_err(|err| self.storage_error("read", Some(id), &err))
    }

    async fn require_record(&self, id: &str) -> CoreResult<AgentMetadata> {
        validate_agent_id(id)?;
        self.read_record(id).await?.ok_or_else(|| {
            CoreError::not_found(ErrorDomain::Agent, format!("agent not found: {id}"))
                .with_details(serde_json::json!({ "id": id }))
        })
    }

    async fn persist(&self, meta: &AgentMetadata) -> CoreResult<()> {
        self.dir
            .handler(&meta.id)
            .write(meta, WriteOptions::default())
            .await
            .map_err(|err| self.storage_error("write", Some(&meta.id), &err))
    }

    /// Every readable record; unreadable or malformed files are skipped.
    async fn read_all(&self) -> CoreResult<Vec<AgentMetadata>> {
        let ids = self
            .dir
            .list_ids()
            .await
            .map_err(|err| self.storage_error("list", None, &err))?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.dir.handler(&id).read::<AgentMetadata>().await {
                Ok(meta) => records.push(meta),
                Err(err) => log::warn!("Skipping unreadable agent metadata {id}: {err}"),
            }
        }
        Ok(records)
    }

    fn emit(&self, event: &AgentMetadataEvent) {
        let (listeners, channel) = match event.kind() {
            AgentMetadataEventKind::Changed => (&self.changed, AGENT_METADATA_CHANGED_CHANNEL),
            AgentMetadataEventKind::Deleted => (&self.deleted, AGENT_METADATA_DELETED_CHANNEL),
        };
        listeners.emit(channel, event);

        if let Some(publisher) = &self.publisher {
            match serde_json::to_value(event) {
                Ok(payload) => publisher.publish(channel, payload),
                Err(err) => log::warn!("Cannot encode {channel} event: {err}"),
            }
        }
    }

    /// Read-modify-write with a version bump. With `expected_version`, a stale
    /// caller is rejected before anything is written.
    async fn mutate(
        &self,
        id: &str,
        expected_version: Option<&str>,
        apply: impl FnOnce(&mut AgentMetadata) + Send,
    ) -> CoreResult<AgentMetadata> {
        let current = self.require_record(id).await?;
        if let Some(expected) = expected_version {
            if current.version != expected {
                return Err(CoreError::version_conflict(
                    ErrorDomain::Agent,
                    format!("agent {id} was modified concurrently"),
                    expected,
                    &current.version,
                )
                .with_details(serde_json::json!({ "id": id })));
            }
        }

        let mut next = current.clone();
        apply(&mut next);
        next.id = current.id;
        next.version = next_version(&current.version)?;

        self.persist(&next).await?;
        self.emit(&AgentMetadataEvent::Changed {
            id: next.id.clone(),
            version: next.version.clone(),
        });
        Ok(next)
    }
}

#[async_trait]
impl AgentMetadataRepository for FileAgentMetadataRepository {
    async fn get(&self, id: &str) -> CoreResult<Option<AgentMetadata>> {
        validate_agent_id(id)?;
        self.read_record(id).await
    }

    async fn list(
        &self,
        pagination: &CursorPagination,
    ) -> CoreResult<CursorPaginationResult<AgentMetadata>> {
        let records = self.read_all().await?;
        Ok(paginate_by_key(records, |m| m.id.as_str(), pagination))
    }

    async fn search(
        &self,
        query: &AgentSearchQuery,
        pagination: &CursorPagination,
    ) -> CoreResult<CursorPaginationResult<AgentMetadata>> {
        let mut records = self.read_all().await?;
        records.retain(|meta| query.matches(meta));
        Ok(paginate_by_key(records, |m| m.id.as_str(), pagination))
    }

    async fn create(&self, meta: CreateAgentMetadata) -> CoreResult<AgentMetadata> {
        if meta.name.trim().is_empty() {
            return Err(CoreError::validation(
                ErrorDomain::Agent,
                "agent name must not be empty",
            ));
        }

        let record = AgentMetadata {
            id: generate_agent_id(),
            version: INITIAL_VERSION.to_string(),
            name: meta.name,
            description: meta.description,
            icon: meta.icon,
            keywords: meta.keywords,
            preset: meta.preset,
            status: meta.status,
            session_count: 0,
            usage_count: 0,
            last_used: None,
        };
        self.persist(&record).await?;
        log::info!("Created agent {} ({})", record.id, record.name);

        self.emit(&AgentMetadataEvent::Changed {
            id: record.id.clone(),
            version: record.version.clone(),
        });
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        patch: AgentMetadataPatch,
        options: UpdateOptions,
    ) -> CoreResult<AgentMetadata> {
        self.mutate(id, options.expected_version.as_deref(), |meta| {
            patch.apply_to(meta);
        })
        .await
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        validate_agent_id(id)?;
        let removed = self
            .dir
            .handler(id)
            .remove()
            .await
            .map_err(|err| self.storage_error("delete", Some(id), &err))?;

        if removed {
            log::info!("Deleted agent {id}");
            self.emit(&AgentMetadataEvent::Deleted { id: id.to_string() });
        } else {
            log::debug!("Delete of absent agent {id} ignored");
        }
        Ok(())
    }

    async fn add_active_session_count(&self, id: &str) -> CoreResult<AgentMetadata> {
        self.mutate(id, None, |meta| {
            meta.session_count = meta.session_count.saturating_add(1);
        })
        .await
    }

    async fn minus_active_session_count(&self, id: &str) -> CoreResult<AgentMetadata> {
        self.mutate(id, None, |meta| {
            meta.session_count = meta.session_count.saturating_sub(1);
        })
        .await
    }

    async fn record_usage(&self, id: &str) -> CoreResult<AgentMetadata> {
        let now = Utc::now();
        self.mutate(id, None, move |meta| {
            meta.usage_count = meta.usage_count.saturating_add(1);
            meta.last_used = Some(now);
        })
        .await
    }

    fn on(&self, kind: AgentMetadataEventKind, handler: AgentMetadataHandler) -> Unsubscribe {
        match kind {
            AgentMetadataEventKind::Changed => self.changed.subscribe(handler),
            AgentMetadataEventKind::Deleted => self.deleted.subscribe(handler),
        }
    }
}
