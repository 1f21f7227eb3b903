use crate::bridge::{instantiate, BridgeLoader, LlmBridge, LoadedBridge};
use crate::config::validate_bridge_config;
use crate::manifest::BridgeManifest;
use agentos_json_store::{JsonDirectory, JsonFileHandler, JsonStoreError, WriteOptions};
use agentos_protocol::{CoreError, CoreResult, ErrorDomain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reserved file stem of the active-bridge state
pub const ACTIVE_STATE_ID: &str = "_active";

pub type BridgeId = String;

/// A persisted bridge installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledBridgeRecord {
    pub id: BridgeId,
    pub manifest: BridgeManifest,
    pub installed_at: DateTime<Utc>,
    /// Resolved, validated configuration
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledBridgeSummary {
    pub id: BridgeId,
    pub manifest: BridgeManifest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBridgeState {
    pub active_id: Option<BridgeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Defaults to the manifest name
    pub id: Option<BridgeId>,
}

impl RegisterOptions {
    pub fn with_id(id: impl Into<BridgeId>) -> Self {
        Self { id: Some(id.into()) }
    }
}

/// Bridge ids are file stems: `[A-Za-z0-9._-]`, not starting with `_` or `.`.
pub fn validate_bridge_id(id: &str) -> CoreResult<()> {
    let valid = !id.is_empty()
        && !id.starts_with(&['_', '.'][..])
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(
            CoreError::invalid_argument(ErrorDomain::Bridge, format!("invalid bridge id: {id:?}"))
                .with_details(json!({ "id": id })),
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Persisted bridge installations plus memoized live instances.
///
/// Layout under `base_dir`:
///
/// ```text
/// bridges/
///     ├── _active.json        {activeId, updatedAt}
///     ├── openai.json         InstalledBridgeRecord
///     └── local-llama.json
/// ```
///
/// The caches are per instance and unsynchronised across awaits: concurrent
/// hydration of one id may construct twice, but only the first instance is
/// kept. Only one registry should own a `base_dir` at a time.
pub struct LlmBridgeRegistry {
    dir: JsonDirectory,
    loader: Arc<dyn BridgeLoader>,
    /// Loaded implementations by manifest name
    loaded: Mutex<HashMap<String, LoadedBridge>>,
    /// Live instances by bridge id
    created: Mutex<HashMap<BridgeId, Arc<dyn LlmBridge>>>,
}

impl LlmBridgeRegistry {
    pub fn new(base_dir: impl AsRef<Path>, loader: Arc<dyn BridgeLoader>) -> Self {
        Self {
            dir: JsonDirectory::new(base_dir.as_ref().join("bridges")),
            loader,
            loaded: Mutex::new(HashMap::new()),
            created: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn bridges_dir(&self) -> &Path {
        self.dir.root()
    }

    fn storage_error(&self, operation: &str, id: Option<&str>, err: &JsonStoreError) -> CoreError {
        CoreError::internal(ErrorDomain::Bridge, format!("failed to {operation} bridge state"))
            .with_details(json!({
                "operation": operation,
                "id": id,
                "root": self.dir.root().display().to_string(),
            }))
            .with_cause(err)
    }

    fn active_handler(&self) -> JsonFileHandler {
        self.dir.handler(ACTIVE_STATE_ID)
    }

    async fn persist_record(&self, record: &InstalledBridgeRecord) -> CoreResult<()> {
        self.dir
            .handler(&record.id)
            .write(record, WriteOptions::default())
            .await
            .map_err(|err| self.storage_error("write", Some(&record.id), &err))
    }

    async fn write_active(&self, active_id: Option<&str>) -> CoreResult<()> {
        let state = ActiveBridgeState {
            active_id: active_id.map(str::to_string),
            updated_at: Some(Utc::now()),
        };
        self.active_handler()
            .write(&state, WriteOptions::default())
            .await
            .map_err(|err| self.storage_error("write", Some(ACTIVE_STATE_ID), &err))
    }

    /// Resolve an implementation through the loader, caching successes by name.
    async fn load(&self, name: &str) -> CoreResult<LoadedBridge> {
        let cached = lock(&self.loaded).get(name).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }
        let loaded = self.loader.load(name).await?;
        lock(&self.loaded).insert(name.to_string(), loaded.clone());
        Ok(loaded)
    }

    /// Persisted ids in sorted order, without the active-state file
    pub async fn list_ids(&self) -> CoreResult<Vec<BridgeId>> {
        let ids = self
            .dir
            .list_ids()
            .await
            .map_err(|err| self.storage_error("list", None, &err))?;
        Ok(ids
            .into_iter()
            .filter(|id| !id.starts_with('_'))
            .collect())
    }

    /// Installed bridges whose implementation can currently be loaded.
    /// Records that fail to read or load are hidden, not removed.
    pub async fn list_summaries(&self) -> CoreResult<Vec<InstalledBridgeSummary>> {
        let mut summaries = Vec::new();
        for id in self.list_ids().await? {
            let record = match self.dir.handler(&id).read::<InstalledBridgeRecord>().await {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("Skipping unreadable bridge record {id}: {err}");
                    continue;
                }
            };
            if self.ensure_dependency_available(&record.manifest.name).await {
                summaries.push(InstalledBridgeSummary {
                    id: record.id,
                    manifest: record.manifest,
                });
            }
        }
        Ok(summaries)
    }

    /// Whether the implementation named `name` can be loaded right now
    pub async fn ensure_dependency_available(&self, name: &str) -> bool {
        match self.load(name).await {
            Ok(_) => true,
            Err(err) => {
                log::debug!("Bridge implementation {name} unavailable: {err}");
                false
            }
        }
    }

    /// Validate, instantiate and persist a bridge. The first registration
    /// becomes the active bridge. Re-registering an id replaces both the
    /// stored record and the live instance.
    pub async fn register(
        &self,
        manifest: BridgeManifest,
        config: Value,
        options: RegisterOptions,
    ) -> CoreResult<BridgeId> {
        let id = options.id.unwrap_or_else(|| manifest.name.clone());
        validate_bridge_id(&id)?;

        let loaded = self.load(&manifest.name).await?;
        let resolved = validate_bridge_config(&manifest, &config)?;
        let instance = instantiate(loaded.ctor.as_ref(), &manifest, resolved.clone()).map_err(
            |err| {
                CoreError::operation_failed(
                    ErrorDomain::Bridge,
                    format!("failed to instantiate bridge {id}"),
                )
                .with_details(json!({ "id": id, "name": manifest.name }))
                .with_cause(format!("{err:#}"))
            },
        )?;

        let record = InstalledBridgeRecord {
            id: id.clone(),
            manifest,
            installed_at: Utc::now(),
            config: resolved,
        };
        self.persist_record(&record).await?;
        lock(&self.created).insert(id.clone(), instance);

        if self.get_active_id().await?.is_none() {
            self.write_active(Some(&id)).await?;
        }
        log::info!("Registered bridge {id} ({})", record.manifest.name);
        Ok(id)
    }

    /// Persist a record for `manifest` without instantiating it. An existing
    /// record with the same id is returned untouched.
    pub async fn ensure_manifest_record(
        &self,
        manifest: BridgeManifest,
        config: Value,
    ) -> CoreResult<InstalledBridgeRecord> {
        let id = manifest.name.clone();
        validate_bridge_id(&id)?;
        if let Some(existing) = self.get_record(&id).await? {
            return Ok(existing);
        }

        let resolved = validate_bridge_config(&manifest, &config)?;
        let record = InstalledBridgeRecord {
            id: id.clone(),
            manifest,
            installed_at: Utc::now(),
            config: resolved,
        };
        self.persist_record(&record).await?;
        if self.get_active_id().await?.is_none() {
            self.write_active(Some(&id)).await?;
        }
        log::info!("Recorded bridge manifest {id}");
        Ok(record)
    }

    /// Remove a bridge. When it was active, the first remaining id takes over.
    pub async fn unregister(&self, id: &str) -> CoreResult<()> {
        validate_bridge_id(id)?;
        let removed = self
            .dir
            .handler(id)
            .remove()
            .await
            .map_err(|err| self.storage_error("delete", Some(id), &err))?;
        lock(&self.created).remove(id);

        if self.get_active_id().await?.as_deref() == Some(id) {
            let fallback = self.list_ids().await?.into_iter().next();
            self.write_active(fallback.as_deref()).await?;
            log::info!("Active bridge {id} removed; now {fallback:?}");
        }
        if removed {
            log::info!("Unregistered bridge {id}");
        } else {
            log::debug!("Unregister of absent bridge {id} ignored");
        }
        Ok(())
    }

    pub async fn get_record(&self, id: &str) -> CoreResult<Option<InstalledBridgeRecord>> {
        validate_bridge_id(id)?;
        self.dir
            .handler(id)
            .read_optional::<InstalledBridgeRecord>()
            .await
            .map_err(|err| self.storage_error("read", Some(id), &err))
    }

    /// Live instance for `id`, hydrating from disk on first use.
    ///
    /// Any failure (missing record, unloadable implementation, config that no
    /// longer satisfies the current schema) is logged and yields `None`.
    pub async fn get_bridge(&self, id: &str) -> Option<Arc<dyn LlmBridge>> {
        let cached = lock(&self.created).get(id).cloned();
        if cached.is_some() {
            return cached;
        }
        match self.hydrate(id).await {
            Ok(bridge) => bridge,
            Err(err) => {
                log::warn!("Failed to hydrate bridge {id}: {err}");
                None
            }
        }
    }

    async fn hydrate(&self, id: &str) -> CoreResult<Option<Arc<dyn LlmBridge>>> {
        let Some(record) = self.get_record(id).await? else {
            return Ok(None);
        };
        let loaded = self.load(&record.manifest.name).await?;
        let resolved = validate_bridge_config(&loaded.manifest, &record.config)?;
        let instance = instantiate(loaded.ctor.as_ref(), &record.manifest, resolved).map_err(
            |err| {
                CoreError::operation_failed(
                    ErrorDomain::Bridge,
                    format!("failed to instantiate bridge {id}"),
                )
                .with_cause(format!("{err:#}"))
            },
        )?;

        let kept = Arc::clone(lock(&self.created).entry(id.to_string()).or_insert(instance));
        log::debug!("Hydrated bridge {id} from {}", self.dir.path_for(id).display());
        Ok(Some(kept))
    }

    pub async fn get_bridge_or_throw(&self, id: &str) -> CoreResult<Arc<dyn LlmBridge>> {
        self.get_bridge(id).await.ok_or_else(|| {
            CoreError::not_found(ErrorDomain::Bridge, format!("bridge not available: {id}"))
                .with_details(json!({ "id": id }))
        })
    }

    /// First available installation whose manifest is named `name`
    pub async fn get_bridge_by_name(&self, name: &str) -> Option<Arc<dyn LlmBridge>> {
        let summaries = match self.list_summaries().await {
            Ok(summaries) => summaries,
            Err(err) => {
                log::warn!("Cannot list bridges while resolving {name}: {err}");
                return None;
            }
        };
        let summary = summaries.into_iter().find(|s| s.manifest.name == name)?;
        self.get_bridge(&summary.id).await
    }

    /// Active id from `_active.json`. A missing or unreadable state file reads
    /// as no selection, so it never fails a mutation that already hit disk.
    pub async fn get_active_id(&self) -> CoreResult<Option<BridgeId>> {
        let state: ActiveBridgeState = self.active_handler().read_or_default().await;
        Ok(state.active_id)
    }

    /// Select the active bridge. `Some(id)` must name an installed record.
    pub async fn set_active_id(&self, id: Option<&str>) -> CoreResult<()> {
        if let Some(id) = id {
            if self.get_record(id).await?.is_none() {
                return Err(CoreError::not_found(
                    ErrorDomain::Bridge,
                    format!("bridge not installed: {id}"),
                )
                .with_details(json!({ "id": id })));
            }
        }
        self.write_active(id).await
    }

    pub async fn get_active_bridge(&self) -> CoreResult<Option<Arc<dyn LlmBridge>>> {
        match self.get_active_id().await? {
            Some(id) => Ok(self.get_bridge(&id).await),
            None => Ok(None),
        }
    }
}
