use crate::bridge::{BridgeConstructor, BridgeLoader, LoadedBridge};
use crate::manifest::BridgeManifest;
use agentos_protocol::{CoreError, CoreResult, ErrorDomain};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory table of bridge implementations compiled into the binary.
///
/// `remove` models an uninstalled package: records referring to it stay on
/// disk but can no longer be hydrated.
#[derive(Default)]
pub struct StaticBridgeLoader {
    bridges: RwLock<BTreeMap<String, LoadedBridge>>,
}

impl StaticBridgeLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bridge(self, manifest: BridgeManifest, ctor: Arc<dyn BridgeConstructor>) -> Self {
        self.insert(manifest, ctor);
        self
    }

    /// Register an implementation under `manifest.name`, replacing any previous one.
    pub fn insert(&self, manifest: BridgeManifest, ctor: Arc<dyn BridgeConstructor>) {
        let mut bridges = self.bridges.write().unwrap_or_else(PoisonError::into_inner);
        bridges.insert(manifest.name.clone(), LoadedBridge { ctor, manifest });
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut bridges = self.bridges.write().unwrap_or_else(PoisonError::into_inner);
        bridges.remove(name).is_some()
    }
}

#[async_trait]
impl BridgeLoader for StaticBridgeLoader {
    async fn load(&self, name: &str) -> CoreResult<LoadedBridge> {
        let bridges = self.bridges.read().unwrap_or_else(PoisonError::into_inner);
        bridges.get(name).cloned().ok_or_else(|| {
            CoreError::not_found(
                ErrorDomain::Bridge,
                format!("bridge implementation not installed: {name}"),
            )
            .with_details(serde_json::json!({ "name": name }))
        })
    }
}
