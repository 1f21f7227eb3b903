use crate::manifest::BridgeManifest;
use agentos_protocol::CoreResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A live bridge instance. Inference itself is up to the implementation.
pub trait LlmBridge: Send + Sync {
    fn manifest(&self) -> &BridgeManifest;

    /// Resolved configuration the instance was built with
    fn config(&self) -> &Value;
}

/// Builds bridge instances for one implementation.
///
/// Implementations either construct directly or expose a factory through
/// [`BridgeConstructor::create`]; [`instantiate`] prefers the factory.
pub trait BridgeConstructor: Send + Sync {
    fn construct(
        &self,
        manifest: &BridgeManifest,
        config: Value,
    ) -> anyhow::Result<Arc<dyn LlmBridge>>;

    /// Optional factory. `None` means the implementation has none.
    fn create(
        &self,
        _manifest: &BridgeManifest,
        _config: &Value,
    ) -> Option<anyhow::Result<Arc<dyn LlmBridge>>> {
        None
    }
}

/// Build an instance, using the factory when the constructor offers one.
pub fn instantiate(
    ctor: &dyn BridgeConstructor,
    manifest: &BridgeManifest,
    config: Value,
) -> anyhow::Result<Arc<dyn LlmBridge>> {
    match ctor.create(manifest, &config) {
        Some(created) => created,
        None => ctor.construct(manifest, config),
    }
}

type ConstructFn =
    dyn Fn(&BridgeManifest, Value) -> anyhow::Result<Arc<dyn LlmBridge>> + Send + Sync;

/// Closure-backed constructor
pub struct FnBridgeConstructor {
    construct: Box<ConstructFn>,
}

impl FnBridgeConstructor {
    pub fn new<F>(construct: F) -> Self
    where
        F: Fn(&BridgeManifest, Value) -> anyhow::Result<Arc<dyn LlmBridge>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            construct: Box::new(construct),
        }
    }
}

impl BridgeConstructor for FnBridgeConstructor {
    fn construct(
        &self,
        manifest: &BridgeManifest,
        config: Value,
    ) -> anyhow::Result<Arc<dyn LlmBridge>> {
        (self.construct)(manifest, config)
    }
}

/// Constructor and canonical manifest of an installed implementation
#[derive(Clone)]
pub struct LoadedBridge {
    pub ctor: Arc<dyn BridgeConstructor>,
    pub manifest: BridgeManifest,
}

impl std::fmt::Debug for LoadedBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedBridge")
            .field("manifest", &self.manifest.name)
            .finish_non_exhaustive()
    }
}

/// Resolves a bridge implementation by manifest name
#[async_trait]
pub trait BridgeLoader: Send + Sync {
    async fn load(&self, name: &str) -> CoreResult<LoadedBridge>;
}
