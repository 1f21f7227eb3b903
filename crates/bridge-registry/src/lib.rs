//! # AgentOS Bridge Registry
//!
//! Persists LLM bridge installations, tracks the active bridge and lazily
//! materializes live bridge instances through a pluggable loader.
//!
//! ## Architecture
//!
//! ```text
//! register(manifest, config)
//!     │
//!     ├──> BridgeLoader::load(manifest.name)   (cached by name)
//!     ├──> config: schema defaults + JSON Schema validation
//!     ├──> instantiate (factory preferred over construct)   (cached by id)
//!     └──> bridges/<id>.json, first registration → bridges/_active.json
//!
//! get_bridge(id)
//!     │
//!     ├──> live instance cache hit
//!     └──> hydrate: record → load → validate against current schema → construct
//!          (failures logged, None returned)
//! ```

mod bridge;
mod config;
mod loader;
mod manifest;
mod registry;

pub use bridge::{
    instantiate, BridgeConstructor, BridgeLoader, FnBridgeConstructor, LlmBridge, LoadedBridge,
};
pub use config::{apply_schema_defaults, validate_bridge_config};
pub use loader::StaticBridgeLoader;
pub use manifest::{config_schema_for, BridgeManifest};
pub use registry::{
    validate_bridge_id, ActiveBridgeState, BridgeId, InstalledBridgeRecord,
    InstalledBridgeSummary, LlmBridgeRegistry, RegisterOptions, ACTIVE_STATE_ID,
};
