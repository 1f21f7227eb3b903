use agentos_bridge_registry::{
    BridgeConstructor, BridgeLoader, BridgeManifest, FnBridgeConstructor, LlmBridge,
    LlmBridgeRegistry, RegisterOptions, StaticBridgeLoader,
};
use agentos_protocol::{CoreError, CoreResult, ErrorCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct TestBridge {
    manifest: BridgeManifest,
    config: Value,
}

impl LlmBridge for TestBridge {
    fn manifest(&self) -> &BridgeManifest {
        &self.manifest
    }

    fn config(&self) -> &Value {
        &self.config
    }
}

fn manifest(name: &str) -> BridgeManifest {
    BridgeManifest::new(name, "1.0.0").with_config_schema(json!({
        "type": "object",
        "properties": {
            "model": { "type": "string", "default": "tiny" }
        },
        "additionalProperties": false
    }))
}

fn counting_ctor(counter: Arc<AtomicUsize>) -> Arc<dyn BridgeConstructor> {
    Arc::new(FnBridgeConstructor::new(move |manifest, config| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestBridge {
            manifest: manifest.clone(),
            config,
        }) as Arc<dyn LlmBridge>)
    }))
}

struct Fixture {
    temp: TempDir,
    loader: Arc<StaticBridgeLoader>,
    constructed: Arc<AtomicUsize>,
    registry: LlmBridgeRegistry,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let constructed = Arc::new(AtomicUsize::new(0));
        let loader = Arc::new(
            StaticBridgeLoader::new()
                .with_bridge(manifest("test-bridge"), counting_ctor(Arc::clone(&constructed)))
                .with_bridge(manifest("other-bridge"), counting_ctor(Arc::clone(&constructed))),
        );
        let registry =
            LlmBridgeRegistry::new(temp.path(), Arc::clone(&loader) as Arc<dyn BridgeLoader>);
        Self {
            temp,
            loader,
            constructed,
            registry,
        }
    }

    /// A second registry over the same directory, with cold caches
    fn reopen(&self) -> LlmBridgeRegistry {
        LlmBridgeRegistry::new(
            self.temp.path(),
            Arc::clone(&self.loader) as Arc<dyn BridgeLoader>,
        )
    }

    fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

fn expect_err<T>(result: CoreResult<T>) -> CoreError {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    }
}

#[tokio::test]
async fn lifecycle_tracks_active_bridge() {
    let fx = Fixture::new();
    let registry = &fx.registry;

    let id = registry
        .register(manifest("test-bridge"), json!({}), RegisterOptions::default())
        .await
        .expect("register test-bridge");
    assert_eq!(id, "test-bridge");
    assert_eq!(registry.list_ids().await.unwrap(), vec!["test-bridge"]);
    assert_eq!(registry.get_active_id().await.unwrap().as_deref(), Some("test-bridge"));

    registry
        .register(manifest("other-bridge"), json!({}), RegisterOptions::default())
        .await
        .expect("register other-bridge");
    assert_eq!(
        registry.list_ids().await.unwrap(),
        vec!["other-bridge", "test-bridge"]
    );
    assert_eq!(registry.get_active_id().await.unwrap().as_deref(), Some("test-bridge"));

    registry.set_active_id(Some("other-bridge")).await.unwrap();
    assert_eq!(registry.get_active_id().await.unwrap().as_deref(), Some("other-bridge"));

    registry.unregister("other-bridge").await.unwrap();
    assert_eq!(registry.list_ids().await.unwrap(), vec!["test-bridge"]);
    assert_eq!(registry.get_active_id().await.unwrap().as_deref(), Some("test-bridge"));

    registry.unregister("test-bridge").await.unwrap();
    assert!(registry.list_ids().await.unwrap().is_empty());
    assert_eq!(registry.get_active_id().await.unwrap(), None);
}

#[tokio::test]
async fn active_state_defaults_to_none_and_lives_in_reserved_file() {
    let fx = Fixture::new();
    assert_eq!(fx.registry.get_active_id().await.unwrap(), None);

    fx.registry
        .register(manifest("test-bridge"), json!({}), RegisterOptions::default())
        .await
        .unwrap();
    let raw = std::fs::read_to_string(fx.registry.bridges_dir().join("_active.json")).unwrap();
    let state: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(state["activeId"], "test-bridge");
    assert!(state.get("updatedAt").is_some());
}

#[tokio::test]
async fn register_persists_resolved_config() {
    let fx = Fixture::new();
    fx.registry
        .register(manifest("test-bridge"), json!({}), RegisterOptions::default())
        .await
        .unwrap();

    let record = fx.registry.get_record("test-bridge").await.unwrap().unwrap();
    assert_eq!(record.config, json!({ "model": "tiny" }));
    assert_eq!(record.manifest.name, "test-bridge");

    let bridge = fx.registry.get_bridge("test-bridge").await.unwrap();
    assert_eq!(bridge.config(), &json!({ "model": "tiny" }));
    assert_eq!(fx.constructed(), 1);
}

#[tokio::test]
async fn hydration_is_memoized_per_registry() {
    let fx = Fixture::new();
    fx.registry
        .register(manifest("test-bridge"), json!({ "model": "large" }), RegisterOptions::default())
        .await
        .unwrap();
    assert_eq!(fx.constructed(), 1);

    let reopened = fx.reopen();
    let first = reopened.get_bridge("test-bridge").await.expect("hydrated");
    let second = reopened.get_bridge("test-bridge").await.expect("cached");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.config()["model"], "large");
    assert_eq!(fx.constructed(), 2);
}

#[tokio::test]
async fn reregistering_replaces_record_and_instance() {
    let fx = Fixture::new();
    let registry = &fx.registry;
    registry
        .register(manifest("test-bridge"), json!({ "model": "a" }), RegisterOptions::default())
        .await
        .unwrap();
    let before = registry.get_bridge("test-bridge").await.unwrap();

    registry
        .register(manifest("test-bridge"), json!({ "model": "b" }), RegisterOptions::default())
        .await
        .unwrap();
    let after = registry.get_bridge("test-bridge").await.unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.config()["model"], "b");
    let record = registry.get_record("test-bridge").await.unwrap().unwrap();
    assert_eq!(record.config["model"], "b");
}

#[tokio::test]
async fn invalid_config_is_rejected_before_anything_is_written() {
    let fx = Fixture::new();
    let err = expect_err(
        fx.registry
            .register(manifest("test-bridge"), json!({ "model": 5 }), RegisterOptions::default())
            .await,
    );
    assert_eq!(err.code(), ErrorCode::Validation);
    assert!(fx.registry.list_ids().await.unwrap().is_empty());
    assert_eq!(fx.registry.get_active_id().await.unwrap(), None);
    assert_eq!(fx.constructed(), 0);
}

#[tokio::test]
async fn unknown_implementation_is_not_found() {
    let fx = Fixture::new();
    let err = expect_err(
        fx.registry
            .register(manifest("ghost"), json!({}), RegisterOptions::default())
            .await,
    );
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(!fx.registry.ensure_dependency_available("ghost").await);
    assert!(fx.registry.ensure_dependency_available("test-bridge").await);
}

#[tokio::test]
async fn unloadable_bridges_are_hidden_not_deleted() {
    let fx = Fixture::new();
    for name in ["test-bridge", "other-bridge"] {
        fx.registry
            .register(manifest(name), json!({}), RegisterOptions::default())
            .await
            .unwrap();
    }
    assert!(fx.loader.remove("other-bridge"));

    let reopened = fx.reopen();
    let summaries = reopened.list_summaries().await.unwrap();
    let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["test-bridge"]);
    assert_eq!(
        reopened.list_ids().await.unwrap(),
        vec!["other-bridge", "test-bridge"]
    );

    assert!(reopened.get_bridge("other-bridge").await.is_none());
    let err = expect_err(reopened.get_bridge_or_throw("other-bridge").await);
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn stored_config_failing_current_schema_does_not_hydrate() {
    let fx = Fixture::new();
    fx.registry
        .register(manifest("test-bridge"), json!({ "model": "m" }), RegisterOptions::default())
        .await
        .unwrap();

    let stricter = BridgeManifest::new("test-bridge", "2.0.0").with_config_schema(json!({
        "type": "object",
        "properties": { "model": { "type": "integer" } }
    }));
    fx.loader
        .insert(stricter, counting_ctor(Arc::clone(&fx.constructed)));

    let reopened = fx.reopen();
    assert!(reopened.get_bridge("test-bridge").await.is_none());
    assert_eq!(fx.constructed(), 1);
}

#[tokio::test]
async fn custom_ids_and_lookup_by_name() {
    let fx = Fixture::new();
    let id = fx
        .registry
        .register(
            manifest("test-bridge"),
            json!({ "model": "fast" }),
            RegisterOptions::with_id("fast"),
        )
        .await
        .unwrap();
    assert_eq!(id, "fast");
    assert_eq!(fx.registry.list_ids().await.unwrap(), vec!["fast"]);

    let bridge = fx.registry.get_bridge_by_name("test-bridge").await.unwrap();
    assert_eq!(bridge.config()["model"], "fast");
    assert!(fx.registry.get_bridge_by_name("other-bridge").await.is_none());

    let active = fx.registry.get_active_bridge().await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&active, &bridge));
}

#[tokio::test]
async fn reserved_and_unknown_ids_are_rejected() {
    let fx = Fixture::new();
    let err = expect_err(
        fx.registry
            .register(
                manifest("test-bridge"),
                json!({}),
                RegisterOptions::with_id("_active"),
            )
            .await,
    );
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    let err = expect_err(fx.registry.set_active_id(Some("nope")).await);
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = expect_err(fx.registry.get_record("../escape").await);
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn clearing_the_active_bridge() {
    let fx = Fixture::new();
    fx.registry
        .register(manifest("test-bridge"), json!({}), RegisterOptions::default())
        .await
        .unwrap();
    fx.registry.set_active_id(None).await.unwrap();
    assert_eq!(fx.registry.get_active_id().await.unwrap(), None);
    assert!(fx.registry.get_active_bridge().await.unwrap().is_none());
}

#[tokio::test]
async fn ensure_manifest_record_keeps_existing_records() {
    let fx = Fixture::new();
    let first = fx
        .registry
        .ensure_manifest_record(manifest("test-bridge"), json!({}))
        .await
        .unwrap();
    assert_eq!(first.config, json!({ "model": "tiny" }));
    assert_eq!(fx.constructed(), 0);
    assert_eq!(fx.registry.get_active_id().await.unwrap().as_deref(), Some("test-bridge"));

    let second = fx
        .registry
        .ensure_manifest_record(manifest("test-bridge"), json!({ "model": "other" }))
        .await
        .unwrap();
    assert_eq!(second, first);

    let bridge = fx.registry.get_bridge("test-bridge").await.unwrap();
    assert_eq!(bridge.config()["model"], "tiny");
    assert_eq!(fx.constructed(), 1);
}

#[tokio::test]
async fn unregistering_an_absent_bridge_succeeds() {
    let fx = Fixture::new();
    fx.registry.unregister("never-registered").await.unwrap();
    assert!(fx.registry.list_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_active_state_does_not_fail_mutations() {
    let fx = Fixture::new();
    let active_path = fx.registry.bridges_dir().join("_active.json");
    fx.registry
        .register(manifest("test-bridge"), json!({}), RegisterOptions::default())
        .await
        .unwrap();

    std::fs::write(&active_path, "{truncated").unwrap();
    assert_eq!(fx.registry.get_active_id().await.unwrap(), None);

    let id = fx
        .registry
        .register(manifest("other-bridge"), json!({}), RegisterOptions::default())
        .await
        .expect("register with unreadable active state");
    assert_eq!(id, "other-bridge");
    assert_eq!(
        fx.registry.get_active_id().await.unwrap().as_deref(),
        Some("other-bridge")
    );
    assert!(fx.registry.get_bridge("other-bridge").await.is_some());

    std::fs::write(&active_path, "{truncated").unwrap();
    fx.registry
        .unregister("other-bridge")
        .await
        .expect("unregister with unreadable active state");
    assert_eq!(fx.registry.list_ids().await.unwrap(), vec!["test-bridge"]);
    assert_eq!(fx.registry.get_active_id().await.unwrap(), None);
}
