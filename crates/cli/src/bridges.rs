use crate::output::print_json;
use agentos_bridge_registry::{BridgeLoader, BridgeManifest, LlmBridgeRegistry, StaticBridgeLoader};
use agentos_protocol::{CoreError, ErrorDomain};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Subcommand)]
pub enum BridgesCommand {
    /// Installed bridge ids, sorted
    Ids,
    /// Installed bridges whose implementation is available in this build
    List,
    /// Print the active bridge id (or null)
    Active,
    /// Select the active bridge
    SetActive(SetActiveArgs),
    /// Remove a bridge; the active selection falls back to a remaining one
    Unregister { id: String },
    /// Print the stored record of a bridge
    Show { id: String },
    /// Record a manifest and its config without instantiating it
    Install(InstallArgs),
}

#[derive(Args)]
pub struct SetActiveArgs {
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    id: Option<String>,
    /// Clear the active selection
    #[arg(long)]
    clear: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Manifest JSON file
    #[arg(long)]
    manifest: PathBuf,
    /// Config JSON file (defaults to `{}`)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn read_json(path: &Path, what: &str) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid {what} {}", path.display()))
}

/// The CLI links no bridge implementations, so the loader starts empty.
fn registry(base_dir: &Path) -> LlmBridgeRegistry {
    let loader: Arc<dyn BridgeLoader> = Arc::new(StaticBridgeLoader::new());
    LlmBridgeRegistry::new(base_dir, loader)
}

pub async fn run(command: BridgesCommand, base_dir: &Path) -> Result<()> {
    let registry = registry(base_dir);

    match command {
        BridgesCommand::Ids => print_json(&registry.list_ids().await?),
        BridgesCommand::List => print_json(&registry.list_summaries().await?),
        BridgesCommand::Active => {
            print_json(&json!({ "activeId": registry.get_active_id().await? }))
        }
        BridgesCommand::SetActive(args) => {
            let id = if args.clear { None } else { args.id };
            registry.set_active_id(id.as_deref()).await?;
            print_json(&json!({ "activeId": id }))
        }
        BridgesCommand::Unregister { id } => {
            registry.unregister(&id).await?;
            print_json(&json!({
                "unregistered": id,
                "activeId": registry.get_active_id().await?,
            }))
        }
        BridgesCommand::Show { id } => {
            let record = registry.get_record(&id).await?.ok_or_else(|| {
                CoreError::not_found(ErrorDomain::Bridge, format!("bridge not installed: {id}"))
                    .with_details(json!({ "id": id }))
            })?;
            print_json(&record)
        }
        BridgesCommand::Install(args) => {
            let manifest: BridgeManifest =
                serde_json::from_value(read_json(&args.manifest, "manifest")?)
                    .with_context(|| format!("Invalid manifest {}", args.manifest.display()))?;
            let config = match &args.config {
                Some(path) => read_json(path, "config")?,
                None => json!({}),
            };
            let record = registry.ensure_manifest_record(manifest, config).await?;
            print_json(&record)
        }
    }
}
