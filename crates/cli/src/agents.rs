use crate::output::{page_request, print_json, PageArgs};
use agentos_agent_metadata::{
    AgentMetadataPatch, AgentMetadataRepository, AgentSearchQuery, AgentStatus,
    CreateAgentMetadata, FileAgentMetadataRepository, Preset, UpdateOptions,
};
use agentos_protocol::{CoreError, ErrorDomain};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List agents page by page
    List(PageArgs),
    /// Show one agent
    Get { id: String },
    /// Filter agents; all given filters must match
    Search(SearchArgs),
    /// Create an agent
    Create(CreateArgs),
    /// Patch an agent
    Update(UpdateArgs),
    /// Delete an agent (succeeds when it is already gone)
    Delete { id: String },
}

#[derive(Args)]
pub struct SearchArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<AgentStatus>,
    /// Match any of these keywords (repeatable)
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    icon: String,
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    #[arg(long, default_value = "idle")]
    status: AgentStatus,
    /// JSON file holding the preset snapshot
    #[arg(long)]
    preset_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct UpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    icon: Option<String>,
    /// Replace the keyword list (repeatable)
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    #[arg(long)]
    status: Option<AgentStatus>,
    #[arg(long)]
    preset_file: Option<PathBuf>,
    /// Fail with VERSION_CONFLICT unless the stored version matches
    #[arg(long)]
    expected_version: Option<String>,
}

fn read_preset(path: &Path) -> Result<Preset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read preset {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid preset {}", path.display()))
}

pub async fn run(command: AgentsCommand, agents_dir: &Path) -> Result<()> {
    let repo = FileAgentMetadataRepository::new(agents_dir);

    match command {
        AgentsCommand::List(page) => {
            let result = repo.list(&page_request(&page)).await?;
            print_json(&result)
        }
        AgentsCommand::Get { id } => {
            let meta = repo.get(&id).await?.ok_or_else(|| {
                CoreError::not_found(ErrorDomain::Agent, format!("agent not found: {id}"))
                    .with_details(serde_json::json!({ "id": id }))
            })?;
            print_json(&meta)
        }
        AgentsCommand::Search(args) => {
            let query = AgentSearchQuery {
                status: args.status,
                name: args.name,
                description: args.description,
                keywords: args.keywords,
            };
            let result = repo.search(&query, &page_request(&args.page)).await?;
            print_json(&result)
        }
        AgentsCommand::Create(args) => {
            let preset = match &args.preset_file {
                Some(path) => read_preset(path)?,
                None => Preset::default(),
            };
            let created = repo
                .create(CreateAgentMetadata {
                    name: args.name,
                    description: args.description,
                    icon: args.icon,
                    keywords: args.keywords,
                    preset,
                    status: args.status,
                })
                .await?;
            print_json(&created)
        }
        AgentsCommand::Update(args) => {
            let preset = args.preset_file.as_deref().map(read_preset).transpose()?;
            let patch = AgentMetadataPatch {
                name: args.name,
                description: args.description,
                icon: args.icon,
                keywords: (!args.keywords.is_empty()).then_some(args.keywords),
                preset,
                status: args.status,
                last_used: None,
            };
            if patch.is_empty() {
                return Err(CoreError::invalid_argument(
                    ErrorDomain::Agent,
                    "nothing to update: pass at least one field to change",
                )
                .with_details(serde_json::json!({ "id": args.id }))
                .into());
            }
            let options = UpdateOptions {
                expected_version: args.expected_version,
            };
            let updated = repo.update(&args.id, patch, options).await?;
            print_json(&updated)
        }
        AgentsCommand::Delete { id } => {
            repo.delete(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}
