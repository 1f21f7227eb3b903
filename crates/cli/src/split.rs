use crate::output::print_json;
use agentos_markdown_splitter::{MarkdownSplitter, SplitterConfig};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SplitPreset {
    Embeddings,
    LlmContext,
}

#[derive(Args)]
pub struct SplitArgs {
    /// Markdown file to split
    file: PathBuf,
    /// Document id used in chunk ids (defaults to the file stem)
    #[arg(long)]
    doc_id: Option<String>,
    /// Start from a preset instead of the configured [splitter] section
    #[arg(long, value_enum)]
    preset: Option<SplitPreset>,
    #[arg(long)]
    max_chars: Option<usize>,
    #[arg(long)]
    overlap: Option<usize>,
    /// Deepest heading level that starts a section (1-6)
    #[arg(long)]
    depth: Option<usize>,
}

pub fn run(args: SplitArgs, configured: SplitterConfig) -> Result<()> {
    let mut config = match args.preset {
        Some(SplitPreset::Embeddings) => SplitterConfig::for_embeddings(),
        Some(SplitPreset::LlmContext) => SplitterConfig::for_llm_context(),
        None => configured,
    };
    if let Some(max_chars) = args.max_chars {
        config.max_chars = max_chars;
    }
    if let Some(overlap) = args.overlap {
        config.overlap_chars = overlap;
    }
    if let Some(depth) = args.depth {
        config.max_heading_depth = depth;
    }

    let doc_id = match args.doc_id {
        Some(id) => id,
        None => args
            .file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .context("Cannot derive a document id from the file name; pass --doc-id")?,
    };

    let splitter = MarkdownSplitter::new(config)?;
    let chunks = splitter.split_file(&args.file, &doc_id)?;
    print_json(&chunks)
}
