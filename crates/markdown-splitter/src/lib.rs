//! # AgentOS Markdown Splitter
//!
//! Deterministic, heading-aware splitting of markdown into overlapping
//! knowledge chunks.
//!
//! ## Architecture
//!
//! ```text
//! Markdown
//!     │
//!     ├──> Heading scan (ATX headings up to max_heading_depth, fences skipped)
//!     │    └─> breadcrumb stack snapshot per heading
//!     │
//!     ├──> Sections
//!     │    ├─> preamble before the first heading (no breadcrumbs)
//!     │    └─> heading offset .. next heading offset
//!     │
//!     └──> Sliding window per section
//!          ├─> max_chars window, advance by max_chars - overlap_chars
//!          ├─> drop blank windows
//!          └─> global sort by offset, assign position
//! ```
//!
//! All offsets and lengths are counted in characters.
//!
//! ## Example
//!
//! ```rust
//! use agentos_markdown_splitter::{MarkdownSplitter, SplitterConfig};
//!
//! let splitter = MarkdownSplitter::new(SplitterConfig::default()).unwrap();
//! let chunks = splitter.split("guide", "# Install\n\nRun the installer.\n");
//! assert_eq!(chunks[0].breadcrumbs, vec!["Install".to_string()]);
//! assert_eq!(chunks[0].chunk_id, "guide:0:0");
//! ```

mod config;
mod error;
mod heading;
mod splitter;
mod types;

pub use config::{SplitterConfig, MAX_SUPPORTED_HEADING_DEPTH};
pub use error::{Result, SplitterError};
pub use heading::slugify;
pub use splitter::MarkdownSplitter;
pub use types::{ChunkSource, KnowledgeChunk};
