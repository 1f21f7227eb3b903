use serde::{Deserialize, Serialize};

/// Character range into the original document, end exclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSource {
    pub offset_start: usize,
    pub offset_end: usize,
}

impl ChunkSource {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.offset_end.saturating_sub(self.offset_start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bounded slice of a markdown document, annotated with its heading path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub doc_id: String,

    /// `<docId>:<window offset>:<sequence in section>`, stable across re-splits
    pub chunk_id: String,

    pub text: String,

    /// 0-based index after sorting all chunks by source offset
    pub position: usize,

    /// Ancestor heading titles, outermost first, ending with the section heading
    pub breadcrumbs: Vec<String>,

    /// Slugified titles, parallel to `breadcrumbs`
    pub anchors: Vec<String>,

    pub source: ChunkSource,
}

impl KnowledgeChunk {
    /// Length of `text` in characters
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
