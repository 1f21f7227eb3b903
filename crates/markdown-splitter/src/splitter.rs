use crate::config::SplitterConfig;
use crate::error::{Result, SplitterError};
use crate::heading::HeadingScanner;
use crate::types::{ChunkSource, KnowledgeChunk};
use std::path::Path;

/// A contiguous char range sharing one heading path
#[derive(Debug)]
struct Section {
    start: usize,
    end: usize,
    breadcrumbs: Vec<String>,
    anchors: Vec<String>,
}

/// Splits markdown into overlapping chunks bounded by `max_chars`
pub struct MarkdownSplitter {
    config: SplitterConfig,
    scanner: HeadingScanner,
}

impl MarkdownSplitter {
    /// Create a splitter, rejecting configurations that cannot make progress
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate().map_err(SplitterError::InvalidConfig)?;
        Ok(Self {
            scanner: HeadingScanner::new(config.max_heading_depth)?,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split `text`. Output is sorted by source offset with `position` assigned.
    #[must_use]
    pub fn split(&self, doc_id: &str, text: &str) -> Vec<KnowledgeChunk> {
        let chars: Vec<char> = text.chars().collect();
        let sections = self.sections(text, chars.len());

        let mut chunks = Vec::new();
        for section in &sections {
            self.split_section(doc_id, &chars, section, &mut chunks);
        }

        chunks.sort_by(|a, b| {
            a.source
                .offset_start
                .cmp(&b.source.offset_start)
                .then_with(|| a.source.offset_end.cmp(&b.source.offset_end))
        });
        for (position, chunk) in chunks.iter_mut().enumerate() {
            chunk.position = position;
        }

        log::debug!(
            "Split {doc_id}: {} chars, {} sections, {} chunks",
            chars.len(),
            sections.len(),
            chunks.len()
        );
        chunks
    }

    /// Read a UTF-8 file and split it
    pub fn split_file(&self, path: impl AsRef<Path>, doc_id: &str) -> Result<Vec<KnowledgeChunk>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SplitterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.split(doc_id, &content))
    }

    fn sections(&self, text: &str, len: usize) -> Vec<Section> {
        let headings = self.scanner.scan(text);
        let mut sections = Vec::with_capacity(headings.len() + 1);

        let first_offset = headings.first().map_or(len, |h| h.offset);
        if first_offset > 0 {
            sections.push(Section {
                start: 0,
                end: first_offset,
                breadcrumbs: Vec::new(),
                anchors: Vec::new(),
            });
        }

        for (i, heading) in headings.iter().enumerate() {
            let end = headings.get(i + 1).map_or(len, |next| next.offset);
            sections.push(Section {
                start: heading.offset,
                end,
                breadcrumbs: heading.breadcrumbs.clone(),
                anchors: heading.anchors.clone(),
            });
        }
        sections
    }

    /// Slide a `max_chars` window over the section, advancing by `step()`.
    /// Consecutive windows share exactly `overlap_chars` characters; blank
    /// windows are skipped without consuming a sequence number.
    fn split_section(
        &self,
        doc_id: &str,
        chars: &[char],
        section: &Section,
        out: &mut Vec<KnowledgeChunk>,
    ) {
        let body = &chars[section.start..section.end];
        let max = self.config.max_chars;
        let step = self.config.step();

        let mut window_start = 0;
        let mut seq = 0;
        while window_start < body.len() {
            let window_end = (window_start + max).min(body.len());
            let window = &body[window_start..window_end];

            if window.iter().any(|c| !c.is_whitespace()) {
                out.push(KnowledgeChunk {
                    doc_id: doc_id.to_string(),
                    chunk_id: format!("{doc_id}:{}:{seq}", section.start + window_start),
                    text: window.iter().collect(),
                    position: 0,
                    breadcrumbs: section.breadcrumbs.clone(),
                    anchors: section.anchors.clone(),
                    source: ChunkSource {
                        offset_start: section.start + window_start,
                        offset_end: section.start + window_end,
                    },
                });
                seq += 1;
            }

            if window_end == body.len() {
                break;
            }
            window_start += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn splitter(max_chars: usize, overlap_chars: usize) -> MarkdownSplitter {
        MarkdownSplitter::new(SplitterConfig {
            max_chars,
            overlap_chars,
            max_heading_depth: 3,
        })
        .unwrap()
    }

    #[test]
    fn rejects_overlap_that_cannot_advance() {
        let err = MarkdownSplitter::new(SplitterConfig {
            max_chars: 10,
            overlap_chars: 10,
            max_heading_depth: 3,
        })
        .err()
        .unwrap();
        assert!(matches!(err, SplitterError::InvalidConfig(_)));
    }

    #[test]
    fn short_section_is_one_chunk() {
        let chunks = splitter(100, 10).split("doc", "# Title\n\nShort body.\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "# Title\n\nShort body.\n");
        assert_eq!(chunks[0].chunk_id, "doc:0:0");
        assert_eq!(chunks[0].breadcrumbs, vec!["Title".to_string()]);
        assert_eq!(chunks[0].anchors, vec!["title".to_string()]);
    }

    #[test]
    fn document_without_headings_has_empty_breadcrumbs() {
        let chunks = splitter(100, 10).split("doc", "plain text only");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].breadcrumbs.is_empty());
        assert_eq!(
            chunks[0].source,
            ChunkSource {
                offset_start: 0,
                offset_end: 15
            }
        );
    }

    #[test]
    fn preamble_before_first_heading_is_kept() {
        let chunks = splitter(100, 10).split("doc", "intro line\n# Body\ntext\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "intro line\n");
        assert!(chunks[0].breadcrumbs.is_empty());
        assert_eq!(chunks[1].breadcrumbs, vec!["Body".to_string()]);
        assert_eq!(chunks[1].chunk_id, "doc:11:0");
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(splitter(100, 10).split("doc", "").is_empty());
        assert!(splitter(100, 10).split("doc", " \n\n\t").is_empty());
    }

    #[test]
    fn windows_overlap_and_stay_bounded() {
        let body = "word ".repeat(40);
        let chunks = splitter(30, 10).split("doc", &body);
        let starts: Vec<usize> = chunks.iter().map(|c| c.source.offset_start).collect();
        assert_eq!(starts, vec![0, 20, 40, 60, 80, 100, 120, 140, 160, 180]);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].source.offset_end - pair[1].source.offset_start, 10);
        }
        assert!(chunks.iter().all(|c| c.char_len() <= 30));
        assert_eq!(chunks.last().unwrap().source.offset_end, body.chars().count());
    }

    #[test]
    fn whitespace_near_the_window_end_keeps_the_full_overlap() {
        let body = format!("{} {}", "a".repeat(41), "b".repeat(60));
        let chunks = splitter(50, 10).split("doc", &body);
        let ranges: Vec<(usize, usize)> = chunks
            .iter()
            .map(|c| (c.source.offset_start, c.source.offset_end))
            .collect();
        assert_eq!(ranges, vec![(0, 50), (40, 90), (80, 102)]);
        assert_eq!(chunks[0].char_len(), 50);
    }

    #[test]
    fn blank_windows_do_not_consume_sequence_numbers() {
        let body = format!("{}{}", " ".repeat(30), "x".repeat(10));
        let chunks = splitter(20, 5).split("doc", &body);
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["doc:15:0", "doc:30:1"]);
    }

    #[test]
    fn unbroken_text_still_advances() {
        let body = "x".repeat(95);
        let chunks = splitter(20, 5).split("doc", &body);
        let starts: Vec<usize> = chunks.iter().map(|c| c.source.offset_start).collect();
        assert_eq!(starts, vec![0, 15, 30, 45, 60, 75]);
        assert!(chunks.iter().all(|c| c.char_len() <= 20));
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let body = "日本語のテキスト".repeat(10);
        let chunks = splitter(16, 4).split("doc", &body);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.char_len() <= 16));
        assert_eq!(chunks[0].source.offset_end, 16);
    }

    #[test]
    fn split_file_reports_missing_path() {
        let err = splitter(100, 10)
            .split_file("/definitely/not/here.md", "doc")
            .unwrap_err();
        assert!(matches!(err, SplitterError::Io { .. }));
    }
}
