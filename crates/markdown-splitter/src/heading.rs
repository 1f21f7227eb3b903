use crate::error::Result;
use regex::Regex;
use std::collections::HashMap;

/// ATX heading: up to three spaces of indent, 1-6 hashes, optional closing hashes
const HEADING_PATTERN: &str = r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$";

/// A heading that starts a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Heading {
    pub level: usize,
    pub title: String,
    pub anchor: String,
    /// Char offset of the heading line start
    pub offset: usize,
    /// Titles of the ancestor chain, this heading included
    pub breadcrumbs: Vec<String>,
    pub anchors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
    has_info: bool,
}

impl Fence {
    fn parse(line: &str) -> Option<Self> {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent > 3 {
            return None;
        }
        let rest = &line[indent..];
        let marker = rest.chars().next().filter(|c| matches!(c, '`' | '~'))?;
        let len = rest.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let info = rest[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        Some(Self {
            marker,
            len,
            has_info: !info.is_empty(),
        })
    }

    fn closes(self, open: Self) -> bool {
        self.marker == open.marker && self.len >= open.len && !self.has_info
    }
}

pub(crate) struct HeadingScanner {
    pattern: Regex,
    max_depth: usize,
}

impl HeadingScanner {
    pub fn new(max_depth: usize) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(HEADING_PATTERN)?,
            max_depth,
        })
    }

    /// Headings in document order. Lines inside fenced code blocks and
    /// headings deeper than `max_depth` are skipped.
    pub fn scan(&self, text: &str) -> Vec<Heading> {
        let mut headings = Vec::new();
        let mut stack: Vec<(usize, String, String)> = Vec::new();
        let mut seen_anchors: HashMap<String, usize> = HashMap::new();
        let mut open_fence: Option<Fence> = None;
        let mut offset = 0;

        for raw_line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += raw_line.chars().count();
            let line = raw_line.trim_end_matches(&['\n', '\r'][..]);

            if let Some(fence) = Fence::parse(line) {
                match open_fence {
                    None => open_fence = Some(fence),
                    Some(open) if fence.closes(open) => open_fence = None,
                    Some(_) => {}
                }
                continue;
            }
            if open_fence.is_some() {
                continue;
            }

            let Some(caps) = self.pattern.captures(line) else {
                continue;
            };
            let level = caps[1].len();
            if level > self.max_depth {
                continue;
            }
            let title = caps[2].trim().to_string();
            if title.is_empty() {
                continue;
            }
            let anchor = unique_anchor(&mut seen_anchors, slugify(&title));

            while stack.last().is_some_and(|(depth, _, _)| *depth >= level) {
                stack.pop();
            }
            stack.push((level, title.clone(), anchor.clone()));

            headings.push(Heading {
                level,
                title,
                anchor,
                offset: line_start,
                breadcrumbs: stack.iter().map(|(_, t, _)| t.clone()).collect(),
                anchors: stack.iter().map(|(_, _, a)| a.clone()).collect(),
            });
        }

        if open_fence.is_some() {
            log::debug!("Unterminated code fence; trailing headings ignored");
        }
        headings
    }
}

/// GitHub-style slug: lowercase, alphanumerics kept, separators collapsed to `-`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

fn unique_anchor(seen: &mut HashMap<String, usize>, slug: String) -> String {
    let count = seen.entry(slug.clone()).or_insert(0);
    let anchor = if *count == 0 {
        slug
    } else {
        format!("{slug}-{count}")
    };
    *count += 1;
    anchor
}
