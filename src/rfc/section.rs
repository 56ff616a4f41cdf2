//! Structural parsing of RFC documents into flat, ordered sections.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Heading lines of level 2 to 4 open a new section.
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{2,4})\s+(.+)$").unwrap());

/// Half-open line interval `[start, end)` within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First line (the heading line).
    pub start: usize,
    /// One past the last line.
    pub end: usize,
}

impl LineRange {
    /// Number of lines covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the range covers no lines.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A section of an RFC document, delimited by headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text.
    pub title: String,
    /// Heading depth (2, 3 or 4).
    pub level: u8,
    /// Raw lines following the heading, each terminated by a newline.
    pub content: String,
    /// Lines of the source document this section spans.
    pub line_range: LineRange,
}

impl Section {
    /// Returns true if the content contains a fenced code block delimiter.
    pub fn has_code_block(&self) -> bool {
        self.content.contains("```")
    }
}

/// Matches a heading line, returning its level and title.
fn match_heading(line: &str) -> Option<(u8, &str)> {
    let caps = HEADING.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let title = caps.get(2)?.as_str().trim_end();
    Some((level, title))
}

/// Parses a document into sections in a single left-to-right scan.
///
/// Lines before the first heading are discarded. Each section ends where the
/// next heading begins, or at the end of the document.
pub fn parse_structure(document: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut line_count = 0;

    for (i, line) in document.lines().enumerate() {
        line_count = i + 1;

        if let Some((level, title)) = match_heading(line) {
            if let Some(open) = sections.last_mut() {
                open.line_range.end = i;
            }
            sections.push(Section {
                title: title.to_string(),
                level,
                content: String::new(),
                line_range: LineRange { start: i, end: i },
            });
        } else if let Some(open) = sections.last_mut() {
            open.content.push_str(line);
            open.content.push('\n');
        }
    }

    if let Some(open) = sections.last_mut() {
        open.line_range.end = line_count;
    }

    tracing::debug!(sections = sections.len(), lines = line_count, "parsed RFC structure");
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_no_sections() {
        assert!(parse_structure("").is_empty());
    }

    #[test]
    fn headingless_document_has_no_sections() {
        assert!(parse_structure("just text\nmore text\n").is_empty());
    }

    #[test]
    fn level_one_and_five_headings_are_content() {
        let doc = "## Real\n# Top\n##### Deep\ntext\n";
        let sections = parse_structure(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "# Top\n##### Deep\ntext\n");
    }

    #[test]
    fn levels_two_through_four_open_sections() {
        let doc = "## Two\n### Three\n#### Four\n";
        let sections = parse_structure(doc);
        let levels: Vec<u8> = sections.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![2, 3, 4]);
        assert_eq!(sections[2].title, "Four");
    }

    #[test]
    fn preamble_is_discarded() {
        let doc = "# Title\nintro\n## First\nbody\n";
        let sections = parse_structure(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "First");
        assert_eq!(sections[0].content, "body\n");
        assert_eq!(sections[0].line_range, LineRange { start: 2, end: 4 });
    }

    #[test]
    fn sections_close_at_next_heading() {
        let doc = "## A\na1\na2\n### B\nb1\n## C\n";
        let sections = parse_structure(doc);
        assert_eq!(sections[0].line_range, LineRange { start: 0, end: 3 });
        assert_eq!(sections[1].line_range, LineRange { start: 3, end: 5 });
        assert_eq!(sections[2].line_range, LineRange { start: 5, end: 6 });
        assert!(sections[2].content.is_empty());
    }

    #[test]
    fn heading_requires_whitespace_after_markers() {
        let sections = parse_structure("##NoSpace\n## Spaced  \n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Spaced");
    }

    #[test]
    fn crlf_lines_are_accepted() {
        let sections = parse_structure("## Title\r\nline\r\n");
        assert_eq!(sections[0].title, "Title");
        assert_eq!(sections[0].content, "line\n");
    }

    #[test]
    fn detects_code_blocks() {
        let sections = parse_structure("## A\n```rust\nfn x() {}\n```\n## B\nplain\n");
        assert!(sections[0].has_code_block());
        assert!(!sections[1].has_code_block());
    }

    #[test]
    fn line_range_len() {
        let range = LineRange { start: 3, end: 7 };
        assert_eq!(range.len(), 4);
        assert!(!range.is_empty());
        assert!(LineRange { start: 2, end: 2 }.is_empty());
    }
}
