//! RFC decomposition: structure → classification → micro-issue templates.
//!
//! Every function here is a pure transformation of the document text and the
//! RFC identifier. Reading the document from disk is the only I/O, and only
//! through [`RfcParser::decompose_file`].

pub mod classify;
pub mod complexity;
pub mod extract;
pub mod section;
pub mod template;

pub use classify::{classify, NamingConvention, IMPLEMENTATION_KEYWORDS};
pub use complexity::{estimate_complexity, Complexity, COMPLEXITY_GROUPS};
pub use extract::{FilePathExtractor, PROJECT_DIRS, SOURCE_EXTENSIONS};
pub use section::{parse_structure, LineRange, Section};
pub use template::{
    extract_requirements, render, IssueBody, MicroIssueTemplate, RenderContext,
    DEFINITION_OF_DONE, NO_FILES_LINE,
};

use std::path::Path;

use once_cell::sync::Lazy;

use crate::config::ParserConfig;
use crate::error::Result;

static DEFAULT_PARSER: Lazy<RfcParser> = Lazy::new(RfcParser::default);

/// Decomposes RFC documents into micro-issue templates.
#[derive(Debug, Clone)]
pub struct RfcParser {
    extractor: FilePathExtractor,
    mention: Option<String>,
}

impl Default for RfcParser {
    fn default() -> Self {
        Self {
            extractor: FilePathExtractor::default(),
            mention: ParserConfig::default().mention,
        }
    }
}

impl RfcParser {
    /// Creates a parser from configuration.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            extractor: FilePathExtractor::new(
                config.source_extensions.as_slice(),
                config.project_dirs.as_slice(),
            )?,
            mention: config.mention.clone().filter(|m| !m.trim().is_empty()),
        })
    }

    /// Extracts expected file paths from section content.
    pub fn extract_file_paths(&self, content: &str) -> Vec<String> {
        self.extractor.extract(content)
    }

    /// Decomposes a document into templates.
    pub fn decompose(&self, document: &str, rfc_id: &str) -> Vec<MicroIssueTemplate> {
        self.decompose_source(document, rfc_id, None)
    }

    /// Reads and decomposes a document, naming it by its file name.
    pub fn decompose_file(&self, path: &Path, rfc_id: &str) -> Result<Vec<MicroIssueTemplate>> {
        let document = std::fs::read_to_string(path)?;
        let source = path.file_name().map(|name| name.to_string_lossy());
        Ok(self.decompose_source(&document, rfc_id, source.as_deref()))
    }

    /// Decomposes a document whose source name is known.
    pub fn decompose_source(
        &self,
        document: &str,
        rfc_id: &str,
        source: Option<&str>,
    ) -> Vec<MicroIssueTemplate> {
        let rfc_id = rfc_id.trim();
        let convention = NamingConvention::detect(rfc_id);
        let sections = parse_structure(document);
        let ctx = RenderContext {
            rfc_id,
            convention: &convention,
            source,
            mention: self.mention.as_deref(),
        };

        let mut templates: Vec<MicroIssueTemplate> = classify(&sections, &convention)
            .into_iter()
            .enumerate()
            .map(|(i, section)| {
                let files = self.extractor.extract(&section.content);
                let complexity = estimate_complexity(&section.content);
                render(&ctx, i + 1, section, files, complexity)
            })
            .collect();

        assign_dependencies(&mut templates);

        tracing::debug!(rfc = %rfc_id, templates = templates.len(), "decomposed RFC");
        templates
    }
}

/// Links every template after the first to the first one.
pub fn assign_dependencies(templates: &mut [MicroIssueTemplate]) {
    let Some((root, rest)) = templates.split_first_mut() else {
        return;
    };
    for template in rest {
        template.depend_on(root.id.clone());
    }
}

/// Extracts file paths using the default extension and directory tables.
pub fn extract_file_paths(content: &str) -> Vec<String> {
    DEFAULT_PARSER.extract_file_paths(content)
}

/// Decomposes a document with the default parser configuration.
pub fn decompose(document: &str, rfc_id: &str) -> Vec<MicroIssueTemplate> {
    DEFAULT_PARSER.decompose(document, rfc_id)
}
