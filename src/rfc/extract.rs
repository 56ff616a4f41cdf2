//! Heuristic extraction of expected file paths from section content.

use regex::Regex;

use crate::error::{Error, Result};

/// Source-file extensions recognised in backtick-quoted and bare paths.
pub const SOURCE_EXTENSIONS: &[&str] = &["cs"];

/// Project directory prefixes recognised for bare paths.
pub const PROJECT_DIRS: &[&str] = &["dotnet"];

/// Matches file paths in RFC prose using a fixed set of patterns.
#[derive(Debug, Clone)]
pub struct FilePathExtractor {
    patterns: Vec<Regex>,
}

impl FilePathExtractor {
    /// Builds an extractor for the given extensions and project directories.
    pub fn new<S: AsRef<str>>(extensions: &[S], project_dirs: &[S]) -> Result<Self> {
        if extensions.is_empty() {
            return Err(Error::Config(
                "at least one source extension is required".to_string(),
            ));
        }

        let ext = alternation(extensions);
        let mut patterns = vec![
            // `path/to/File.cs`
            format!(r"`([^`]+\.(?:{ext}))`"),
            // **File**: `path`
            r"\*\*File\*\*:\s*`([^`]+)`".to_string(),
        ];
        if !project_dirs.is_empty() {
            // dotnet/path/File.cs
            let dirs = alternation(project_dirs);
            patterns.push(format!(r"((?:{dirs})/[^\s`]+\.(?:{ext}))\b"));
        }

        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Config(format!("invalid file path pattern: {}", e)))?;

        Ok(Self { patterns })
    }

    /// Extracts deduplicated file paths in first-seen order.
    pub fn extract(&self, content: &str) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.captures_iter(content) {
                if let Some(path) = caps.get(1) {
                    let path = path.as_str();
                    if !files.iter().any(|seen| seen == path) {
                        files.push(path.to_string());
                    }
                }
            }
        }

        files
    }
}

impl Default for FilePathExtractor {
    fn default() -> Self {
        Self::new(SOURCE_EXTENSIONS, PROJECT_DIRS).expect("default file path patterns compile")
    }
}

fn alternation<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| regex::escape(item.as_ref().trim_start_matches('.').trim_end_matches('/')))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_backtick_quoted_source_files() {
        let extractor = FilePathExtractor::default();
        let files = extractor.extract("Create `Models/Brick.cs` and `notes.txt`.");
        assert_eq!(files, vec!["Models/Brick.cs"]);
    }

    #[test]
    fn extracts_labeled_file_convention() {
        let extractor = FilePathExtractor::default();
        let files = extractor.extract("**File**: `config/layout.json`\n");
        assert_eq!(files, vec!["config/layout.json"]);
    }

    #[test]
    fn extracts_bare_project_paths() {
        let extractor = FilePathExtractor::default();
        let files = extractor.extract("Edit dotnet/game/Systems/BallSystem.cs to add spin.");
        assert_eq!(files, vec!["dotnet/game/Systems/BallSystem.cs"]);
    }

    #[test]
    fn deduplicates_across_patterns_in_first_seen_order() {
        let extractor = FilePathExtractor::default();
        let content = "**File**: `dotnet/game/Brick.cs`\nAlso `Paddle.cs` and dotnet/game/Brick.cs.";
        let files = extractor.extract(content);
        assert_eq!(files, vec!["dotnet/game/Brick.cs", "Paddle.cs"]);
    }

    #[test]
    fn no_matches_is_empty() {
        let extractor = FilePathExtractor::default();
        assert!(extractor.extract("Nothing to see here.").is_empty());
    }

    #[test]
    fn custom_extensions_and_dirs() {
        let extractor = FilePathExtractor::new(&[".rs", "toml"], &["crates/"]).unwrap();
        let files = extractor.extract("See `src/lib.rs`, `Cargo.toml` and crates/core/src/main.rs");
        assert_eq!(
            files,
            vec!["src/lib.rs", "Cargo.toml", "crates/core/src/main.rs"]
        );
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(FilePathExtractor::new(&empty, &empty).is_err());
    }

    #[test]
    fn extension_must_end_the_quoted_path() {
        let extractor = FilePathExtractor::default();
        assert!(extractor.extract("`file.csv`").is_empty());
    }
}
