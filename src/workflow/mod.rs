//! Issue workflows built on an [`IssueTracker`](crate::github::IssueTracker).
//!
//! Each workflow takes a tracker and explicit configuration, performs one
//! automation step and reports what it did. None of them read the
//! environment.

pub mod create;
pub mod next_rfc;
pub mod progression;
pub mod recreate;
pub mod validate;

pub use create::{CreatedIssue, MicroIssueCreator};
pub use next_rfc::{NextRfcPlanner, RfcCandidate, RfcSpec};
pub use progression::{Progression, ProgressionOutcome};
pub use recreate::{RecreateOutcome, Recreator};
pub use validate::{PrValidator, PrVerdict};

use regex::Regex;

use crate::error::{Error, Result};

/// Builds a regex matching `<family>-RFC-` followed by `suffix`.
pub(crate) fn family_regex(family: &str, suffix: &str) -> Result<Regex> {
    let pattern = format!(r"{}-RFC-{}", regex::escape(family), suffix);
    Regex::new(&pattern)
        .map_err(|e| Error::Config(format!("invalid pattern for family '{}': {}", family, e)))
}

/// Parses capture `group` of the first match of `re` in `text` as a number.
pub(crate) fn capture_number(re: &Regex, text: &str, group: usize) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether `text` mentions `id` with no digit directly after it, so that
/// `Game-RFC-004-1` does not match inside `Game-RFC-004-10`.
pub(crate) fn mentions_id(text: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    text.match_indices(id).any(|(start, _)| {
        !text[start + id.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}
