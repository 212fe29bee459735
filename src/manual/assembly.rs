use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::model::Screenshot;
use crate::error::ErrorKind;

/// Either a full Markdown image whose target is a placeholder, or a bare token.
/// `\d+` is greedy, so `_1` never matches the prefix of `_10`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\(PLACEHOLDER_IMAGE_(\d+)\)|PLACEHOLDER_IMAGE_(\d+)")
        .expect("placeholder pattern is valid")
});

/// What to do with placeholders that have no screenshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderPolicy {
    /// Remove the image (or bare token) and log a warning
    #[default]
    Strip,
    /// Leave the token in the document
    Keep,
    /// Fail assembly
    Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Unresolved image placeholders: {indices:?}")]
    Unresolved { indices: Vec<usize> },
}

impl AssemblyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidResponse
    }
}

/// Substitute screenshot URLs for `PLACEHOLDER_IMAGE_<i>` tokens.
///
/// The first occurrence of index `i` becomes `screenshots[i].url`; later
/// repeats of that index are left as written. Tokens whose index has no
/// screenshot are handled according to `policy`.
pub fn assemble(
    content: &str,
    screenshots: &[Screenshot],
    policy: PlaceholderPolicy,
) -> Result<String, AssemblyError> {
    if !content.contains("PLACEHOLDER_IMAGE_") {
        return Ok(content.to_string());
    }

    let mut resolved = HashSet::new();
    let mut unresolved = Vec::new();

    let output = PLACEHOLDER.replace_all(content, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let (digits, is_image) = match (caps.get(1), caps.get(2)) {
            (Some(m), _) => (m.as_str(), true),
            (None, Some(m)) => (m.as_str(), false),
            (None, None) => return whole.to_string(),
        };

        let index = digits.parse::<usize>().ok();
        let screenshot = index.and_then(|i| screenshots.get(i));

        match (index, screenshot) {
            (Some(i), Some(shot)) => {
                if !resolved.insert(i) {
                    return whole.to_string();
                }
                let token = format!("PLACEHOLDER_IMAGE_{}", digits);
                debug!(index = i, "Resolved image placeholder");
                if is_image {
                    whole.replacen(&token, &shot.url, 1)
                } else {
                    shot.url.clone()
                }
            }
            _ => {
                if let Some(i) = index {
                    unresolved.push(i);
                }
                match policy {
                    PlaceholderPolicy::Strip => String::new(),
                    PlaceholderPolicy::Keep | PlaceholderPolicy::Error => whole.to_string(),
                }
            }
        }
    });

    if unresolved.is_empty() {
        return Ok(output.into_owned());
    }

    match policy {
        PlaceholderPolicy::Error => Err(AssemblyError::Unresolved {
            indices: unresolved,
        }),
        PlaceholderPolicy::Strip => {
            warn!(indices = ?unresolved, "Removed unresolved image placeholders");
            Ok(output.into_owned())
        }
        PlaceholderPolicy::Keep => {
            warn!(indices = ?unresolved, "Left unresolved image placeholders in manual");
            Ok(output.into_owned())
        }
    }
}
