//! Terminal window matching
//!
//! Platform-agnostic logic for picking the terminal window out of the list
//! of visible top-level windows. Patterns are tried in configured order, and
//! for each pattern:
//!
//! 1. **Regex match** - Case-insensitive regex on window title
//! 2. **Substring match** - Case-insensitive substring search on title
//!
//! The first window matched by the earliest pattern wins, so a specific
//! pattern like "Windows PowerShell" takes precedence over a generic one
//! like "cmd" even if the generic one matches a window earlier in z-order.
//!
//! # Security
//!
//! Regex patterns are limited to 1MB to prevent ReDoS attacks.

use regex::RegexBuilder;

use crate::model::WindowInfo;

/// Maximum regex pattern size (1MB) to prevent ReDoS attacks
const MAX_REGEX_SIZE: usize = 1_048_576;

/// Tries to match windows by regex pattern on title
///
/// Returns the first window whose title matches the case-insensitive regex
/// pattern, or `None` for no match, an invalid regex or an oversized pattern.
pub fn try_regex_match<'a>(pattern: &str, windows: &'a [WindowInfo]) -> Option<&'a WindowInfo> {
    if pattern.len() > MAX_REGEX_SIZE {
        tracing::warn!("Regex pattern too large (>1MB), skipping regex match");
        return None;
    }

    let regex = match RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(MAX_REGEX_SIZE)
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("Pattern '{}' is not a valid regex: {}", pattern, e);
            return None;
        }
    };

    windows.iter().find(|w| regex.is_match(&w.title))
}

/// Tries to match windows by case-insensitive substring on title
pub fn try_substring_match<'a>(
    substring: &str,
    windows: &'a [WindowInfo],
) -> Option<&'a WindowInfo> {
    let needle = substring.to_lowercase();
    windows
        .iter()
        .find(|w| w.title.to_lowercase().contains(&needle))
}

/// Finds the terminal window for an ordered list of title patterns
pub fn find_terminal_window<'a>(
    patterns: &[String],
    windows: &'a [WindowInfo],
) -> Option<&'a WindowInfo> {
    for pattern in patterns {
        if let Some(window) =
            try_regex_match(pattern, windows).or_else(|| try_substring_match(pattern, windows))
        {
            tracing::debug!(
                "Pattern '{}' matched window {} (title: {})",
                pattern,
                window.id,
                window.title
            );
            return Some(window);
        }
    }

    tracing::debug!("No window matched patterns {:?}", patterns);
    None
}
