use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

use crate::errors::{ScoutError, ScoutResult};

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = r".*\sand\s.*";

static PATTERN_CACHE: Lazy<DashMap<(String, bool), Arc<Regex>>> = Lazy::new(DashMap::new);

/// Decides whether a single line of content is a hit.
///
/// Implementations are immutable once built and are shared read-only by every worker.
pub trait MatchPredicate: fmt::Debug + Send + Sync {
    fn matches(&self, line: &str) -> bool;
}

/// Compiled regular expression, tested anywhere in the line
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
    regex: Arc<Regex>,
}

impl PatternMatcher {
    /// Compiles a case-insensitive matcher
    pub fn new(pattern: &str) -> ScoutResult<Self> {
        Self::with_case_sensitivity(pattern, false)
    }

    /// Compiles a matcher, reusing a previously compiled regex for the same pattern
    pub fn with_case_sensitivity(pattern: &str, case_sensitive: bool) -> ScoutResult<Self> {
        let key = (pattern.to_string(), case_sensitive);
        if let Some(entry) = PATTERN_CACHE.get(&key) {
            return Ok(Self {
                pattern: pattern.to_string(),
                regex: entry.clone(),
            });
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| ScoutError::invalid_pattern(format!("{}: {}", pattern, e)))?;
        let regex = Arc::new(regex);
        PATTERN_CACHE.insert(key, regex.clone());

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }
}

impl MatchPredicate for PatternMatcher {
    fn matches(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

impl fmt::Display for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
