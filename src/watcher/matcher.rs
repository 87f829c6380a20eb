//! Compiled ignore regexes

use std::path::Path;

use regex::bytes::Regex;

use crate::error::{PodsyncError, PodsyncResult};

/// Matches absolute paths against the session's ignore regexes.
///
/// A pattern matches if it is found anywhere in the path, so `\.git` hits
/// both `/src/.git` and everything below it. Matching runs on the raw path
/// bytes, so non-UTF-8 names are still matched.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
}

impl IgnoreMatcher {
    /// Compile `patterns`, failing on the first invalid one
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> PodsyncResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| PodsyncError::InvalidIgnorePattern {
                    pattern: p.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<PodsyncResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let path = path.as_os_str().as_encoded_bytes();
        self.patterns.iter().any(|re| re.is_match(path))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
