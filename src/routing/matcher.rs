//! Path segment matching.
//!
//! # Responsibilities
//! - Decide whether a request path starts with the segment `/<alias>`
//! - Return the remaining path after the alias
//!
//! # Design Decisions
//! - A segment ends at the end of the path or at the next `/`
//! - Comparison is ASCII case-insensitive
//! - No regex and no allocation on the hot path

/// Matches a request path against one alias segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMatcher {
    /// The alias prefixed with `/`.
    segment: String,
}

impl SegmentMatcher {
    /// Create a matcher for `alias` (given without a leading slash).
    pub fn new(alias: &str) -> Self {
        Self {
            segment: format!("/{}", alias),
        }
    }

    /// If `path` starts with this segment, return what follows it.
    ///
    /// The remainder is empty or starts with `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let head = path.get(..self.segment.len())?;
        if !head.eq_ignore_ascii_case(&self.segment) {
            return None;
        }

        let rest = &path[self.segment.len()..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}
