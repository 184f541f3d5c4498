//! Command pattern compilation and matching.
//!
//! A [`CommandPattern`] is the compiled form of a handler's pattern
//! specification. Matching is anchored: the pattern must match starting at
//! the beginning of the (already trimmed) command text, never as a search
//! over the middle of a message. Capture groups are exposed positionally to
//! the handler through [`CommandMatch`].
//!
//! Patterns are pure values — compiling and matching have no side effects
//! and no state beyond the compiled automaton.

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

/// A compiled, reusable command pattern.
///
/// Created once at module load time and immutable afterwards.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    regex: Regex,
    raw: String,
}

impl CommandPattern {
    /// Compiles a pattern specification.
    ///
    /// The pattern is wrapped in a non-capturing group and anchored at the
    /// start of the input, so positional capture-group indices written in
    /// the handler declaration are preserved. Matching is case-sensitive
    /// unless `case_sensitive` is `false`.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        let anchored = format!("^(?:{pattern})");
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            regex,
            raw: pattern.to_string(),
        })
    }

    /// The pattern exactly as written in the handler declaration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches against the beginning of `text`.
    ///
    /// Returns `None` when the pattern does not match at position zero.
    pub fn find(&self, text: &str) -> Option<CommandMatch> {
        let captures = self.regex.captures(text)?;
        let whole = captures.get(0).map(|m| m.as_str().to_string())?;
        let end = captures.get(0).map(|m| m.end()).unwrap_or(0);

        let groups = captures
            .iter()
            .skip(1)
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect();

        Some(CommandMatch {
            whole,
            groups,
            rest: text[end..].to_string(),
        })
    }
}

/// The positional capture result of a successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    whole: String,
    groups: Vec<Option<String>>,
    rest: String,
}

impl CommandMatch {
    /// The full matched text.
    pub fn whole(&self) -> &str {
        &self.whole
    }

    /// Positional capture group `i`, starting at 1 like the pattern syntax.
    ///
    /// Returns `None` for out-of-range indices and for groups that did not
    /// participate in the match.
    pub fn group(&self, i: usize) -> Option<&str> {
        if i == 0 {
            return Some(self.whole());
        }
        self.groups.get(i - 1).and_then(|g| g.as_deref())
    }

    /// The number of capture groups in the pattern.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The text following the matched portion.
    pub fn rest(&self) -> &str {
        &self.rest
    }
}
