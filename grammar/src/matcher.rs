use std::ops::Range;

use regex_automata::{
    meta::{BuildError, Regex},
    util::syntax,
    Anchored, Input,
};

/// A single textual pattern, which can only match starting at a given position.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// The pattern as written in the grammar
    source: String,
    regex: Regex,
}

/// A successful application of a [`Matcher`].  All ranges are byte offsets into the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub range: Range<usize>,
    /// The range of every capture group (index `0` is the whole match).  Groups which didn't
    /// participate in the match are `None`.
    pub groups: Vec<Option<Range<usize>>>,
}

impl MatchResult {
    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// The reasons why a [`Matcher`] can't be built
#[derive(Debug, Clone)]
pub enum MatcherError {
    UnknownFlag(char),
    Regex(BuildError),
}

impl Matcher {
    /// Compile `pattern` with the given single-character `flags`:
    /// - `i`: case insensitive
    /// - `m`: `^`/`$` match at line boundaries
    /// - `s`: `.` matches `\n`
    /// - `x`: ignore whitespace and allow `#` comments
    /// - `U`: swap the greediness of repetitions
    /// - `u`: unicode (on by default, accepted for compatibility)
    pub fn new(pattern: &str, flags: &str) -> Result<Self, MatcherError> {
        let mut syntax = syntax::Config::new();
        for flag in flags.chars() {
            syntax = match flag {
                'i' => syntax.case_insensitive(true),
                'm' => syntax.multi_line(true),
                's' => syntax.dot_matches_new_line(true),
                'x' => syntax.ignore_whitespace(true),
                'U' => syntax.swap_greed(true),
                'u' => syntax.unicode(true),
                'g' | 'y' => syntax, // Global/sticky are implied by how matchers are used
                _ => return Err(MatcherError::UnknownFlag(flag)),
            };
        }
        let regex = Regex::builder()
            .syntax(syntax)
            .build(pattern)
            .map_err(MatcherError::Regex)?;
        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// The pattern as written in the grammar
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Attempt to match this pattern starting **exactly** at byte index `pos` of `text`.  This
    /// never searches forward; if the pattern doesn't match at `pos`, `None` is returned.
    ///
    /// `pos` must lie on a `char` boundary.  The text before `pos` is still visible to
    /// assertions, so `\b` and multi-line `^` behave as they would anywhere in `text`.
    pub fn match_at(&self, text: &str, pos: usize) -> Option<MatchResult> {
        if pos > text.len() || !text.is_char_boundary(pos) {
            return None;
        }
        let input = Input::new(text)
            .span(pos..text.len())
            .anchored(Anchored::Yes);
        let mut captures = self.regex.create_captures();
        self.regex.search_captures(&input, &mut captures);
        let whole = captures.get_match()?;
        debug_assert_eq!(whole.start(), pos);
        let groups = (0..captures.group_len())
            .map(|i| captures.get_group(i).map(|span| span.range()))
            .collect();
        Some(MatchResult {
            range: whole.range(),
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Matcher, MatcherError};

    #[test]
    fn anchored() {
        let m = Matcher::new(r"\d+", "").unwrap();
        assert_eq!(m.match_at("12+3", 0).map(|r| r.range), Some(0..2));
        assert_eq!(m.match_at("12+3", 1).map(|r| r.range), Some(1..2));
        // Never searches forward
        assert_eq!(m.match_at("12+3", 2), None);
        assert_eq!(m.match_at("12+3", 3).map(|r| r.range), Some(3..4));
        assert_eq!(m.match_at("12+3", 4), None);
    }

    #[test]
    fn multi_line_caret_is_still_anchored() {
        let m = Matcher::new(r"^b", "m").unwrap();
        assert_eq!(m.match_at("a\nb", 0), None);
        assert_eq!(m.match_at("a\nb", 2).map(|r| r.range), Some(2..3));
    }

    #[test]
    fn assertions_see_preceding_text() {
        let m = Matcher::new(r"\b(?:true)\b", "").unwrap();
        assert_eq!(m.match_at("xtrue", 1), None);
        assert_eq!(m.match_at("x true", 2).map(|r| r.range), Some(2..6));

        let m = Matcher::new(r"^#", "m").unwrap();
        assert_eq!(m.match_at("a#", 1), None);
        assert_eq!(m.match_at("a\n#", 2).map(|r| r.range), Some(2..3));

        // `\A` is the start of the whole text, not of the remaining slice
        let m = Matcher::new(r"\Ab", "").unwrap();
        assert_eq!(m.match_at("ab", 1), None);
    }

    #[test]
    fn capture_groups() {
        let m = Matcher::new(r"(\w+)(\s*)(=)?", "").unwrap();
        let r = m.match_at("let x = 1", 4).unwrap();
        assert_eq!(r.range, 4..7);
        assert_eq!(
            r.groups,
            vec![Some(4..7), Some(4..5), Some(5..6), Some(6..7)]
        );

        let r = m.match_at("ab", 0).unwrap();
        assert_eq!(r.groups, vec![Some(0..2), Some(0..2), Some(2..2), None]);
    }

    #[test]
    fn flags() {
        let m = Matcher::new("abc", "i").unwrap();
        assert!(m.match_at("ABC", 0).is_some());
        let m = Matcher::new("a b c # the letters", "x").unwrap();
        assert_eq!(m.match_at("abc", 0).map(|r| r.range), Some(0..3));
        assert!(matches!(
            Matcher::new("abc", "q"),
            Err(MatcherError::UnknownFlag('q'))
        ));
        assert!(matches!(Matcher::new("(", ""), Err(MatcherError::Regex(_))));
    }

    #[test]
    fn multi_byte_chars() {
        let m = Matcher::new("é+", "").unwrap();
        assert_eq!(m.match_at("aéé", 1).map(|r| r.range), Some(1..5));
    }
}
