//! Pattern compilation and the narrow find interface the scanners use.
//!
//! The backend is a tagged variant: a compiled byte regex for the general
//! case, and a SIMD substring finder for case-sensitive literal patterns,
//! which skips the regex engine entirely.

use memchr::memmem::Finder;
use regex::bytes::RegexBuilder;

use crate::error::Result;

/// A compiled search pattern. Built once before the pipeline starts and
/// shared read-only across the scanner threads.
#[derive(Debug)]
pub enum Matcher {
    Regex(regex::bytes::Regex),
    Literal(Finder<'static>),
}

impl Matcher {
    /// Compiles `pattern` with the case/word/literal options applied.
    ///
    /// Smart case turns on case-insensitive matching when the pattern
    /// contains no uppercase byte and `-i` wasn't given explicitly.
    pub fn build(
        pattern: &str,
        ignore_case: bool,
        smart_case: bool,
        word_regexp: bool,
        literal: bool,
    ) -> Result<Matcher> {
        let caseless = ignore_case
            || (smart_case && !pattern.bytes().any(|b| b.is_ascii_uppercase()));

        if literal && !word_regexp && !caseless {
            // Pure literal: straight to the substring search.
            return Ok(Matcher::Literal(
                Finder::new(pattern.as_bytes()).into_owned(),
            ));
        }

        let mut source = if literal {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };

        if word_regexp {
            source = format!(r"\b(?:{})\b", source);
        }

        let re = RegexBuilder::new(&source)
            .case_insensitive(caseless)
            .multi_line(true)
            .unicode(false)
            .build()?;

        Ok(Matcher::Regex(re))
    }

    /// Finds the leftmost match at or after `start`. Returns the half-open
    /// byte span of the match.
    pub fn find_at(&self, haystack: &[u8], start: usize) -> Option<(usize, usize)> {
        match self {
            Matcher::Regex(re) => re.find_at(haystack, start).map(|m| (m.start(), m.end())),
            Matcher::Literal(finder) => finder
                .find(&haystack[start..])
                .map(|pos| (start + pos, start + pos + finder.needle().len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Matcher;

    fn build(pattern: &str) -> Matcher {
        Matcher::build(pattern, false, true, false, false).unwrap()
    }

    #[test]
    fn test_plain_find() {
        let m = build("ne+dle");
        assert_eq!(m.find_at(b"hay needle hay", 0), Some((4, 10)));
        assert_eq!(m.find_at(b"hay needle hay", 5), None);
        assert_eq!(m.find_at(b"nothing", 0), None);
    }

    #[test]
    fn test_literal_uses_substring_search() {
        let m = Matcher::build("a.b", false, false, false, true).unwrap();
        match m {
            Matcher::Literal(_) => {}
            Matcher::Regex(_) => panic!("literal pattern should use the substring finder"),
        }
        assert_eq!(m.find_at(b"xa.by", 0), Some((1, 4)));
        // The dot is not a metacharacter here.
        assert_eq!(m.find_at(b"xaaby", 0), None);
    }

    #[test]
    fn test_literal_with_ignore_case_falls_back_to_regex() {
        let m = Matcher::build("a.b", true, false, false, true).unwrap();
        assert_eq!(m.find_at(b"xA.By", 0), Some((1, 4)));
        assert_eq!(m.find_at(b"xaaby", 0), None);
    }

    #[test]
    fn test_smart_case_lowercase_pattern_is_caseless() {
        let m = Matcher::build("todo", false, true, false, false).unwrap();
        assert_eq!(m.find_at(b"# TODO later", 0), Some((2, 6)));
    }

    #[test]
    fn test_smart_case_uppercase_pattern_is_exact() {
        let m = Matcher::build("Todo", false, true, false, false).unwrap();
        assert_eq!(m.find_at(b"# TODO later", 0), None);
        assert_eq!(m.find_at(b"# Todo later", 0), Some((2, 6)));
    }

    #[test]
    fn test_no_smart_case_is_exact() {
        let m = Matcher::build("todo", false, false, false, false).unwrap();
        assert_eq!(m.find_at(b"# TODO later", 0), None);
    }

    #[test]
    fn test_word_regexp_requires_boundaries() {
        let m = Matcher::build("cat", false, true, true, false).unwrap();
        assert_eq!(m.find_at(b"a cat sat", 0), Some((2, 5)));
        assert_eq!(m.find_at(b"concatenate", 0), None);
    }

    #[test]
    fn test_word_regexp_wraps_whole_alternation() {
        let m = Matcher::build("cat|dog", false, true, true, false).unwrap();
        assert_eq!(m.find_at(b"hotdog", 0), None);
        assert_eq!(m.find_at(b"a dog", 0), Some((2, 5)));
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        assert!(Matcher::build("(unclosed", false, true, false, false).is_err());
    }
}
