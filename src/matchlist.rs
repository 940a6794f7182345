//! Match and match-group value types flowing from the scanners to the
//! output task.

use memchr::{memchr, memrchr};

/// One matched line within one file.
///
/// `pre` + `text` + `post` reproduce the exact bytes of the matched line,
/// excluding the terminating newline; the 1-based column of the match is
/// therefore `pre.len() + 1`. Deliberately not `Clone`: matches are moved
/// through the pipeline, never copied.
#[derive(Debug)]
pub struct Match {
    pub line_number: u64,
    pub pre: Vec<u8>,
    pub text: Vec<u8>,
    pub post: Vec<u8>,
}

impl Match {
    /// Builds a match from the raw file buffer and the match span.
    ///
    /// The line start is found by scanning backward for the preceding
    /// newline (or start of buffer), the line end by scanning forward for
    /// the next newline (or end of buffer).
    pub fn from_buffer(buf: &[u8], start: usize, end: usize, line_number: u64) -> Match {
        debug_assert!(start < end && end <= buf.len());

        let line_start = memrchr(b'\n', &buf[..start]).map_or(0, |p| p + 1);
        let line_end = memchr(b'\n', &buf[end..]).map_or(buf.len(), |p| end + p);

        Match {
            line_number,
            pre: buf[line_start..start].to_vec(),
            text: buf[start..end].to_vec(),
            post: buf[end..line_end].to_vec(),
        }
    }

    /// 1-based column of the first matched byte.
    pub fn column(&self) -> usize {
        self.pre.len() + 1
    }
}

/// All matches found within one file, in line order.
#[derive(Debug, Default)]
pub struct MatchGroup {
    pub path: String,
    matches: Vec<Match>,
}

impl MatchGroup {
    pub fn new(path: String) -> MatchGroup {
        MatchGroup {
            path,
            matches: Vec::new(),
        }
    }

    /// Appends a match. Line numbers must be strictly increasing; the
    /// scanner enforces the at-most-one-match-per-line rule before calling.
    pub fn push(&mut self, m: Match) {
        debug_assert!(
            self.matches.last().map_or(true, |prev| prev.line_number < m.line_number),
            "match line numbers must be strictly increasing"
        );
        self.matches.push(m);
    }

    /// Number of matched lines (one match per line, so len == lines).
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Match, MatchGroup};

    #[test]
    fn test_match_reconstructs_line() {
        let buf = b"int x = 42;\nreturn 0;\n";
        let m = Match::from_buffer(buf, 8, 10, 1);

        assert_eq!(m.pre, b"int x = ");
        assert_eq!(m.text, b"42");
        assert_eq!(m.post, b";");
        assert_eq!(m.column(), 9);
    }

    #[test]
    fn test_match_on_first_and_last_line() {
        let buf = b"alpha\nbeta";

        let first = Match::from_buffer(buf, 0, 5, 1);
        assert_eq!(first.pre, b"");
        assert_eq!(first.text, b"alpha");
        assert_eq!(first.post, b"");

        // No trailing newline on the last line.
        let last = Match::from_buffer(buf, 6, 10, 2);
        assert_eq!(last.pre, b"");
        assert_eq!(last.text, b"beta");
        assert_eq!(last.post, b"");
        assert_eq!(last.column(), 1);
    }

    #[test]
    fn test_group_counts_matched_lines() {
        let buf = b"one\ntwo\n";
        let mut group = MatchGroup::new("t.txt".to_string());
        assert!(group.is_empty());

        group.push(Match::from_buffer(buf, 0, 3, 1));
        group.push(Match::from_buffer(buf, 4, 7, 2));
        assert_eq!(group.len(), 2);
    }
}
