//! The scanner worker pool: reads files off the file queue, runs the
//! compiled pattern over their bytes, and emits per-file match groups.

use std::fs;
use std::io::Read;
use std::sync::Arc;

use memchr::memchr_iter;

use crate::matcher::Matcher;
use crate::matchlist::{Match, MatchGroup};
use crate::queue::SyncQueue;
use crate::walker::FileHandle;

/// Preferred I/O size bounds. stat() routinely reports 4 KiB block sizes,
/// which is far below what current storage wants per request.
const MIN_IO_BLOCK: u64 = 0x20000; // 128 KiB
const MAX_IO_BLOCK: u64 = 0x100000; // 1 MiB

/// Counts newlines in a byte range.
///
/// This is the hot path of line accounting; `memchr_iter` dispatches to the
/// best vectorized implementation the CPU supports at runtime, is correct
/// for unaligned ends, and never reads past the slice.
pub fn count_newlines(haystack: &[u8]) -> u64 {
    memchr_iter(b'\n', haystack).count() as u64
}

/// One scanner worker. Clones share the queues and the compiled matcher;
/// each worker owns a reusable read buffer for its whole lifetime.
pub struct Scanner {
    in_queue: Arc<SyncQueue<FileHandle>>,
    out_queue: Arc<SyncQueue<MatchGroup>>,
    matcher: Arc<Matcher>,
}

impl Scanner {
    pub fn new(
        in_queue: Arc<SyncQueue<FileHandle>>,
        out_queue: Arc<SyncQueue<MatchGroup>>,
        matcher: Arc<Matcher>,
    ) -> Scanner {
        Scanner {
            in_queue,
            out_queue,
            matcher,
        }
    }

    /// Worker loop: pull, read, scan, emit, until the file queue closes.
    pub fn run(&self) {
        // One growable buffer per worker, reused across files.
        let mut buf: Vec<u8> = Vec::new();

        while let Some(handle) = self.in_queue.pull() {
            if handle.size == 0 {
                debug!("skipping zero-length file {:?}", handle.path);
                continue;
            }

            if let Err(err) = read_file(&handle, &mut buf) {
                warn!("could not read {:?}: {}", handle.path, err);
                continue;
            }

            let path = handle.path.to_string_lossy().into_owned();
            let group = scan_buffer(&buf, &self.matcher, path);

            if !group.is_empty() {
                // A closed match queue means the pipeline is shutting down.
                if self.out_queue.push(group).is_err() {
                    break;
                }
            }
        }
    }
}

/// Reads the whole file into `buf`, replacing its previous contents. Reads
/// in chunks of the file's preferred block size, clamped to sane bounds.
fn read_file(handle: &FileHandle, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let io_size = handle.block_size.max(MIN_IO_BLOCK).min(MAX_IO_BLOCK) as usize;

    buf.clear();
    buf.reserve(handle.size as usize);

    let mut file = fs::File::open(&handle.path)?;
    loop {
        let old_len = buf.len();
        buf.resize(old_len + io_size, 0);
        let n = file.read(&mut buf[old_len..])?;
        buf.truncate(old_len + n);
        if n == 0 {
            return Ok(());
        }
    }
}

/// Runs the matcher over the buffer, collecting at most one match per line,
/// with line numbers computed incrementally between match starts.
pub fn scan_buffer(buf: &[u8], matcher: &Matcher, path: String) -> MatchGroup {
    let mut group = MatchGroup::new(path);

    let mut start = 0;
    // Offset up to which newlines have been counted into line_no.
    let mut last_counted = 0;
    let mut line_no: u64 = 1;
    let mut prev_line_no: u64 = 0;

    while start <= buf.len() {
        let (m_start, m_end) = match matcher.find_at(buf, start) {
            Some(span) => span,
            None => break,
        };

        if m_start == m_end {
            // Zero-length match. Step one byte past it and retry, so
            // patterns like `a*` can't loop forever. Multi-byte advances
            // for CRLF or UTF-8 would hook in here; the file is treated as
            // opaque bytes and only '\n' terminates lines.
            start = m_end + 1;
            continue;
        }

        line_no += count_newlines(&buf[last_counted..m_start]);
        last_counted = m_start;
        start = m_end;

        if line_no == prev_line_no {
            // Only the first match on a line is reported.
            continue;
        }
        prev_line_no = line_no;

        group.push(Match::from_buffer(buf, m_start, m_end, line_no));
    }

    group
}

#[cfg(test)]
mod tests {
    use super::{count_newlines, scan_buffer};
    use crate::matcher::Matcher;
    use crate::matchlist::MatchGroup;

    fn scan(pattern: &str, haystack: &[u8]) -> MatchGroup {
        let matcher = Matcher::build(pattern, false, false, false, false).unwrap();
        scan_buffer(haystack, &matcher, "test".to_string())
    }

    #[test]
    fn test_count_newlines() {
        assert_eq!(count_newlines(b""), 0);
        assert_eq!(count_newlines(b"no newline"), 0);
        assert_eq!(count_newlines(b"a\nb\nc\n"), 3);
        assert_eq!(count_newlines(b"\n\n\n\n"), 4);
    }

    #[test]
    fn test_single_match() {
        let group = scan("42", b"int x = 42;\nreturn 0;\n");
        assert_eq!(group.len(), 1);

        let m = group.iter().next().unwrap();
        assert_eq!(m.line_number, 1);
        assert_eq!(m.pre, b"int x = ");
        assert_eq!(m.text, b"42");
        assert_eq!(m.post, b";");
    }

    #[test]
    fn test_line_numbers_accumulate() {
        let group = scan("x", b"a\nb\nx\n\n\nx y x\n");
        let lines: Vec<u64> = group.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![3, 6]);
    }

    #[test]
    fn test_at_most_one_match_per_line() {
        let group = scan("foo", b"foo foo foo\nbar foo\n");
        assert_eq!(group.len(), 2);

        let mut it = group.iter();
        let first = it.next().unwrap();
        assert_eq!(first.line_number, 1);
        // The first match on the line, with the rest of the line as post.
        assert_eq!(first.pre, b"");
        assert_eq!(first.text, b"foo");
        assert_eq!(first.post, b" foo foo");

        let second = it.next().unwrap();
        assert_eq!(second.line_number, 2);
        assert_eq!(second.pre, b"bar ");
    }

    #[test]
    fn test_no_trailing_newline() {
        let group = scan("end", b"the end");
        assert_eq!(group.len(), 1);
        let m = group.iter().next().unwrap();
        assert_eq!(m.pre, b"the ");
        assert_eq!(m.text, b"end");
        assert_eq!(m.post, b"");
    }

    #[test]
    fn test_empty_matches_do_not_loop() {
        // `a*` matches the empty string everywhere; the scan must still
        // terminate and report only the non-empty matches.
        let group = scan("a*", b"bb ab\nbbb\naa\n");
        let lines: Vec<u64> = group.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![1, 3]);

        let texts: Vec<&[u8]> = group.iter().map(|m| m.text.as_slice()).collect();
        assert_eq!(texts, vec![b"a" as &[u8], b"aa"]);
    }

    #[test]
    fn test_empty_pattern_finds_nothing() {
        let group = scan("z*", b"abc\ndef\n");
        assert!(group.is_empty());
    }

    #[test]
    fn test_match_columns() {
        let group = scan("bar", b"foo bar\n  bar\n");
        let cols: Vec<usize> = group.iter().map(|m| m.column()).collect();
        assert_eq!(cols, vec![5, 3]);
    }

    #[test]
    fn test_line_reconstruction_invariant() {
        let buf: &[u8] = b"alpha beta gamma\ndelta beta\nepsilon\n";
        let group = scan("beta", buf);

        for m in group.iter() {
            let mut line = Vec::new();
            line.extend_from_slice(&m.pre);
            line.extend_from_slice(&m.text);
            line.extend_from_slice(&m.post);

            let expected: &[u8] = buf
                .split(|&b| b == b'\n')
                .nth((m.line_number - 1) as usize)
                .unwrap();
            assert_eq!(line, expected);
        }
    }
}
