//! The output task: the single consumer of the match queue, rendering
//! match groups in arrival order and keeping the matched-line tally.

use std::io::Write;
use std::sync::Arc;

use crate::matchlist::MatchGroup;
use crate::queue::SyncQueue;

// ANSI SGR sequences. The trailing "erase in line" (\x1B[K) after every
// color change stops terminals from flooding the rest of a scrolled line
// with the current background color; GNU grep does the same.
const COLOR_FILENAME: &[u8] = b"\x1B[32;1m\x1B[K"; // green, bold
const COLOR_LINENO: &[u8] = b"\x1B[33;1m\x1B[K"; // yellow, bold
const COLOR_MATCH: &[u8] = b"\x1B[30;43;1m\x1B[K"; // black on yellow, bold
const COLOR_DEFAULT: &[u8] = b"\x1B[0m\x1B[K"; // reset

/// How the formatter renders: grouped with filename headers when stdout is
/// a terminal, one self-contained line per match when piped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub is_tty: bool,
    pub color: bool,
    pub column: bool,
    pub null_sep: bool,
}

/// Consumes match groups until the queue closes, writing rendered output to
/// the sink and summing matched lines for the exit status.
pub struct OutputTask<W: Write> {
    queue: Arc<SyncQueue<MatchGroup>>,
    opts: OutputOptions,
    sink: W,
    total_matched_lines: u64,
}

impl<W: Write> OutputTask<W> {
    pub fn new(queue: Arc<SyncQueue<MatchGroup>>, opts: OutputOptions, sink: W) -> OutputTask<W> {
        OutputTask {
            queue,
            opts,
            sink,
            total_matched_lines: 0,
        }
    }

    /// Runs to queue close; returns the total number of matched lines.
    pub fn run(mut self) -> u64 {
        let mut first_group = true;

        while let Some(group) = self.queue.pull() {
            self.total_matched_lines += group.len() as u64;

            if self.opts.is_tty && !first_group {
                // Blank line between per-file groups.
                if self.sink.write_all(b"\n").is_err() {
                    break;
                }
            }
            first_group = false;

            if let Err(err) = self.render_group(&group) {
                // Most likely a closed pipe; no point rendering further.
                error!("write error on output: {}", err);
                break;
            }
        }

        let _ = self.sink.flush();
        self.total_matched_lines
    }

    fn render_group(&mut self, group: &MatchGroup) -> std::io::Result<()> {
        // Leading "./" is noise when searching the default path.
        let path = group.path.strip_prefix("./").unwrap_or(&group.path);

        if self.opts.is_tty {
            self.write_colored(COLOR_FILENAME, path.as_bytes())?;
            self.sink.write_all(b"\n")?;
        }

        for m in group.iter() {
            if !self.opts.is_tty {
                self.write_colored(COLOR_FILENAME, path.as_bytes())?;
                self.sink
                    .write_all(if self.opts.null_sep { b"\0" } else { b":" })?;
            }

            self.write_colored(COLOR_LINENO, m.line_number.to_string().as_bytes())?;
            self.sink.write_all(b":")?;

            if self.opts.column {
                write!(self.sink, "{}:", m.column())?;
            }

            self.sink.write_all(&m.pre)?;
            self.write_colored(COLOR_MATCH, &m.text)?;
            self.sink.write_all(&m.post)?;
            self.sink.write_all(b"\n")?;
        }

        Ok(())
    }

    fn write_colored(&mut self, color: &[u8], text: &[u8]) -> std::io::Result<()> {
        if self.opts.color {
            self.sink.write_all(color)?;
            self.sink.write_all(text)?;
            self.sink.write_all(COLOR_DEFAULT)
        } else {
            self.sink.write_all(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputOptions, OutputTask};
    use crate::matchlist::{Match, MatchGroup};
    use crate::queue::SyncQueue;
    use std::sync::Arc;

    fn group(path: &str, lines: &[(u64, &str, &str, &str)]) -> MatchGroup {
        let mut g = MatchGroup::new(path.to_string());
        for (line_number, pre, text, post) in lines {
            g.push(Match {
                line_number: *line_number,
                pre: pre.as_bytes().to_vec(),
                text: text.as_bytes().to_vec(),
                post: post.as_bytes().to_vec(),
            });
        }
        g
    }

    fn render(opts: OutputOptions, groups: Vec<MatchGroup>) -> (String, u64) {
        let queue = Arc::new(SyncQueue::new());
        for g in groups {
            queue.push(g).unwrap();
        }
        queue.close();

        let mut out = Vec::new();
        let total = OutputTask::new(queue, opts, &mut out).run();
        (String::from_utf8(out).unwrap(), total)
    }

    #[test]
    fn test_pipe_mode_one_line_per_match() {
        let (out, total) = render(
            OutputOptions::default(),
            vec![group("a.c", &[(1, "int x = ", "42", ";")])],
        );
        assert_eq!(out, "a.c:1:int x = 42;\n");
        assert_eq!(total, 1);
    }

    #[test]
    fn test_pipe_mode_no_group_separator() {
        let (out, total) = render(
            OutputOptions::default(),
            vec![
                group("a.c", &[(1, "", "x", ""), (5, "", "x", "")]),
                group("b.c", &[(2, "", "x", "")]),
            ],
        );
        assert_eq!(out, "a.c:1:x\na.c:5:x\nb.c:2:x\n");
        assert_eq!(total, 3);
    }

    #[test]
    fn test_tty_mode_groups_under_header() {
        let opts = OutputOptions {
            is_tty: true,
            ..Default::default()
        };
        let (out, _) = render(
            opts,
            vec![
                group("a.c", &[(1, "", "x", ""), (5, "pre ", "x", " post")]),
                group("b.c", &[(2, "", "x", "")]),
            ],
        );
        assert_eq!(out, "a.c\n1:x\n5:pre x post\n\nb.c\n2:x\n");
    }

    #[test]
    fn test_column_output() {
        let opts = OutputOptions {
            column: true,
            ..Default::default()
        };
        let (out, _) = render(opts, vec![group("a.c", &[(3, "ab", "cd", "ef")])]);
        assert_eq!(out, "a.c:3:3:abcdef\n");
    }

    #[test]
    fn test_null_separator() {
        let opts = OutputOptions {
            null_sep: true,
            ..Default::default()
        };
        let (out, _) = render(opts, vec![group("a.c", &[(1, "", "x", "")])]);
        assert_eq!(out, "a.c\x001:x\n");
    }

    #[test]
    fn test_dot_slash_prefix_stripped() {
        let (out, _) = render(
            OutputOptions::default(),
            vec![group("./sub/a.c", &[(1, "", "x", "")])],
        );
        assert_eq!(out, "sub/a.c:1:x\n");
    }

    #[test]
    fn test_color_sequences_wrap_fields() {
        let opts = OutputOptions {
            color: true,
            ..Default::default()
        };
        let (out, _) = render(opts, vec![group("a.c", &[(1, "x = ", "42", ";")])]);
        assert_eq!(
            out,
            "\x1B[32;1m\x1B[Ka.c\x1B[0m\x1B[K:\x1B[33;1m\x1B[K1\x1B[0m\x1B[K:x = \x1B[30;43;1m\x1B[K42\x1B[0m\x1B[K;\n"
        );
    }

    #[test]
    fn test_tally_sums_all_groups() {
        let (_, total) = render(
            OutputOptions::default(),
            vec![
                group("a.c", &[(1, "", "x", ""), (2, "", "x", "")]),
                group("b.c", &[(9, "", "x", "")]),
            ],
        );
        assert_eq!(total, 3);
    }
}
