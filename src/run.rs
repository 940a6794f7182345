//! The driver: wires the walker, the scanner pool and the output task
//! together with the two queues, and runs a search to completion.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::dirfilter::DirFilter;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::output::{OutputOptions, OutputTask};
use crate::queue::SyncQueue;
use crate::scanner::Scanner;
use crate::walker::Walker;

/// Runs a search with stdout as the sink and returns the process exit
/// code: 0 for at least one match, 1 for none or a missing start path.
pub fn run(config: &Config) -> Result<i32> {
    let stdout_is_tty = atty::is(atty::Stream::Stdout);
    let opts = OutputOptions {
        is_tty: stdout_is_tty,
        color: config.color.unwrap_or(stdout_is_tty),
        column: config.column,
        null_sep: config.null_sep,
    };

    let sink = io::BufWriter::new(io::stdout());
    let (total_matched_lines, missing) = search(config, opts, sink)?;

    if let Some(path) = missing {
        // ack and ag treat a missing start path as "no matches found".
        eprintln!("ucgrep: \"{}\": No such file or directory", path.display());
        return Ok(1);
    }

    Ok(if total_matched_lines == 0 { 1 } else { 0 })
}

/// Runs the full pipeline against an arbitrary sink. Returns the total
/// matched-line count and the first missing start path, if any.
///
/// Startup order: output task, then the scanner pool, then the walker. The
/// walker is the source, so it goes last; everything downstream is already
/// waiting on its queue by the time files start flowing. Shutdown is the
/// close cascade: join walker, close file queue, join scanners, close match
/// queue, join output.
pub fn search<W>(
    config: &Config,
    opts: OutputOptions,
    sink: W,
) -> Result<(u64, Option<PathBuf>)>
where
    W: Write + Send + 'static,
{
    let type_filter = Arc::new(config.types.compile()?);
    let dir_filter = Arc::new(DirFilter::with_ops(&config.ignore_dirs));
    let matcher = Arc::new(Matcher::build(
        &config.pattern,
        config.ignore_case,
        config.smart_case,
        config.word_regexp,
        config.literal,
    )?);

    let file_queue = Arc::new(SyncQueue::new());
    let match_queue = Arc::new(SyncQueue::new());

    let output = OutputTask::new(match_queue.clone(), opts, sink);
    let output_thread = thread::Builder::new()
        .name("output".to_string())
        .spawn(move || output.run())?;

    let jobs = if config.jobs == 0 {
        num_cpus::get().max(1)
    } else {
        config.jobs
    };
    debug!("running with {} scanner jobs, {} dir jobs", jobs, config.dirjobs);

    let mut scanner_threads = Vec::with_capacity(jobs);
    for i in 0..jobs {
        let scanner = Scanner::new(file_queue.clone(), match_queue.clone(), matcher.clone());
        let handle = thread::Builder::new()
            .name(format!("scan-{}", i))
            .spawn(move || scanner.run())?;
        scanner_threads.push(handle);
    }

    let walker = Walker::new(
        config.paths.clone(),
        type_filter,
        dir_filter,
        config.recurse,
        config.follow_symlinks,
        config.dirjobs,
        file_queue.clone(),
    );
    let missing = walker.run();

    file_queue.close();
    for handle in scanner_threads {
        handle.join().expect("scanner thread panicked");
    }

    match_queue.close();
    let total_matched_lines = output_thread.join().expect("output thread panicked");

    Ok((total_matched_lines, missing))
}
