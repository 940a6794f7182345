//! Parallel directory traversal feeding the file queue.
//!
//! A pool of workers shares an internal directory queue; each worker lists
//! one directory at a time, pushing admitted files to the output queue and
//! subdirectories back onto the directory queue. An in-flight counter
//! distinguishes "temporarily empty" (another worker may still push
//! children) from "permanently empty", which is when the directory queue is
//! closed and the workers drain out.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::dirfilter::DirFilter;
use crate::filter::TypeFilter;
use crate::queue::SyncQueue;

/// One regular file to be scanned, fully described at traversal time so the
/// scanner never needs another stat.
#[derive(Debug)]
pub struct FileHandle {
    pub path: PathBuf,
    pub size: u64,
    /// Preferred I/O block size reported by the filesystem.
    pub block_size: u64,
}

#[cfg(unix)]
fn dev_ino(md: &fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (md.dev(), md.ino())
}

#[cfg(unix)]
fn block_size(md: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    md.blksize()
}

#[cfg(not(unix))]
fn block_size(_md: &fs::Metadata) -> u64 {
    4096
}

/// Key identifying a directory for cycle/duplicate detection. On unix the
/// (device, inode) pair defeats hardlinked directories and overlapping
/// start paths; elsewhere the canonical path has to do.
#[cfg(unix)]
type VisitKey = (u64, u64);
#[cfg(not(unix))]
type VisitKey = PathBuf;

#[cfg(unix)]
fn visit_key(path: &Path, md: &fs::Metadata) -> VisitKey {
    let _ = path;
    dev_ino(md)
}

#[cfg(not(unix))]
fn visit_key(path: &Path, _md: &fs::Metadata) -> VisitKey {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Traversal counters, kept per worker and merged once at worker exit.
#[derive(Debug, Default, Clone)]
struct TraversalStats {
    dirs_found: usize,
    dirs_rejected: usize,
    files_found: usize,
    files_rejected: usize,
    files_sent: usize,
}

impl TraversalStats {
    fn merge(&mut self, other: &TraversalStats) {
        self.dirs_found += other.dirs_found;
        self.dirs_rejected += other.dirs_rejected;
        self.files_found += other.files_found;
        self.files_rejected += other.files_rejected;
        self.files_sent += other.files_sent;
    }
}

struct WalkContext {
    type_filter: Arc<TypeFilter>,
    dir_filter: Arc<DirFilter>,
    recurse: bool,
    follow_symlinks: bool,
    files: Arc<SyncQueue<FileHandle>>,
    dirs: SyncQueue<PathBuf>,
    /// Directories enqueued but not yet fully listed. The worker that
    /// brings this to zero closes the directory queue.
    in_flight: AtomicUsize,
    visited: Mutex<HashSet<VisitKey>>,
    totals: Mutex<TraversalStats>,
}

pub struct Walker {
    start_paths: Vec<PathBuf>,
    dirjobs: usize,
    ctx: Arc<WalkContext>,
}

impl Walker {
    pub fn new(
        start_paths: Vec<PathBuf>,
        type_filter: Arc<TypeFilter>,
        dir_filter: Arc<DirFilter>,
        recurse: bool,
        follow_symlinks: bool,
        dirjobs: usize,
        files: Arc<SyncQueue<FileHandle>>,
    ) -> Walker {
        Walker {
            start_paths,
            dirjobs,
            ctx: Arc::new(WalkContext {
                type_filter,
                dir_filter,
                recurse,
                follow_symlinks,
                files,
                dirs: SyncQueue::new(),
                in_flight: AtomicUsize::new(0),
                visited: Mutex::new(HashSet::new()),
                totals: Mutex::new(TraversalStats::default()),
            }),
        }
    }

    /// Traverses all start paths to completion. Returns the first start
    /// path that could not be found, if any; the caller closes the file
    /// queue and reports the missing path after shutdown.
    pub fn run(&self) -> Option<PathBuf> {
        let mut missing = None;

        for path in &self.start_paths {
            // Explicitly named paths are resolved through symlinks.
            let md = match fs::metadata(path) {
                Ok(md) => md,
                Err(err) => {
                    debug!("start path {:?}: {}", path, err);
                    if missing.is_none() {
                        missing = Some(path.clone());
                    }
                    continue;
                }
            };

            if md.is_file() {
                // A file named on the command line is always scanned; the
                // type filter only applies to files discovered by walking.
                let handle = FileHandle {
                    path: path.clone(),
                    size: md.len(),
                    block_size: block_size(&md),
                };
                if self.ctx.files.push(handle).is_err() {
                    return missing;
                }
            } else if md.is_dir() {
                // Repeated start paths collapse into one visit.
                if self.ctx.mark_visited(path, &md) {
                    self.ctx.enqueue_dir(path.clone());
                }
            }
        }

        if self.ctx.in_flight.load(Ordering::Acquire) == 0 {
            // Nothing to traverse; don't strand the workers.
            self.ctx.dirs.close();
        }

        let mut workers = Vec::with_capacity(self.dirjobs);
        for i in 0..self.dirjobs {
            let ctx = self.ctx.clone();
            let worker = thread::Builder::new()
                .name(format!("walk-{}", i))
                .spawn(move || worker_loop(&ctx))
                .expect("failed to spawn walker thread");
            workers.push(worker);
        }

        for worker in workers {
            worker.join().expect("walker thread panicked");
        }

        let totals = self.ctx.totals.lock().expect("stats lock poisoned");
        debug!(
            "traversal: {} dirs found, {} dirs rejected, {} files found, {} files rejected, {} files sent",
            totals.dirs_found, totals.dirs_rejected, totals.files_found, totals.files_rejected,
            totals.files_sent
        );

        missing
    }
}

impl WalkContext {
    /// Records a directory as seen; true if it was new.
    fn mark_visited(&self, path: &Path, md: &fs::Metadata) -> bool {
        let key = visit_key(path, md);
        self.visited
            .lock()
            .expect("visited-set lock poisoned")
            .insert(key)
    }

    fn enqueue_dir(&self, path: PathBuf) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if self.dirs.push(path).is_err() {
            // Closed queue during shutdown; balance the counter.
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

fn worker_loop(ctx: &WalkContext) {
    let mut stats = TraversalStats::default();

    while let Some(dir) = ctx.dirs.pull() {
        process_dir(ctx, &dir, &mut stats);

        if ctx.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last in-flight directory fully listed; traversal is done.
            ctx.dirs.close();
        }
    }

    ctx.totals
        .lock()
        .expect("stats lock poisoned")
        .merge(&stats);
}

fn process_dir(ctx: &WalkContext, dir: &Path, stats: &mut TraversalStats) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("could not read directory {:?}: {}", dir, err);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("bad directory entry in {:?}: {}", dir, err);
                continue;
            }
        };

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(err) => {
                warn!("could not determine type of {:?}: {}", entry.path(), err);
                continue;
            }
        };

        let name = entry.file_name();
        let name = name.to_string_lossy();

        let (is_dir, is_file, metadata) = if file_type.is_symlink() {
            if !ctx.follow_symlinks {
                // Symlinked directories are never traversed, symlinked
                // files are skipped.
                continue;
            }
            match fs::metadata(entry.path()) {
                Ok(md) => (md.is_dir(), md.is_file(), Some(md)),
                Err(err) => {
                    warn!("broken symlink {:?}: {}", entry.path(), err);
                    continue;
                }
            }
        } else {
            (file_type.is_dir(), file_type.is_file(), None)
        };

        if is_dir {
            stats.dirs_found += 1;

            if !ctx.recurse || ctx.dir_filter.is_excluded(&name) {
                stats.dirs_rejected += 1;
                continue;
            }

            let path = entry.path();
            let md = match metadata.map_or_else(|| entry.metadata(), Ok) {
                Ok(md) => md,
                Err(err) => {
                    warn!("could not stat {:?}: {}", path, err);
                    continue;
                }
            };

            // Overlapping roots, hardlinks, and symlink cycles all resolve
            // to an already-visited key.
            if ctx.mark_visited(&path, &md) {
                ctx.enqueue_dir(path);
            } else {
                stats.dirs_rejected += 1;
            }
        } else if is_file {
            stats.files_found += 1;

            if !ctx.type_filter.admit(&name) {
                stats.files_rejected += 1;
                continue;
            }

            // Admitted files are the only ones worth a stat.
            let md = match metadata.map_or_else(|| entry.metadata(), Ok) {
                Ok(md) => md,
                Err(err) => {
                    warn!("could not stat {:?}: {}", entry.path(), err);
                    continue;
                }
            };

            stats.files_sent += 1;
            let handle = FileHandle {
                path: entry.path(),
                size: md.len(),
                block_size: block_size(&md),
            };
            if ctx.files.push(handle).is_err() {
                return;
            }
        }
        // Sockets, fifos, devices: skipped.
    }
}

#[cfg(test)]
mod tests {
    use super::{FileHandle, Walker};
    use crate::dirfilter::DirFilter;
    use crate::queue::SyncQueue;
    use crate::types::Types;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn walk(paths: Vec<PathBuf>, recurse: bool, follow: bool) -> (Vec<PathBuf>, Option<PathBuf>) {
        let filter = Arc::new(Types::new().compile().unwrap());
        let dir_filter = Arc::new(DirFilter::new());
        let files: Arc<SyncQueue<FileHandle>> = Arc::new(SyncQueue::new());

        let walker = Walker::new(paths, filter, dir_filter, recurse, follow, 4, files.clone());
        let missing = walker.run();
        files.close();

        let mut found = Vec::new();
        while let Some(handle) = files.pull() {
            found.push(handle.path);
        }
        (found, missing)
    }

    #[test]
    fn test_walks_admitted_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("a.c"), "int x;\n").unwrap();
        fs::write(root.join("b.log"), "noise\n").unwrap();
        fs::write(root.join("sub/c.py"), "pass\n").unwrap();

        let (found, missing) = walk(vec![root.to_path_buf()], true, false);
        assert!(missing.is_none());

        let names: BTreeSet<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.c", "c.py"].iter().map(|s| s.to_string()).collect());
    }

    #[test]
    fn test_no_recurse_stays_at_top_level() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("a.c"), "x\n").unwrap();
        fs::write(root.join("sub/b.c"), "y\n").unwrap();

        let (found, _) = walk(vec![root.to_path_buf()], false, false);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.c"));
    }

    #[test]
    fn test_excluded_dirs_are_not_entered() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/config.c"), "hidden\n").unwrap();
        fs::write(root.join("a.c"), "x\n").unwrap();

        let (found, _) = walk(vec![root.to_path_buf()], true, false);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.c"));
    }

    #[test]
    fn test_overlapping_roots_deliver_files_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/a.c"), "x\n").unwrap();

        // The same tree from two angles; the visited set must dedupe.
        let (found, _) = walk(
            vec![root.to_path_buf(), root.join("sub")],
            true,
            false,
        );
        assert_eq!(found.len(), 1, "found: {:?}", found);
    }

    #[test]
    fn test_missing_start_path_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let bogus = tmp.path().join("nonexistent");

        let (found, missing) = walk(vec![bogus.clone()], true, false);
        assert!(found.is_empty());
        assert_eq!(missing, Some(bogus));
    }

    #[test]
    fn test_explicit_file_bypasses_type_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("trace.log");
        fs::write(&log, "not a source file\n").unwrap();

        let (found, missing) = walk(vec![log.clone()], true, false);
        assert!(missing.is_none());
        assert_eq!(found, vec![log]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycles_terminate() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("d1")).unwrap();
        fs::write(root.join("d1/a.c"), "x\n").unwrap();
        // Loop back up to the root.
        std::os::unix::fs::symlink(root, root.join("d1/loop")).unwrap();

        let (found, _) = walk(vec![root.to_path_buf()], true, true);
        assert_eq!(found.len(), 1, "found: {:?}", found);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_when_not_following() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real/a.c"), "x\n").unwrap();
        std::os::unix::fs::symlink(root.join("real/a.c"), root.join("link.c")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("linkdir")).unwrap();

        let (found, _) = walk(vec![root.to_path_buf()], true, false);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("real/a.c"));

        let (found, _) = walk(vec![root.to_path_buf()], true, true);
        assert_eq!(found.len(), 2);
    }
}
