//! Directory-basename exclusion for the walker.

use std::collections::HashSet;

/// Directories that are never descended into unless explicitly re-enabled
/// with `--noignore-dir`. VCS bookkeeping and build-system droppings.
static BUILTIN_DIR_EXCLUDES: &[&str] = &[
    ".bzr",
    ".git",
    ".hg",
    ".metadata",
    ".svn",
    "CMakeFiles",
    "CVS",
    "autom4te.cache",
];

/// Rejects directory basenames from the built-in set plus any user
/// `--ignore-dir` additions, minus `--noignore-dir` removals.
#[derive(Debug, Clone)]
pub struct DirFilter {
    excluded: HashSet<String>,
}

impl DirFilter {
    pub fn new() -> DirFilter {
        DirFilter {
            excluded: BUILTIN_DIR_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Applies (name, add) operations in command-line order, so a
    /// `--noignore-dir` can undo an earlier `--ignore-dir` or a built-in.
    pub fn with_ops(ops: &[(String, bool)]) -> DirFilter {
        let mut filter = DirFilter::new();
        for (name, add) in ops {
            if *add {
                filter.add(name);
            } else {
                filter.remove(name);
            }
        }
        filter
    }

    pub fn add(&mut self, name: &str) {
        self.excluded.insert(name.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.excluded.remove(name);
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }
}

impl Default for DirFilter {
    fn default() -> Self {
        DirFilter::new()
    }
}
