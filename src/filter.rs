//! The compiled, search-time file admission filter.
//!
//! Classifying basenames is on the walker's hot path: tens of thousands of
//! names per second. Extensions up to four bytes are packed into `u32`s and
//! binary-searched in a small sorted array, which keeps the common lookup
//! inside a couple of cache lines; longer extensions and literal filenames
//! fall back to hash sets, and glob rules are compiled into `GlobSet`s.

use std::collections::HashSet;

use globset::{Glob, GlobSet, GlobSetBuilder};
use memchr::memrchr;

use crate::error::Result;

/// Packs an extension body (without its dot) of at most four bytes into a
/// `u32`. The encoding only needs to be consistent, not meaningful: the
/// table is sorted and searched with the same packing.
fn pack_ext(ext: &[u8]) -> u32 {
    debug_assert!(ext.len() <= 4);

    let mut packed = 0u32;
    for (i, &b) in ext.iter().enumerate() {
        packed |= u32::from(b) << (8 * i);
    }
    packed
}

/// Decides whether a basename is of interest. Immutable once compiled;
/// shared read-only across the walker threads.
#[derive(Debug)]
pub struct TypeFilter {
    /// Sorted packed codes for extensions of one to four bytes.
    fast_exts: Vec<u32>,
    /// Extensions longer than four bytes, stored with their leading dot.
    long_exts: HashSet<String>,
    /// Literal basenames ("Makefile", "CMakeLists.txt").
    literal_names: HashSet<String>,
    /// Exclude globs; any match vetoes an extension or literal candidate.
    exclude_globs: GlobSet,
    /// All include and exclude globs, in command-line order.
    ordered_globs: GlobSet,
    /// Parallel to `ordered_globs` pattern indices: true for includes.
    ordered_is_include: Vec<bool>,
}

impl TypeFilter {
    /// Builds the tables. `extensions` carry their leading dot; `ordered`
    /// pairs each glob with an is-include tag, in the order given on the
    /// command line.
    pub fn compile(
        extensions: &[String],
        literals: &[String],
        exclude_globs: &[String],
        ordered: &[(String, bool)],
    ) -> Result<TypeFilter> {
        let mut fast_exts = Vec::new();
        let mut long_exts = HashSet::new();

        for ext in extensions {
            let body = &ext.as_bytes()[1..];
            if body.len() <= 4 {
                fast_exts.push(pack_ext(body));
            } else {
                long_exts.insert(ext.clone());
            }
        }

        fast_exts.sort_unstable();
        fast_exts.dedup();

        let mut exclude_builder = GlobSetBuilder::new();
        for glob in exclude_globs {
            exclude_builder.add(Glob::new(glob)?);
        }

        let mut ordered_builder = GlobSetBuilder::new();
        let mut ordered_is_include = Vec::with_capacity(ordered.len());
        for (glob, is_include) in ordered {
            ordered_builder.add(Glob::new(glob)?);
            ordered_is_include.push(*is_include);
        }

        Ok(TypeFilter {
            fast_exts,
            long_exts,
            literal_names: literals.iter().cloned().collect(),
            exclude_globs: exclude_builder.build()?,
            ordered_globs: ordered_builder.build()?,
            ordered_is_include,
        })
    }

    /// True if a file with this basename should be scanned.
    pub fn admit(&self, name: &str) -> bool {
        let bytes = name.as_bytes();

        // A candidate matched by extension or literal name is only vetoed
        // by the exclude globs; a non-candidate gets one more chance from
        // the ordered include/exclude glob list.
        let mut candidate = false;

        if let Some(dot) = memrchr(b'.', bytes) {
            // A leading dot is a hidden file, not an extension.
            if dot != 0 {
                let body = &bytes[dot + 1..];
                if body.len() <= 4 {
                    candidate = self.fast_exts.binary_search(&pack_ext(body)).is_ok();
                } else {
                    candidate = self.long_exts.contains(&name[dot..]);
                }
            }
        }

        if !candidate {
            candidate = self.literal_names.contains(name);
        }

        if candidate {
            return !self.exclude_globs.is_match(name);
        }

        // The last matching glob decides; no match at all rejects.
        match self.ordered_globs.matches(name).last() {
            Some(&idx) => self.ordered_is_include[idx],
            None => false,
        }
    }
}
