//! Search configuration.
//!
//! The [`Config`] struct is not constructable, use [`ConfigBuilder`].
//!
//! # Examples
//!
//! ```
//! # use ucgrep::config::ConfigBuilder;
//! ConfigBuilder::default()
//!     .pattern("TODO")
//!     .build()
//!     .expect("mission failed");
//! ```

use std::path::PathBuf;

use crate::types::Types;

/// Everything the search pipeline needs to know, assembled by the CLI layer
/// and immutable once the pipeline starts.
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option))]
#[builder(build_fn(validate = "Self::validate"))]
#[non_exhaustive]
pub struct Config {
    /// The search pattern.
    pub pattern: String,
    /// Files and directories to search.
    #[builder(default = "vec![PathBuf::from(\".\")]")]
    pub paths: Vec<PathBuf>,
    /// Ignore case distinctions in the pattern.
    #[builder(default)]
    pub ignore_case: bool,
    /// Ignore case when the pattern has no uppercase characters.
    #[builder(default = "true")]
    pub smart_case: bool,
    /// The pattern must match a complete word.
    #[builder(default)]
    pub word_regexp: bool,
    /// Treat the pattern as a literal string, not a regex.
    #[builder(default)]
    pub literal: bool,
    /// Print the column of the first match after the line number.
    #[builder(default)]
    pub column: bool,
    /// Force color on or off; `None` auto-detects from the terminal.
    #[builder(default)]
    pub color: Option<bool>,
    /// Print NUL instead of ':' after the file name.
    #[builder(default)]
    pub null_sep: bool,
    /// Recurse into subdirectories.
    #[builder(default = "true")]
    pub recurse: bool,
    /// Follow symlinks during traversal.
    #[builder(default)]
    pub follow_symlinks: bool,
    /// Scanner threads; 0 means one per CPU.
    #[builder(default)]
    pub jobs: usize,
    /// Directory traversal threads.
    #[builder(default = "4")]
    pub dirjobs: usize,
    /// The file-type registry, with all command-line administration applied.
    #[builder(default)]
    pub types: Types,
    /// (name, add) operations for the directory filter, in command-line
    /// order so later removals can undo earlier additions.
    #[builder(default)]
    pub ignore_dirs: Vec<(String, bool)>,
}

impl ConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.paths.as_ref().map_or(false, Vec::is_empty) {
            return Err("paths must not be empty".into());
        }

        if self.dirjobs.map_or(false, |n| n == 0) {
            return Err("dirjobs must be greater than zero".into());
        }

        Ok(())
    }
}
