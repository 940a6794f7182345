//! Rc-file discovery and parsing.
//!
//! Two files are honored: `$HOME/.ucgrc`, then the nearest `.ucgrc` found
//! walking up from the current directory, stopping at (and excluding)
//! `$HOME`. Each file is a line-oriented list of options which get
//! prepended to the real command line.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const RC_FILENAME: &str = ".ucgrc";

/// Collects the options contributed by the rc files, user file first.
/// `skip_user_rc` leaves `$HOME/.ucgrc` alone; tests use it to keep the
/// invoking user's configuration out of the picture.
pub fn rc_arguments(skip_user_rc: bool) -> Result<Vec<String>> {
    let home = env::var_os("HOME").map(PathBuf::from);
    let mut args = Vec::new();

    if !skip_user_rc {
        if let Some(ref home) = home {
            let path = home.join(RC_FILENAME);
            match fs::read_to_string(&path) {
                Ok(text) => args.extend(parse_rc_text(&path.to_string_lossy(), &text)?),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("couldn't read rc file {:?}: {}", path, err),
            }
        }
    }

    if let Some(path) = project_rc_path(home.as_deref()) {
        match fs::read_to_string(&path) {
            Ok(text) => args.extend(parse_rc_text(&path.to_string_lossy(), &text)?),
            Err(err) => warn!("couldn't read rc file {:?}: {}", path, err),
        }
    }

    Ok(args)
}

/// Walks up from the cwd looking for a project rc file. The walk stops
/// before `$HOME` itself, so the user rc file is never read twice, and at
/// the filesystem root.
fn project_rc_path(home: Option<&Path>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    let canonical_home = home.and_then(|h| fs::canonicalize(h).ok());

    for dir in cwd.ancestors() {
        if let Some(ref home) = canonical_home {
            if fs::canonicalize(dir).ok().as_ref() == Some(home) {
                return None;
            }
        }

        let candidate = dir.join(RC_FILENAME);
        if candidate.is_file() {
            debug!("found rc file {:?}", candidate);
            return Some(candidate);
        }
    }

    None
}

/// Parses rc-file text: one option per line, blank lines and `#` comments
/// ignored. Bare positional arguments and `--` are forbidden; an rc file
/// cannot inject a pattern or paths.
fn parse_rc_text(name: &str, text: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line == "--" {
            return Err(Error::Usage(format!(
                "Double-dash \"--\" is not allowed in rc file \"{}\"",
                name
            )));
        }

        if !line.starts_with('-') {
            return Err(Error::Usage(format!(
                "Non-option argument \"{}\" is not allowed in rc file \"{}\"",
                line, name
            )));
        }

        args.push(line.to_string());
    }

    Ok(args)
}
